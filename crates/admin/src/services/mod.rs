//! Back-office controllers.
//!
//! # Services
//!
//! - `order_poller` - Order list, status changes and change polling
//! - `products` - Create and edit products
//! - `catalogues` - Upload and delete downloadable catalogues
//! - `stats` - Payment split and best sellers

pub mod catalogues;
pub mod order_poller;
pub mod products;
pub mod stats;

pub use catalogues::CatalogueAdmin;
pub use order_poller::{OrderListState, OrderPoller, filter_orders, latest_update};
pub use products::{ProductAdmin, validate_draft};
pub use stats::{PaymentSplit, StatsBoard, best_sellers};
