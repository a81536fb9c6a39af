//! Client-side controllers.
//!
//! # Services
//!
//! - `session` - Who is signed in, plus the shared busy flag
//! - `auth` - Email + one-time-code login flow with resend countdown
//! - `cart` - Mirror of the server-held cart
//! - `products` - Listing filters, search debounce, autocomplete
//! - `orders` - Order history and cancellation
//! - `addresses` - Saved shipping addresses
//! - `checkout` - Cash on delivery and hosted online payment
//! - `catalogue` - Downloadable catalogues
//!
//! Every controller is cheap to clone and shares its state through an
//! `Arc`. State that views render is published on a `tokio::sync::watch`
//! channel; transient messages go through the [`Notifier`](crate::notify::Notifier).

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalogue;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod session;

pub use addresses::AddressBook;
pub use auth::{Countdown, OtpFlow, OtpState};
pub use cart::{CartSnapshot, CartSync};
pub use catalogue::CatalogueShelf;
pub use checkout::{Checkout, PaymentOutcome};
pub use orders::OrderBook;
pub use products::{ProductCatalog, ProductListing, ProductQuery, QueryChange};
pub use session::{BusyGuard, Identity, SessionState, SessionStore};
