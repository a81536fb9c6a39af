//! Boighor storefront client library.
//!
//! Client-side state for the bookstore: who is signed in, the OTP login
//! flow, the server-held cart, catalogue queries, orders and checkout. A
//! front-end (the CLI, or anything else) drives the controllers in
//! [`services`] and renders what they publish.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod lifetime;
pub mod notify;
pub mod services;
pub mod state;

pub use error::{AppError, Result};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use state::Storefront;
