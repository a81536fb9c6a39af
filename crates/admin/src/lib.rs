//! Boighor admin library.
//!
//! Back-office controllers for the bookstore: the order list with change
//! polling, product authoring, catalogue uploads and sales stats.
//!
//! # Security
//!
//! Admin views are only offered to identities whose role is `admin`. That
//! check is cosmetic; the backend enforces authorization on every call.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod services;
pub mod state;

pub use state::AdminConsole;
