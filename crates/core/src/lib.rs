//! Boighor Core - Shared domain types.
//!
//! This crate provides the types used across all Boighor components:
//! - `storefront` - Customer-facing client state (session, OTP login, cart, catalogue queries)
//! - `admin` - Back-office services (order polling, product authoring, stats)
//! - `cli` - Terminal front-end that drives both
//!
//! # Architecture
//!
//! The core crate contains only types and parsing rules - no I/O, no HTTP
//! clients, no timers. Anything that talks to the bookstore backend lives in
//! `boighor-storefront`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, OTP codes, prices, statuses and languages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
