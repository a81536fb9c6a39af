//! Core types for Boighor.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod language;
pub mod otp;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use language::{Language, Localized};
pub use otp::{OtpCode, OtpCodeError};
pub use price::{CurrencyCode, Price};
pub use status::*;
