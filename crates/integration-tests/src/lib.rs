//! Integration tests for Boighor.
//!
//! The controllers are wired to [`fake::FakeBackend`], an in-memory
//! bookstore backend, so whole flows (sign in, fill the cart, check out,
//! manage orders) run without a network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boighor-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - OTP sign-in, resend countdown, logout
//! - `cart_sync` - Cart mirror and stale responses
//! - `product_queries` - Filters, paging, search and autocomplete
//! - `checkout_orders` - Addresses, checkout and customer orders
//! - `admin_console` - Order polling, status changes, products, stats

pub mod fake;

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use url::Url;

use boighor_core::{AddressId, Localized, OrderId, OrderStatus, PaymentMethod, ProductId, UserId};
use boighor_storefront::{Notice, Storefront};
use boighor_storefront::api::{Address, AddressInput, Order, OrderCustomer, Product};
use boighor_storefront::config::StorefrontConfig;
use boighor_storefront::credentials::{CredentialStore, MemoryCredentialStore};

pub use fake::{ADMIN_ORDERS_PER_PAGE, FakeBackend, OTP_CODE};

/// A storefront wired to a fake backend.
pub struct TestShop {
    pub backend: Arc<FakeBackend>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub storefront: Storefront,
}

impl TestShop {
    /// A storefront with default timings over an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(Arc::new(FakeBackend::new()))
    }

    #[must_use]
    pub fn with_backend(backend: Arc<FakeBackend>) -> Self {
        Self::with_parts(backend, Arc::new(MemoryCredentialStore::new()))
    }

    /// A storefront over existing backend and credential state, as after a
    /// restart.
    #[must_use]
    pub fn with_parts(backend: Arc<FakeBackend>, credentials: Arc<MemoryCredentialStore>) -> Self {
        let storefront = Storefront::with_backend(
            test_config(),
            Arc::clone(&backend) as Arc<dyn boighor_storefront::api::Backend>,
            Arc::clone(&credentials) as Arc<dyn CredentialStore>,
        );
        Self {
            backend,
            credentials,
            storefront,
        }
    }

    /// Sign in through the OTP flow.
    ///
    /// # Panics
    ///
    /// Panics if the fake rejects the sign-in.
    pub async fn sign_in(&self, email: &str) {
        let otp = self.storefront.otp();
        otp.request_otp(email).await.expect("OTP request failed");
        otp.verify_otp(&OTP_CODE.to_string())
            .await
            .expect("OTP verification failed");
    }
}

impl Default for TestShop {
    fn default() -> Self {
        Self::new()
    }
}

/// Every notice published since the last drain.
pub fn drain(notices: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        out.push(notice);
    }
    out
}

/// Configuration with default timings pointing nowhere.
///
/// # Panics
///
/// Never; the URL is a constant.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig::for_api(Url::parse("http://bookstore.test").expect("valid URL"))
}

/// A fixed point in time for fixtures.
///
/// # Panics
///
/// Never; the date is a constant.
#[must_use]
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

/// A book in `category` by `author`.
#[must_use]
pub fn book(id: &str, title: &str, category: &str, author: &str, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: Localized::english(title),
        description: Localized::default(),
        category: Localized::english(category),
        author: Localized::english(author),
        price: Decimal::new(price, 0),
        old_price: None,
        stock: 10,
        sold: 0,
        images: Vec::new(),
        created_at: None,
    }
}

/// A complete shipping address.
#[must_use]
pub fn address(id: &str) -> Address {
    Address {
        id: AddressId::new(id),
        fields: address_input(),
    }
}

#[must_use]
pub fn address_input() -> AddressInput {
    AddressInput {
        full_name: "Apu Roy".to_string(),
        phone: "9000000000".to_string(),
        address_line1: "12 College Street".to_string(),
        city: "Kolkata".to_string(),
        state: "West Bengal".to_string(),
        country: "India".to_string(),
        postal_code: "700073".to_string(),
        ..AddressInput::default()
    }
}

/// A cash-on-delivery order placed by `email`.
#[must_use]
pub fn order(id: &str, email: &str, status: OrderStatus, updated_at: DateTime<Utc>) -> Order {
    Order {
        id: OrderId::new(id),
        items: Vec::new(),
        user: Some(OrderCustomer {
            id: UserId::new(format!("user-{email}")),
            email: email.to_string(),
        }),
        sub_total: Decimal::new(250, 0),
        status,
        method: PaymentMethod::Cod,
        phone: "9000000000".to_string(),
        address: "12 College Street, Kolkata".to_string(),
        paid_at: None,
        created_at: updated_at,
        updated_at,
    }
}
