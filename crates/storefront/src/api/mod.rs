//! Bookstore REST backend client.
//!
//! # Architecture
//!
//! - [`Backend`] is the seam every controller talks through; it lists one
//!   method per endpoint the storefront and back-office use
//! - [`HttpBackend`] implements it with `reqwest`
//! - The backend is the source of truth. Nothing here caches mutable state
//!
//! # Credentials
//!
//! After OTP verification the backend issues a session token. It is installed
//! with [`Backend::set_token`] and sent as both the `token` header and the
//! `token` cookie on every subsequent request. Product listing and
//! autocomplete work without it.

mod http;
pub mod types;

pub use http::HttpBackend;
pub use types::*;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use boighor_core::{
    AddressId, CartItemId, CatalogueId, Email, Language, OrderId, OrderStatus, OtpCode,
    ProductId,
};

/// Errors that can occur when talking to the bookstore backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure, timeout, or TLS error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request; `message` comes from its body.
    #[error("Rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Missing, expired, or insufficient credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built from the configured base.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the failure happened before the backend could answer.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// The message the backend sent, if it sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. }
            | Self::Unauthorized(message)
            | Self::NotFound(message) => Some(message.as_str()),
            Self::Http(_) | Self::RateLimited(_) | Self::Parse(_) | Self::Url(_) => None,
        }
    }
}

/// Every endpoint of the bookstore backend the client consumes.
///
/// Implementations must be cheap to share (`Arc<dyn Backend>`); controllers
/// hold one and never assume anything about ordering between calls.
#[async_trait]
pub trait Backend: Send + Sync {
    // =========================================================================
    // Credential
    // =========================================================================

    /// Install (or clear) the session credential sent with later requests.
    async fn set_token(&self, token: Option<SecretString>);

    // =========================================================================
    // Users
    // =========================================================================

    /// Ask the backend to email a one-time password.
    async fn send_otp(&self, email: &Email) -> Result<MessageResponse, ApiError>;

    /// Exchange an email + code for a session token and identity.
    async fn verify_otp(&self, email: &Email, otp: OtpCode) -> Result<VerifyResponse, ApiError>;

    /// Look up the identity of the current credential.
    async fn me(&self) -> Result<User, ApiError>;

    /// Invalidate the current credential server-side.
    async fn logout(&self) -> Result<(), ApiError>;

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the whole server-held cart.
    async fn cart(&self) -> Result<CartResponse, ApiError>;

    /// Add one unit of a product.
    async fn add_to_cart(&self, product: &ProductId) -> Result<MessageResponse, ApiError>;

    /// Increment or decrement a cart line.
    async fn update_cart(
        &self,
        action: CartAction,
        item: &CartItemId,
    ) -> Result<MessageResponse, ApiError>;

    /// Remove a cart line.
    async fn remove_from_cart(&self, item: &CartItemId) -> Result<MessageResponse, ApiError>;

    // =========================================================================
    // Products
    // =========================================================================

    /// Filtered, paginated product listing.
    async fn products(&self, params: &ProductListParams) -> Result<ProductListResponse, ApiError>;

    /// Search-as-you-type suggestions.
    async fn autocomplete(&self, query: &str, lang: Language)
    -> Result<Vec<Suggestion>, ApiError>;

    /// One product with related products.
    async fn product(&self, id: &ProductId) -> Result<ProductDetailResponse, ApiError>;

    // =========================================================================
    // Addresses
    // =========================================================================

    async fn addresses(&self) -> Result<Vec<Address>, ApiError>;

    async fn address(&self, id: &AddressId) -> Result<Address, ApiError>;

    async fn create_address(&self, input: &AddressInput) -> Result<MessageResponse, ApiError>;

    async fn delete_address(&self, id: &AddressId) -> Result<MessageResponse, ApiError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place a cash-on-delivery order for the current cart.
    async fn place_cod_order(&self, order: &NewOrderRequest) -> Result<MessageResponse, ApiError>;

    /// Start a hosted online payment for the current cart.
    async fn start_online_payment(
        &self,
        order: &NewOrderRequest,
    ) -> Result<PaymentSessionResponse, ApiError>;

    /// Confirm a hosted payment session and create the order.
    async fn verify_payment(&self, session_id: &str) -> Result<PaymentVerification, ApiError>;

    /// The current customer's orders.
    async fn my_orders(&self) -> Result<OrderListResponse, ApiError>;

    async fn order(&self, id: &OrderId) -> Result<Order, ApiError>;

    async fn cancel_order(&self, id: &OrderId) -> Result<CancelOrderResponse, ApiError>;

    // =========================================================================
    // Admin
    // =========================================================================

    /// All orders, newest first, one page at a time.
    async fn admin_orders(&self, page: u32) -> Result<Vec<Order>, ApiError>;

    /// Timestamp of the most recent order mutation.
    async fn orders_last_update(&self) -> Result<LastUpdate, ApiError>;

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<MessageResponse, ApiError>;

    async fn stats(&self) -> Result<SalesStats, ApiError>;

    async fn create_product(
        &self,
        draft: &ProductDraft,
        images: &[FileUpload],
    ) -> Result<MessageResponse, ApiError>;

    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<MessageResponse, ApiError>;

    async fn replace_product_images(
        &self,
        id: &ProductId,
        images: &[FileUpload],
    ) -> Result<MessageResponse, ApiError>;

    // =========================================================================
    // Catalogues
    // =========================================================================

    async fn catalogues(&self) -> Result<Vec<Catalogue>, ApiError>;

    async fn upload_catalogue(&self, upload: &CatalogueUpload)
    -> Result<MessageResponse, ApiError>;

    async fn delete_catalogue(&self, id: &CatalogueId) -> Result<MessageResponse, ApiError>;

    /// Raw bytes of a catalogue file.
    async fn download(&self, file_url: &str) -> Result<Vec<u8>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("order o1".to_string());
        assert_eq!(err.to_string(), "Not found: order o1");

        let err = ApiError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }

    #[test]
    fn test_backend_message() {
        let err = ApiError::Rejected {
            status: 400,
            message: "Wrong OTP".to_string(),
        };
        assert_eq!(err.backend_message(), Some("Wrong OTP"));
        assert!(!err.is_network());
        assert_eq!(ApiError::RateLimited(1).backend_message(), None);
    }
}
