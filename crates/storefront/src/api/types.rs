//! Wire types for the bookstore REST backend.
//!
//! Field names follow the backend's JSON (`_id`, camelCase). Anything the
//! client does not need is left out; unknown fields are ignored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use boighor_core::{
    AddressId, CartItemId, CatalogueId, Email, Language, Localized, OrderId, OrderStatus,
    PaymentMethod, ProductId, Role, UserId,
};

// =============================================================================
// Generic
// =============================================================================

/// The `{ "message": ".." }` body most mutations return.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

impl MessageResponse {
    /// Build a response carrying `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// An account as returned by `/api/user/me` and `/api/user/verify`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
}

/// Body of `POST /api/user/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a Email,
}

/// Body of `POST /api/user/verify`.
#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    pub email: &'a Email,
    pub otp: boighor_core::OtpCode,
}

/// Response of a successful OTP verification.
#[derive(Debug, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub message: String,
    #[serde(deserialize_with = "deserialize_secret")]
    pub token: SecretString,
    pub user: User,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

// =============================================================================
// Products
// =============================================================================

/// A product image.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProductImage {
    pub url: String,
}

/// A book in the catalogue.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub title: Localized,
    #[serde(default)]
    pub description: Localized,
    #[serde(default)]
    pub category: Localized,
    #[serde(default)]
    pub author: Localized,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub old_price: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub sold: u32,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Response of `GET /api/product/all`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProductListResponse {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(rename = "newProduct", default)]
    pub new_products: Vec<Product>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(rename = "totalpages", default)]
    pub total_pages: u32,
}

/// Response of `GET /api/product/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDetailResponse {
    pub product: Product,
    #[serde(rename = "relatedProduct", default)]
    pub related: Vec<Product>,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Suggestion {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub title: Localized,
    #[serde(default)]
    pub author: Option<Localized>,
}

/// Query parameters of `GET /api/product/all`.
///
/// Empty strings mean "no filter", matching what the backend expects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductListParams {
    pub search: String,
    pub category: String,
    pub author: String,
    pub sort_by_price: String,
    pub page: u32,
    pub lang: Language,
}

// =============================================================================
// Cart
// =============================================================================

/// One line of the server-held cart.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CartLine {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    pub quantity: u32,
    pub product: Product,
}

/// Response of `GET /api/cart/all`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    #[serde(default)]
    pub cart: Vec<CartLine>,
    #[serde(default)]
    pub sum_of_quantities: u32,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
}

/// Direction of a quantity change (`?action=inc|dec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartAction {
    #[serde(rename = "inc")]
    Increment,
    #[serde(rename = "dec")]
    Decrement,
}

impl CartAction {
    /// Query string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "inc",
            Self::Decrement => "dec",
        }
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// Fields of a shipping address, as entered by the customer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub alternate_phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub landmark: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

/// A saved shipping address.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: AddressId,
    #[serde(flatten)]
    pub fields: AddressInput,
}

impl Address {
    /// Single-line form sent with an order.
    #[must_use]
    pub fn formatted(&self) -> String {
        let f = &self.fields;
        [
            f.full_name.as_str(),
            f.address_line1.as_str(),
            f.address_line2.as_str(),
            f.landmark.as_str(),
            f.city.as_str(),
            f.state.as_str(),
            f.postal_code.as_str(),
            f.country.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

// =============================================================================
// Orders
// =============================================================================

/// The customer an order belongs to (populated on admin listings).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OrderCustomer {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub email: String,
}

/// One line of an order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OrderItem {
    pub product: Product,
    pub quantity: u32,
}

/// A placed order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub user: Option<OrderCustomer>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
    pub status: OrderStatus,
    pub method: PaymentMethod,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response of `GET /api/order/all`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OrderListResponse {
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// Response of `POST /api/order/{id}/cancel`.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderResponse {
    #[serde(default)]
    pub message: String,
    pub order: Order,
}

/// Body of the order-creation endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewOrderRequest {
    pub method: PaymentMethod,
    pub phone: String,
    pub address: String,
}

/// Response of `POST /api/order/new/online`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PaymentSessionResponse {
    #[serde(default)]
    pub url: Option<String>,
}

/// Response of `POST /api/order/verify/payment`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PaymentVerification {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Response of `GET /api/order/admin/last-update`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastUpdate {
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

// =============================================================================
// Admin
// =============================================================================

/// Units sold per product, for the dashboard chart.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProductSales {
    pub name: Localized,
    #[serde(default)]
    pub sold: u32,
}

/// Response of `GET /api/stats`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct SalesStats {
    #[serde(default)]
    pub cod: u64,
    #[serde(default)]
    pub online: u64,
    #[serde(default)]
    pub data: Vec<ProductSales>,
}

/// Localized and numeric fields of a product being created or edited.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub title: Localized,
    pub description: Localized,
    pub category: Localized,
    pub author: Localized,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub old_price: Option<Decimal>,
    pub stock: u32,
}

/// A file attached to a multipart upload.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// =============================================================================
// Catalogues
// =============================================================================

/// A downloadable catalogue (PDF price list etc.).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Catalogue {
    #[serde(rename = "_id")]
    pub id: CatalogueId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_url: String,
}

/// Metadata for a catalogue upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueUpload {
    pub title: String,
    pub description: String,
    pub file: FileUpload,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_response_from_backend_json() {
        let json = r#"{
            "cart": [{
                "_id": "c1",
                "quantity": 2,
                "product": {"_id": "p1", "title": {"en": "Aparajito"}, "price": 250}
            }],
            "sumOfQuantities": 2,
            "subTotal": 500
        }"#;

        let cart: CartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(cart.sum_of_quantities, 2);
        assert_eq!(cart.sub_total, Decimal::new(500, 0));
        assert_eq!(cart.cart.len(), 1);
    }

    #[test]
    fn test_order_accepts_capitalised_status() {
        let json = r#"{
            "_id": "o1",
            "status": "Pending",
            "method": "cod",
            "subTotal": 120.5,
            "createdAt": "2025-01-02T03:04:05Z",
            "updatedAt": "2025-01-02T03:04:05Z"
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.user.is_none());
    }

    #[test]
    fn test_address_formatted_skips_blank_parts() {
        let address = Address {
            id: AddressId::new("a1"),
            fields: AddressInput {
                full_name: "Apu Roy".to_string(),
                phone: "9000000000".to_string(),
                address_line1: "12 College Street".to_string(),
                city: "Kolkata".to_string(),
                state: "West Bengal".to_string(),
                country: "India".to_string(),
                postal_code: "700073".to_string(),
                ..AddressInput::default()
            },
        };

        assert_eq!(
            address.formatted(),
            "Apu Roy, 12 College Street, Kolkata, West Bengal, 700073, India"
        );
    }
}
