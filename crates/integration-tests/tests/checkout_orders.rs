//! Addresses, checkout, payment verification and customer orders.

use boighor_core::{AddressId, OrderStatus, PaymentMethod, ProductId};
use boighor_integration_tests::{TestShop, address, address_input, at, book, drain, order};
use boighor_storefront::api::AddressInput;
use boighor_storefront::services::PaymentOutcome;
use boighor_storefront::{AppError, NoticeLevel};

const READER: &str = "reader@example.com";

async fn shop_with_cart() -> TestShop {
    let shop = TestShop::new();
    shop.backend
        .add_product(book("p1", "Pather Panchali", "Novel", "Bibhutibhushan", 250))
        .await;
    shop.backend.add_address(address("a1")).await;
    shop.sign_in(READER).await;
    shop.storefront
        .cart()
        .add_item(&ProductId::new("p1"))
        .await
        .unwrap();
    shop
}

// =============================================================================
// Addresses
// =============================================================================

#[tokio::test]
async fn test_blank_required_field_is_named() {
    let shop = TestShop::new();
    shop.sign_in(READER).await;
    let mut notices = shop.storefront.notifier().subscribe();

    let input = AddressInput {
        city: "  ".to_string(),
        ..address_input()
    };
    let result = shop.storefront.addresses().create(&input).await;

    assert!(matches!(result, Err(AppError::Validation(ref m)) if m == "City is required"));
    assert_eq!(shop.backend.calls("create_address").await, 0);
    assert_eq!(drain(&mut notices)[0].message, "City is required");
}

#[tokio::test]
async fn test_create_and_delete_address() {
    let shop = TestShop::new();
    shop.sign_in(READER).await;
    let book_of_addresses = shop.storefront.addresses();

    let listed = book_of_addresses.create(&address_input()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].fields.city, "Kolkata");

    let listed = book_of_addresses.delete(&listed[0].id).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_addresses_require_sign_in() {
    let shop = TestShop::new();

    let result = shop.storefront.addresses().list().await;

    assert!(matches!(result, Err(AppError::Unauthenticated)));
    assert_eq!(shop.backend.calls("addresses").await, 0);
}

// =============================================================================
// Cash on delivery
// =============================================================================

#[tokio::test]
async fn test_cod_order_sends_address_and_empties_cart() {
    let shop = shop_with_cart().await;
    let mut notices = shop.storefront.notifier().subscribe();

    shop.storefront
        .checkout()
        .place_cod(&AddressId::new("a1"))
        .await
        .unwrap();

    let placed = shop.backend.placed_orders().await;
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].method, PaymentMethod::Cod);
    assert_eq!(placed[0].phone, "9000000000");
    assert_eq!(
        placed[0].address,
        "Apu Roy, 12 College Street, Kolkata, West Bengal, 700073, India"
    );
    assert!(shop.storefront.cart().snapshot().is_empty());
    assert!(!shop.storefront.session().state().is_button_busy);

    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
}

#[tokio::test]
async fn test_cod_with_unknown_address_places_nothing() {
    let shop = shop_with_cart().await;

    let result = shop
        .storefront
        .checkout()
        .place_cod(&AddressId::new("missing"))
        .await;

    assert!(matches!(result, Err(AppError::Api(_))));
    assert!(shop.backend.placed_orders().await.is_empty());
    assert!(!shop.storefront.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_cod_refused_while_busy() {
    let shop = shop_with_cart().await;
    let _busy = shop.storefront.session().begin_submit().unwrap();

    let result = shop
        .storefront
        .checkout()
        .place_cod(&AddressId::new("a1"))
        .await;

    assert!(matches!(result, Err(AppError::Busy)));
    assert_eq!(shop.backend.calls("place_cod_order").await, 0);
}

// =============================================================================
// Online payment
// =============================================================================

#[tokio::test]
async fn test_online_payment_verified_once() {
    let shop = shop_with_cart().await;
    let checkout = shop.storefront.checkout();

    let url = checkout.start_online(&AddressId::new("a1")).await.unwrap();
    assert_eq!(url, "https://pay.example.com/cs_test_1");
    assert_eq!(shop.backend.placed_orders().await[0].method, PaymentMethod::Online);

    let mut notices = shop.storefront.notifier().subscribe();
    let outcome = checkout.verify_payment(Some("cs_test_1")).await.unwrap();
    assert_eq!(outcome, PaymentOutcome::Verified);
    assert!(shop.storefront.cart().snapshot().is_empty());

    let again = checkout.verify_payment(Some("cs_test_1")).await.unwrap();
    assert_eq!(again, PaymentOutcome::AlreadyVerified);
    assert_eq!(shop.backend.calls("verify_payment").await, 1);

    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Order placed successfully");
}

#[tokio::test]
async fn test_failed_verification_can_be_retried() {
    let shop = shop_with_cart().await;
    let checkout = shop.storefront.checkout();

    let result = checkout.verify_payment(Some("cs_late")).await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
    assert!(!shop.storefront.cart().snapshot().is_empty());

    shop.backend.open_payment_session("cs_late").await;
    let outcome = checkout.verify_payment(Some("cs_late")).await.unwrap();

    assert_eq!(outcome, PaymentOutcome::Verified);
    assert_eq!(shop.backend.calls("verify_payment").await, 2);
}

#[tokio::test]
async fn test_missing_session_id_is_rejected() {
    let shop = shop_with_cart().await;

    let result = shop.storefront.checkout().verify_payment(None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = shop.storefront.checkout().verify_payment(Some(" ")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert_eq!(shop.backend.calls("verify_payment").await, 0);
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_cancel_pending_order() {
    let shop = TestShop::new();
    shop.backend
        .add_order(order("o1", READER, OrderStatus::Pending, at(9, 0)))
        .await;
    shop.sign_in(READER).await;
    let orders = shop.storefront.orders();

    let listed = orders.list().await.unwrap();
    assert_eq!(listed.len(), 1);

    let cancelled = orders.cancel(&listed[0]).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(orders.orders()[0].status, OrderStatus::Cancelled);
    assert!(!cancelled.status.is_cancellable());
}

#[tokio::test]
async fn test_shipped_order_cannot_be_cancelled() {
    let shop = TestShop::new();
    shop.backend
        .add_order(order("o1", READER, OrderStatus::Shipped, at(9, 0)))
        .await;
    shop.sign_in(READER).await;
    let orders = shop.storefront.orders();
    let shipped = orders.list().await.unwrap().remove(0);

    let result = orders.cancel(&shipped).await;

    assert!(
        matches!(result, Err(AppError::InvalidState(ref m)) if m == "A shipped order can no longer be cancelled.")
    );
    assert_eq!(shop.backend.calls("cancel_order").await, 0);
}

#[tokio::test]
async fn test_orders_are_scoped_to_customer() {
    let shop = TestShop::new();
    shop.backend
        .add_order(order("o1", READER, OrderStatus::Pending, at(9, 0)))
        .await;
    shop.backend
        .add_order(order("o2", "other@example.com", OrderStatus::Pending, at(9, 5)))
        .await;
    shop.sign_in(READER).await;

    let listed = shop.storefront.orders().list().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id.as_str(), "o1");
}

// =============================================================================
// Catalogues
// =============================================================================

#[tokio::test]
async fn test_download_catalogue() {
    let shop = TestShop::new();
    shop.backend
        .add_catalogue(
            boighor_storefront::api::Catalogue {
                id: boighor_core::CatalogueId::new("c1"),
                title: "Puja 2025".to_string(),
                description: None,
                file_url: "/uploads/puja-2025.pdf".to_string(),
            },
            b"%PDF-1.7".to_vec(),
        )
        .await;
    let shelf = shop.storefront.catalogues();

    let catalogues = shelf.list().await.unwrap();
    let bytes = shelf.download(&catalogues[0]).await.unwrap();

    assert_eq!(bytes, b"%PDF-1.7");
}
