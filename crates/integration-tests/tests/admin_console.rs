//! Admin console: order polling, status changes, products, catalogues, stats.

use std::time::Duration;

use rust_decimal::Decimal;

use boighor_admin::AdminConsole;
use boighor_admin::services::{PaymentSplit, best_sellers};
use boighor_core::{Language, Localized, OrderId, OrderStatus, ProductId};
use boighor_integration_tests::{ADMIN_ORDERS_PER_PAGE, TestShop, at, book, drain, order};
use boighor_storefront::api::{
    CatalogueUpload, FileUpload, ProductDraft, ProductSales, SalesStats,
};
use boighor_storefront::{AppError, NoticeLevel};

const ADMIN: &str = "admin@example.com";

async fn admin_shop() -> (TestShop, AdminConsole) {
    let shop = TestShop::new();
    shop.backend.add_admin(ADMIN).await;
    shop.backend
        .add_order(order("o1", "reader@example.com", OrderStatus::Pending, at(9, 0)))
        .await;
    shop.backend
        .add_order(order("o2", "buyer@example.com", OrderStatus::Pending, at(10, 0)))
        .await;
    shop.sign_in(ADMIN).await;
    let console = AdminConsole::new(&shop.storefront);
    (shop, console)
}

fn draft(title: &str) -> ProductDraft {
    ProductDraft {
        title: Localized::english(title),
        category: Localized::english("Novel"),
        author: Localized::english("Sunil Gangopadhyay"),
        price: Decimal::new(400, 0),
        stock: 5,
        ..ProductDraft::default()
    }
}

fn cover() -> FileUpload {
    FileUpload {
        file_name: "cover.jpg".to_string(),
        mime: "image/jpeg".to_string(),
        bytes: vec![0xff, 0xd8, 0xff],
    }
}

// =============================================================================
// Access
// =============================================================================

#[tokio::test]
async fn test_customer_cannot_open_admin_orders() {
    let shop = TestShop::new();
    shop.sign_in("reader@example.com").await;
    let console = AdminConsole::new(&shop.storefront);
    let mut notices = shop.storefront.notifier().subscribe();

    let result = console.orders().load().await;

    assert!(matches!(result, Err(AppError::Unauthenticated)));
    assert_eq!(shop.backend.calls("admin_orders").await, 0);
    assert_eq!(drain(&mut notices).len(), 1);
}

// =============================================================================
// Order list
// =============================================================================

#[tokio::test]
async fn test_load_records_newest_update() {
    let (_shop, console) = admin_shop().await;

    let state = console.orders().load().await.unwrap();

    assert_eq!(state.orders.len(), 2);
    assert_eq!(state.last_known_update, Some(at(10, 0)));
    assert!(!state.is_stale);
    assert!(!state.is_loading);
    assert_eq!(console.orders().filter("BUYER").len(), 1);
}

#[tokio::test]
async fn test_status_change_refetches_list() {
    let (shop, console) = admin_shop().await;
    let poller = console.orders();
    poller.load().await.unwrap();
    let mut notices = shop.storefront.notifier().subscribe();
    let id = OrderId::new("o1");

    let state = poller.update_status(&id, OrderStatus::Shipped).await.unwrap();

    let updated = state.orders.iter().find(|o| o.id == id).unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert!(!updated.status.is_cancellable());
    assert_eq!(shop.backend.calls("admin_orders").await, 2);
    assert_eq!(shop.backend.order_status(&id).await, Some(OrderStatus::Shipped));

    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
}

#[tokio::test]
async fn test_failed_status_change_keeps_list() {
    let (shop, console) = admin_shop().await;
    let poller = console.orders();
    let before = poller.load().await.unwrap();
    shop.backend
        .fail("update_order_status", 400, "Invalid status")
        .await;

    let result = poller
        .update_status(&OrderId::new("o1"), OrderStatus::Delivered)
        .await;

    assert!(matches!(result, Err(AppError::Api(_))));
    assert_eq!(poller.state(), before);
    assert_eq!(shop.backend.calls("admin_orders").await, 1);
}

#[tokio::test]
async fn test_poll_flags_remote_change() {
    let (shop, console) = admin_shop().await;
    let poller = console.orders();
    poller.load().await.unwrap();

    assert!(!poller.poll_once().await.unwrap());

    shop.backend.touch_order(&OrderId::new("o1"), at(11, 0)).await;
    assert!(poller.poll_once().await.unwrap());
    assert!(poller.is_stale());
    // Stale list is left as loaded
    assert_eq!(poller.state().last_known_update, Some(at(10, 0)));
    assert_eq!(shop.backend.calls("admin_orders").await, 1);

    let state = poller.refresh().await.unwrap();
    assert!(!state.is_stale);
    assert_eq!(state.last_known_update, Some(at(11, 0)));
    assert!(!poller.poll_once().await.unwrap());
}

#[tokio::test]
async fn test_poll_failure_is_not_shown() {
    let (shop, console) = admin_shop().await;
    let poller = console.orders();
    let before = poller.load().await.unwrap();
    shop.backend
        .fail("orders_last_update", 503, "Service Unavailable")
        .await;
    let mut notices = shop.storefront.notifier().subscribe();

    assert!(poller.poll_once().await.is_err());

    assert_eq!(poller.state(), before);
    assert!(drain(&mut notices).is_empty());
}

#[tokio::test]
async fn test_later_page_is_not_stale() {
    let (shop, console) = admin_shop().await;
    shop.backend
        .add_order(order("o3", "reader@example.com", OrderStatus::Pending, at(8, 0)))
        .await;
    let poller = console.orders();

    let state = poller.load_page(2).await.unwrap();

    assert_eq!(ADMIN_ORDERS_PER_PAGE, 2);
    assert_eq!(state.page, 2);
    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.orders[0].id, OrderId::new("o3"));
    assert_eq!(state.last_known_update, Some(at(10, 0)));
    assert!(!poller.poll_once().await.unwrap());
    assert!(!poller.poll_once().await.unwrap());

    shop.backend.touch_order(&OrderId::new("o2"), at(11, 0)).await;
    assert!(poller.poll_once().await.unwrap());

    let state = poller.refresh().await.unwrap();
    assert_eq!(state.page, 2);
    assert!(!state.is_stale);
    assert!(!poller.poll_once().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_poll_answered_before_own_edit_is_ignored() {
    let (shop, console) = admin_shop().await;
    let poller = console.orders().clone();
    poller.load().await.unwrap();

    // The poll reads the old timestamp, then answers after the edit reloads
    shop.backend
        .delay_next("orders_last_update", Duration::from_secs(2))
        .await;
    let poll = tokio::spawn({
        let poller = poller.clone();
        async move { poller.poll_once().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let state = poller
        .update_status(&OrderId::new("o1"), OrderStatus::Shipped)
        .await
        .unwrap();
    assert!(state.last_known_update > Some(at(10, 0)));

    assert!(!poll.await.unwrap().unwrap());
    assert!(!poller.is_stale());
    assert!(!poller.poll_once().await.unwrap());
}

#[tokio::test]
async fn test_load_falls_back_to_page_when_last_update_fails() {
    let (shop, console) = admin_shop().await;
    shop.backend
        .fail("orders_last_update", 503, "Service Unavailable")
        .await;
    let mut notices = shop.storefront.notifier().subscribe();

    let state = console.orders().load().await.unwrap();

    assert_eq!(state.orders.len(), 2);
    assert_eq!(state.last_known_update, Some(at(10, 0)));
    assert!(drain(&mut notices).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_background_poll_runs_on_interval() {
    let (shop, console) = admin_shop().await;
    let poller = console.orders();
    poller.load().await.unwrap();
    let polling = poller.spawn();

    // One read of the last update comes from the load itself
    shop.backend.touch_order(&OrderId::new("o2"), at(12, 0)).await;
    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(shop.backend.calls("orders_last_update").await, 1);
    assert!(!poller.is_stale());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(shop.backend.calls("orders_last_update").await, 2);
    assert!(poller.is_stale());

    drop(polling);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(shop.backend.calls("orders_last_update").await, 2);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_create_product_needs_images() {
    let (shop, console) = admin_shop().await;

    let result = console.products().create(&draft("Aranyer Din Ratri"), &[]).await;
    assert!(matches!(result, Err(AppError::Validation(ref m)) if m == "Please select images"));
    assert_eq!(shop.backend.created_products().await, 0);

    console
        .products()
        .create(&draft("Aranyer Din Ratri"), &[cover()])
        .await
        .unwrap();
    assert_eq!(shop.backend.created_products().await, 1);

    let listed = console.products().list(1).await.unwrap();
    assert_eq!(listed.products.len(), 1);
    assert_eq!(listed.products[0].title.en, "Aranyer Din Ratri");
}

#[tokio::test]
async fn test_invalid_draft_is_not_sent() {
    let (shop, console) = admin_shop().await;
    let mut bad = draft("Aranyer Din Ratri");
    bad.price = Decimal::new(-1, 0);

    let result = console.products().create(&bad, &[cover()]).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(shop.backend.calls("create_product").await, 0);
}

#[tokio::test]
async fn test_update_drops_cached_detail() {
    let (shop, console) = admin_shop().await;
    shop.backend
        .add_product(book("p1", "Pratidwandi", "Novel", "Sunil Gangopadhyay", 350))
        .await;
    let id = ProductId::new("p1");
    shop.storefront.products().fetch_product(&id).await.unwrap();

    console
        .products()
        .update(&id, &draft("Pratidwandi (New Edition)"))
        .await
        .unwrap();
    let detail = shop.storefront.products().fetch_product(&id).await.unwrap();

    assert_eq!(detail.product.title.en, "Pratidwandi (New Edition)");
    assert_eq!(shop.backend.calls("product").await, 2);
}

// =============================================================================
// Catalogues
// =============================================================================

#[tokio::test]
async fn test_upload_and_delete_catalogue() {
    let (shop, console) = admin_shop().await;
    let upload = CatalogueUpload {
        title: "Boimela 2025".to_string(),
        description: "Book fair price list".to_string(),
        file: FileUpload {
            file_name: "boimela-2025.pdf".to_string(),
            mime: "application/pdf".to_string(),
            bytes: b"%PDF-1.7".to_vec(),
        },
    };

    let listed = console.catalogues().upload(&upload).await.unwrap();
    assert_eq!(listed.len(), 1);

    let bytes = shop
        .storefront
        .catalogues()
        .download(&listed[0])
        .await
        .unwrap();
    assert_eq!(bytes, b"%PDF-1.7");

    let listed = console.catalogues().delete(&listed[0].id).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let (shop, console) = admin_shop().await;
    let upload = CatalogueUpload {
        title: "Empty".to_string(),
        description: String::new(),
        file: FileUpload {
            file_name: "empty.pdf".to_string(),
            mime: "application/pdf".to_string(),
            bytes: Vec::new(),
        },
    };

    let result = console.catalogues().upload(&upload).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(shop.backend.calls("upload_catalogue").await, 0);
}

// =============================================================================
// Stats
// =============================================================================

#[tokio::test]
async fn test_stats_split_and_best_sellers() {
    let (shop, console) = admin_shop().await;
    shop.backend
        .set_stats(SalesStats {
            cod: 6,
            online: 2,
            data: vec![
                ProductSales {
                    name: Localized::both("Gitanjali", "গীতাঞ্জলি"),
                    sold: 4,
                },
                ProductSales {
                    name: Localized::english("Pather Panchali"),
                    sold: 9,
                },
            ],
        })
        .await;

    let stats = console.stats().fetch().await.unwrap();

    let split = PaymentSplit::of(&stats).unwrap();
    assert!((split.cod - 75.0).abs() < f64::EPSILON);
    assert!((split.online - 25.0).abs() < f64::EPSILON);

    let sellers = best_sellers(&stats, Language::Bn);
    assert_eq!(sellers[0], ("Pather Panchali".to_string(), 9));
    assert_eq!(sellers[1], ("গীতাঞ্জলি".to_string(), 4));
}
