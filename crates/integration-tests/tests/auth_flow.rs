//! OTP sign-in, resend countdown, session restore and logout.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use secrecy::SecretString;

use boighor_core::ProductId;
use boighor_integration_tests::{OTP_CODE, TestShop, book, drain};
use boighor_storefront::credentials::{CredentialStore, SessionToken};
use boighor_storefront::services::OtpState;
use boighor_storefront::{AppError, NoticeLevel};

// =============================================================================
// Request and verify
// =============================================================================

#[tokio::test]
async fn test_request_then_verify_signs_in_once() {
    let shop = TestShop::new();
    let mut notices = shop.storefront.notifier().subscribe();
    let mut session = shop.storefront.session().subscribe();
    let otp = shop.storefront.otp();

    otp.request_otp("reader@example.com").await.unwrap();
    assert_eq!(
        otp.state(),
        OtpState::OtpRequested {
            email: "reader@example.com".parse().unwrap()
        }
    );
    assert!(!shop.storefront.session().is_authenticated());

    let identity = otp.verify_otp(&OTP_CODE.to_string()).await.unwrap();
    assert_eq!(identity.email.as_str(), "reader@example.com");
    assert_eq!(otp.state(), OtpState::Authenticated);
    assert_eq!(shop.storefront.session().identity(), Some(identity));
    assert!(session.has_changed().unwrap());
    assert!(session.borrow_and_update().is_authenticated);

    assert_eq!(shop.backend.calls("send_otp").await, 1);
    assert_eq!(shop.backend.calls("verify_otp").await, 1);
    assert!(shop.backend.current_token().await.is_some());

    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.level == NoticeLevel::Success));
}

#[tokio::test]
async fn test_malformed_email_is_rejected_without_request() {
    let shop = TestShop::new();
    let mut notices = shop.storefront.notifier().subscribe();

    let result = shop.storefront.otp().request_otp("not-an-email").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(shop.storefront.otp().state(), OtpState::Idle);
    assert_eq!(shop.backend.calls("send_otp").await, 0);
    assert_eq!(drain(&mut notices).len(), 1);
}

#[tokio::test]
async fn test_wrong_code_keeps_verify_step_open() {
    let shop = TestShop::new();
    shop.backend
        .add_product(book("p1", "Pather Panchali", "Novel", "Bibhutibhushan", 250))
        .await;
    let otp = shop.storefront.otp();
    otp.request_otp("reader@example.com").await.unwrap();

    let mut notices = shop.storefront.notifier().subscribe();
    let result = otp.verify_otp("000000").await;

    assert!(matches!(result, Err(AppError::Api(_))));
    assert!(matches!(otp.state(), OtpState::OtpRequested { .. }));
    assert!(!shop.storefront.session().is_authenticated());
    let errors = drain(&mut notices);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].level, NoticeLevel::Error);
    assert_eq!(errors[0].message, "Wrong OTP");
    assert_eq!(shop.backend.calls("cart").await, 0);

    otp.verify_otp(&OTP_CODE.to_string()).await.unwrap();

    assert_eq!(otp.state(), OtpState::Authenticated);
    assert_eq!(shop.backend.calls("cart").await, 1);
}

#[tokio::test]
async fn test_verify_before_request_is_invalid() {
    let shop = TestShop::new();

    let result = shop.storefront.otp().verify_otp("123456").await;

    assert!(matches!(result, Err(AppError::InvalidState(_))));
    assert_eq!(shop.backend.calls("verify_otp").await, 0);
}

#[tokio::test]
async fn test_malformed_code_is_rejected_locally() {
    let shop = TestShop::new();
    let otp = shop.storefront.otp();
    otp.request_otp("reader@example.com").await.unwrap();

    let result = otp.verify_otp("12ab").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(shop.backend.calls("verify_otp").await, 0);
}

#[tokio::test]
async fn test_submission_refused_while_busy() {
    let shop = TestShop::new();
    let mut notices = shop.storefront.notifier().subscribe();

    let guard = shop.storefront.session().begin_submit().unwrap();
    assert!(shop.storefront.session().state().is_button_busy);

    let result = shop.storefront.otp().request_otp("reader@example.com").await;
    assert!(matches!(result, Err(AppError::Busy)));
    assert_eq!(shop.backend.calls("send_otp").await, 0);
    assert_eq!(drain(&mut notices).len(), 1);

    drop(guard);
    assert!(!shop.storefront.session().state().is_button_busy);
    shop.storefront
        .otp()
        .request_otp("reader@example.com")
        .await
        .unwrap();
}

// =============================================================================
// Resend countdown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_resend_waits_for_countdown() {
    let shop = TestShop::new();
    let otp = shop.storefront.otp();
    otp.request_otp("reader@example.com").await.unwrap();
    assert_eq!(otp.countdown().remaining(), 60);

    let early = otp.resend().await;
    assert!(matches!(early, Err(AppError::InvalidState(_))));
    assert_eq!(shop.backend.calls("send_otp").await, 1);

    tokio::time::sleep(Duration::from_millis(59_500)).await;
    assert_eq!(otp.countdown().remaining(), 1);
    assert!(!otp.countdown().can_resend());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(otp.countdown().can_resend());

    otp.resend().await.unwrap();
    assert_eq!(shop.backend.calls("send_otp").await, 2);
    assert_eq!(otp.countdown().remaining(), 60);

    let sent = shop.backend.sent_otps().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
}

#[tokio::test(start_paused = true)]
async fn test_request_again_waits_for_countdown() {
    let shop = TestShop::new();
    let otp = shop.storefront.otp();
    otp.request_otp("reader@example.com").await.unwrap();
    tokio::time::sleep(Duration::from_millis(19_500)).await;
    let mut notices = shop.storefront.notifier().subscribe();

    let same = otp.request_otp("reader@example.com").await;
    assert!(
        matches!(same, Err(AppError::InvalidState(ref m)) if m == "You can resend the code in 00:41.")
    );
    let other = otp.request_otp("other@example.com").await;
    assert!(matches!(other, Err(AppError::InvalidState(_))));

    assert_eq!(shop.backend.calls("send_otp").await, 1);
    assert_eq!(otp.countdown().remaining(), 41);
    assert_eq!(
        otp.state().email().map(|e| e.as_str().to_string()),
        Some("reader@example.com".to_string())
    );
    assert_eq!(drain(&mut notices).len(), 2);

    // A new address is accepted once the verify step is left
    otp.cancel();
    otp.request_otp("other@example.com").await.unwrap();
    assert_eq!(shop.backend.calls("send_otp").await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_countdown() {
    let shop = TestShop::new();
    let otp = shop.storefront.otp();
    otp.request_otp("reader@example.com").await.unwrap();

    otp.cancel();
    assert_eq!(otp.state(), OtpState::Idle);

    let mut countdown = otp.subscribe_countdown();
    countdown.borrow_and_update();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!countdown.has_changed().unwrap());
}

// =============================================================================
// Restore and logout
// =============================================================================

#[tokio::test]
async fn test_init_restores_saved_session() {
    let first = TestShop::new();
    first.sign_in("reader@example.com").await;

    let restarted = TestShop::with_parts(
        Arc::clone(&first.backend),
        Arc::clone(&first.credentials),
    );
    let identity = restarted.storefront.init().await;

    assert_eq!(
        identity.map(|identity| identity.email.into_inner()),
        Some("reader@example.com".to_string())
    );
    assert!(restarted.storefront.session().is_authenticated());
    assert!(!restarted.storefront.session().state().is_loading);
    // One fetch after the first sign-in, one on restart
    assert_eq!(first.backend.calls("cart").await, 2);
}

#[tokio::test]
async fn test_init_forgets_rejected_token() {
    let shop = TestShop::new();
    shop.credentials
        .save_token(&SessionToken::issued(
            SecretString::from("revoked".to_string()),
            Utc::now(),
        ))
        .await
        .unwrap();
    let mut notices = shop.storefront.notifier().subscribe();

    let identity = shop.storefront.init().await;

    assert!(identity.is_none());
    assert!(!shop.storefront.session().state().is_loading);
    assert!(shop.credentials.load_token().await.unwrap().is_none());
    assert!(shop.backend.current_token().await.is_none());
    assert!(drain(&mut notices).is_empty());
}

#[tokio::test]
async fn test_init_resumes_pending_otp() {
    let first = TestShop::new();
    first
        .storefront
        .otp()
        .request_otp("reader@example.com")
        .await
        .unwrap();

    let restarted = TestShop::with_parts(
        Arc::clone(&first.backend),
        Arc::clone(&first.credentials),
    );
    restarted.storefront.init().await;

    let otp = restarted.storefront.otp();
    assert!(matches!(otp.state(), OtpState::OtpRequested { .. }));
    assert!(!otp.countdown().can_resend());

    otp.verify_otp(&OTP_CODE.to_string()).await.unwrap();
    assert!(restarted.storefront.session().is_authenticated());
    assert!(first.credentials.load_pending().await.unwrap().is_none());
    restarted.storefront.shutdown();
}

#[tokio::test]
async fn test_logout_clears_session_and_cart() {
    let shop = TestShop::new();
    shop.backend
        .add_product(book("p1", "Aparajito", "Novel", "Bibhutibhushan", 300))
        .await;
    shop.sign_in("reader@example.com").await;
    shop.storefront
        .cart()
        .add_item(&ProductId::new("p1"))
        .await
        .unwrap();
    assert!(!shop.storefront.cart().snapshot().is_empty());

    shop.storefront.otp().logout().await;

    assert!(!shop.storefront.session().is_authenticated());
    assert!(shop.storefront.cart().snapshot().is_empty());
    assert_eq!(shop.storefront.otp().state(), OtpState::Idle);
    assert!(shop.credentials.load_token().await.unwrap().is_none());
    assert!(shop.backend.current_token().await.is_none());
}

#[tokio::test]
async fn test_logout_completes_when_backend_fails() {
    let shop = TestShop::new();
    shop.sign_in("reader@example.com").await;
    shop.backend.fail("logout", 500, "Internal Server Error").await;

    shop.storefront.otp().logout().await;

    assert!(!shop.storefront.session().is_authenticated());
    assert!(shop.credentials.load_token().await.unwrap().is_none());
}
