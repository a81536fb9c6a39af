//! Checkout: cash on delivery, hosted online payment, and the return trip
//! from the payment page.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, instrument};

use boighor_core::{AddressId, PaymentMethod};

use crate::api::{Backend, NewOrderRequest};
use crate::error::{AppError, add_breadcrumb};
use crate::notify::Notifier;
use crate::services::cart::CartSync;
use crate::services::session::SessionStore;

/// Outcome of returning from the hosted payment page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The backend confirmed the payment and created the order.
    Verified,
    /// This session id was already verified; nothing was sent.
    AlreadyVerified,
}

/// Places orders for the current cart.
#[derive(Clone)]
pub struct Checkout {
    inner: Arc<CheckoutInner>,
}

struct CheckoutInner {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    cart: CartSync,
    notifier: Notifier,
    /// Payment session ids that have been verified or are being verified
    verified: Mutex<HashSet<String>>,
}

impl Checkout {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        session: SessionStore,
        cart: CartSync,
        notifier: Notifier,
    ) -> Self {
        Self {
            inner: Arc::new(CheckoutInner {
                backend,
                session,
                cart,
                notifier,
                verified: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Place a cash-on-delivery order shipped to `address`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Busy` while another submission is running, or the
    /// backend error.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn place_cod(&self, address: &AddressId) -> Result<(), AppError> {
        let request = self.order_request(PaymentMethod::Cod, address).await?;
        let _busy = self.begin_submit()?;
        add_breadcrumb("checkout", "Place COD order", None);

        match self.inner.backend.place_cod_order(&request).await {
            Ok(response) => self
                .inner
                .notifier
                .success_or(response.message, "Order placed"),
            Err(e) => return self.fail(e.into()),
        }

        info!("Cash-on-delivery order placed");
        // Failure here is already reported by the cart.
        let _ = self.inner.cart.fetch_cart().await;
        Ok(())
    }

    /// Start a hosted payment and return the URL to send the customer to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if the backend did not return a
    /// payment URL, otherwise the backend error.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn start_online(&self, address: &AddressId) -> Result<String, AppError> {
        let request = self.order_request(PaymentMethod::Online, address).await?;
        let _busy = self.begin_submit()?;
        add_breadcrumb("checkout", "Start online payment", None);

        let session = match self.inner.backend.start_online_payment(&request).await {
            Ok(session) => session,
            Err(e) => return self.fail(e.into()),
        };

        match session.url.filter(|url| !url.trim().is_empty()) {
            Some(url) => Ok(url),
            None => self.fail(AppError::InvalidState(
                "Could not start the payment session.".to_string(),
            )),
        }
    }

    /// Confirm the payment session the hosted page redirected back with.
    ///
    /// A session id is only ever verified once; later calls with the same
    /// id return [`PaymentOutcome::AlreadyVerified`] without a request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `session_id` is missing, or an
    /// error if the backend does not confirm the payment.
    #[instrument(skip(self))]
    pub async fn verify_payment(&self, session_id: Option<&str>) -> Result<PaymentOutcome, AppError> {
        let Some(session_id) = session_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return self.fail(AppError::Validation(
                "Payment session is missing.".to_string(),
            ));
        };

        if !self.verified().insert(session_id.to_string()) {
            return Ok(PaymentOutcome::AlreadyVerified);
        }

        let confirmed = match self.inner.backend.verify_payment(session_id).await {
            Ok(verification) if verification.success => true,
            Ok(verification) => {
                tracing::warn!(message = %verification.message, "Payment not confirmed");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Payment verification failed");
                false
            }
        };

        if !confirmed {
            self.verified().remove(session_id);
            return self.fail(AppError::InvalidState(
                "Payment verification failed.".to_string(),
            ));
        }

        self.inner.notifier.success("Order placed successfully");
        // Failure here is already reported by the cart.
        let _ = self.inner.cart.fetch_cart().await;
        Ok(PaymentOutcome::Verified)
    }

    async fn order_request(
        &self,
        method: PaymentMethod,
        address: &AddressId,
    ) -> Result<NewOrderRequest, AppError> {
        if let Err(e) = self.inner.session.require_auth() {
            return self.fail(e);
        }
        let address = match self.inner.backend.address(address).await {
            Ok(address) => address,
            Err(e) => return self.fail(e.into()),
        };

        Ok(NewOrderRequest {
            method,
            phone: address.fields.phone.clone(),
            address: address.formatted(),
        })
    }

    fn begin_submit(&self) -> Result<crate::services::session::BusyGuard, AppError> {
        self.inner.session.begin_submit().or_else(|e| self.fail(e))
    }

    fn verified(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.inner
            .verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn fail<T>(&self, err: AppError) -> Result<T, AppError> {
        self.inner.notifier.error(&err);
        Err(err)
    }
}
