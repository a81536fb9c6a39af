//! The signed-in customer's orders.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use boighor_core::OrderId;

use crate::api::{Backend, Order};
use crate::error::{AppError, add_breadcrumb};
use crate::notify::Notifier;
use crate::services::session::SessionStore;

/// Order history plus the cancel action.
#[derive(Clone)]
pub struct OrderBook {
    inner: Arc<OrderBookInner>,
}

struct OrderBookInner {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    notifier: Notifier,
    orders: watch::Sender<Vec<Order>>,
}

impl OrderBook {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, session: SessionStore, notifier: Notifier) -> Self {
        let (orders, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(OrderBookInner {
                backend,
                session,
                notifier,
                orders,
            }),
        }
    }

    /// Orders from the last successful listing.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.inner.orders.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Order>> {
        self.inner.orders.subscribe()
    }

    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when signed out, or the backend
    /// error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>, AppError> {
        self.require_session()?;
        match self.inner.backend.my_orders().await {
            Ok(response) => {
                self.inner.orders.send_replace(response.orders.clone());
                Ok(response.orders)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when signed out, or the backend
    /// error.
    #[instrument(skip(self), fields(order = %id))]
    pub async fn get(&self, id: &OrderId) -> Result<Order, AppError> {
        self.require_session()?;
        match self.inner.backend.order(id).await {
            Ok(order) => Ok(order),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Cancel a pending order.
    ///
    /// The order returned by the backend replaces the listed copy.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` without calling the backend when the
    /// order is past pending, otherwise the backend error.
    #[instrument(skip(self, order), fields(order = %order.id, status = %order.status))]
    pub async fn cancel(&self, order: &Order) -> Result<Order, AppError> {
        self.require_session()?;
        if !order.status.is_cancellable() {
            return self.fail(AppError::InvalidState(format!(
                "A {} order can no longer be cancelled.",
                order.status
            )));
        }
        add_breadcrumb("order", "Cancel order", Some(&[("order_id", order.id.as_str())]));

        let response = match self.inner.backend.cancel_order(&order.id).await {
            Ok(response) => response,
            Err(e) => return self.fail(e.into()),
        };

        let updated = response.order;
        self.inner.orders.send_modify(|orders| {
            if let Some(slot) = orders.iter_mut().find(|o| o.id == updated.id) {
                *slot = updated.clone();
            }
        });
        self.inner
            .notifier
            .success_or(response.message, "Order cancelled");

        Ok(updated)
    }

    fn require_session(&self) -> Result<(), AppError> {
        match self.inner.session.require_auth() {
            Ok(_) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&self, err: AppError) -> Result<T, AppError> {
        self.inner.notifier.error(&err);
        Err(err)
    }
}
