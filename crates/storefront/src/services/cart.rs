//! Cart synchronizer.
//!
//! The cart lives on the backend. The client keeps a read-only mirror that
//! is replaced wholesale by every fetch, and every mutation is followed by a
//! fresh fetch rather than an optimistic local edit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::instrument;

use boighor_core::{CartItemId, Price, ProductId};

use crate::api::{Backend, CartAction, CartLine, CartResponse};
use crate::error::{AppError, add_breadcrumb};
use crate::notify::Notifier;
use crate::services::session::SessionStore;

/// Local mirror of the server-held cart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub total_items: u32,
    pub sub_total: Price,
}

impl From<CartResponse> for CartSnapshot {
    fn from(cart: CartResponse) -> Self {
        Self {
            lines: cart.cart,
            total_items: cart.sum_of_quantities,
            sub_total: Price::inr(cart.sub_total),
        }
    }
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Keeps the cart mirror in step with the backend.
#[derive(Clone)]
pub struct CartSync {
    inner: Arc<CartInner>,
}

struct CartInner {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    notifier: Notifier,
    state: watch::Sender<CartSnapshot>,
    /// Sequence number of the most recently issued fetch
    issued: AtomicU64,
    /// Sequence number of the fetch whose result is mirrored
    applied: Mutex<u64>,
}

impl CartSync {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, session: SessionStore, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(CartSnapshot::default());
        Self {
            inner: Arc::new(CartInner {
                backend,
                session,
                notifier,
                state,
                issued: AtomicU64::new(0),
                applied: Mutex::new(0),
            }),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Replace the mirror with the backend's cart.
    ///
    /// If a newer fetch was issued while this one was in flight, this
    /// response is discarded and the mirror is left to the newer one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when signed out, or the backend
    /// error. The mirror is unchanged on error.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<CartSnapshot, AppError> {
        self.require_session()?;

        let seq = self.inner.issued.fetch_add(1, Ordering::AcqRel) + 1;
        let cart = match self.inner.backend.cart().await {
            Ok(cart) => CartSnapshot::from(cart),
            Err(e) => return self.fail(e.into()),
        };

        let mut applied = self
            .inner
            .applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if seq > *applied {
            *applied = seq;
            self.inner.state.send_replace(cart);
        } else {
            tracing::debug!(seq, applied = *applied, "Discarding stale cart response");
        }
        drop(applied);

        Ok(self.snapshot())
    }

    /// Add one unit of `product`, then refresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the mirror is unchanged.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn add_item(&self, product: &ProductId) -> Result<CartSnapshot, AppError> {
        self.require_session()?;
        add_breadcrumb("cart", "Add to cart", Some(&[("product_id", product.as_str())]));

        match self.inner.backend.add_to_cart(product).await {
            Ok(response) => self
                .inner
                .notifier
                .success_or(response.message, "Added to cart"),
            Err(e) => return self.fail(e.into()),
        }
        self.fetch_cart().await
    }

    /// Increment or decrement a line, then refresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the mirror is unchanged.
    #[instrument(skip(self), fields(item = %item, action = action.as_str()))]
    pub async fn update_quantity(
        &self,
        action: CartAction,
        item: &CartItemId,
    ) -> Result<CartSnapshot, AppError> {
        self.require_session()?;
        add_breadcrumb(
            "cart",
            "Update quantity",
            Some(&[("item_id", item.as_str()), ("action", action.as_str())]),
        );

        if let Err(e) = self.inner.backend.update_cart(action, item).await {
            return self.fail(e.into());
        }
        self.fetch_cart().await
    }

    /// Remove a line, then refresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the mirror is unchanged.
    #[instrument(skip(self), fields(item = %item))]
    pub async fn remove_item(&self, item: &CartItemId) -> Result<CartSnapshot, AppError> {
        self.require_session()?;
        add_breadcrumb("cart", "Remove from cart", Some(&[("item_id", item.as_str())]));

        match self.inner.backend.remove_from_cart(item).await {
            Ok(response) => self
                .inner
                .notifier
                .success_or(response.message, "Removed from cart"),
            Err(e) => return self.fail(e.into()),
        }
        self.fetch_cart().await
    }

    /// Empty the mirror (on logout). Fetches still in flight are discarded.
    pub fn reset(&self) {
        let mut applied = self
            .inner
            .applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *applied = self.inner.issued.load(Ordering::Acquire);
        self.inner.state.send_replace(CartSnapshot::default());
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
