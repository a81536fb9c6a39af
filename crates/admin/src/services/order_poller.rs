//! Admin order list with change polling.
//!
//! The list is loaded once and then left alone. Each load records the
//! backend's "last update" timestamp as its baseline. A background poll asks
//! for that timestamp again and raises [`OrderListState::is_stale`] when it
//! is newer than the baseline. The baseline covers every page, so paging
//! does not make the list look stale. A poll answer older than the baseline
//! predates the load and is ignored. The admin refreshes by hand; nothing is
//! re-fetched automatically.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use boighor_core::{OrderId, OrderStatus};
use boighor_storefront::api::{Backend, Order};
use boighor_storefront::error::add_breadcrumb;
use boighor_storefront::lifetime::TaskHandle;
use boighor_storefront::services::SessionStore;
use boighor_storefront::{AppError, Notifier};

/// What the admin order table renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderListState {
    pub orders: Vec<Order>,
    /// Backend's last order update when the list was loaded
    pub last_known_update: Option<DateTime<Utc>>,
    /// Orders changed on the server since the list was loaded
    pub is_stale: bool,
    pub is_loading: bool,
    /// 1-indexed
    pub page: u32,
}

/// Newest `updatedAt` among `orders`.
#[must_use]
pub fn latest_update(orders: &[Order]) -> Option<DateTime<Utc>> {
    orders.iter().map(|order| order.updated_at).max()
}

/// Orders whose customer email or id contains `search`, ignoring case.
#[must_use]
pub fn filter_orders<'a>(orders: &'a [Order], search: &str) -> Vec<&'a Order> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return orders.iter().collect();
    }

    orders
        .iter()
        .filter(|order| {
            order.id.as_str().to_lowercase().contains(&needle)
                || order
                    .user
                    .as_ref()
                    .is_some_and(|user| user.email.to_lowercase().contains(&needle))
        })
        .collect()
}

#[derive(Clone)]
pub struct OrderPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    notifier: Notifier,
    interval: Duration,
    state: watch::Sender<OrderListState>,
}

impl OrderPoller {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        session: SessionStore,
        notifier: Notifier,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(OrderListState {
            page: 1,
            ..OrderListState::default()
        });
        Self {
            inner: Arc::new(PollerInner {
                backend,
                session,
                notifier,
                interval,
                state,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> OrderListState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OrderListState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.inner.state.borrow().is_stale
    }

    /// Loaded orders matching `search` (customer email or order id).
    #[must_use]
    pub fn filter(&self, search: &str) -> Vec<Order> {
        let state = self.inner.state.borrow();
        filter_orders(&state.orders, search)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Load the first page and record the backend's last update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` unless an admin is signed in, or
    /// the backend error.
    pub async fn load(&self) -> Result<OrderListState, AppError> {
        self.load_page(1).await
    }

    /// Reload the current page; clears the stale flag.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the previous list stays displayed.
    pub async fn refresh(&self) -> Result<OrderListState, AppError> {
        let page = self.inner.state.borrow().page;
        self.load_page(page).await
    }

    /// # Errors
    ///
    /// Returns the backend error; the previous list stays displayed.
    #[instrument(skip(self))]
    pub async fn load_page(&self, page: u32) -> Result<OrderListState, AppError> {
        if let Err(e) = self.inner.session.require_admin() {
            return self.fail(e);
        }
        let page = page.max(1);

        self.inner
            .state
            .send_modify(|state| state.is_loading = true);

        // Read before the orders, so a change made in between is still seen
        let baseline = self.inner.backend.orders_last_update().await;

        match self.inner.backend.admin_orders(page).await {
            Ok(orders) => {
                let last_known_update = match baseline {
                    Ok(update) => update.last_update,
                    Err(e) => {
                        warn!(error = %e, "Could not read last order update; using the loaded page");
                        latest_update(&orders)
                    }
                };
                debug!(count = orders.len(), ?last_known_update, "Loaded admin orders");
                self.inner.state.send_replace(OrderListState {
                    orders,
                    last_known_update,
                    is_stale: false,
                    is_loading: false,
                    page,
                });
                Ok(self.state())
            }
            Err(e) => {
                self.inner
                    .state
                    .send_modify(|state| state.is_loading = false);
                self.fail(e.into())
            }
        }
    }

    /// Ask the backend whether orders changed since the list was loaded.
    ///
    /// Only raises the stale flag; the list itself is untouched. Failures are
    /// logged and not shown, the next tick tries again.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> Result<bool, AppError> {
        let remote = match self.inner.backend.orders_last_update().await {
            Ok(update) => update.last_update,
            Err(e) => {
                warn!(error = %e, "Order poll failed");
                return Err(e.into());
            }
        };

        let changed = self.inner.state.send_if_modified(|state| {
            if !state.is_stale && remote > state.last_known_update {
                state.is_stale = true;
                true
            } else {
                false
            }
        });
        if changed {
            info!(?remote, "Orders changed on the server");
        }

        Ok(self.is_stale())
    }

    /// Poll every interval until the returned handle is dropped.
    ///
    /// The first poll happens one interval from now.
    #[must_use = "polling stops when the handle is dropped"]
    pub fn spawn(&self) -> TaskHandle {
        let poller = self.clone();
        let period = self.inner.interval;

        TaskHandle::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                // Failures are logged by poll_once
                let _ = poller.poll_once().await;
            }
        })
    }

    /// Change an order's status, then reload the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the list keeps showing the old status.
    #[instrument(skip(self), fields(order = %id, status = %status))]
    pub async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderListState, AppError> {
        if let Err(e) = self.inner.session.require_admin() {
            return self.fail(e);
        }
        add_breadcrumb(
            "admin",
            "Update order status",
            Some(&[("order_id", id.as_str()), ("status", status.as_str())]),
        );

        match self.inner.backend.update_order_status(id, status).await {
            Ok(response) => self
                .inner
                .notifier
                .success_or(response.message, "Order status updated"),
            Err(e) => return self.fail(e.into()),
        }
        self.refresh().await
    }

    fn fail<T>(&self, err: AppError) -> Result<T, AppError> {
        self.inner.notifier.error(&err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use boighor_core::{PaymentMethod, UserId};
    use boighor_storefront::api::OrderCustomer;

    use super::*;

    fn order(id: &str, email: &str, updated_minute: u32) -> Order {
        let at = Utc
            .with_ymd_and_hms(2025, 3, 1, 10, updated_minute, 0)
            .single()
            .unwrap_or_default();
        Order {
            id: OrderId::new(id),
            items: Vec::new(),
            user: Some(OrderCustomer {
                id: UserId::new("u1"),
                email: email.to_string(),
            }),
            sub_total: Decimal::new(300, 0),
            status: OrderStatus::Pending,
            method: PaymentMethod::Cod,
            phone: String::new(),
            address: String::new(),
            paid_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_latest_update_is_max() {
        let orders = [
            order("a", "x@y.com", 5),
            order("b", "x@y.com", 20),
            order("c", "x@y.com", 10),
        ];
        assert_eq!(latest_update(&orders), Some(orders[1].updated_at));
        assert_eq!(latest_update(&[]), None);
    }

    #[test]
    fn test_filter_matches_email_or_id() {
        let orders = [
            order("66AbC123", "apu@boighor.com", 1),
            order("77def456", "durga@example.com", 2),
        ];

        let by_email: Vec<_> = filter_orders(&orders, "DURGA")
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(by_email, ["77def456"]);

        let by_id: Vec<_> = filter_orders(&orders, "abc")
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(by_id, ["66AbC123"]);

        assert_eq!(filter_orders(&orders, "  ").len(), 2);
        assert!(filter_orders(&orders, "nobody").is_empty());
    }
}
