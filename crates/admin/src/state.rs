//! Admin controllers sharing the storefront's session.

use std::sync::Arc;

use boighor_storefront::Storefront;

use crate::services::{CatalogueAdmin, OrderPoller, ProductAdmin, StatsBoard};

/// Everything behind the admin dashboard.
///
/// Built on top of a [`Storefront`] so both share one backend, one session
/// and one notifier. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AdminConsole {
    inner: Arc<AdminConsoleInner>,
}

struct AdminConsoleInner {
    orders: OrderPoller,
    products: ProductAdmin,
    catalogues: CatalogueAdmin,
    stats: StatsBoard,
}

impl AdminConsole {
    #[must_use]
    pub fn new(storefront: &Storefront) -> Self {
        let backend = storefront.backend();
        let session = storefront.session();
        let notifier = storefront.notifier();

        Self {
            inner: Arc::new(AdminConsoleInner {
                orders: OrderPoller::new(
                    Arc::clone(backend),
                    session.clone(),
                    notifier.clone(),
                    storefront.config().timing.order_poll,
                ),
                products: ProductAdmin::new(
                    Arc::clone(backend),
                    session.clone(),
                    notifier.clone(),
                    storefront.products().clone(),
                ),
                catalogues: CatalogueAdmin::new(
                    Arc::clone(backend),
                    session.clone(),
                    notifier.clone(),
                ),
                stats: StatsBoard::new(Arc::clone(backend), session.clone(), notifier.clone()),
            }),
        }
    }

    #[must_use]
    pub fn orders(&self) -> &OrderPoller {
        &self.inner.orders
    }

    #[must_use]
    pub fn products(&self) -> &ProductAdmin {
        &self.inner.products
    }

    #[must_use]
    pub fn catalogues(&self) -> &CatalogueAdmin {
        &self.inner.catalogues
    }

    #[must_use]
    pub fn stats(&self) -> &StatsBoard {
        &self.inner.stats
    }
}
