//! Dashboard numbers.

use std::sync::Arc;

use tracing::instrument;

use boighor_core::Language;
use boighor_storefront::api::{Backend, SalesStats};
use boighor_storefront::services::SessionStore;
use boighor_storefront::{AppError, Notifier};

/// Share of orders paid by each method, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentSplit {
    pub cod: f64,
    pub online: f64,
}

impl PaymentSplit {
    /// `None` when there are no orders yet.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(stats: &SalesStats) -> Option<Self> {
        let total = stats.cod + stats.online;
        if total == 0 {
            return None;
        }
        let total = total as f64;
        Some(Self {
            cod: stats.cod as f64 * 100.0 / total,
            online: stats.online as f64 * 100.0 / total,
        })
    }
}

/// Best sellers first, as `(title, units sold)`.
#[must_use]
pub fn best_sellers(stats: &SalesStats, language: Language) -> Vec<(String, u32)> {
    let mut sales: Vec<_> = stats
        .data
        .iter()
        .map(|product| (product.name.get(language).to_string(), product.sold))
        .collect();
    sales.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sales
}

#[derive(Clone)]
pub struct StatsBoard {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    notifier: Notifier,
}

impl StatsBoard {
    #[must_use]
    pub const fn new(backend: Arc<dyn Backend>, session: SessionStore, notifier: Notifier) -> Self {
        Self {
            backend,
            session,
            notifier,
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` unless an admin is signed in, or
    /// the backend error.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<SalesStats, AppError> {
        let result = match self.session.require_admin() {
            Ok(_) => self.backend.stats().await.map_err(AppError::from),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| self.notifier.error(e))
    }
}

#[cfg(test)]
mod tests {
    use boighor_core::Localized;
    use boighor_storefront::api::ProductSales;

    use super::*;

    fn stats() -> SalesStats {
        SalesStats {
            cod: 3,
            online: 1,
            data: vec![
                ProductSales {
                    name: Localized::english("Aranyak"),
                    sold: 4,
                },
                ProductSales {
                    name: Localized::both("Pather Panchali", "পথের পাঁচালী"),
                    sold: 9,
                },
            ],
        }
    }

    #[test]
    fn test_payment_split() {
        let split = PaymentSplit::of(&stats());
        assert_eq!(
            split,
            Some(PaymentSplit {
                cod: 75.0,
                online: 25.0
            })
        );
        assert_eq!(PaymentSplit::of(&SalesStats::default()), None);
    }

    #[test]
    fn test_best_sellers_order_and_language() {
        let sales = best_sellers(&stats(), Language::Bn);
        assert_eq!(
            sales,
            vec![("পথের পাঁচালী".to_string(), 9), ("Aranyak".to_string(), 4)]
        );
    }
}
