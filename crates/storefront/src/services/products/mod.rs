//! Product query controller.
//!
//! Keeps the listing in step with the URL query string, debounces typed
//! search text, and serves search-as-you-type suggestions.
//!
//! # Caching
//!
//! Product detail pages are cached with `moka` (5-minute TTL). Listings and
//! suggestions are always fetched fresh.

mod debounce;
mod query;

pub use debounce::Debouncer;
pub use query::{ProductQuery, QueryChange};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::watch;
use tracing::{debug, instrument};

use boighor_core::{Language, PriceSort, ProductId};

use crate::api::{Backend, Product, ProductDetailResponse, ProductListResponse, Suggestion};
use crate::config::TimingConfig;
use crate::error::AppError;
use crate::notify::Notifier;

/// Suggestions are only requested once this many characters are typed.
pub const MIN_AUTOCOMPLETE_CHARS: usize = 2;

/// What the listing view renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductListing {
    pub products: Vec<Product>,
    pub new_products: Vec<Product>,
    pub categories: Vec<String>,
    pub total_pages: u32,
    pub is_loading: bool,
}

impl ProductListing {
    fn loaded(response: ProductListResponse) -> Self {
        Self {
            products: response.products,
            new_products: response.new_products,
            categories: response.categories,
            total_pages: response.total_pages,
            is_loading: false,
        }
    }
}

/// Drives the product listing, search box and autocomplete.
#[derive(Clone)]
pub struct ProductCatalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    query: watch::Sender<ProductQuery>,
    listing: watch::Sender<ProductListing>,
    suggestions: watch::Sender<Vec<Suggestion>>,
    /// Most recent autocomplete input, trimmed
    latest_input: Mutex<String>,
    search_debounce: Debouncer,
    suggest_debounce: Debouncer,
    issued: AtomicU64,
    applied: Mutex<u64>,
    details: Cache<ProductId, Arc<ProductDetailResponse>>,
}

impl ProductCatalog {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        notifier: Notifier,
        language: Language,
        timing: &TimingConfig,
    ) -> Self {
        let details = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let (query, _) = watch::channel(ProductQuery {
            language,
            ..ProductQuery::default()
        });
        let (listing, _) = watch::channel(ProductListing::default());
        let (suggestions, _) = watch::channel(Vec::new());

        Self {
            inner: Arc::new(CatalogInner {
                backend,
                notifier,
                query,
                listing,
                suggestions,
                latest_input: Mutex::new(String::new()),
                search_debounce: Debouncer::new(timing.search_debounce),
                suggest_debounce: Debouncer::new(timing.autocomplete_debounce),
                issued: AtomicU64::new(0),
                applied: Mutex::new(0),
                details,
            }),
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    #[must_use]
    pub fn query(&self) -> ProductQuery {
        self.inner.query.borrow().clone()
    }

    /// The current query as it should appear in the URL.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.inner.query.borrow().to_query_string()
    }

    #[must_use]
    pub fn subscribe_query(&self) -> watch::Receiver<ProductQuery> {
        self.inner.query.subscribe()
    }

    #[must_use]
    pub fn listing(&self) -> ProductListing {
        self.inner.listing.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_listing(&self) -> watch::Receiver<ProductListing> {
        self.inner.listing.subscribe()
    }

    #[must_use]
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.inner.suggestions.borrow().clone()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Load the listing for a URL query string (page load, back/forward).
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn navigate(&self, query_string: &str) -> Result<ProductListing, AppError> {
        let query = ProductQuery::from_query_string(query_string);
        self.inner.query.send_replace(query);
        self.fetch_products().await
    }

    /// Apply one filter change and re-fetch if the query changed.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn change(&self, change: QueryChange) -> Result<ProductListing, AppError> {
        if self.inner.query.send_if_modified(|query| query.apply(change)) {
            self.fetch_products().await
        } else {
            Ok(self.listing())
        }
    }

    /// Set the search text immediately (search submitted).
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn set_search(&self, text: &str) -> Result<ProductListing, AppError> {
        self.inner.search_debounce.cancel();
        self.change(QueryChange::Search(text.trim().to_string()))
            .await
    }

    /// Set the search text once typing pauses.
    ///
    /// Returns `Ok(None)` when a later keystroke superseded this one.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn type_search(&self, text: &str) -> Result<Option<ProductListing>, AppError> {
        if !self.inner.search_debounce.settle().await {
            return Ok(None);
        }
        self.change(QueryChange::Search(text.trim().to_string()))
            .await
            .map(Some)
    }

    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn set_category(&self, category: &str) -> Result<ProductListing, AppError> {
        self.change(QueryChange::Category(category.to_string()))
            .await
    }

    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn set_author(&self, author: &str) -> Result<ProductListing, AppError> {
        self.change(QueryChange::Author(author.to_string())).await
    }

    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn set_price_sort(
        &self,
        sort: Option<PriceSort>,
    ) -> Result<ProductListing, AppError> {
        self.change(QueryChange::PriceSort(sort)).await
    }

    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn set_language(&self, language: Language) -> Result<ProductListing, AppError> {
        self.change(QueryChange::Language(language)).await
    }

    /// Go to a page, keeping every filter.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn set_page(&self, page: u32) -> Result<ProductListing, AppError> {
        self.change(QueryChange::Page(page)).await
    }

    /// Drop every filter and go back to page 1.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn clear_filters(&self) -> Result<ProductListing, AppError> {
        self.inner.search_debounce.cancel();
        let before = self.query();
        self.inner.query.send_modify(ProductQuery::clear_filters);
        if self.query() == before {
            return Ok(self.listing());
        }
        self.fetch_products().await
    }

    /// Fetch the listing for the current query.
    ///
    /// Responses to superseded fetches are discarded.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn fetch_products(&self) -> Result<ProductListing, AppError> {
        let seq = self.inner.issued.fetch_add(1, Ordering::AcqRel) + 1;
        let params = self.inner.query.borrow().to_params();
        self.inner
            .listing
            .send_modify(|listing| listing.is_loading = true);

        let result = self.inner.backend.products(&params).await;

        let mut applied = self
            .inner
            .applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let latest = seq > *applied && seq == self.inner.issued.load(Ordering::Acquire);
        match result {
            Ok(response) => {
                if seq > *applied {
                    *applied = seq;
                    let mut listing = ProductListing::loaded(response);
                    listing.is_loading = !latest;
                    self.inner.listing.send_replace(listing);
                } else {
                    debug!(seq, "Discarding stale product listing");
                }
                drop(applied);
                Ok(self.listing())
            }
            Err(e) => {
                if latest {
                    self.inner
                        .listing
                        .send_modify(|listing| listing.is_loading = false);
                }
                drop(applied);
                let err = AppError::from(e);
                self.inner.notifier.error(&err);
                Err(err)
            }
        }
    }

    // =========================================================================
    // Autocomplete
    // =========================================================================

    /// Suggestions for the text typed so far.
    ///
    /// Fewer than [`MIN_AUTOCOMPLETE_CHARS`] characters clears the
    /// suggestions without a request. Otherwise the request waits for typing
    /// to pause, and its result is dropped if the input has changed since.
    /// Returns `Ok(None)` when the call was superseded.
    ///
    /// Failures are logged but not shown; the dropdown simply stays empty.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn suggest(&self, text: &str) -> Result<Option<Vec<Suggestion>>, AppError> {
        let input = text.trim().to_string();
        *self.latest_input() = input.clone();

        if input.chars().count() < MIN_AUTOCOMPLETE_CHARS {
            self.inner.suggest_debounce.cancel();
            self.inner.suggestions.send_replace(Vec::new());
            return Ok(Some(Vec::new()));
        }

        if !self.inner.suggest_debounce.settle().await {
            return Ok(None);
        }

        let language = self.inner.query.borrow().language;
        let result = self.inner.backend.autocomplete(&input, language).await;

        if *self.latest_input() != input {
            debug!(%input, "Discarding suggestions for outdated input");
            return Ok(None);
        }

        match result {
            Ok(suggestions) => {
                self.inner.suggestions.send_replace(suggestions.clone());
                Ok(Some(suggestions))
            }
            Err(e) => {
                tracing::warn!(error = %e, %input, "Autocomplete failed");
                self.inner.suggestions.send_replace(Vec::new());
                Err(e.into())
            }
        }
    }

    /// Close the suggestion dropdown.
    pub fn clear_suggestions(&self) {
        self.inner.suggest_debounce.cancel();
        self.latest_input().clear();
        self.inner.suggestions.send_replace(Vec::new());
    }

    // =========================================================================
    // Detail
    // =========================================================================

    /// A product with its related products.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self), fields(product = %id))]
    pub async fn fetch_product(&self, id: &ProductId) -> Result<Arc<ProductDetailResponse>, AppError> {
        if let Some(detail) = self.inner.details.get(id).await {
            debug!("Cache hit for product");
            return Ok(detail);
        }

        let detail = match self.inner.backend.product(id).await {
            Ok(detail) => Arc::new(detail),
            Err(e) => {
                let err = AppError::from(e);
                self.inner.notifier.error(&err);
                return Err(err);
            }
        };

        self.inner
            .details
            .insert(id.clone(), Arc::clone(&detail))
            .await;

        Ok(detail)
    }

    /// Drop a cached product (after an admin edit).
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner.details.invalidate(id).await;
    }

    fn latest_input(&self) -> std::sync::MutexGuard<'_, String> {
        self.inner
            .latest_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
