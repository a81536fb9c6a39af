//! Product authoring.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use boighor_core::{Language, ProductId};
use boighor_storefront::api::{
    Backend, FileUpload, ProductDraft, ProductListParams, ProductListResponse,
};
use boighor_storefront::services::{ProductCatalog, SessionStore};
use boighor_storefront::{AppError, Notifier};

/// Check a draft before it is sent.
///
/// # Errors
///
/// Returns `AppError::Validation` for a missing English title or a
/// negative price, old price or stock.
pub fn validate_draft(draft: &ProductDraft) -> Result<(), AppError> {
    if draft.title.en.trim().is_empty() {
        return Err(AppError::Validation("Title (English) is required".to_string()));
    }
    if draft.price.is_sign_negative() {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    if draft.old_price.is_some_and(|old| old < Decimal::ZERO) {
        return Err(AppError::Validation("Old price cannot be negative".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ProductAdmin {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    notifier: Notifier,
    /// Cached product pages to invalidate after an edit
    catalog: ProductCatalog,
}

impl ProductAdmin {
    #[must_use]
    pub const fn new(
        backend: Arc<dyn Backend>,
        session: SessionStore,
        notifier: Notifier,
        catalog: ProductCatalog,
    ) -> Self {
        Self {
            backend,
            session,
            notifier,
            catalog,
        }
    }

    /// One page of every product, unfiltered.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32) -> Result<ProductListResponse, AppError> {
        self.require_admin()?;
        let params = ProductListParams {
            page: page.max(1),
            lang: Language::En,
            ..ProductListParams::default()
        };
        match self.backend.products(&params).await {
            Ok(response) => Ok(response),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Create a product with at least one image.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` without calling the backend when no
    /// image is attached or the draft is invalid, otherwise the backend
    /// error.
    #[instrument(skip(self, draft, images), fields(title = %draft.title.en, images = images.len()))]
    pub async fn create(&self, draft: &ProductDraft, images: &[FileUpload]) -> Result<(), AppError> {
        self.require_admin()?;
        if images.is_empty() {
            return self.fail(AppError::Validation("Please select images".to_string()));
        }
        if let Err(e) = validate_draft(draft) {
            return self.fail(e);
        }

        match self.backend.create_product(draft, images).await {
            Ok(response) => {
                info!("Product created");
                self.notifier.success_or(response.message, "Product created");
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Update a product's text, prices and stock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an invalid draft, otherwise the
    /// backend error.
    #[instrument(skip(self, draft), fields(product = %id))]
    pub async fn update(&self, id: &ProductId, draft: &ProductDraft) -> Result<(), AppError> {
        self.require_admin()?;
        if let Err(e) = validate_draft(draft) {
            return self.fail(e);
        }

        match self.backend.update_product(id, draft).await {
            Ok(response) => {
                self.catalog.invalidate_product(id).await;
                self.notifier.success_or(response.message, "Product updated");
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Replace every image of a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when no image is attached, otherwise
    /// the backend error.
    #[instrument(skip(self, images), fields(product = %id, images = images.len()))]
    pub async fn replace_images(&self, id: &ProductId, images: &[FileUpload]) -> Result<(), AppError> {
        self.require_admin()?;
        if images.is_empty() {
            return self.fail(AppError::Validation("Please select images".to_string()));
        }

        match self.backend.replace_product_images(id, images).await {
            Ok(response) => {
                self.catalog.invalidate_product(id).await;
                self.notifier.success_or(response.message, "Images updated");
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn require_admin(&self) -> Result<(), AppError> {
        match self.session.require_admin() {
            Ok(_) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&self, err: AppError) -> Result<T, AppError> {
        self.notifier.error(&err);
        Err(err)
    }
}
