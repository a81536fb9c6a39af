//! Catalogue uploads.

use std::sync::Arc;

use tracing::instrument;

use boighor_core::CatalogueId;
use boighor_storefront::api::{Backend, Catalogue, CatalogueUpload};
use boighor_storefront::services::SessionStore;
use boighor_storefront::{AppError, Notifier};

#[derive(Clone)]
pub struct CatalogueAdmin {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    notifier: Notifier,
}

impl CatalogueAdmin {
    #[must_use]
    pub const fn new(backend: Arc<dyn Backend>, session: SessionStore, notifier: Notifier) -> Self {
        Self {
            backend,
            session,
            notifier,
        }
    }

    /// Upload a catalogue and return the refreshed list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` without calling the backend when the
    /// title or file is missing, otherwise the backend error.
    #[instrument(skip(self, upload), fields(title = %upload.title, file = %upload.file.file_name))]
    pub async fn upload(&self, upload: &CatalogueUpload) -> Result<Vec<Catalogue>, AppError> {
        self.require_admin()?;
        if upload.title.trim().is_empty() {
            return self.fail(AppError::Validation("Title is required".to_string()));
        }
        if upload.file.bytes.is_empty() {
            return self.fail(AppError::Validation("Please select a file".to_string()));
        }

        match self.backend.upload_catalogue(upload).await {
            Ok(response) => self.notifier.success_or(response.message, "Catalogue uploaded"),
            Err(e) => return self.fail(e.into()),
        }
        self.list().await
    }

    /// Delete a catalogue and return the refreshed list.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self), fields(catalogue = %id))]
    pub async fn delete(&self, id: &CatalogueId) -> Result<Vec<Catalogue>, AppError> {
        self.require_admin()?;
        match self.backend.delete_catalogue(id).await {
            Ok(response) => self.notifier.success_or(response.message, "Catalogue deleted"),
            Err(e) => return self.fail(e.into()),
        }
        self.list().await
    }

    async fn list(&self) -> Result<Vec<Catalogue>, AppError> {
        match self.backend.catalogues().await {
            Ok(catalogues) => Ok(catalogues),
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
