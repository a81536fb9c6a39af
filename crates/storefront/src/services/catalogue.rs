//! Downloadable catalogues (public side).

use std::sync::Arc;

use tracing::instrument;

use crate::api::{Backend, Catalogue};
use crate::error::AppError;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct CatalogueShelf {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
}

impl CatalogueShelf {
    #[must_use]
    pub const fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self { backend, notifier }
    }

    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Catalogue>, AppError> {
        match self.backend.catalogues().await {
            Ok(catalogues) => Ok(catalogues),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Fetch the file behind a catalogue.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self, catalogue), fields(catalogue = %catalogue.id))]
    pub async fn download(&self, catalogue: &Catalogue) -> Result<Vec<u8>, AppError> {
        match self.backend.download(&catalogue.file_url).await {
            Ok(bytes) => {
                tracing::debug!(len = bytes.len(), "Downloaded catalogue");
                Ok(bytes)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn fail<T>(&self, err: AppError) -> Result<T, AppError> {
        self.notifier.error(&err);
        Err(err)
    }
}
