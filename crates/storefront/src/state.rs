//! Client state shared by every view.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{Backend, HttpBackend};
use crate::config::StorefrontConfig;
use crate::credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use crate::error::AppError;
use crate::notify::Notifier;
use crate::services::{
    AddressBook, CartSync, CatalogueShelf, Checkout, Identity, OrderBook, OtpFlow,
    ProductCatalog, SessionStore,
};

/// Every controller, wired to one backend and one notifier.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    backend: Arc<dyn Backend>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Notifier,
    session: SessionStore,
    otp: OtpFlow,
    cart: CartSync,
    products: ProductCatalog,
    orders: OrderBook,
    addresses: AddressBook,
    checkout: Checkout,
    catalogues: CatalogueShelf,
}

impl Storefront {
    /// Connect to the configured backend.
    ///
    /// The session is saved under `state_dir` when one is configured and
    /// kept in memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, AppError> {
        let backend = HttpBackend::new(config.api_url.clone(), config.http_timeout)?;
        let credentials: Arc<dyn CredentialStore> = match &config.state_dir {
            Some(dir) => Arc::new(FileCredentialStore::new(dir)),
            None => Arc::new(MemoryCredentialStore::new()),
        };

        Ok(Self::with_backend(config, Arc::new(backend), credentials))
    }

    /// Wire the controllers to an existing backend and credential store.
    #[must_use]
    pub fn with_backend(
        config: StorefrontConfig,
        backend: Arc<dyn Backend>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let notifier = Notifier::new();
        let timing = config.timing;

        let session = SessionStore::new(Arc::clone(&backend));
        let cart = CartSync::new(Arc::clone(&backend), session.clone(), notifier.clone());
        let otp = OtpFlow::new(
            Arc::clone(&backend),
            Arc::clone(&credentials),
            session.clone(),
            cart.clone(),
            notifier.clone(),
            timing.otp_resend,
        );
        let products = ProductCatalog::new(
            Arc::clone(&backend),
            notifier.clone(),
            config.language,
            &timing,
        );
        let orders = OrderBook::new(Arc::clone(&backend), session.clone(), notifier.clone());
        let addresses = AddressBook::new(Arc::clone(&backend), session.clone(), notifier.clone());
        let checkout = Checkout::new(
            Arc::clone(&backend),
            session.clone(),
            cart.clone(),
            notifier.clone(),
        );
        let catalogues = CatalogueShelf::new(Arc::clone(&backend), notifier.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                backend,
                credentials,
                notifier,
                session,
                otp,
                cart,
                products,
                orders,
                addresses,
                checkout,
                catalogues,
            }),
        }
    }

    /// Restore what the previous run left behind.
    ///
    /// Installs a saved credential, asks the backend who it belongs to,
    /// resumes a pending OTP request and loads the cart for a signed-in
    /// user. Nothing here is reported to the user; an anonymous start is
    /// normal.
    pub async fn init(&self) -> Option<Identity> {
        let saved = match self.inner.credentials.load_token().await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "Could not read saved session");
                None
            }
        };
        let had_token = saved.is_some();
        if let Some(saved) = saved {
            self.inner.backend.set_token(Some(saved.token)).await;
        }

        let identity = self.inner.session.probe().await;

        if identity.is_none() && had_token {
            debug!("Saved session was rejected; forgetting it");
            self.inner.backend.set_token(None).await;
            if let Err(e) = self.inner.credentials.clear_token().await {
                warn!(error = %e, "Could not remove saved session");
            }
        }

        match self.inner.otp.resume().await {
            Ok(Some(email)) => info!(email = %email, "Resumed pending OTP request"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not resume pending OTP request"),
        }

        if identity.is_some() {
            // Failure is already reported by the cart.
            let _ = self.inner.cart.fetch_cart().await;
        }

        identity
    }

    /// Stop every timer owned by the controllers.
    ///
    /// Persisted state is left alone so the next run can pick it up.
    pub fn shutdown(&self) {
        self.inner.otp.cancel();
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn otp(&self) -> &OtpFlow {
        &self.inner.otp
    }

    #[must_use]
    pub fn cart(&self) -> &CartSync {
        &self.inner.cart
    }

    #[must_use]
    pub fn products(&self) -> &ProductCatalog {
        &self.inner.products
    }

    #[must_use]
    pub fn orders(&self) -> &OrderBook {
        &self.inner.orders
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressBook {
        &self.inner.addresses
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    #[must_use]
    pub fn catalogues(&self) -> &CatalogueShelf {
        &self.inner.catalogues
    }
}
