//! Unified error handling with Sentry integration.
//!
//! Every controller operation returns `Result<T, AppError>`. Front-ends show
//! [`AppError::user_message`] and redirect to login when
//! [`AppError::requires_login`] is true.

use thiserror::Error;

use crate::api::ApiError;
use crate::credentials::CredentialError;

/// Shown when the backend could not be reached.
const NETWORK_MESSAGE: &str = "Something went wrong. Please check your connection and try again.";

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input rejected before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The view requires a signed-in (or admin) session.
    #[error("Not authenticated")]
    Unauthenticated,

    /// A submission of the same action is still in flight.
    #[error("Request already in progress")]
    Busy,

    /// The operation is not valid in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The owning view was torn down before the call completed.
    #[error("Cancelled")]
    Cancelled,

    /// Saved session could not be read or written.
    #[error("Credential storage error: {0}")]
    Credential(#[from] CredentialError),
}

impl AppError {
    /// Message suitable for a toast.
    ///
    /// Backend rejections carry the backend's own text; transport failures
    /// get a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::InvalidState(message) => message.clone(),
            Self::Api(ApiError::RateLimited(secs)) => {
                format!("Too many requests. Please try again in {secs} seconds.")
            }
            Self::Api(err) => err
                .backend_message()
                .map_or_else(|| NETWORK_MESSAGE.to_string(), str::to_owned),
            Self::Unauthenticated => "Please log in to continue.".to_string(),
            Self::Busy => "Please wait, your request is still being processed.".to_string(),
            Self::Cancelled => "Cancelled.".to_string(),
            Self::Credential(_) => "Could not access your saved session.".to_string(),
        }
    }

    /// Whether the front-end should send the user to the login view.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Api(ApiError::Unauthorized(_)))
    }

    /// Whether the failure is on our side (transport, parsing, storage)
    /// rather than a rejection the user can act on.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Http(_) | ApiError::Parse(_) | ApiError::Url(_))
                | Self::Credential(_)
        )
    }

    /// Capture internal errors to Sentry.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
