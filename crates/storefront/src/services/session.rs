//! Session store: who is signed in, and the flags views render from.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::instrument;

use boighor_core::{Email, Role, UserId};

use crate::api::{Backend, User};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};

/// The signed-in account.
///
/// `role` only decides which views are shown. The backend authorizes every
/// request on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub email: Email,
    pub role: Role,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// Snapshot of the session published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub is_authenticated: bool,
    /// True until the start-up identity probe resolves.
    pub is_loading: bool,
    /// True while a guarded submission is in flight.
    pub is_button_busy: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            is_authenticated: false,
            is_loading: true,
            is_button_busy: false,
        }
    }
}

/// Holds the current identity and session flags.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: Arc<dyn Backend>,
    state: watch::Sender<SessionState>,
    busy: AtomicBool,
}

impl SessionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(SessionInner {
                backend,
                state,
                busy: AtomicBool::new(false),
            }),
        }
    }

    /// Receive every change to the session.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    /// Ask the backend who the current credential belongs to.
    ///
    /// Failure is expected for anonymous visitors and is not reported to the
    /// user; it leaves the session signed out.
    #[instrument(skip(self))]
    pub async fn probe(&self) -> Option<Identity> {
        let identity = match self.inner.backend.me().await {
            Ok(user) => Some(Identity::from(user)),
            Err(e) => {
                tracing::debug!(error = %e, "No active session");
                None
            }
        };

        if let Some(identity) = &identity {
            set_sentry_user(&identity.id, Some(identity.email.as_str()));
        }

        self.inner.state.send_modify(|state| {
            state.is_loading = false;
            state.is_authenticated = identity.is_some();
            state.identity.clone_from(&identity);
        });

        identity
    }

    /// Record a freshly verified identity.
    pub fn sign_in(&self, identity: Identity) {
        set_sentry_user(&identity.id, Some(identity.email.as_str()));
        self.inner.state.send_modify(|state| {
            state.is_loading = false;
            state.is_authenticated = true;
            state.identity = Some(identity);
        });
    }

    /// Forget the identity.
    pub fn sign_out(&self) {
        clear_sentry_user();
        self.inner.state.send_modify(|state| {
            state.is_loading = false;
            state.is_authenticated = false;
            state.identity = None;
        });
    }

    /// The identity, or a login redirect.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when no one is signed in.
    pub fn require_auth(&self) -> Result<Identity, AppError> {
        self.identity().ok_or(AppError::Unauthenticated)
    }

    /// The identity of a signed-in admin, or a login redirect.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` unless an admin is signed in.
    pub fn require_admin(&self) -> Result<Identity, AppError> {
        let identity = self.require_auth()?;
        if identity.role.is_admin() {
            Ok(identity)
        } else {
            Err(AppError::Unauthenticated)
        }
    }

    /// Mark a submission as in flight.
    ///
    /// The returned guard clears the flag when dropped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Busy` if another submission has not finished.
    pub fn begin_submit(&self) -> Result<BusyGuard, AppError> {
        if self.inner.busy.swap(true, Ordering::AcqRel) {
            return Err(AppError::Busy);
        }
        self.inner
            .state
            .send_modify(|state| state.is_button_busy = true);
        Ok(BusyGuard {
            inner: Arc::clone(&self.inner),
        })
    }
}

/// Clears the busy flag on drop.
#[must_use = "the submission is only guarded while the guard is alive"]
pub struct BusyGuard {
    inner: Arc<SessionInner>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::Release);
        self.inner
            .state
            .send_modify(|state| state.is_button_busy = false);
    }
}

impl std::fmt::Debug for BusyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusyGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use url::Url;

    use super::*;
    use crate::api::HttpBackend;

    fn store() -> SessionStore {
        // Never contacted by these tests
        let backend = HttpBackend::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        SessionStore::new(Arc::new(backend))
    }

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new("u1"),
            email: Email::parse("reader@boighor.test").unwrap(),
            role,
        }
    }

    #[test]
    fn test_starts_loading_and_signed_out() {
        let state = store().state();
        assert!(state.is_loading);
        assert!(!state.is_authenticated);
        assert!(state.identity.is_none());
    }

    #[test]
    fn test_busy_guard_rejects_second_submit() {
        let store = store();

        let guard = store.begin_submit().unwrap();
        assert!(store.state().is_button_busy);
        assert!(matches!(store.begin_submit(), Err(AppError::Busy)));

        drop(guard);
        assert!(!store.state().is_button_busy);
        assert!(store.begin_submit().is_ok());
    }

    #[test]
    fn test_gates() {
        let store = store();
        assert!(matches!(store.require_auth(), Err(AppError::Unauthenticated)));

        store.sign_in(identity(Role::User));
        assert!(store.require_auth().is_ok());
        assert!(matches!(store.require_admin(), Err(AppError::Unauthenticated)));

        store.sign_in(identity(Role::Admin));
        assert_eq!(store.require_admin().unwrap().role, Role::Admin);

        store.sign_out();
        assert!(!store.is_authenticated());
        assert!(!store.state().is_loading);
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = store();
        let mut rx = store.subscribe();

        store.sign_in(identity(Role::User));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated);
    }
}
