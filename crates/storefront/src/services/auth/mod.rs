//! OTP sign-in flow.
//!
//! ```text
//! idle ──request_otp──▶ otp_requested ──verify_otp──▶ verifying ──ok──▶ authenticated
//!                         ▲      │ resend                  │
//!                         └──────┘◀──────── wrong code ────┘
//! ```
//!
//! The email an OTP was sent to is kept in the flow's own state and reused
//! for verification and resends. It is also persisted, with the time it was
//! sent, so a restart can [`OtpFlow::resume`] on the verify step.

mod countdown;

pub use countdown::Countdown;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::instrument;

use boighor_core::{Email, OtpCode};

use crate::api::Backend;
use crate::credentials::{CredentialStore, PendingOtp, SessionToken};
use crate::error::{AppError, add_breadcrumb};
use crate::lifetime::{Lifetime, LifetimeToken, TaskHandle};
use crate::notify::Notifier;
use crate::services::cart::CartSync;
use crate::services::session::{Identity, SessionStore};

/// Where the sign-in flow is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OtpState {
    #[default]
    Idle,
    /// An OTP was sent to `email` and can be verified or resent.
    OtpRequested { email: Email },
    /// A code for `email` is being checked.
    Verifying { email: Email },
    Authenticated,
}

impl OtpState {
    /// Email the pending OTP was sent to.
    #[must_use]
    pub const fn email(&self) -> Option<&Email> {
        match self {
            Self::OtpRequested { email } | Self::Verifying { email } => Some(email),
            Self::Idle | Self::Authenticated => None,
        }
    }
}

/// Drives request, verification, resend and logout.
#[derive(Clone)]
pub struct OtpFlow {
    inner: Arc<OtpInner>,
}

struct OtpInner {
    backend: Arc<dyn Backend>,
    credentials: Arc<dyn CredentialStore>,
    session: SessionStore,
    cart: CartSync,
    notifier: Notifier,
    resend_window: Duration,
    state: watch::Sender<OtpState>,
    countdown: Arc<watch::Sender<Countdown>>,
    /// The verify step; ends when the flow leaves it
    pending: Mutex<Option<PendingStep>>,
}

/// Resources owned by the verify step.
struct PendingStep {
    lifetime: Lifetime,
    _timer: TaskHandle,
}

impl OtpFlow {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        credentials: Arc<dyn CredentialStore>,
        session: SessionStore,
        cart: CartSync,
        notifier: Notifier,
        resend_window: Duration,
    ) -> Self {
        let (state, _) = watch::channel(OtpState::Idle);
        let (countdown, _) = watch::channel(Countdown::expired(resend_window));
        Self {
            inner: Arc::new(OtpInner {
                backend,
                credentials,
                session,
                cart,
                notifier,
                resend_window,
                state,
                countdown: Arc::new(countdown),
                pending: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> OtpState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OtpState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn countdown(&self) -> Countdown {
        *self.inner.countdown.borrow()
    }

    #[must_use]
    pub fn subscribe_countdown(&self) -> watch::Receiver<Countdown> {
        self.inner.countdown.subscribe()
    }

    /// Restore the verify step from a persisted OTP request.
    ///
    /// Returns the email the OTP was sent to, if there was one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Credential` if the saved request cannot be read.
    pub async fn resume(&self) -> Result<Option<Email>, AppError> {
        let current = self.state();
        if current != OtpState::Idle {
            return Ok(current.email().cloned());
        }

        let Some(pending) = self.inner.credentials.load_pending().await? else {
            return Ok(None);
        };

        let elapsed = (Utc::now() - pending.requested_at)
            .to_std()
            .unwrap_or_default();
        let countdown = Countdown::resumed(self.inner.resend_window, elapsed);
        self.enter_verify_step(pending.email.clone(), countdown);

        Ok(Some(pending.email))
    }

    /// Ask the backend to email an OTP to `email`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a malformed email, `AppError::Busy`
    /// while another submission runs, `AppError::InvalidState` while the
    /// resend countdown of a pending OTP is running, or the backend error.
    /// The flow state is unchanged on error.
    #[instrument(skip(self))]
    pub async fn request_otp(&self, email: &str) -> Result<(), AppError> {
        let email = match Email::parse(email) {
            Ok(email) => email,
            Err(e) => return self.fail(AppError::Validation(e.to_string())),
        };

        match self.state() {
            OtpState::Idle => {}
            OtpState::OtpRequested { .. } => {
                let countdown = self.countdown();
                if !countdown.can_resend() {
                    return self.fail(resend_locked(countdown));
                }
            }
            OtpState::Verifying { .. } => {
                return self.fail(AppError::Busy);
            }
            OtpState::Authenticated => {
                return self.fail(AppError::InvalidState(
                    "You are already signed in.".to_string(),
                ));
            }
        }

        self.send(email).await
    }

    /// Resend the OTP to the email it was first sent to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if no OTP is pending or the
    /// countdown has not finished, otherwise as [`Self::request_otp`].
    #[instrument(skip(self))]
    pub async fn resend(&self) -> Result<(), AppError> {
        let OtpState::OtpRequested { email } = self.state() else {
            return self.fail(AppError::InvalidState(
                "Request an OTP before resending.".to_string(),
            ));
        };

        let countdown = self.countdown();
        if !countdown.can_resend() {
            return self.fail(resend_locked(countdown));
        }

        self.send(email).await
    }

    /// Check `code` against the pending OTP.
    ///
    /// On success the session is signed in, the credential saved, the
    /// pending request forgotten and the cart refreshed. On failure the flow
    /// stays on the verify step so another code can be tried.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if no OTP is pending,
    /// `AppError::Validation` for a malformed code, `AppError::Cancelled` if
    /// the verify step was left mid-request, or the backend error.
    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, code: &str) -> Result<Identity, AppError> {
        let OtpState::OtpRequested { email } = self.state() else {
            return self.fail(AppError::InvalidState(
                "Request an OTP first.".to_string(),
            ));
        };

        let otp = match OtpCode::parse(code) {
            Ok(otp) => otp,
            Err(e) => return self.fail(AppError::Validation(e.to_string())),
        };

        let _busy = match self.inner.session.begin_submit() {
            Ok(guard) => guard,
            Err(e) => return self.fail(e),
        };
        let Some(token) = self.step_token() else {
            return self.fail(AppError::Cancelled);
        };

        add_breadcrumb("auth", "Verify OTP", Some(&[("email", email.as_str())]));
        self.inner.state.send_replace(OtpState::Verifying {
            email: email.clone(),
        });

        let outcome = token
            .run(self.inner.backend.verify_otp(&email, otp))
            .await;

        let response = match outcome {
            None => return self.fail(AppError::Cancelled),
            Some(Err(e)) => {
                self.inner
                    .state
                    .send_replace(OtpState::OtpRequested { email });
                return self.fail(e.into());
            }
            Some(Ok(response)) => response,
        };

        let token = SessionToken::issued(response.token, Utc::now());
        self.inner
            .backend
            .set_token(Some(token.token.clone()))
            .await;
        if let Err(e) = self.inner.credentials.save_token(&token).await {
            tracing::warn!(error = %e, "Could not save session; it will end with this process");
        }
        if let Err(e) = self.inner.credentials.clear_pending().await {
            tracing::warn!(error = %e, "Could not clear pending OTP request");
        }

        let identity = Identity::from(response.user);
        self.inner.session.sign_in(identity.clone());
        self.leave_verify_step(OtpState::Authenticated);
        self.inner
            .notifier
            .success_or(response.message, "Signed in");
        tracing::info!(user_id = %identity.id, "Signed in");

        // Errors are already reported by the cart
        let _ = self.inner.cart.fetch_cart().await;

        Ok(identity)
    }

    /// Abandon the verify step (navigating away). Stops the countdown and
    /// discards any in-flight verification.
    pub fn cancel(&self) {
        if self.state().email().is_some() {
            self.leave_verify_step(OtpState::Idle);
        }
    }

    /// Sign out.
    ///
    /// The backend call is best-effort; local state is cleared regardless
    /// of its outcome.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.inner.backend.logout().await {
            tracing::warn!(error = %e, "Backend logout failed; clearing local session anyway");
        }

        self.inner.backend.set_token(None).await;
        if let Err(e) = self.inner.credentials.clear_token().await {
            tracing::warn!(error = %e, "Could not remove saved session");
        }
        if let Err(e) = self.inner.credentials.clear_pending().await {
            tracing::warn!(error = %e, "Could not clear pending OTP request");
        }

        self.inner.session.sign_out();
        self.inner.cart.reset();
        self.leave_verify_step(OtpState::Idle);
        self.inner.notifier.success("Logged out");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn send(&self, email: Email) -> Result<(), AppError> {
        let _busy = match self.inner.session.begin_submit() {
            Ok(guard) => guard,
            Err(e) => return self.fail(e),
        };
        add_breadcrumb("auth", "Request OTP", Some(&[("email", email.as_str())]));

        let response = match self.inner.backend.send_otp(&email).await {
            Ok(response) => response,
            Err(e) => return self.fail(e.into()),
        };

        let pending = PendingOtp {
            email: email.clone(),
            requested_at: Utc::now(),
        };
        if let Err(e) = self.inner.credentials.save_pending(&pending).await {
            tracing::warn!(error = %e, "Could not persist pending OTP request");
        }

        self.enter_verify_step(email, Countdown::new(self.inner.resend_window));
        self.inner
            .notifier
            .success_or(response.message, "OTP sent to your email");
        Ok(())
    }

    /// Move to `otp_requested`, replacing any previous verify step and
    /// restarting the countdown from `countdown`.
    fn enter_verify_step(&self, email: Email, countdown: Countdown) {
        let lifetime = Lifetime::new();
        self.inner.countdown.send_replace(countdown);
        let timer = lifetime.token().spawn(run_countdown(Arc::clone(&self.inner.countdown)));

        let previous = self
            .pending()
            .replace(PendingStep {
                lifetime,
                _timer: timer,
            });
        drop(previous);

        self.inner
            .state
            .send_replace(OtpState::OtpRequested { email });
    }

    fn leave_verify_step(&self, next: OtpState) {
        let previous = self.pending().take();
        if let Some(step) = previous {
            step.lifetime.end();
        }
        self.inner
            .countdown
            .send_replace(Countdown::expired(self.inner.resend_window));
        self.inner.state.send_replace(next);
    }

    fn step_token(&self) -> Option<LifetimeToken> {
        self.pending()
            .as_ref()
            .map(|step| step.lifetime.token())
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingStep>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn fail<T>(&self, err: AppError) -> Result<T, AppError> {
        self.inner.notifier.error(&err);
        Err(err)
    }
}

/// Tick the countdown once per second until it reaches zero.
async fn run_countdown(countdown: Arc<watch::Sender<Countdown>>) {
    let period = Duration::from_secs(1);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !countdown.borrow().can_resend() {
        interval.tick().await;
        countdown.send_modify(Countdown::tick);
    }
}

fn resend_locked(countdown: Countdown) -> AppError {
    AppError::InvalidState(format!(
        "You can resend the code in {}.",
        countdown.format_remaining()
    ))
}
