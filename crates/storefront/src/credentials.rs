//! Persistence for the session credential and the pending OTP request.
//!
//! The backend hands out a session token that stays valid for 15 days. The
//! email an OTP was sent to is kept too, with the time it was sent, so the
//! verify step and its resend countdown survive a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use boighor_core::Email;

/// How long a session token is kept after it was issued.
pub const SESSION_LIFETIME_DAYS: i64 = 15;

/// File name used by [`FileCredentialStore`].
const SESSION_FILE: &str = "session.json";

/// Errors reading or writing saved credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt session file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A saved session credential.
#[derive(Clone)]
pub struct SessionToken {
    /// Opaque token sent in the `token` header.
    pub token: SecretString,
    /// When the token stops being offered to the backend.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SessionToken {
    /// A token issued at `now`, expiring after the session lifetime.
    #[must_use]
    pub fn issued(token: SecretString, now: DateTime<Utc>) -> Self {
        Self {
            token,
            expires_at: now + Duration::days(SESSION_LIFETIME_DAYS),
        }
    }

    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An OTP that was sent but not verified yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOtp {
    pub email: Email,
    pub requested_at: DateTime<Utc>,
}

/// Where the session credential and pending OTP request are kept.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the saved token. Expired tokens load as `None`.
    async fn load_token(&self) -> Result<Option<SessionToken>, CredentialError>;

    async fn save_token(&self, token: &SessionToken) -> Result<(), CredentialError>;

    async fn clear_token(&self) -> Result<(), CredentialError>;

    /// The OTP request awaiting verification, if any.
    async fn load_pending(&self) -> Result<Option<PendingOtp>, CredentialError>;

    async fn save_pending(&self, pending: &PendingOtp) -> Result<(), CredentialError>;

    async fn clear_pending(&self) -> Result<(), CredentialError>;
}

// =============================================================================
// On-disk format
// =============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<StoredToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending: Option<PendingOtp>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl StoredSession {
    fn live_token(&self, now: DateTime<Utc>) -> Option<SessionToken> {
        self.token
            .as_ref()
            .map(|stored| SessionToken {
                token: SecretString::from(stored.token.clone()),
                expires_at: stored.expires_at,
            })
            .filter(|token| !token.is_expired_at(now))
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Credentials that live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<StoredSession>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load_token(&self) -> Result<Option<SessionToken>, CredentialError> {
        Ok(self.session.lock().await.live_token(Utc::now()))
    }

    async fn save_token(&self, token: &SessionToken) -> Result<(), CredentialError> {
        self.session.lock().await.token = Some(StoredToken {
            token: token.token.expose_secret().to_string(),
            expires_at: token.expires_at,
        });
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), CredentialError> {
        self.session.lock().await.token = None;
        Ok(())
    }

    async fn load_pending(&self) -> Result<Option<PendingOtp>, CredentialError> {
        Ok(self.session.lock().await.pending.clone())
    }

    async fn save_pending(&self, pending: &PendingOtp) -> Result<(), CredentialError> {
        self.session.lock().await.pending = Some(pending.clone());
        Ok(())
    }

    async fn clear_pending(&self) -> Result<(), CredentialError> {
        self.session.lock().await.pending = None;
        Ok(())
    }
}

// =============================================================================
// File store
// =============================================================================

/// Credentials kept in a JSON file, used by the CLI between invocations.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Store credentials in `session.json` under `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Path of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoredSession, CredentialError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredSession::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, session: &StoredSession) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(session)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn update(&self, f: impl FnOnce(&mut StoredSession) + Send) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().await;
        let mut session = self.read().await?;
        f(&mut session);
        self.write(&session).await
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load_token(&self) -> Result<Option<SessionToken>, CredentialError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.live_token(Utc::now()))
    }

    async fn save_token(&self, token: &SessionToken) -> Result<(), CredentialError> {
        let stored = StoredToken {
            token: token.token.expose_secret().to_string(),
            expires_at: token.expires_at,
        };
        self.update(move |session| session.token = Some(stored)).await
    }

    async fn clear_token(&self) -> Result<(), CredentialError> {
        self.update(|session| session.token = None).await
    }

    async fn load_pending(&self) -> Result<Option<PendingOtp>, CredentialError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.pending)
    }

    async fn save_pending(&self, pending: &PendingOtp) -> Result<(), CredentialError> {
        let pending = pending.clone();
        self.update(move |session| session.pending = Some(pending))
            .await
    }

    async fn clear_pending(&self) -> Result<(), CredentialError> {
        self.update(|session| session.pending = None).await
    }
}
