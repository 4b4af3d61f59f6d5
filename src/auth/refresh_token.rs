/// Refresh Token Management
///
/// Creation, rotation and revocation of refresh sessions.
/// Refresh tokens are:
/// - 256-bit secrets from the OS random source, hex encoded
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Single-use: rotation consumes the presented token atomically
/// - Bounded by a store-side TTL of 30 days

use std::time::Duration;

use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::auth::session_store::{hash_token, RefreshSession, SessionStore};
use crate::error::{AppError, AuthError};

/// Lifetime of a refresh session
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const TOKEN_BYTES: usize = 32;

/// Generate a new cryptographically secure refresh secret
pub fn generate_refresh_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Issues, rotates and revokes refresh sessions
#[derive(Clone)]
pub struct RefreshSessionManager {
    sessions: SessionStore,
    ttl: Duration,
}

impl RefreshSessionManager {
    pub fn new(sessions: SessionStore) -> Self {
        Self {
            sessions,
            ttl: REFRESH_TOKEN_TTL,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a new session for `user_id` and return its plaintext token.
    ///
    /// The plaintext is returned exactly once; only its hash is stored.
    ///
    /// # Errors
    /// - `Entropy` if the random source fails
    /// - `Store` if the session cannot be written
    pub async fn create(&self, user_id: &str) -> Result<String, AppError> {
        let token = generate_refresh_token()?;
        let hash = hash_token(&token);

        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AppError::Internal(format!("invalid session ttl: {}", e)))?;
        let session = RefreshSession {
            user_id: user_id.to_string(),
            expiry: Utc::now() + ttl,
        };

        self.sessions.save(&hash, &session, self.ttl).await?;

        tracing::debug!(user_id = %user_id, "Refresh session created");
        Ok(token)
    }

    /// Consume `old_token` and issue a fresh session for the same user.
    ///
    /// The old record is removed with an atomic take, so of several
    /// concurrent rotations of one token exactly one succeeds.
    ///
    /// # Returns
    /// `(new_token, user_id)`
    ///
    /// # Errors
    /// - `InvalidOrExpiredToken` if the token is unknown, expired or already used
    /// - `Store` on store failures
    pub async fn rotate(&self, old_token: &str) -> Result<(String, String), AppError> {
        let old_hash = hash_token(old_token);

        let session = match self.sessions.take(&old_hash).await? {
            Some(session) if !session.is_expired() => session,
            Some(session) => {
                tracing::info!(user_id = %session.user_id, "Refresh session expired");
                return Err(AuthError::InvalidOrExpiredToken.into());
            }
            None => {
                tracing::warn!("Refresh token not found in store");
                return Err(AuthError::InvalidOrExpiredToken.into());
            }
        };

        let new_token = self.create(&session.user_id).await?;

        tracing::info!(user_id = %session.user_id, "Refresh token rotated");
        Ok((new_token, session.user_id))
    }

    /// Delete the session behind `token`. Unknown tokens are not an error.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.sessions.remove(&hash_token(token)).await?;
        Ok(())
    }

    /// Whether `token` still maps to a live session.
    pub async fn is_active(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.sessions.contains(&hash_token(token)).await?)
    }
}
