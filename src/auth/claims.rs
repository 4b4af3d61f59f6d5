/// JWT Claims structure
///
/// Represents the payload of an access token: the subject user identifier
/// and the standard registered claims (RFC 7519).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime of every access token
pub const ACCESS_TOKEN_TTL: Duration = Duration::minutes(15);

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create claims for `user_id` valid from `issued_at` for [`ACCESS_TOKEN_TTL`].
    pub fn new(user_id: &str, issued_at: DateTime<Utc>, issuer: &str) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: user_id.to_string(),
            iat,
            nbf: iat,
            exp: (issued_at + ACCESS_TOKEN_TTL).timestamp(),
            iss: issuer.to_string(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Check if token has expired
    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}
