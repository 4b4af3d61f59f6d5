/// Error Handling Module
///
/// Unified error handling for the authentication core.
/// It covers:
/// 1. Domain-specific error types (auth, store, config)
/// 2. A single application error type used for control flow
/// 3. HTTP response mapping with structured context
/// 4. Structured error logging keyed by request id

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Authentication errors raised by the signer, hasher, session manager
/// and the bearer-token gate.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signer used without a private key.
    #[error("JWT private key not initialized")]
    NotInitialized,
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    /// Any access token failure. The specific cause is only logged.
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid or expired refresh token")]
    InvalidOrExpiredToken,
    #[error("missing refresh token")]
    MissingRefreshToken,
    #[error("missing authorization header")]
    MissingAuthorization,
    #[error("invalid authorization header format")]
    MalformedAuthorization,
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("password exceeds {0} bytes")]
    PasswordTooLong(usize),
    #[error("failed to generate random token: {0}")]
    Entropy(String),
}

/// Key-value store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt session record: {0}")]
    Corrupt(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config: {0}")]
    MissingRequired(String),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classes that decide how an error reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Signer used before keys were loaded.
    Precondition,
    /// Malformed or expired token, malformed authorization header.
    Validation,
    /// Refresh secret unknown to the store or expired.
    NotFoundOrExpired,
    /// Store round-trip failure.
    Upstream,
    Internal,
}

impl AppError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::Auth(e) => match e {
                AuthError::NotInitialized => ErrorClass::Precondition,
                AuthError::InvalidToken
                | AuthError::MissingAuthorization
                | AuthError::MalformedAuthorization
                | AuthError::PasswordTooLong(_) => ErrorClass::Validation,
                AuthError::InvalidOrExpiredToken | AuthError::MissingRefreshToken => {
                    ErrorClass::NotFoundOrExpired
                }
                AuthError::InvalidKey(_)
                | AuthError::Signing(_)
                | AuthError::Hashing(_)
                | AuthError::Entropy(_) => ErrorClass::Internal,
            },
            AppError::Store(_) => ErrorClass::Upstream,
            AppError::Internal(_) => ErrorClass::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.class() {
            ErrorClass::Validation | ErrorClass::NotFoundOrExpired => StatusCode::UNAUTHORIZED,
            ErrorClass::Precondition | ErrorClass::Upstream | ErrorClass::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Attach the request id so the response and the log line agree.
    pub fn scoped(self, request_id: impl Into<String>) -> ApiError {
        ApiError {
            request_id: request_id.into(),
            source: self,
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Request id of the failed request
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);

    fn to_http_response(&self, request_id: &str) -> HttpResponse {
        let (status, body) = self.error_response(request_id);
        HttpResponse::build(status).json(body)
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (code, message) = match self {
            // Client-facing reasons are short and never carry internals.
            AppError::Auth(e) => match e {
                AuthError::InvalidToken => ("TOKEN_INVALID", e.to_string()),
                AuthError::MissingAuthorization => ("MISSING_AUTHORIZATION", e.to_string()),
                AuthError::MalformedAuthorization => ("MALFORMED_AUTHORIZATION", e.to_string()),
                AuthError::InvalidOrExpiredToken => ("REFRESH_TOKEN_INVALID", e.to_string()),
                AuthError::MissingRefreshToken => ("MISSING_REFRESH_TOKEN", e.to_string()),
                AuthError::PasswordTooLong(_) => ("PASSWORD_TOO_LONG", e.to_string()),
                AuthError::Signing(_) | AuthError::NotInitialized => (
                    "TOKEN_GENERATION_FAILED",
                    "failed to generate access token".to_string(),
                ),
                _ => ("INTERNAL_ERROR", "Internal server error".to_string()),
            },
            AppError::Store(_) => (
                "SERVICE_UNAVAILABLE",
                "Internal server error".to_string(),
            ),
            AppError::Internal(_) => ("INTERNAL_ERROR", "Internal server error".to_string()),
        };

        let status = self.status_code();
        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self.class() {
            ErrorClass::Validation | ErrorClass::NotFoundOrExpired => {
                tracing::warn!(
                    request_id = request_id,
                    error = %self,
                    "Authentication error"
                );
            }
            ErrorClass::Upstream => {
                tracing::error!(
                    request_id = request_id,
                    error = %self,
                    "Session store error"
                );
            }
            ErrorClass::Precondition | ErrorClass::Internal => {
                tracing::error!(
                    request_id = request_id,
                    error = %self,
                    "Internal error"
                );
            }
        }
    }
}

/// An [`AppError`] bound to the request that produced it.
///
/// Route handlers return this so the JSON body and the log entry both
/// carry the `X-Request-ID` of the failed request.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ApiError {
    pub request_id: String,
    #[source]
    pub source: AppError,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.source.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        self.source.log_error(&self.request_id);
        self.source.to_http_response(&self.request_id)
    }
}
