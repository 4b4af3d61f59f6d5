/// Authentication module
///
/// Handles access token signing/validation, password hashing,
/// and refresh session management.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session_store;

pub use claims::{Claims, ACCESS_TOKEN_TTL};
pub use jwt::{Keypair, TokenSigner, DEFAULT_ISSUER};
pub use password::{
    hash_password, validate_password_strength, verify_password, PasswordPolicyError,
    MAX_PASSWORD_BYTES, PASSWORD_COST,
};
pub use refresh_token::{generate_refresh_token, RefreshSessionManager, REFRESH_TOKEN_TTL};
pub use session_store::{hash_token, session_key, RefreshSession, SessionStore, SESSION_PREFIX};
