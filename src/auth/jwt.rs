/// Access Token Signing and Validation
///
/// Issues and validates short-lived RS256 access tokens. The keypair is
/// parsed once at startup and injected into a [`TokenSigner`]; the signer
/// is immutable afterwards and cheap to clone across workers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::error::AuthError;

/// Issuer stamped into every access token
pub const DEFAULT_ISSUER: &str = "social-media-app";

/// Only RSA PKCS#1 v1.5 signatures are accepted.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// RSA keypair used to sign and verify access tokens
#[derive(Clone)]
pub struct Keypair {
    encoding: Option<EncodingKey>,
    decoding: DecodingKey,
}

impl Keypair {
    /// Parse a PEM encoded RSA private key and its public key.
    ///
    /// # Errors
    /// Returns `InvalidKey` if either key is malformed
    pub fn from_pem(private_pem: &str, public_pem: &str) -> Result<Self, AuthError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem.as_bytes()).map_err(|e| {
            AuthError::InvalidKey(format!("failed to parse RSA private key: {}", e))
        })?;
        let decoding = Self::decoding_key(public_pem)?;

        Ok(Self {
            encoding: Some(encoding),
            decoding,
        })
    }

    /// Verification-only keypair; issuing tokens with it fails with `NotInitialized`.
    pub fn public_only(public_pem: &str) -> Result<Self, AuthError> {
        Ok(Self {
            encoding: None,
            decoding: Self::decoding_key(public_pem)?,
        })
    }

    fn decoding_key(public_pem: &str) -> Result<DecodingKey, AuthError> {
        DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::InvalidKey(format!("failed to parse RSA public key: {}", e)))
    }
}

/// Issues and validates access tokens
#[derive(Clone)]
pub struct TokenSigner {
    keys: Arc<Keypair>,
    issuer: String,
}

impl TokenSigner {
    pub fn new(keys: Keypair, issuer: impl Into<String>) -> Self {
        Self {
            keys: Arc::new(keys),
            issuer: issuer.into(),
        }
    }

    /// Generate a new access token for a user, valid for 15 minutes from now.
    ///
    /// # Errors
    /// - `NotInitialized` if no private key is loaded
    /// - `Signing` if the signature cannot be produced
    pub fn issue_access_token(&self, user_id: &str) -> Result<String, AuthError> {
        self.issue_access_token_at(user_id, Utc::now())
    }

    /// Same as [`issue_access_token`](Self::issue_access_token) with an explicit issue time.
    pub fn issue_access_token_at(
        &self,
        user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let encoding = self.keys.encoding.as_ref().ok_or(AuthError::NotInitialized)?;
        let claims = Claims::new(user_id, issued_at, &self.issuer);

        encode(&Header::new(Algorithm::RS256), &claims, encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Validate an access token and return its subject.
    ///
    /// Rejects tokens whose header names a non-RSA algorithm, tokens that are
    /// expired or not yet valid, tokens from another issuer, and anything
    /// malformed.
    ///
    /// # Errors
    /// Always `InvalidToken`; the specific cause is logged
    pub fn validate_access_token(&self, token: &str) -> Result<String, AuthError> {
        self.decode_claims(token).map(|claims| claims.sub)
    }

    /// Validate and return the full claim set.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(error = %e, "JWT validation error");
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const PRIVATE_PEM: &str = include_str!("../../tests/fixtures/signing_private.pem");
    const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/signing_public.pem");
    const OTHER_PRIVATE_PEM: &str = include_str!("../../tests/fixtures/other_private.pem");
    const OTHER_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/other_public.pem");

    fn get_test_signer() -> TokenSigner {
        let keys = Keypair::from_pem(PRIVATE_PEM, PUBLIC_PEM).expect("Failed to parse keys");
        TokenSigner::new(keys, DEFAULT_ISSUER)
    }

    #[test]
    fn test_generate_and_validate_token() {
        let signer = get_test_signer();

        let token = signer.issue_access_token("user-123").expect("Failed to generate token");
        let user_id = signer.validate_access_token(&token).expect("Failed to validate token");

        assert_eq!(user_id, "user-123");
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_claims_carry_issuer_and_lifetime() {
        let signer = get_test_signer();
        let token = signer.issue_access_token("user-123").unwrap();

        let claims = signer.decode_claims(&token).unwrap();
        assert_eq!(claims.iss, DEFAULT_ISSUER);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_invalid_token() {
        let signer = get_test_signer();
        let result = signer.validate_access_token("invalid.token.here");

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token() {
        let signer = get_test_signer();
        let token = signer.issue_access_token("user-123").unwrap();

        // Flip the last signature character
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(matches!(
            signer.validate_access_token(&tampered),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_from_other_keypair_is_rejected() {
        let other = TokenSigner::new(
            Keypair::from_pem(OTHER_PRIVATE_PEM, OTHER_PUBLIC_PEM).unwrap(),
            DEFAULT_ISSUER,
        );
        let token = other.issue_access_token("user-123").unwrap();

        assert!(get_test_signer().validate_access_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = get_test_signer();
        let issued_at = Utc::now() - Duration::minutes(16);
        let token = signer.issue_access_token_at("user-123", issued_at).unwrap();

        assert!(matches!(
            signer.validate_access_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_not_yet_valid_token_is_rejected() {
        let signer = get_test_signer();
        let issued_at = Utc::now() + Duration::minutes(5);
        let token = signer.issue_access_token_at("user-123", issued_at).unwrap();

        assert!(signer.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_hmac_token_is_rejected() {
        // alg substitution: an HS256 token keyed with the public key bytes
        let claims = Claims::new("attacker", Utc::now(), DEFAULT_ISSUER);
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(PUBLIC_PEM.as_bytes()),
        )
        .unwrap();

        assert!(get_test_signer().validate_access_token(&forged).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let keys = Keypair::from_pem(PRIVATE_PEM, PUBLIC_PEM).unwrap();
        let token = TokenSigner::new(keys.clone(), "someone-else")
            .issue_access_token("user-123")
            .unwrap();

        let result = TokenSigner::new(keys, DEFAULT_ISSUER).validate_access_token(&token);
        assert!(result.is_err());
    }

    #[test]
    fn test_public_only_signer_cannot_issue() {
        let signer = TokenSigner::new(Keypair::public_only(PUBLIC_PEM).unwrap(), DEFAULT_ISSUER);
        let result = signer.issue_access_token("user-123");

        assert!(matches!(result, Err(AuthError::NotInitialized)));
    }

    #[test]
    fn test_malformed_keys_are_rejected() {
        assert!(matches!(
            Keypair::from_pem("not a key", PUBLIC_PEM),
            Err(AuthError::InvalidKey(_))
        ));
        assert!(matches!(
            Keypair::from_pem(PRIVATE_PEM, "not a key"),
            Err(AuthError::InvalidKey(_))
        ));
    }
}
