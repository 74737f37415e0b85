//! Session tokens: HMAC-signed JWTs carrying the caller's identity.
//!
//! Tokens are stateless. Validity is a function of the signature and the
//! `exp` claim only; there is no server-side revocation.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_common::{Identity, WardenError};

/// Algorithms accepted on validation
const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub role_id: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            role_id: self.role_id.clone(),
        }
    }
}

/// Token validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

impl From<TokenError> for WardenError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => WardenError::Unauthenticated("token expired".to_string()),
            TokenError::Invalid(_) => WardenError::Unauthenticated("invalid token".to_string()),
        }
    }
}

/// Issues and validates session tokens
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
    issuer: String,
}

impl TokenService {
    /// Create a token service from the signing secret.
    ///
    /// Fails with `WardenError::Config` for an empty secret or a TTL under one second.
    pub fn new(secret: &str, default_ttl: Duration, issuer: &str) -> Result<Self, WardenError> {
        if secret.is_empty() {
            return Err(WardenError::Config("JWT secret is not configured".to_string()));
        }
        if default_ttl.as_secs() == 0 {
            return Err(WardenError::Config(
                "JWT expiry must be at least one second".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_FAMILY.to_vec();
        // Expiry is checked against our own boundary rule below.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[issuer]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_ttl,
            issuer: issuer.to_string(),
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token with the configured TTL
    pub fn issue(&self, identity: &Identity) -> Result<String, WardenError> {
        self.issue_with_ttl(identity, self.default_ttl)
    }

    /// Issue a token expiring `ttl` from now
    pub fn issue_with_ttl(
        &self,
        identity: &Identity,
        ttl: Duration,
    ) -> Result<String, WardenError> {
        self.issue_at(identity, ttl, chrono::Utc::now().timestamp())
    }

    fn issue_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        now: i64,
    ) -> Result<String, WardenError> {
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| WardenError::InvalidInput("token TTL out of range".to_string()))?;
        if ttl_secs == 0 {
            return Err(WardenError::InvalidInput("token TTL must be positive".to_string()));
        }

        let claims = Claims {
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
            role_id: identity.role_id.clone(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| WardenError::Internal(format!("JWT encoding error: {e}")))?;

        tracing::debug!(
            user_id = %claims.user_id,
            role_id = %claims.role_id,
            exp = claims.exp,
            "Issued session token"
        );

        Ok(token)
    }

    /// Validate a token and return its claims
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, chrono::Utc::now().timestamp())
    }

    fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        // Reject anything outside the HMAC family before touching the key,
        // so an RSA/none header can never be checked against the shared secret.
        let header = decode_header(token).map_err(|e| TokenError::Invalid(e.to_string()))?;
        if !HMAC_FAMILY.contains(&header.alg) {
            return Err(TokenError::Invalid(format!(
                "unexpected signing algorithm: {:?}",
                header.alg
            )));
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        // Expired at the exact expiry second.
        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
