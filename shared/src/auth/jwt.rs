//! # ID Token Service
//!
//! Mints and validates the OIDC ID token returned alongside access/refresh
//! tokens from `/oauth/token`.
//!
//! ## Why Only the ID Token Is a JWT
//!
//! This revision's non-goals explicitly exclude cryptographic signing of
//! access tokens: access and refresh tokens are opaque, server-side-looked-up
//! strings (see `TokenStore`), not JWTs. The **ID token** is the one token
//! this service signs, because OIDC clients parse it directly to learn who
//! the user is without a round trip to `/userinfo`.
//!
//! ## Token Structure
//!
//! ```text
//! xxxxx.yyyyy.zzzzz
//! ├────┼─────┼────┤
//! │    │     │    └── Signature (HMAC-SHA256 over header+payload)
//! │    │     └─────── Payload (claims)
//! │    └───────────── Header (alg: HS256)
//! ```
//!
//! ## Claims
//!
//! | Claim | Description |
//! |-------|-------------|
//! | `sub` | Subject - the user's UUID, stringified |
//! | `email` | User's email |
//! | `name` | User's display name |
//! | `preferred_username` | User's email (mirrors `/userinfo`) |
//! | `groups` | The user's AD/SSO group memberships |
//! | `iss` | Issuer - the configured `oauth.issuer` |
//! | `aud` | Audience - the requesting client's `client_id` |
//! | `exp` | Expiration (mirrors the access token's TTL) |
//! | `iat` | Issued at |
//!
//! ## Security Notes
//!
//! - Signed with **HS256** (HMAC-SHA256), a shared-secret MAC rather than an
//!   asymmetric signature — acceptable because the only verifier in this
//!   revision is this same service (via `/userinfo` and local validation);
//!   the discovery document advertises `id_token_signing_alg_values_supported:
//!   ["HS256"]` accordingly.
//! - The secret must be at least 32 characters.
//! - ID tokens are not independently revocable: revoking the access token
//!   they were issued alongside does not invalidate an already-issued ID
//!   token, matching standard OIDC behavior (the ID token is a point-in-time
//!   assertion, not a capability).

use crate::config::OAuthConfig;
use crate::errors::ApiError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ID token claims, mirroring the `/userinfo` response shape plus the
/// standard OIDC envelope fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject - the user's UUID, stringified per OIDC convention.
    pub sub: String,

    /// User's email address.
    pub email: String,

    /// User's display name.
    pub name: String,

    /// User's preferred username (mirrors `email` in this deployment).
    pub preferred_username: String,

    /// The user's AD/SSO group memberships, used by clients for coarse
    /// authorization decisions.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Issuer - the authorization server's issuer URL.
    pub iss: String,

    /// Audience - the `client_id` of the application this token was minted for.
    pub aud: String,

    /// Expiration time as a Unix timestamp.
    pub exp: i64,

    /// Issued-at time as a Unix timestamp.
    pub iat: i64,
}

/// Minimal view of a user needed to mint an ID token.
///
/// Kept separate from the domain `User` entity so this module doesn't need
/// to depend on `oauth-service`'s domain types.
#[derive(Debug, Clone)]
pub struct IdTokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub groups: Vec<String>,
}

/// Signs and verifies ID tokens.
///
/// Created once at startup from [`OAuthConfig`] and shared via `Arc` across
/// the token endpoint and any local verification paths.
#[derive(Clone)]
pub struct IdTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: OAuthConfig,
}

impl IdTokenService {
    /// Creates a new ID token service from OAuth configuration.
    pub fn new(config: OAuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            encoding_key,
            decoding_key,
            config,
        }
    }

    /// Mints an ID token for `subject`, scoped to `client_id`, expiring with
    /// the same lifetime as the access token it is issued alongside.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InternalError` if encoding fails (not expected to
    /// happen with a valid configuration).
    pub fn mint(&self, subject: &IdTokenSubject, client_id: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let ttl = Duration::seconds(self.config.access_token_ttl_seconds);

        let claims = IdTokenClaims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            name: subject.display_name.clone(),
            preferred_username: subject.email.clone(),
            groups: subject.groups.clone(),
            iss: self.config.issuer.clone(),
            aud: client_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            ApiError::InternalError {
                message: format!("failed to mint ID token: {}", e),
            }
        })
    }

    /// Validates and decodes an ID token previously minted by this service,
    /// checking signature, expiration, issuer, and that `aud` matches
    /// `expected_client_id`.
    pub fn validate(
        &self,
        token: &str,
        expected_client_id: &str,
    ) -> Result<IdTokenClaims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[expected_client_id]);

        let token_data: TokenData<IdTokenClaims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::InvalidToken,
            })?;

        Ok(token_data.claims)
    }

    /// Extracts the bearer token from an `Authorization` header value.
    pub fn extract_from_header(auth_header: &str) -> Result<&str, ApiError> {
        auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::InvalidToken)
    }
}

impl std::fmt::Debug for IdTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdTokenService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig {
            secret: "test_secret_key_minimum_32_chars_required".to_string(),
            issuer: "https://hub.example.com".to_string(),
            code_ttl_seconds: 600,
            access_token_ttl_seconds: 3600,
            refresh_token_ttl_seconds: 2_592_000,
            rotate_refresh_tokens: false,
        }
    }

    fn test_subject() -> IdTokenSubject {
        IdTokenSubject {
            user_id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            display_name: "Jane Doe".to_string(),
            groups: vec!["engineering".to_string()],
        }
    }

    #[test]
    fn test_mint_and_validate_round_trip() {
        let service = IdTokenService::new(test_config());
        let subject = test_subject();

        let token = service.mint(&subject, "client-abc").unwrap();
        let claims = service.validate(&token, "client-abc").unwrap();

        assert_eq!(claims.sub, subject.user_id.to_string());
        assert_eq!(claims.email, subject.email);
        assert_eq!(claims.preferred_username, subject.email);
        assert_eq!(claims.aud, "client-abc");
        assert_eq!(claims.groups, vec!["engineering".to_string()]);
    }

    #[test]
    fn test_validate_rejects_wrong_audience() {
        let service = IdTokenService::new(test_config());
        let subject = test_subject();

        let token = service.mint(&subject, "client-abc").unwrap();
        let result = service.validate(&token, "client-other");

        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_extract_from_header_valid() {
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let header = format!("Bearer {}", token);

        let extracted = IdTokenService::extract_from_header(&header).unwrap();
        assert_eq!(extracted, token);
    }

    #[test]
    fn test_extract_from_header_invalid() {
        let result = IdTokenService::extract_from_header("InvalidHeader token");
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }
}
