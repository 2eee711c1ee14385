//! # UserInfo & Discovery Service (C5)
//!
//! Backs `/oauth/userinfo` (resolves a live access token to the OIDC claims
//! set) and `/.well-known/openid-configuration` (the static discovery
//! document clients use to learn this server's endpoint URLs and supported
//! capabilities).

use crate::domain::entities::TokenKind;
use crate::repository::{TokenStore, UserRepository};
use serde::Serialize;
use shared::config::OAuthConfig;
use shared::errors::{ApiError, ApiResult};
use std::sync::Arc;

/// The OIDC `/userinfo` response shape: a subset of [`IdTokenClaims`] minus
/// the envelope fields (`iss`/`aud`/`exp`/`iat`), which belong to the ID
/// token, not this endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfoResponse {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub preferred_username: String,
    pub groups: Vec<String>,
}

/// `/.well-known/openid-configuration`. Field names are fixed by the OIDC
/// Discovery 1.0 spec.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub revocation_endpoint: String,
    pub jwks_uri: Option<String>,
    pub response_types_supported: Vec<&'static str>,
    pub subject_types_supported: Vec<&'static str>,
    pub id_token_signing_alg_values_supported: Vec<&'static str>,
    pub scopes_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
    pub code_challenge_methods_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
}

#[derive(Clone)]
pub struct UserInfoService {
    token_store: Arc<dyn TokenStore>,
    user_repository: UserRepository,
    config: OAuthConfig,
}

impl UserInfoService {
    pub fn new(token_store: Arc<dyn TokenStore>, user_repository: UserRepository, config: OAuthConfig) -> Self {
        Self { token_store, user_repository, config }
    }

    /// Resolves a bearer access token to its subject's claims. Returns
    /// `ApiError::InvalidToken` uniformly for "doesn't exist", "expired",
    /// "revoked", and "user deactivated since issuance" — distinguishing
    /// them would let a caller probe for which tokens once existed.
    pub async fn userinfo(&self, access_token: &str) -> ApiResult<UserInfoResponse> {
        let token = self
            .token_store
            .find(access_token, TokenKind::Access)
            .await?
            .filter(|t| t.is_live())
            .ok_or(ApiError::InvalidToken)?;

        let user = self
            .user_repository
            .find_by_id(token.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(ApiError::InvalidToken)?;

        Ok(UserInfoResponse {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            preferred_username: user.email,
            groups: user.groups,
        })
    }

    /// Builds the discovery document from the configured issuer. No
    /// database access — purely a function of `OAuthConfig`.
    pub fn discovery_document(&self) -> DiscoveryDocument {
        build_discovery_document(&self.config)
    }
}

/// Free function so the discovery document's shape can be unit tested
/// without constructing a full [`UserInfoService`] (which otherwise needs a
/// live database handle for its stores).
fn build_discovery_document(config: &OAuthConfig) -> DiscoveryDocument {
    let issuer = config.issuer.trim_end_matches('/');
    DiscoveryDocument {
        issuer: issuer.to_string(),
        authorization_endpoint: format!("{}/oauth/authorize", issuer),
        token_endpoint: format!("{}/oauth/token", issuer),
        userinfo_endpoint: format!("{}/oauth/userinfo", issuer),
        revocation_endpoint: format!("{}/oauth/revoke", issuer),
        jwks_uri: None,
        response_types_supported: vec!["code"],
        subject_types_supported: vec!["public"],
        id_token_signing_alg_values_supported: vec!["HS256"],
        scopes_supported: vec!["openid", "profile", "email"],
        token_endpoint_auth_methods_supported: vec![
            "client_secret_post",
            "client_secret_basic",
            "none",
        ],
        code_challenge_methods_supported: vec!["S256", "plain"],
        grant_types_supported: vec!["authorization_code", "refresh_token"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig {
            secret: "test_secret_key_minimum_32_chars_required".to_string(),
            issuer: "https://hub.example.com/".to_string(),
            code_ttl_seconds: 600,
            access_token_ttl_seconds: 3600,
            refresh_token_ttl_seconds: 2_592_000,
            rotate_refresh_tokens: false,
        }
    }

    #[test]
    fn test_discovery_document_strips_trailing_slash_from_issuer() {
        let doc = build_discovery_document(&test_config());
        assert_eq!(doc.issuer, "https://hub.example.com");
        assert_eq!(doc.authorization_endpoint, "https://hub.example.com/oauth/authorize");
    }

    #[test]
    fn test_discovery_document_advertises_both_pkce_methods() {
        let doc = build_discovery_document(&test_config());
        assert!(doc.code_challenge_methods_supported.contains(&"S256"));
        assert!(doc.code_challenge_methods_supported.contains(&"plain"));
    }
}
