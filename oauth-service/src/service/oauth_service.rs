//! # OAuth Authorization/Token Service (C3/C4)
//!
//! The authorize and token-exchange state machine. `AuthorizeRequest`/
//! `TokenRequest` are plain structs rather than Actix extractors so the
//! six-step authorize algorithm and the two token-grant branches can be unit
//! tested against the in-memory mocks in `repository::code_store` and
//! `repository::token_store` without standing up an HTTP server.
//!
//! ## Public vs. Confidential Clients
//!
//! `Application.is_public` does double duty, matching how the upstream
//! collaborator's client registry models it: a public client (SPA or native
//! app) cannot keep a secret, so it authenticates with PKCE alone and is
//! also, by the same token, exempt from the access-decision engine's
//! principal gate (see `service::access_service`) — there's no
//! per-installation identity to grant against. A confidential client always
//! presents its `client_secret` and is always subject to the principal gate
//! unless explicitly granted to everyone.

use crate::domain::entities::{
    Application, AuthorizationCode, LoginType, NewAuthorizationCode, NewLoginHistory, NewToken,
    Token, TokenKind, User, CODE_CHALLENGE_METHOD_PLAIN, CODE_CHALLENGE_METHOD_S256,
};
use crate::repository::{ClientStore, CodeStore, LoginHistoryRepository, TokenStore, UserRepository};
use crate::service::access_service::AccessService;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use shared::auth::{ClientSecretHasher, IdTokenService, IdTokenSubject};
use shared::config::OAuthConfig;
use shared::errors::{ApiError, ApiResult, OAuthErrorCode};
use std::sync::Arc;
use uuid::Uuid;

const AUTHORIZATION_CODE_LENGTH: usize = 32;
const OPAQUE_TOKEN_LENGTH: usize = 48;
const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn generate_opaque_value(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char).collect()
}

/// Who is asking: resolved from the session, not yet validated against the
/// application being authorized.
#[derive(Debug, Clone)]
pub struct RequestingUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// Outcome of an authorize call. Both variants are redirects; the caller's
/// job is to turn either into an HTTP 302.
#[derive(Debug, Clone)]
pub enum AuthorizeOutcome {
    /// No live session. Send the browser to the SSO login route, which will
    /// redirect back here (preserving every query parameter) once it mints one.
    NeedsLogin { login_redirect_to: String },
    /// Terminal redirect back to the client, success or error, already
    /// carrying `code`/`state` or `error`/`error_description`/`state`.
    Redirect { url: String },
}

#[derive(Debug, Clone)]
pub enum TokenRequest {
    AuthorizationCode {
        code: String,
        redirect_uri: String,
        client_id: String,
        client_secret: Option<String>,
        code_verifier: Option<String>,
    },
    RefreshToken {
        refresh_token: String,
        client_id: String,
        client_secret: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct IssuedTokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
}

#[derive(Clone)]
pub struct OAuthService {
    client_store: Arc<dyn ClientStore>,
    code_store: Arc<dyn CodeStore>,
    token_store: Arc<dyn TokenStore>,
    user_repository: UserRepository,
    id_token_service: IdTokenService,
    secret_hasher: ClientSecretHasher,
    access_service: AccessService,
    login_history: LoginHistoryRepository,
    config: OAuthConfig,
}

impl OAuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_store: Arc<dyn ClientStore>,
        code_store: Arc<dyn CodeStore>,
        token_store: Arc<dyn TokenStore>,
        user_repository: UserRepository,
        id_token_service: IdTokenService,
        secret_hasher: ClientSecretHasher,
        access_service: AccessService,
        login_history: LoginHistoryRepository,
        config: OAuthConfig,
    ) -> Self {
        Self {
            client_store,
            code_store,
            token_store,
            user_repository,
            id_token_service,
            secret_hasher,
            access_service,
            login_history,
            config,
        }
    }

    // =========================================================================
    // /oauth/authorize (C3)
    // =========================================================================

    /// The six-step authorize algorithm:
    /// 1. resolve and validate the client
    /// 2. validate `redirect_uri` is exactly registered (only after this does
    ///    any subsequent failure get to redirect back to the client)
    /// 3. validate `response_type`
    /// 4. validate the PKCE parameters' shape
    /// 5. resolve the session, or bounce to SSO login
    /// 6. the access-decision engine's active + principal gate, then mint
    ///    the code and redirect
    pub async fn authorize(
        &self,
        request: AuthorizeRequest,
        user: Option<RequestingUser>,
        original_query: &str,
    ) -> ApiResult<AuthorizeOutcome> {
        // Redirects the caller-supplied (not yet validated-as-registered)
        // redirect_uri back with `error`/`error_description`/`state`. Used
        // from client resolution onward, per SPEC_FULL.md §4.3 step 3: only
        // the redirect_uri-registration check itself (step 2) has no URI
        // left that's safe to redirect to, so it alone is a flat 400.
        let redirect_err = |code: OAuthErrorCode, description: &str| -> ApiResult<AuthorizeOutcome> {
            Ok(AuthorizeOutcome::Redirect {
                url: shared::errors::build_oauth_redirect_error_url(
                    &request.redirect_uri,
                    code,
                    Some(description),
                    request.state.as_deref(),
                ),
            })
        };

        // Step 1: resolve the client. An unknown or inactive client still
        // redirects back to the caller's redirect_uri with `invalid_client`
        // rather than a flat 400.
        let application = match self
            .client_store
            .find_by_client_id(&request.client_id)
            .await?
            .filter(|app| app.is_active)
        {
            Some(application) => application,
            None => {
                return redirect_err(OAuthErrorCode::InvalidClient, "unknown or inactive client");
            }
        };

        // Step 2: the redirect_uri must match a registered URI exactly
        // (invariant: no prefix/wildcard matching). Still a flat 400 — we
        // cannot redirect to a URI we haven't validated.
        if !application.redirect_uris.iter().any(|uri| uri == &request.redirect_uri) {
            return Err(ApiError::OAuth {
                code: OAuthErrorCode::InvalidRequest,
                description: Some("redirect_uri is not registered for this client".to_string()),
                state: None,
            });
        }

        // Step 3: response_type.
        if request.response_type != "code" {
            return redirect_err(
                OAuthErrorCode::UnsupportedResponseType,
                "only the authorization code response type is supported",
            );
        }

        // Step 4: PKCE shape. Public clients must present a challenge;
        // confidential clients may optionally use one.
        match request.code_challenge_method.as_deref() {
            Some(CODE_CHALLENGE_METHOD_S256) | Some(CODE_CHALLENGE_METHOD_PLAIN) => {
                if request.code_challenge.is_none() {
                    return redirect_err(OAuthErrorCode::InvalidRequest, "code_challenge is required");
                }
            }
            Some(_) => {
                return redirect_err(OAuthErrorCode::InvalidRequest, "unsupported code_challenge_method");
            }
            None => {
                if application.is_public {
                    return redirect_err(
                        OAuthErrorCode::InvalidRequest,
                        "PKCE is required for public clients",
                    );
                }
            }
        }

        // Step 5: session resolution.
        let user = match user {
            Some(user) => user,
            None => {
                let login_redirect_to = format!("/oauth/authorize?{}", original_query);
                return Ok(AuthorizeOutcome::NeedsLogin { login_redirect_to });
            }
        };

        // Step 6: active + principal gate (department gate is list-only, not
        // checked here — see `service::access_service`).
        if !self.access_service.can_authorize(&application, user.user_id, user.is_admin).await? {
            self.login_history
                .record(NewLoginHistory {
                    user_id: Some(user.user_id),
                    login_type: LoginType::OauthAuthorize,
                    ip_address: None,
                    user_agent: None,
                    success: false,
                    failure_reason: Some("access_denied".to_string()),
                })
                .await?;
            return redirect_err(OAuthErrorCode::AccessDenied, "not authorized for this application");
        }

        self.login_history
            .record(NewLoginHistory {
                user_id: Some(user.user_id),
                login_type: LoginType::OauthAuthorize,
                ip_address: None,
                user_agent: None,
                success: true,
                failure_reason: None,
            })
            .await?;

        let scopes: Vec<String> = request
            .scope
            .as_deref()
            .unwrap_or("openid")
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let code = generate_opaque_value(AUTHORIZATION_CODE_LENGTH);
        self.code_store
            .create(NewAuthorizationCode {
                code: code.clone(),
                user_id: user.user_id,
                application_id: application.id,
                redirect_uri: request.redirect_uri.clone(),
                scopes,
                state: request.state.clone(),
                code_challenge: request.code_challenge.clone(),
                code_challenge_method: request.code_challenge_method.clone(),
                expires_at: Utc::now() + Duration::seconds(self.config.code_ttl_seconds),
            })
            .await?;

        let mut url = url::Url::parse(&request.redirect_uri)
            .map_err(|e| ApiError::InternalError { message: format!("invalid redirect_uri: {}", e) })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &code);
            if let Some(state) = &request.state {
                pairs.append_pair("state", state);
            }
        }

        Ok(AuthorizeOutcome::Redirect { url: url.to_string() })
    }

    // =========================================================================
    // /oauth/token (C4)
    // =========================================================================

    pub async fn exchange_token(&self, request: TokenRequest) -> ApiResult<IssuedTokenSet> {
        match request {
            TokenRequest::AuthorizationCode {
                code,
                redirect_uri,
                client_id,
                client_secret,
                code_verifier,
            } => {
                self.exchange_authorization_code(code, redirect_uri, client_id, client_secret, code_verifier)
                    .await
            }
            TokenRequest::RefreshToken { refresh_token, client_id, client_secret } => {
                self.exchange_refresh_token(refresh_token, client_id, client_secret).await
            }
        }
    }

    async fn exchange_authorization_code(
        &self,
        code: String,
        redirect_uri: String,
        client_id: String,
        client_secret: Option<String>,
        code_verifier: Option<String>,
    ) -> ApiResult<IssuedTokenSet> {
        let application = self.authenticate_client(&client_id, client_secret.as_deref()).await?;

        // Read-only lookup first: a failed PKCE or redirect_uri check must
        // not burn the code (see `repository::code_store` module docs).
        let stored = self.code_store.find(&code).await?.ok_or_else(ApiError::invalid_grant)?;

        if !stored.is_redeemable() || stored.application_id != application.id {
            return Err(ApiError::invalid_grant());
        }
        if stored.redirect_uri != redirect_uri {
            return Err(ApiError::invalid_grant());
        }
        self.verify_pkce(&stored, code_verifier.as_deref())?;

        // Only now, with every check passed, attempt the atomic consumption.
        if !self.code_store.consume(&code).await? {
            return Err(ApiError::invalid_grant());
        }

        self.issue_tokens(&application, stored.user_id, stored.scopes).await
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: String,
        client_id: String,
        client_secret: Option<String>,
    ) -> ApiResult<IssuedTokenSet> {
        let application = self.authenticate_client(&client_id, client_secret.as_deref()).await?;

        let stored: Token = self
            .token_store
            .find(&refresh_token, TokenKind::Refresh)
            .await?
            .filter(|t| t.is_live() && t.application_id == application.id)
            .ok_or_else(ApiError::invalid_grant)?;

        if self.config.rotate_refresh_tokens {
            self.token_store.revoke(&refresh_token, application.id).await?;
        }

        let mut issued = self.issue_tokens(&application, stored.user_id, stored.scopes).await?;
        if !self.config.rotate_refresh_tokens {
            issued.refresh_token = None;
        }
        Ok(issued)
    }

    /// Mints the access/refresh/ID token triple for `user_id` at
    /// `application`. Looks the user profile up directly (rather than
    /// requiring every caller to pass it in) since both token-grant branches
    /// only ever have a bare `user_id` in hand at this point.
    async fn issue_tokens(
        &self,
        application: &Application,
        user_id: Uuid,
        scopes: Vec<String>,
    ) -> ApiResult<IssuedTokenSet> {
        let user: User = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(ApiError::invalid_grant)?;
        if !user.is_active {
            return Err(ApiError::invalid_grant());
        }

        let now = Utc::now();

        let access_token = generate_opaque_value(OPAQUE_TOKEN_LENGTH);
        self.token_store
            .create(NewToken {
                token: access_token.clone(),
                kind: TokenKind::Access,
                user_id,
                application_id: application.id,
                scopes: scopes.clone(),
                is_public_client: application.is_public,
                expires_at: now + Duration::seconds(self.config.access_token_ttl_seconds),
            })
            .await?;

        let refresh_token = generate_opaque_value(OPAQUE_TOKEN_LENGTH);
        self.token_store
            .create(NewToken {
                token: refresh_token.clone(),
                kind: TokenKind::Refresh,
                user_id,
                application_id: application.id,
                scopes: scopes.clone(),
                is_public_client: application.is_public,
                expires_at: now + Duration::seconds(self.config.refresh_token_ttl_seconds),
            })
            .await?;

        let id_token = self.id_token_service.mint(
            &IdTokenSubject {
                user_id: user.id,
                email: user.email,
                display_name: user.display_name,
                groups: user.groups,
            },
            &application.client_id,
        )?;

        Ok(IssuedTokenSet {
            access_token,
            refresh_token: Some(refresh_token),
            id_token,
            token_type: "Bearer",
            expires_in: self.config.access_token_ttl_seconds,
            scope: scopes.join(" "),
        })
    }

    // =========================================================================
    // /oauth/revoke
    // =========================================================================

    /// Per RFC 7009 §2.2: always reports success, even if the token was
    /// already revoked, expired, or never existed, so a client can't use the
    /// response to enumerate valid tokens. Client authentication must still
    /// succeed first.
    pub async fn revoke(
        &self,
        token: String,
        client_id: String,
        client_secret: Option<String>,
    ) -> ApiResult<()> {
        let application = self.authenticate_client(&client_id, client_secret.as_deref()).await?;
        // Scoped to the authenticated client's own application_id so one
        // client can never revoke a token belonging to another — the
        // caller only proved ownership of `client_id`, never of `token`.
        self.token_store.revoke(&token, application.id).await?;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn authenticate_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> ApiResult<Application> {
        let invalid_client = || ApiError::OAuth {
            code: OAuthErrorCode::InvalidClient,
            description: None,
            state: None,
        };

        let application = self
            .client_store
            .find_by_client_id(client_id)
            .await?
            .filter(|app| app.is_active)
            .ok_or_else(invalid_client)?;

        if !application.is_public {
            let secret = client_secret.ok_or_else(invalid_client)?;
            if !self.secret_hasher.verify(secret, &application.client_secret_hash)? {
                return Err(invalid_client());
            }
        }

        Ok(application)
    }

    /// Verifies RFC 7636 PKCE: `base64url_no_pad(sha256(code_verifier)) ==
    /// code_challenge` for S256, or a direct string match for `plain`. A
    /// code minted without PKCE requires no verifier.
    fn verify_pkce(&self, code: &AuthorizationCode, verifier: Option<&str>) -> ApiResult<()> {
        match (&code.code_challenge, &code.code_challenge_method) {
            (Some(challenge), Some(method)) => {
                let verifier = verifier.ok_or_else(ApiError::invalid_grant)?;
                let computed = match method.as_str() {
                    CODE_CHALLENGE_METHOD_S256 => {
                        let digest = Sha256::digest(verifier.as_bytes());
                        URL_SAFE_NO_PAD.encode(digest)
                    }
                    CODE_CHALLENGE_METHOD_PLAIN => verifier.to_string(),
                    _ => return Err(ApiError::invalid_grant()),
                };
                if &computed != challenge {
                    return Err(ApiError::invalid_grant());
                }
                Ok(())
            }
            (None, None) => Ok(()),
            _ => Err(ApiError::invalid_grant()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exact RFC 7636 Appendix B test vector.
    const TEST_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const TEST_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_pkce_s256_accepts_correct_verifier() {
        let digest = Sha256::digest(TEST_VERIFIER.as_bytes());
        let computed = URL_SAFE_NO_PAD.encode(digest);
        assert_eq!(computed, TEST_CHALLENGE);
    }

    #[test]
    fn test_pkce_s256_rejects_wrong_verifier() {
        let digest = Sha256::digest(b"not-the-right-verifier");
        let computed = URL_SAFE_NO_PAD.encode(digest);
        assert_ne!(computed, TEST_CHALLENGE);
    }

    #[test]
    fn test_generate_opaque_value_is_unique_and_sized() {
        let a = generate_opaque_value(OPAQUE_TOKEN_LENGTH);
        let b = generate_opaque_value(OPAQUE_TOKEN_LENGTH);
        assert_eq!(a.len(), OPAQUE_TOKEN_LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn test_s256_constant_matches_rfc_name() {
        assert_eq!(CODE_CHALLENGE_METHOD_S256, "S256");
    }
}
