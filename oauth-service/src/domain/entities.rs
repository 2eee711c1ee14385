//! # Identity Core Domain Entities
//!
//! Core persistent records for the OAuth2/OIDC authorization server. Entities
//! map directly to the nine tables described in the external-interfaces
//! section: `users`, `applications`, `oauth_codes`, `oauth_tokens`,
//! `user_groups`, `user_group_members`, `application_access`, `audit_logs`,
//! `login_history`.
//!
//! ## Entity Overview
//!
//! | Entity               | Table                 | Purpose                               |
//! |-----------------------|------------------------|----------------------------------------|
//! | [`User`]              | `users`               | A person authenticated via upstream SSO |
//! | [`Application`]       | `applications`        | An OAuth relying party (client)         |
//! | [`AuthorizationCode`] | `oauth_codes`         | Single-use code redeemed at the token endpoint |
//! | [`Token`]             | `oauth_tokens`        | Access or refresh token                 |
//! | [`UserGroup`]         | `user_groups`         | A named set of users for fanning out grants |
//! | [`ApplicationAccess`] | `application_access`  | A grant binding a principal to an application |
//! | [`AuditLog`]          | `audit_logs`          | Append-only record of admin mutations   |
//! | [`LoginHistory`]      | `login_history`       | Append-only record of authentication attempts |
//!
//! Users are never hard-deleted while referenced; applications, groups, and
//! grants may be. `User` carries no password — the only credential this core
//! mints for a human is the session cookie issued after SSO callback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// USER
// =============================================================================

/// A person authenticated via the upstream SSO collaborator.
///
/// Created on first successful SSO login (by the callback handler, not by
/// this entity's owning repository) and mutated afterward only through the
/// admin surface — department, job title, `is_active`, `is_admin`. The
/// `is_super_admin` flag is deliberately not mutable through the admin API
/// (§4.9).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique, compared case-insensitively; authoritative claim from SSO.
    pub email: String,
    pub display_name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub middle_name: Option<String>,
    /// Free-form; gates application visibility via `Application.allowed_departments`.
    pub department: Option<String>,
    pub job_title: Option<String>,
    /// Upstream group names, as asserted by the SSO claim at last login.
    pub groups: Vec<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to upsert a user on first (or subsequent) SSO login.
#[derive(Debug, Clone)]
pub struct UpsertUser {
    pub email: String,
    pub display_name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub middle_name: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub groups: Vec<String>,
}

/// Partial update applied by the admin surface. `None` fields are left
/// unchanged. `is_super_admin` has no field here by design (§4.9).
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

// =============================================================================
// APPLICATION (OAuth client)
// =============================================================================

/// A registered relying party.
///
/// `client_secret_hash` is never exposed; the plaintext secret is returned to
/// the admin exactly once, at creation or regeneration, and is not retained
/// anywhere in this entity or its DTOs.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub name: String,
    /// Unique, URL-safe (see `shared::validation::validators::valid_slug`).
    pub slug: String,
    pub client_id: String,
    pub client_secret_hash: String,
    /// Exact-match only; no prefix or wildcard matching at redemption.
    pub redirect_uris: Vec<String>,
    pub is_active: bool,
    /// Bypasses the per-user/group principal gate in the access-decision engine.
    pub is_public: bool,
    /// Empty means no departmental restriction.
    pub allowed_departments: Vec<String>,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub icon_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin-supplied fields for application creation. `client_id` and the
/// secret are generated by the service layer, never accepted from the caller.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub icon_url: Option<String>,
    pub redirect_uris: Vec<String>,
    pub is_public: bool,
    pub allowed_departments: Vec<String>,
}

/// Partial update applied by the admin surface. Secret and `client_id` are
/// never mutated here — regeneration is a distinct operation.
#[derive(Debug, Clone, Default)]
pub struct ApplicationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub icon_url: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    pub allowed_departments: Option<Vec<String>>,
}

// =============================================================================
// AUTHORIZATION CODE
// =============================================================================

/// The S256 PKCE method per RFC 7636.
pub const CODE_CHALLENGE_METHOD_S256: &str = "S256";
/// The plain PKCE method per RFC 7636 (verifier compared directly).
pub const CODE_CHALLENGE_METHOD_PLAIN: &str = "plain";

/// A short-lived, single-use artifact minted by the authorization endpoint
/// and redeemed by the token endpoint.
///
/// Invariants (enforced by [`crate::repository::CodeStore`], not by this
/// struct): redeemable at most once; inert after expiry or consumption.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorizationCode {
    pub code: String,
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    /// `S256` or `plain`; `None` when the client did not request PKCE.
    pub code_challenge_method: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    pub fn is_redeemable(&self) -> bool {
        !self.is_expired() && !self.is_consumed()
    }
}

/// Fields required to mint a new authorization code.
#[derive(Debug, Clone)]
pub struct NewAuthorizationCode {
    pub code: String,
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// TOKEN
// =============================================================================

/// Distinguishes the two opaque-token kinds minted at exchange time. The ID
/// token is not stored here — it is a stateless signed JWT, minted and
/// validated entirely in [`shared::auth::IdTokenService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "access" => Some(Self::Access),
            "refresh" => Some(Self::Refresh),
            _ => None,
        }
    }
}

/// An opaque bearer credential. Access tokens live ≈1h, refresh tokens ≈30d
/// (see `OAuthConfig`). `revoked_at` is monotonic — once set it never clears.
#[derive(Debug, Clone)]
pub struct Token {
    pub token: String,
    pub kind: TokenKind,
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub scopes: Vec<String>,
    /// Whether this token was issued to a public client (no client secret),
    /// i.e. under PKCE. Refresh of such a token does not require a secret.
    pub is_public_client: bool,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn is_live(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

/// Row shape as stored (kind persisted as text, matched against [`TokenKind`]
/// at the repository boundary rather than via a custom sqlx `Type` impl).
#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub token: String,
    pub kind: String,
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub scopes: Vec<String>,
    pub is_public_client: bool,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for Token {
    type Error = String;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let kind = TokenKind::from_str(&row.kind)
            .ok_or_else(|| format!("unrecognized token kind: {}", row.kind))?;
        Ok(Self {
            token: row.token,
            kind,
            user_id: row.user_id,
            application_id: row.application_id,
            scopes: row.scopes,
            is_public_client: row.is_public_client,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        })
    }
}

/// Fields required to mint a new access or refresh token.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub token: String,
    pub kind: TokenKind,
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub scopes: Vec<String>,
    pub is_public_client: bool,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// USER GROUP
// =============================================================================

/// A named set of users, used solely to fan out application-access grants.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserGroup {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserGroupUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// APPLICATION ACCESS (grant)
// =============================================================================

/// A grant row binding exactly one principal (user or group) to an
/// application. Enforced unique per (application, principal) by the
/// repository's conflict handling.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationAccess {
    pub id: Uuid,
    pub application_id: Uuid,
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The principal side of a grant — exactly one of these two shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPrincipal {
    User(Uuid),
    Group(Uuid),
}

// =============================================================================
// AUDIT LOG
// =============================================================================

/// An append-only record of an admin-surface mutation. Written in the same
/// transaction as the mutation it describes (§4.8, invariant 4).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_user_id: Option<Uuid>,
    /// `entity.verb`, e.g. `user.update`, `group.create`, `access.grant`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor_user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Conjunctive filters for the paginated audit-log admin endpoint (§4.8).
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub user_id: Option<Uuid>,
}

// =============================================================================
// LOGIN HISTORY
// =============================================================================

/// Distinguishes how a login was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    /// Full upstream SSO redirect flow.
    Sso,
    /// Local development bypass, if enabled by the deployment.
    Dev,
    /// A session resolved during `/oauth/authorize` (no fresh SSO round-trip).
    OauthAuthorize,
}

impl LoginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sso => "sso",
            Self::Dev => "dev",
            Self::OauthAuthorize => "oauth_authorize",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sso" => Some(Self::Sso),
            "dev" => Some(Self::Dev),
            "oauth_authorize" => Some(Self::OauthAuthorize),
            _ => None,
        }
    }
}

/// An append-only record of an authentication attempt, success or failure
/// (§4.8, invariant 5). `user_id` is `None` on failures where no account
/// could be resolved.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LoginHistory {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub login_type: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLoginHistory {
    pub user_id: Option<Uuid>,
    pub login_type: LoginType,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
}

/// Conjunctive filters for the paginated login-history admin endpoint (§4.8).
#[derive(Debug, Clone, Default)]
pub struct LoginHistoryFilter {
    pub user_id: Option<Uuid>,
    pub login_type: Option<String>,
    pub success: Option<bool>,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// `(page, per_page)` request, descending `created_at`, per §4.8.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Debug, Clone)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_round_trip() {
        assert_eq!(TokenKind::from_str(TokenKind::Access.as_str()), Some(TokenKind::Access));
        assert_eq!(TokenKind::from_str(TokenKind::Refresh.as_str()), Some(TokenKind::Refresh));
        assert_eq!(TokenKind::from_str("bogus"), None);
    }

    #[test]
    fn test_login_type_round_trip() {
        for lt in [LoginType::Sso, LoginType::Dev, LoginType::OauthAuthorize] {
            assert_eq!(LoginType::from_str(lt.as_str()), Some(lt));
        }
    }

    #[test]
    fn test_authorization_code_redeemable() {
        let mut code = AuthorizationCode {
            code: "abc".into(),
            user_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            redirect_uri: "https://c/cb".into(),
            scopes: vec!["openid".into()],
            state: None,
            code_challenge: None,
            code_challenge_method: None,
            expires_at: Utc::now() + chrono::Duration::minutes(10),
            consumed_at: None,
            created_at: Utc::now(),
        };
        assert!(code.is_redeemable());

        code.consumed_at = Some(Utc::now());
        assert!(!code.is_redeemable());

        code.consumed_at = None;
        code.expires_at = Utc::now() - chrono::Duration::minutes(1);
        assert!(!code.is_redeemable());
    }

    #[test]
    fn test_page_offset() {
        let page = Page { page: 1, per_page: 20 };
        assert_eq!(page.offset(), 0);
        let page = Page { page: 3, per_page: 20 };
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn test_token_row_conversion_rejects_unknown_kind() {
        let row = TokenRow {
            token: "t".into(),
            kind: "bogus".into(),
            user_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            scopes: vec![],
            is_public_client: false,
            expires_at: Utc::now(),
            revoked_at: None,
            created_at: Utc::now(),
        };
        assert!(Token::try_from(row).is_err());
    }
}
