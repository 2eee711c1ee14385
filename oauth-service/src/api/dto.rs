//! # Data Transfer Objects (DTOs)
//!
//! DTOs define the structure of data transferred between client and server.
//! They serve as the **API contract** and handle:
//!
//! - **Request validation**: Using the `validator` crate
//! - **Deserialization**: JSON/query-string → Rust structs via `serde`
//! - **Serialization**: Rust structs → JSON for responses
//!
//! ## DTO Categories
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              DTOs                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  OAuth/OIDC (RFC 6749/7636/7009, OIDC Discovery)                        │
//! │  ───────────────────────────────────────────────                       │
//! │  - AuthorizeQuery / TokenRequestForm / RevokeRequestForm                │
//! │  - TokenResponseDto / OidcUserInfoDto / DiscoveryDocumentDto            │
//! │                                                                         │
//! │  Admin CRUD (§4.9): Applications, Users, Groups, Access, Stats          │
//! │  ───────────────────────────────────────────────────────────           │
//! │  - CreateApplicationRequest / UpdateApplicationRequest / ...            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## JSON Naming Convention
//!
//! Admin DTOs use `camelCase` for JSON serialization, matching the frontend
//! convention. OAuth/OIDC DTOs use the wire field names fixed by their RFCs
//! (`snake_case`: `client_id`, `redirect_uri`, `code_verifier`, ...) — these
//! are never renamed, since interoperability depends on the literal names.
//!
//! ## Related Documentation
//!
//! - Validation module: [`shared::validation`]
//! - API handlers: [`super::handlers`]

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::{
    AccessPrincipal, Application, ApplicationAccess, AuditLog, LoginHistory, Page, PagedResult,
    User, UserGroup,
};
use crate::repository::group_repository::GroupWithMemberCount;
use crate::service::{AdminStats, ApplicationWithSecret, DiscoveryDocument, IssuedTokenSet, UserInfoResponse};

// =============================================================================
// /oauth/authorize (GET query params)
// =============================================================================

/// Query parameters for `GET /oauth/authorize`. Field names are fixed by
/// RFC 6749 §4.1.1 and RFC 7636 §4.3 — never renamed.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeQuery {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

// =============================================================================
// /oauth/token (POST form)
// =============================================================================

/// Body of `POST /oauth/token`, `application/x-www-form-urlencoded` per
/// RFC 6749 §4.1.3/§6. Fields not relevant to `grant_type` are simply absent.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequestForm {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// RFC 6749 §5.1 token response. `id_token` is the OIDC extension; always
/// present since every grant here mints one.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponseDto {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub id_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
}

impl From<IssuedTokenSet> for TokenResponseDto {
    fn from(tokens: IssuedTokenSet) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            scope: tokens.scope,
        }
    }
}

// =============================================================================
// /oauth/revoke (POST form, RFC 7009)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequestForm {
    pub token: String,
    pub client_id: String,
    pub client_secret: Option<String>,
}

// =============================================================================
// /oauth/userinfo, /.well-known/openid-configuration
// =============================================================================

/// Mirrors [`UserInfoResponse`] field-for-field; kept as a distinct type so
/// the wire shape of `/oauth/userinfo` can evolve independently of the
/// service-layer return type.
#[derive(Debug, Clone, Serialize)]
pub struct OidcUserInfoDto {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub preferred_username: String,
    pub groups: Vec<String>,
}

impl From<UserInfoResponse> for OidcUserInfoDto {
    fn from(info: UserInfoResponse) -> Self {
        Self {
            sub: info.sub,
            email: info.email,
            name: info.name,
            preferred_username: info.preferred_username,
            groups: info.groups,
        }
    }
}

/// `/.well-known/openid-configuration` wire shape (OIDC Discovery 1.0 field
/// names — `snake_case`, never renamed).
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryDocumentDto {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub revocation_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    pub response_types_supported: Vec<&'static str>,
    pub subject_types_supported: Vec<&'static str>,
    pub id_token_signing_alg_values_supported: Vec<&'static str>,
    pub scopes_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
    pub code_challenge_methods_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
}

impl From<DiscoveryDocument> for DiscoveryDocumentDto {
    fn from(doc: DiscoveryDocument) -> Self {
        Self {
            issuer: doc.issuer,
            authorization_endpoint: doc.authorization_endpoint,
            token_endpoint: doc.token_endpoint,
            userinfo_endpoint: doc.userinfo_endpoint,
            revocation_endpoint: doc.revocation_endpoint,
            jwks_uri: doc.jwks_uri,
            response_types_supported: doc.response_types_supported,
            subject_types_supported: doc.subject_types_supported,
            id_token_signing_alg_values_supported: doc.id_token_signing_alg_values_supported,
            scopes_supported: doc.scopes_supported,
            token_endpoint_auth_methods_supported: doc.token_endpoint_auth_methods_supported,
            code_challenge_methods_supported: doc.code_challenge_methods_supported,
            grant_types_supported: doc.grant_types_supported,
        }
    }
}

// =============================================================================
// Pagination (shared across admin listings)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<PageQuery> for Page {
    fn from(q: PageQuery) -> Self {
        let default = Page::default();
        Page {
            page: q.page.unwrap_or(default.page),
            per_page: q.per_page.unwrap_or(default.per_page),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T: Serialize, U: Into<T>> From<PagedResult<U>> for PagedResponse<T> {
    fn from(result: PagedResult<U>) -> Self {
        Self {
            items: result.items.into_iter().map(Into::into).collect(),
            total: result.total,
            page: result.page,
            per_page: result.per_page,
        }
    }
}

// =============================================================================
// Applications (§4.9)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub client_id: String,
    pub redirect_uris: Vec<String>,
    pub is_active: bool,
    pub is_public: bool,
    pub allowed_departments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Application> for ApplicationDto {
    fn from(app: Application) -> Self {
        Self {
            id: app.id,
            name: app.name,
            slug: app.slug,
            client_id: app.client_id,
            redirect_uris: app.redirect_uris,
            is_active: app.is_active,
            is_public: app.is_public,
            allowed_departments: app.allowed_departments,
            description: app.description,
            base_url: app.base_url,
            icon_url: app.icon_url,
            created_at: app.created_at.to_rfc3339(),
            updated_at: app.updated_at.to_rfc3339(),
        }
    }
}

/// Response to create/regenerate-secret — the only two calls that ever
/// expose the plaintext `client_secret`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWithSecretDto {
    #[serde(flatten)]
    pub application: ApplicationDto,
    pub client_secret: String,
}

impl From<ApplicationWithSecret> for ApplicationWithSecretDto {
    fn from(with_secret: ApplicationWithSecret) -> Self {
        Self {
            application: with_secret.application.into(),
            client_secret: with_secret.client_secret,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Slug must be 1-100 characters"))]
    pub slug: String,
    pub description: Option<String>,
    pub base_url: Option<String>,
    pub icon_url: Option<String>,
    #[validate(length(min = 1, message = "At least one redirect_uri is required"))]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub allowed_departments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
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
// Users (§4.9)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    pub groups: Vec<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_super_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            department: user.department,
            job_title: user.job_title,
            groups: user.groups,
            is_active: user.is_active,
            is_admin: user.is_admin,
            is_super_admin: user.is_super_admin,
            last_login_at: user.last_login_at.map(|dt| dt.to_rfc3339()),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub department: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkSetActiveRequest {
    #[validate(length(min = 1, message = "At least one user id is required"))]
    pub user_ids: Vec<Uuid>,
    pub is_active: bool,
}

// =============================================================================
// Groups (§4.9)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub member_count: i64,
    pub created_at: String,
}

impl From<GroupWithMemberCount> for GroupDto {
    fn from(g: GroupWithMemberCount) -> Self {
        Self {
            id: g.group.id,
            name: g.group.name,
            color: g.group.color,
            description: g.group.description,
            member_count: g.member_count,
            created_at: g.group.created_at.to_rfc3339(),
        }
    }
}

impl From<UserGroup> for GroupDto {
    fn from(g: UserGroup) -> Self {
        Self {
            id: g.id,
            name: g.name,
            color: g.color,
            description: g.description,
            member_count: 0,
            created_at: g.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "Color must be 1-20 characters"))]
    pub color: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberRequest {
    pub user_id: Uuid,
}

// =============================================================================
// Access grants (§4.9)
// =============================================================================

/// A grant principal as it crosses the wire: exactly one of `user_id` /
/// `group_id` is present, enforced by [`AccessGrantRequest::principal`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrantRequest {
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

impl AccessGrantRequest {
    pub fn principal(&self) -> Result<AccessPrincipal, &'static str> {
        match (self.user_id, self.group_id) {
            (Some(user_id), None) => Ok(AccessPrincipal::User(user_id)),
            (None, Some(group_id)) => Ok(AccessPrincipal::Group(group_id)),
            _ => Err("exactly one of userId or groupId is required"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationAccessDto {
    pub id: Uuid,
    pub application_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    pub created_at: String,
}

impl From<ApplicationAccess> for ApplicationAccessDto {
    fn from(grant: ApplicationAccess) -> Self {
        Self {
            id: grant.id,
            application_id: grant.application_id,
            user_id: grant.user_id,
            group_id: grant.group_id,
            created_at: grant.created_at.to_rfc3339(),
        }
    }
}

// =============================================================================
// Stats (§4.9, read-only)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsDto {
    pub total_users: i64,
    pub active_users: i64,
    pub total_applications: i64,
    pub active_applications: i64,
    pub total_groups: i64,
}

impl From<AdminStats> for AdminStatsDto {
    fn from(stats: AdminStats) -> Self {
        Self {
            total_users: stats.total_users,
            active_users: stats.active_users,
            total_applications: stats.total_applications,
            active_applications: stats.active_applications,
            total_groups: stats.total_groups,
        }
    }
}

// =============================================================================
// Applications visible to the current user (non-admin listing)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleApplicationDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl From<Application> for VisibleApplicationDto {
    fn from(app: Application) -> Self {
        Self {
            id: app.id,
            name: app.name,
            slug: app.slug,
            description: app.description,
            base_url: app.base_url,
            icon_url: app.icon_url,
        }
    }
}

// =============================================================================
// SSO collaborator contract (§6)
// =============================================================================

/// Query parameters for `GET /auth/sso/login`. `redirect_to` carries the
/// original `/oauth/authorize` query string, replayed verbatim once the
/// upstream round-trip completes.
#[derive(Debug, Clone, Deserialize)]
pub struct SsoLoginQuery {
    pub redirect_to: Option<String>,
}

/// Body of `POST /auth/sso/callback`. The upstream collaborator has already
/// completed first-factor authentication and validated its own ID token by
/// the time it calls back here; this core trusts the claims it's handed and
/// only performs the upsert, per the contract in `shared::auth::session`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SsoCallbackRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    pub display_name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub middle_name: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    pub redirect_to: Option<String>,
}

/// Response to a successful SSO callback: the session credential the caller
/// (the collaborator's own front channel) should set as the `hub_session`
/// cookie, plus where to send the browser next.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoCallbackResponse {
    pub session_token: String,
    pub redirect_to: String,
}

// =============================================================================
// Audit log / login history (§4.8, admin read-only listings)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogDto {
    pub id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<AuditLog> for AuditLogDto {
    fn from(log: AuditLog) -> Self {
        Self {
            id: log.id,
            actor_user_id: log.actor_user_id,
            action: log.action,
            entity_type: log.entity_type,
            entity_id: log.entity_id,
            old_values: log.old_values,
            new_values: log.new_values,
            ip_address: log.ip_address,
            user_agent: log.user_agent,
            created_at: log.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistoryQuery {
    pub user_id: Option<Uuid>,
    pub login_type: Option<String>,
    pub success: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistoryDto {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub login_type: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub created_at: String,
}

impl From<LoginHistory> for LoginHistoryDto {
    fn from(entry: LoginHistory) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            login_type: entry.login_type,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            success: entry.success,
            failure_reason: entry.failure_reason,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

// =============================================================================
// Generic responses
// =============================================================================

/// Generic message response for simple confirmations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_create_application_request_requires_redirect_uri() {
        let request = CreateApplicationRequest {
            name: "Sample".to_string(),
            slug: "sample".to_string(),
            description: None,
            base_url: None,
            icon_url: None,
            redirect_uris: vec![],
            is_public: false,
            allowed_departments: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_access_grant_request_rejects_both_principals() {
        let request = AccessGrantRequest { user_id: Some(Uuid::new_v4()), group_id: Some(Uuid::new_v4()) };
        assert!(request.principal().is_err());
    }

    #[test]
    fn test_access_grant_request_rejects_neither_principal() {
        let request = AccessGrantRequest { user_id: None, group_id: None };
        assert!(request.principal().is_err());
    }

    #[test]
    fn test_access_grant_request_accepts_user_principal() {
        let user_id = Uuid::new_v4();
        let request = AccessGrantRequest { user_id: Some(user_id), group_id: None };
        assert_eq!(request.principal().unwrap(), AccessPrincipal::User(user_id));
    }

    #[test]
    fn test_page_query_defaults_match_domain_default() {
        let page: Page = PageQuery { page: None, per_page: None }.into();
        let default = Page::default();
        assert_eq!(page.page, default.page);
        assert_eq!(page.per_page, default.per_page);
    }

    #[test]
    fn test_message_response_new() {
        let response = MessageResponse::new("Test message");
        assert_eq!(response.message, "Test message");
    }
}
