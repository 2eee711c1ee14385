//! # Request Handlers
//!
//! HTTP request handlers that bridge the API layer with the service layer.
//! Each handler follows this pattern:
//!
//! 1. **Extract** request data using Actix extractors
//! 2. **Validate** input using the `validator` crate
//! 3. **Call** service layer methods
//! 4. **Transform** and return HTTP response
//!
//! ## Error Handling
//!
//! Admin and OIDC-side-channel handlers return `Result<HttpResponse, ApiError>`,
//! which renders the generic `{code, message, ...}` envelope. The three OAuth
//! runtime endpoints (`/oauth/token`, `/oauth/revoke`, `/oauth/userinfo`) rely
//! on `ApiError::OAuth` rendering the RFC 6749 `{error, error_description?,
//! state?}` envelope instead — see `shared::errors`. `/oauth/authorize` is the
//! one endpoint that never returns an `ApiError` to the client on a request
//! that named a valid, registered `redirect_uri`: failures past that point are
//! folded into a 302 redirect built by the service layer itself.
//!
//! ## Authentication
//!
//! Session resolution happens once, in `shared::auth::session::SessionAuthenticator`
//! middleware, before any handler runs. Handlers pull the result back out via
//! the `AuthenticatedUser` (must be logged in) or `MaybeAuthenticatedUser`
//! (session optional) extractors — never by re-reading the cookie or header
//! themselves.
//!
//! ## Related Documentation
//!
//! - DTOs: [`super::dto`]
//! - Routes: [`super::routes`]
//! - Service: [`crate::service`]
//! - Errors: [`shared::errors::ApiError`]

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use shared::auth::session::{AuthenticatedUser, MaybeAuthenticatedUser, SESSION_COOKIE_NAME};
use shared::errors::ApiError;
use shared::validation;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::{AuditLogFilter, LoginHistoryFilter, LoginType, UpsertUser};
use crate::repository::user_repository::UserFilter as RepoUserFilter;
use crate::service::oauth_service::{AuthorizeOutcome, AuthorizeRequest, RequestingUser, TokenRequest};
use crate::AppState;

use super::dto::{
    AccessGrantRequest, AdminStatsDto, ApplicationAccessDto, ApplicationDto,
    ApplicationWithSecretDto, AuditLogDto, AuditLogQuery, AuthorizeQuery, BulkSetActiveRequest,
    CreateApplicationRequest, CreateGroupRequest, DiscoveryDocumentDto, GroupDto,
    GroupMemberRequest, HealthResponse, LoginHistoryDto, LoginHistoryQuery, MessageResponse,
    OidcUserInfoDto, PageQuery, PagedResponse, RevokeRequestForm, SsoCallbackRequest,
    SsoCallbackResponse, SsoLoginQuery, TokenRequestForm, TokenResponseDto, UpdateApplicationRequest,
    UpdateGroupRequest, UpdateUserRequest, UserDto, UserListQuery, VisibleApplicationDto,
};

fn user_agent_of(req: &HttpRequest) -> Option<String> {
    req.headers().get("User-Agent").and_then(|v| v.to_str().ok()).map(String::from)
}

fn require_admin(user: &AuthenticatedUser) -> Result<(), ApiError> {
    if user.is_admin || user.is_super_admin {
        Ok(())
    } else {
        Err(ApiError::InsufficientPermissions)
    }
}

fn require_super_admin(user: &AuthenticatedUser) -> Result<(), ApiError> {
    if user.is_super_admin {
        Ok(())
    } else {
        Err(ApiError::InsufficientPermissions)
    }
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

/// `GET /health` — liveness probe for load balancers.
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: "oauth-service".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

// =============================================================================
// DISCOVERY
// =============================================================================

/// `GET /.well-known/openid-configuration`
pub async fn discovery(state: web::Data<AppState>) -> HttpResponse {
    let document = state.userinfo_service.discovery_document();
    HttpResponse::Ok().json(DiscoveryDocumentDto::from(document))
}

// =============================================================================
// OAUTH2 / OIDC RUNTIME (C3/C4/C5)
// =============================================================================

/// `GET /oauth/authorize`
///
/// The session may or may not already be resolved by the time this handler
/// runs (`SessionAuthenticator` never rejects a request, only annotates it).
/// A missing session redirects the browser to the upstream SSO login flow
/// with this request's own query string carried through `redirect_to`, so
/// the round trip lands back here with the same parameters once the session
/// exists.
pub async fn authorize(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<AuthorizeQuery>,
    user: MaybeAuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let original_query = req.query_string().to_string();
    let query = query.into_inner();

    let request = AuthorizeRequest {
        response_type: query.response_type,
        client_id: query.client_id,
        redirect_uri: query.redirect_uri,
        scope: query.scope,
        state: query.state,
        code_challenge: query.code_challenge,
        code_challenge_method: query.code_challenge_method,
    };

    let requesting_user = user
        .0
        .as_ref()
        .map(|u| RequestingUser { user_id: u.user_id, is_admin: u.is_admin });

    let outcome = state.oauth_service.authorize(request, requesting_user, &original_query).await?;

    match outcome {
        AuthorizeOutcome::NeedsLogin { login_redirect_to } => {
            let destination = format!(
                "/auth/sso/login?redirect_to={}",
                urlencoding_encode(&login_redirect_to)
            );
            Ok(HttpResponse::Found().append_header(("Location", destination)).finish())
        }
        AuthorizeOutcome::Redirect { url } => {
            Ok(HttpResponse::Found().append_header(("Location", url)).finish())
        }
    }
}

/// Minimal percent-encoding for a single query-string value embedded in
/// another query string. `url::Url`'s `query_pairs_mut` handles this
/// correctly for a full URL, but here the value is a bare relative path plus
/// query string being embedded as *one* parameter, so it's encoded by hand.
fn urlencoding_encode(value: &str) -> String {
    let mut placeholder = url::Url::parse("http://placeholder.invalid/").expect("valid base");
    placeholder.query_pairs_mut().append_pair("v", value);
    placeholder
        .query()
        .and_then(|q| q.strip_prefix("v="))
        .unwrap_or("")
        .to_string()
}

/// `POST /oauth/token`
pub async fn token(
    state: web::Data<AppState>,
    form: web::Form<TokenRequestForm>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();

    let request = match form.grant_type.as_str() {
        "authorization_code" => TokenRequest::AuthorizationCode {
            code: form.code.ok_or_else(|| ApiError::OAuth {
                code: shared::errors::OAuthErrorCode::InvalidRequest,
                description: Some("code is required".to_string()),
                state: None,
            })?,
            redirect_uri: form.redirect_uri.ok_or_else(|| ApiError::OAuth {
                code: shared::errors::OAuthErrorCode::InvalidRequest,
                description: Some("redirect_uri is required".to_string()),
                state: None,
            })?,
            client_id: form.client_id.ok_or_else(|| ApiError::OAuth {
                code: shared::errors::OAuthErrorCode::InvalidClient,
                description: None,
                state: None,
            })?,
            client_secret: form.client_secret,
            code_verifier: form.code_verifier,
        },
        "refresh_token" => TokenRequest::RefreshToken {
            refresh_token: form.refresh_token.ok_or_else(|| ApiError::OAuth {
                code: shared::errors::OAuthErrorCode::InvalidRequest,
                description: Some("refresh_token is required".to_string()),
                state: None,
            })?,
            client_id: form.client_id.ok_or_else(|| ApiError::OAuth {
                code: shared::errors::OAuthErrorCode::InvalidClient,
                description: None,
                state: None,
            })?,
            client_secret: form.client_secret,
        },
        _ => {
            return Err(ApiError::OAuth {
                code: shared::errors::OAuthErrorCode::UnsupportedGrantType,
                description: Some(format!("unsupported grant_type: {}", form.grant_type)),
                state: None,
            })
        }
    };

    let tokens = state.oauth_service.exchange_token(request).await?;
    Ok(HttpResponse::Ok().json(TokenResponseDto::from(tokens)))
}

/// `GET /oauth/userinfo`
pub async fn userinfo(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let header = req.headers().get("Authorization").ok_or(ApiError::InvalidToken)?.to_str().map_err(|_| ApiError::InvalidToken)?;
    let access_token = shared::auth::IdTokenService::extract_from_header(header)?;

    let info = state.userinfo_service.userinfo(access_token).await?;
    Ok(HttpResponse::Ok().json(OidcUserInfoDto::from(info)))
}

/// `POST /oauth/revoke` — always succeeds per RFC 7009 §2.2.
pub async fn revoke(
    state: web::Data<AppState>,
    form: web::Form<RevokeRequestForm>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    state.oauth_service.revoke(form.token, form.client_id, form.client_secret).await?;
    Ok(HttpResponse::Ok().finish())
}

// =============================================================================
// SSO COLLABORATOR CONTRACT
// =============================================================================

/// `GET /auth/sso/login?redirect_to=…` — kicks off the upstream SSO round
/// trip. The upstream collaborator owns the actual identity-provider
/// negotiation; this core only needs to hand it the eventual return address.
pub async fn sso_login(
    state: web::Data<AppState>,
    query: web::Query<SsoLoginQuery>,
) -> HttpResponse {
    let redirect_to = query.into_inner().redirect_to.unwrap_or_else(|| "/".to_string());
    let discovery_url = &state.config.sso.discovery_url;
    let destination = format!(
        "{}?redirect_to={}",
        discovery_url,
        urlencoding_encode(&redirect_to)
    );
    HttpResponse::Found().append_header(("Location", destination)).finish()
}

/// `POST /auth/sso/callback` — the upstream collaborator has already
/// authenticated the user and validated its own ID token; this endpoint
/// trusts the claims it's handed, upserts the corresponding [`User`](crate::domain::entities::User),
/// mints a session, and records a [`LoginHistory`](crate::domain::entities::LoginHistory) row.
///
/// The session is written directly into Redis under the `session:{credential}`
/// key convention documented by `shared::redis_client` — there is no
/// dedicated setter there because, in the general case, the core never writes
/// that key; this is the one call site that does.
pub async fn sso_callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<SsoCallbackRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ip_address = Some(client_ip_from_request(&req));
    let user_agent = user_agent_of(&req);

    let upsert = UpsertUser {
        email: body.email.clone(),
        display_name: body.display_name,
        given_name: body.given_name,
        family_name: body.family_name,
        middle_name: body.middle_name,
        department: body.department,
        job_title: body.job_title,
        groups: body.groups,
    };

    let user = match state.user_repository.upsert(upsert).await {
        Ok(user) => user,
        Err(e) => {
            state
                .audit_service
                .record_login(None, LoginType::Sso, false, Some("upsert_failed".to_string()), ip_address, user_agent)
                .await?;
            return Err(e);
        }
    };

    if !user.is_active {
        state
            .audit_service
            .record_login(Some(user.id), LoginType::Sso, false, Some("account_inactive".to_string()), ip_address, user_agent)
            .await?;
        return Err(ApiError::AccessDenied);
    }

    let authenticated = AuthenticatedUser {
        user_id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        department: user.department.clone(),
        groups: user.groups.clone(),
        is_active: user.is_active,
        is_admin: user.is_admin,
        is_super_admin: user.is_super_admin,
    };

    let credential = Uuid::new_v4().to_string();
    let ttl = std::time::Duration::from_secs(state.config.oauth.refresh_token_ttl_seconds.max(0) as u64);
    state
        .redis_client
        .set(&format!("session:{}", credential), &authenticated, Some(ttl))
        .await?;

    state
        .audit_service
        .record_login(Some(user.id), LoginType::Sso, true, None, ip_address, user_agent)
        .await?;

    let redirect_to = body.redirect_to.unwrap_or_else(|| "/".to_string());

    info!(user_id = %user.id, "SSO session established");

    Ok(HttpResponse::Ok()
        .cookie(
            actix_web::cookie::Cookie::build(SESSION_COOKIE_NAME, credential.clone())
                .path("/")
                .http_only(true)
                .secure(state.config.is_production())
                .finish(),
        )
        .json(SsoCallbackResponse { session_token: credential, redirect_to }))
}

fn client_ip_from_request(req: &HttpRequest) -> String {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| req.peer_addr().map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

// =============================================================================
// APPLICATIONS — visible listing (non-admin)
// =============================================================================

/// `GET /api/applications` — the dashboard listing: active, department-
/// eligible, and (for non-public apps) access-granted applications, sorted
/// by name.
pub async fn list_visible_applications(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let mut visible = Vec::new();
    let mut page_num = 1u32;
    loop {
        let page = state
            .application_service
            .list(crate::domain::entities::Page { page: page_num, per_page: 100 })
            .await?;
        if page.items.is_empty() {
            break;
        }
        for app in page.items {
            if state
                .access_service
                .is_visible_to(&app, user.department.as_deref(), user.user_id, user.is_admin)
                .await?
            {
                visible.push(app);
            }
        }
        if (page_num as i64) * 100 >= page.total {
            break;
        }
        page_num += 1;
    }
    visible.sort_by(|a, b| a.name.cmp(&b.name));

    let dtos: Vec<VisibleApplicationDto> = visible.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(dtos))
}

// =============================================================================
// APPLICATIONS — admin CRUD (§4.9)
// =============================================================================

pub async fn list_applications(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let page = state.application_service.list(query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(PagedResponse::<ApplicationDto>::from(page)))
}

pub async fn get_application(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let id = path.into_inner();
    let application = state
        .application_service
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound { resource: format!("application:{}", id) })?;
    Ok(HttpResponse::Ok().json(ApplicationDto::from(application)))
}

pub async fn create_application(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateApplicationRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let new_app = crate::domain::entities::NewApplication {
        name: body.name,
        slug: body.slug,
        description: body.description,
        base_url: body.base_url,
        icon_url: body.icon_url,
        redirect_uris: body.redirect_uris,
        is_public: body.is_public,
        allowed_departments: body.allowed_departments,
    };

    let created = state.application_service.create(user.user_id, new_app).await?;
    Ok(HttpResponse::Created().json(ApplicationWithSecretDto::from(created)))
}

pub async fn update_application(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateApplicationRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let update = crate::domain::entities::ApplicationUpdate {
        name: body.name,
        description: body.description,
        base_url: body.base_url,
        icon_url: body.icon_url,
        redirect_uris: body.redirect_uris,
        is_active: body.is_active,
        is_public: body.is_public,
        allowed_departments: body.allowed_departments,
    };

    let updated = state.application_service.update(user.user_id, path.into_inner(), update).await?;
    Ok(HttpResponse::Ok().json(ApplicationDto::from(updated)))
}

pub async fn regenerate_application_secret(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let result = state.application_service.regenerate_secret(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApplicationWithSecretDto::from(result)))
}

pub async fn delete_application(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    state.application_service.delete(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("application deleted")))
}

// =============================================================================
// ADMIN — users
// =============================================================================

pub async fn list_users(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let query = query.into_inner();
    let filter = RepoUserFilter {
        department: query.department,
        is_active: query.is_active,
        is_admin: query.is_admin,
    };
    let page = crate::domain::entities::Page {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let result = state.user_admin_service.list(filter, page).await?;
    Ok(HttpResponse::Ok().json(PagedResponse::<UserDto>::from(result)))
}

pub async fn get_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let id = path.into_inner();
    let found = state
        .user_admin_service
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", id) })?;
    Ok(HttpResponse::Ok().json(UserDto::from(found)))
}

pub async fn update_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let body = body.into_inner();

    let update = crate::domain::entities::UserUpdate {
        department: body.department,
        job_title: body.job_title,
        is_active: body.is_active,
        is_admin: body.is_admin,
    };

    let updated = state.user_admin_service.update(user.user_id, path.into_inner(), update).await?;
    Ok(HttpResponse::Ok().json(UserDto::from(updated)))
}

pub async fn bulk_set_user_active(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<BulkSetActiveRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let count = state.user_admin_service.bulk_set_active(user.user_id, &body.user_ids, body.is_active).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(format!("{} user(s) updated", count))))
}

// =============================================================================
// ADMIN — groups
// =============================================================================

pub async fn list_groups(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let page = state.group_admin_service.list(query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(PagedResponse::<GroupDto>::from(page)))
}

pub async fn create_group(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let new_group = crate::domain::entities::NewUserGroup {
        name: body.name,
        color: body.color,
        description: body.description,
    };
    let group = state.group_admin_service.create(user.user_id, new_group).await?;
    Ok(HttpResponse::Created().json(GroupDto::from(group)))
}

pub async fn update_group(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let update = crate::domain::entities::UserGroupUpdate {
        name: body.name,
        color: body.color,
        description: body.description,
    };
    let group = state.group_admin_service.update(user.user_id, path.into_inner(), update).await?;
    Ok(HttpResponse::Ok().json(GroupDto::from(group)))
}

pub async fn delete_group(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    state.group_admin_service.delete(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("group deleted")))
}

pub async fn add_group_member(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<GroupMemberRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    state.group_admin_service.add_member(user.user_id, path.into_inner(), body.into_inner().user_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("member added")))
}

pub async fn remove_group_member(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let (group_id, user_id) = path.into_inner();
    state.group_admin_service.remove_member(user.user_id, group_id, user_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("member removed")))
}

// =============================================================================
// ADMIN — access grants
// =============================================================================

pub async fn list_application_access(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let grants = state.access_admin_service.list_for_application(path.into_inner()).await?;
    let dtos: Vec<ApplicationAccessDto> = grants.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(dtos))
}

pub async fn grant_application_access(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<AccessGrantRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let principal = body
        .into_inner()
        .principal()
        .map_err(|message| ApiError::BadRequest { message: message.to_string() })?;
    let grant = state.access_admin_service.grant(user.user_id, path.into_inner(), principal).await?;
    Ok(HttpResponse::Created().json(ApplicationAccessDto::from(grant)))
}

pub async fn revoke_application_access(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<AccessGrantRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let principal = body
        .into_inner()
        .principal()
        .map_err(|message| ApiError::BadRequest { message: message.to_string() })?;
    state.access_admin_service.revoke(user.user_id, path.into_inner(), principal).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("access revoked")))
}

// =============================================================================
// ADMIN — stats, audit log, login history (read-only)
// =============================================================================

pub async fn admin_stats(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let stats = state.stats_service.summary().await?;
    Ok(HttpResponse::Ok().json(AdminStatsDto::from(stats)))
}

pub async fn list_audit_logs(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<AuditLogQuery>,
) -> Result<HttpResponse, ApiError> {
    require_super_admin(&user)?;
    let query = query.into_inner();
    let filter = AuditLogFilter {
        action: query.action,
        entity_type: query.entity_type,
        user_id: query.user_id,
    };
    let page = crate::domain::entities::Page {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let result = state.audit_log_repository.list(filter, page).await?;
    Ok(HttpResponse::Ok().json(PagedResponse::<AuditLogDto>::from(result)))
}

pub async fn list_login_history(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<LoginHistoryQuery>,
) -> Result<HttpResponse, ApiError> {
    require_super_admin(&user)?;
    let query = query.into_inner();
    let filter = LoginHistoryFilter {
        user_id: query.user_id,
        login_type: query.login_type,
        success: query.success,
    };
    let page = crate::domain::entities::Page {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let result = state.login_history_repository.list(filter, page).await?;
    Ok(HttpResponse::Ok().json(PagedResponse::<LoginHistoryDto>::from(result)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencoding_encode_preserves_path_and_query() {
        let encoded = urlencoding_encode("/oauth/authorize?client_id=abc&state=xyz");
        assert!(!encoded.contains('?'));
        assert!(encoded.contains("client_id%3Dabc") || encoded.contains("client_id%3Dabc%26state%3Dxyz"));
    }

    #[test]
    fn test_require_admin_rejects_plain_user() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            display_name: "Jane".to_string(),
            department: None,
            groups: vec![],
            is_active: true,
            is_admin: false,
            is_super_admin: false,
        };
        assert!(matches!(require_admin(&user), Err(ApiError::InsufficientPermissions)));
    }

    #[test]
    fn test_require_super_admin_rejects_plain_admin() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            display_name: "Jane".to_string(),
            department: None,
            groups: vec![],
            is_active: true,
            is_admin: true,
            is_super_admin: false,
        };
        assert!(matches!(require_super_admin(&user), Err(ApiError::InsufficientPermissions)));
    }
}
