//! # Session Authenticator (C2)
//!
//! Resolves the calling HTTP request to either an authenticated [`AuthenticatedUser`]
//! or anonymous.
//!
//! ## What This Does *Not* Do
//!
//! This module never mints a session. Session creation is the responsibility
//! of the upstream SSO callback handler, an external collaborator whose only
//! contract with this core is: *after successful upstream authentication,
//! insert or update a `User` row keyed by email, and write a session
//! credential → user mapping this authenticator can read.* This module is
//! purely a consumer of that mapping.
//!
//! ## Resolution Flow
//!
//! ```text
//! ┌─────────┐     ┌───────────────────────┐     ┌──────────────┐
//! │ Request │────►│ SessionAuthenticator  │────►│ Session Store│
//! └─────────┘     └───────────────────────┘     └──────┬───────┘
//!                                                       │
//!                 ┌──────────────┐     ┌─────────────┐ │
//!                 │   Handler    │◄────│ Insert User │◄┘ (if live)
//!                 │(AuthenticUser│     │ Extension   │
//!                 │ or anonymous)│     │             │
//!                 └──────────────┘     └─────────────┘
//! ```
//!
//! The bearer session credential is read from a cookie (browser flows, e.g.
//! `/oauth/authorize`) or the `Authorization` header (API/admin flows),
//! cookie taking precedence when both are present.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::auth::session::{SessionAuthenticator, AuthenticatedUser};
//!
//! let authenticator = SessionAuthenticator::new(redis.clone());
//!
//! App::new()
//!     .service(
//!         web::scope("/api")
//!             .wrap(authenticator.clone())
//!             .route("/admin/applications", web::get().to(list_applications))
//!     )
//! ```
//!
//! Handlers pull the resolved identity out with the `AuthenticatedUser`
//! extractor (errors with `ApiError::MissingAuth` if anonymous) or
//! `MaybeAuthenticatedUser` (never errors; wraps an `Option`).

use crate::errors::ApiError;
use crate::redis_client::RedisClient;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use uuid::Uuid;

/// Cookie name carrying the session credential on browser-facing routes.
/// The SSO callback handler (the one caller outside this module that mints
/// a session) sets this cookie directly, so the name is public.
pub const SESSION_COOKIE_NAME: &str = "hub_session";

// =============================================================================
// Authenticated User
// =============================================================================

/// The identity resolved for a live session.
///
/// Carries exactly the fields the Access-Decision Engine (C6) and the admin
/// mutation surface need: who the user is, what department gates they pass,
/// and which privilege tiers apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    /// Free-form department string; empty/absent means no department.
    pub department: Option<String>,
    /// Upstream SSO group names, used by the Access-Decision Engine's
    /// principal gate and echoed into the ID token / `/userinfo`.
    pub groups: Vec<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_super_admin: bool,
}

/// Extractor that requires an authenticated session.
///
/// ```rust,ignore
/// async fn handler(user: AuthenticatedUser) -> impl Responder { ... }
/// ```
///
/// Returns `ApiError::MissingAuth` if no live session was resolved for this
/// request (either no credential was presented, or the session authenticator
/// middleware was not applied to this route).
impl actix_web::FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let result = req
            .extensions()
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::MissingAuth.into());

        ready(result)
    }
}

/// Extractor that never fails; resolves to `None` for anonymous requests.
///
/// Used by `/oauth/authorize` (step 5 of C3: an anonymous caller is
/// redirected to the SSO login route rather than rejected outright).
#[derive(Debug, Clone)]
pub struct MaybeAuthenticatedUser(pub Option<AuthenticatedUser>);

impl actix_web::FromRequest for MaybeAuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        ready(Ok(MaybeAuthenticatedUser(
            req.extensions().get::<AuthenticatedUser>().cloned(),
        )))
    }
}

// =============================================================================
// Session Authenticator (Actix Transform/Service middleware)
// =============================================================================

/// Resolves the session credential on every request it wraps and, if live,
/// inserts the resulting [`AuthenticatedUser`] into request extensions.
///
/// Never rejects a request itself — an anonymous caller simply proceeds with
/// no `AuthenticatedUser` in extensions; it's up to the route (via the
/// `AuthenticatedUser` vs. `MaybeAuthenticatedUser` extractor) to decide
/// whether that's acceptable.
#[derive(Clone)]
pub struct SessionAuthenticator {
    redis: RedisClient,
}

impl SessionAuthenticator {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    /// Extracts the bearer session credential from a cookie or the
    /// `Authorization` header, preferring the cookie.
    fn extract_credential(req: &ServiceRequest) -> Option<String> {
        if let Some(cookie) = req.cookie(SESSION_COOKIE_NAME) {
            return Some(cookie.value().to_string());
        }

        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuthenticator
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionAuthenticatorMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthenticatorMiddleware {
            service: Rc::new(service),
            redis: self.redis.clone(),
        }))
    }
}

pub struct SessionAuthenticatorMiddleware<S> {
    service: Rc<S>,
    redis: RedisClient,
}

impl<S, B> Service<ServiceRequest> for SessionAuthenticatorMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let redis = self.redis.clone();
        let credential = SessionAuthenticator::extract_credential(&req);

        Box::pin(async move {
            if let Some(credential) = credential {
                if let Ok(Some(user)) = redis
                    .get_session::<AuthenticatedUser>(&credential)
                    .await
                {
                    if user.is_active {
                        req.extensions_mut().insert(user);
                    }
                }
            }

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            display_name: "Jane Doe".to_string(),
            department: Some("Engineering".to_string()),
            groups: vec!["engineering".to_string()],
            is_active: true,
            is_admin: false,
            is_super_admin: false,
        }
    }

    #[test]
    fn test_authenticated_user_serde_round_trip() {
        let user = sample_user();
        let json = serde_json::to_string(&user).unwrap();
        let decoded: AuthenticatedUser = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.user_id, user.user_id);
        assert_eq!(decoded.email, user.email);
        assert_eq!(decoded.groups, user.groups);
    }

    #[test]
    fn test_maybe_authenticated_user_wraps_option() {
        let some = MaybeAuthenticatedUser(Some(sample_user()));
        let none = MaybeAuthenticatedUser(None);

        assert!(some.0.is_some());
        assert!(none.0.is_none());
    }
}
