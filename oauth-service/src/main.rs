//! # Hub Identity Core — OAuth 2.0 / OpenID Connect Authorization Server
//!
//! The **oauth-service** is the corporate application hub's single sign-on
//! and authorization core. It never collects a password itself — identity is
//! established upstream by an SSO provider and handed to this service via
//! `/auth/sso/callback` — but owns everything downstream of that: the
//! authorization-code + PKCE dance, token issuance and revocation, OIDC
//! discovery/userinfo, and the admin surface that manages registered
//! applications, users, groups, and access grants.
//!
//! ## Architecture Overview
//!
//! This service follows **Clean Architecture** principles with clear
//! separation between layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HTTP Layer (api/)                        │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐ │
//! │  │   routes    │  │  handlers   │  │    DTOs (Request/Res)   │ │
//! │  └──────┬──────┘  └──────┬──────┘  └────────────┬────────────┘ │
//! └─────────┼────────────────┼─────────────────────┼───────────────┘
//!           │                │                      │
//!           ▼                ▼                      ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Service Layer (service/)                     │
//! │  OAuthService · UserInfoService · AccessService · AuditService  │
//! │  ApplicationService · UserAdminService · GroupAdminService      │
//! │  AccessAdminService · StatsService                              │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Repository Layer (repository/)                 │
//! │  ClientStore · CodeStore · TokenStore · AuditSink (mockable)     │
//! │  UserRepository · GroupRepository · AccessRepository            │
//! │  LoginHistoryRepository · AuditLogRepository                    │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (domain/)                       │
//! │  Entities · Value Objects (AccessPrincipal, TokenKind, Page)     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## API Endpoints
//!
//! See [`api::routes`] for the full route table.
//!
//! ## Health Check
//!
//! | Method | Endpoint  | Description              |
//! |--------|-----------|--------------------------|
//! | GET    | `/health` | Service health status    |
//!
//! ## Security Features
//!
//! - **PKCE-only authorization code flow** (RFC 7636), public clients never
//!   receive a client secret.
//! - **Argon2id client secret hashing** via [`shared::auth::ClientSecretHasher`].
//! - **Session-backed authentication**, not bearer JWTs on the browser side —
//!   see [`shared::auth::session`].
//! - **Fixed-window rate limiting** per route class, see [`shared::rate_limit`].
//! - **Append-only audit log and login history** for every admin mutation and
//!   authentication attempt.
//!
//! ## Configuration
//!
//! Environment variables are loaded via [`shared::config::AppConfig`]. Key
//! settings for oauth-service:
//!
//! - `SERVICE_NAME=oauth-service`
//! - `OAUTH_SECRET` — signing secret for ID tokens
//! - `OAUTH__ISSUER` — issuer URI embedded in ID tokens and the discovery document
//! - `SSO_DISCOVERY_URL` — upstream SSO provider's login entrypoint
//!
//! ## Related Documentation
//!
//! - Authentication design: [`shared::auth`]
//! - Session middleware: [`shared::auth::session`]
//! - Rate limiting: [`shared::rate_limit`]

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use shared::{
    auth::{session::SessionAuthenticator, ClientSecretHasher, IdTokenService},
    config::AppConfig,
    database,
    rate_limit::{RateLimitMiddlewareFactory, RateLimiter},
    redis_client::RedisClient,
    tracing_config,
};
use std::sync::Arc;
use tracing::info;

mod api;
mod domain;
mod repository;
mod service;

use api::routes;
use repository::{
    AccessRepository, AuditLogRepository, ClientStore, CodeStore, GroupRepository,
    LoginHistoryRepository, PgAuditSink, PgClientStore, PgCodeStore, PgTokenStore, TokenStore,
    UserRepository,
};
use service::{
    AccessAdminService, AccessService, ApplicationService, AuditService, GroupAdminService,
    OAuthService, StatsService, UserAdminService, UserInfoService,
};

/// Shared application state injected into all request handlers.
///
/// Wrapped in [`actix_web::web::Data`] and made available to every handler
/// via the extractor pattern. Every field here is either an `Arc`-backed
/// clone-cheap service/repository or a plain config struct — there is no
/// interior-mutable global state.
pub struct AppState {
    pub oauth_service: OAuthService,
    pub userinfo_service: UserInfoService,
    pub application_service: ApplicationService,
    pub user_admin_service: UserAdminService,
    pub group_admin_service: GroupAdminService,
    pub access_admin_service: AccessAdminService,
    pub stats_service: StatsService,
    pub access_service: AccessService,
    pub audit_service: AuditService,
    pub user_repository: UserRepository,
    pub audit_log_repository: AuditLogRepository,
    pub login_history_repository: LoginHistoryRepository,
    pub redis_client: RedisClient,
    pub config: AppConfig,
}

/// Application entry point and server initialization.
///
/// # Initialization Sequence
///
/// 1. Load configuration from environment variables
/// 2. Initialize structured logging/tracing
/// 3. Create PostgreSQL connection pool
/// 4. Create Redis client for sessions and caching
/// 5. Instantiate repositories and services with dependencies
/// 6. Spawn the expired-code/expired-token sweeper
/// 7. Configure and start HTTP server
///
/// # Error Handling
///
/// The main function uses `expect()` for critical initialization errors
/// that should prevent the service from starting (fail-fast pattern).
///
/// # Graceful Shutdown
///
/// Actix-web handles SIGTERM/SIGINT signals and gracefully shuts down:
/// stops accepting new connections, waits for in-flight requests, closes
/// database and Redis connections.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // ─────────────────────────────────────────────────────────────────────
    // Step 1: Load configuration from environment
    // ─────────────────────────────────────────────────────────────────────
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // ─────────────────────────────────────────────────────────────────────
    // Step 2: Initialize structured logging
    // ─────────────────────────────────────────────────────────────────────
    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        host = %config.server.host,
        port = %config.server.port,
        "Starting oauth-service"
    );

    // ─────────────────────────────────────────────────────────────────────
    // Step 3: Create PostgreSQL connection pool
    // ─────────────────────────────────────────────────────────────────────
    let db_pool = database::create_pool(&config.database)
        .await
        .expect("Failed to create database pool");

    // ─────────────────────────────────────────────────────────────────────
    // Step 4: Create Redis client
    // ─────────────────────────────────────────────────────────────────────
    // Redis backs both sessions (written by /auth/sso/callback, read by the
    // SessionAuthenticator middleware) and the rate limiter's nothing —
    // the rate limiter is in-process (DashMap), Redis is session-only here.
    let redis_client = RedisClient::new(&config.redis)
        .await
        .expect("Failed to connect to Redis");

    // ─────────────────────────────────────────────────────────────────────
    // Step 5: Instantiate repositories and services
    // ─────────────────────────────────────────────────────────────────────
    let client_store: Arc<dyn ClientStore> = Arc::new(PgClientStore::new(db_pool.clone()));
    let code_store: Arc<dyn CodeStore> = Arc::new(PgCodeStore::new(db_pool.clone()));
    let token_store: Arc<dyn TokenStore> = Arc::new(PgTokenStore::new(db_pool.clone()));
    let audit_sink = Arc::new(PgAuditSink::new(db_pool.clone()));

    let user_repository = UserRepository::new(db_pool.clone());
    let group_repository = GroupRepository::new(db_pool.clone());
    let access_repository = AccessRepository::new(db_pool.clone());
    let login_history_repository = LoginHistoryRepository::new(db_pool.clone());
    let audit_log_repository = AuditLogRepository::new(db_pool.clone());

    let secret_hasher = ClientSecretHasher::new();
    let id_token_service = IdTokenService::new(config.oauth.clone());

    let audit_service = AuditService::new(db_pool.clone(), audit_sink, login_history_repository.clone());
    let access_service = AccessService::new(access_repository.clone());

    let sweep_code_store = code_store.clone();
    let sweep_token_store = token_store.clone();

    let oauth_service = OAuthService::new(
        client_store.clone(),
        code_store,
        token_store.clone(),
        user_repository.clone(),
        id_token_service,
        secret_hasher.clone(),
        access_service.clone(),
        login_history_repository.clone(),
        config.oauth.clone(),
    );

    let userinfo_service =
        UserInfoService::new(token_store, user_repository.clone(), config.oauth.clone());

    let application_service =
        ApplicationService::new(client_store.clone(), secret_hasher, audit_service.clone());

    let user_admin_service = UserAdminService::new(user_repository.clone(), audit_service.clone());
    let group_admin_service = GroupAdminService::new(group_repository.clone(), audit_service.clone());
    let access_admin_service = AccessAdminService::new(access_repository, audit_service.clone());
    let stats_service = StatsService::new(user_repository.clone(), client_store, group_repository);

    let rate_limiter = RateLimiter::new(config.rate_limit.clone());
    let session_authenticator = SessionAuthenticator::new(redis_client.clone());

    let app_state = web::Data::new(AppState {
        oauth_service,
        userinfo_service,
        application_service,
        user_admin_service,
        group_admin_service,
        access_admin_service,
        stats_service,
        access_service,
        audit_service,
        user_repository,
        audit_log_repository,
        login_history_repository,
        redis_client,
        config: config.clone(),
    });

    // Database pool is also shared for health checks and direct queries.
    let db_pool = web::Data::new(db_pool);

    // ─────────────────────────────────────────────────────────────────────
    // Step 6: Spawn the expired-code/expired-token sweeper
    // ─────────────────────────────────────────────────────────────────────
    // §4.7's housekeeping requirement: nothing reads an expired code or
    // token again, so this purely bounds table growth. An hourly cadence is
    // generous relative to the shortest-lived row (the authorization code,
    // `OAuthConfig::code_ttl_seconds`, default 10 minutes).
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match sweep_code_store.sweep_expired().await {
                Ok(count) => info!(deleted = count, "swept expired authorization codes"),
                Err(error) => tracing::error!(%error, "failed to sweep expired authorization codes"),
            }
            match sweep_token_store.sweep_expired().await {
                Ok(count) => info!(deleted = count, "swept expired tokens"),
                Err(error) => tracing::error!(%error, "failed to sweep expired tokens"),
            }
        }
    });

    // ─────────────────────────────────────────────────────────────────────
    // Step 7: Configure and start HTTP server
    // ─────────────────────────────────────────────────────────────────────
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    info!("Server listening on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        // In production, replace `allow_any_origin()` with the hub's actual
        // set of registered application origins.
        // TODO: Configure specific origins for production
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            // ─────────────────────────────────────────────────────────
            // Middleware Stack (order matters: first added = last executed)
            // ─────────────────────────────────────────────────────────
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(RateLimitMiddlewareFactory::new(rate_limiter.clone()))
            .wrap(session_authenticator.clone())
            // ─────────────────────────────────────────────────────────
            // Shared State
            // ─────────────────────────────────────────────────────────
            .app_data(app_state.clone())
            .app_data(db_pool.clone())
            // ─────────────────────────────────────────────────────────
            // Routes Configuration
            // ─────────────────────────────────────────────────────────
            .configure(routes::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
