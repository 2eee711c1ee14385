//! # Hub Identity Core - Shared Library
//!
//! Ambient infrastructure shared by the OAuth2/OIDC authorization server:
//! configuration, error handling, database/Redis clients, logging, request
//! validation, and the authentication/rate-limiting building blocks the
//! service is assembled from.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      oauth-service                          │
//! │              (api / service / repository / domain)          │
//! │                       │                                     │
//! │              ┌────────▼────────┐                            │
//! │              │  shared crate   │ ◄── You are here           │
//! │              └─────────────────┘                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose | Key Types |
//! |--------|---------|-----------|
//! | [`config`] | Environment-based configuration | [`AppConfig`] |
//! | [`errors`] | Standardized error handling, including RFC 6749 OAuth errors | [`ApiError`], [`ApiResult`] |
//! | [`auth`] | ID token minting, client-secret hashing, session resolution | [`IdTokenService`], [`ClientSecretHasher`], [`SessionAuthenticator`] |
//! | [`rate_limit`] | Per-IP, per-route-class fixed-window limiter (C1) | [`RateLimiter`](rate_limit::RateLimiter) |
//! | [`database`] | PostgreSQL connection pool | [`create_pool`](database::create_pool) |
//! | [`redis_client`] | Redis for session lookup | [`RedisClient`] |
//! | [`tracing_config`] | Structured logging setup | [`init_tracing`](tracing_config::init_tracing) |
//! | [`validation`] | Request validation helpers | Custom validators |
//!
//! ## Design Decisions
//!
//! 1. **Single source of truth**: All shared types live here to prevent drift
//! 2. **Framework agnostic where possible**: Core logic works with both Actix-web and Axum
//! 3. **Security first**: Auth and crypto follow OWASP guidelines
//! 4. **Observable by default**: Structured logging and tracing built-in
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::{AppConfig, ApiError, ApiResult};
//! use shared::auth::{IdTokenService, ClientSecretHasher};
//! use shared::database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let db_pool = database::create_pool(&config.database).await?;
//!     let id_tokens = IdTokenService::new(config.oauth.clone());
//!
//!     // Ready to build the service!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod rate_limit;
pub mod redis_client;
pub mod tracing_config;
pub mod validation;

// Re-exports for convenience - import commonly used types directly from `shared`
pub use config::AppConfig;
pub use errors::{ApiError, ApiResult};

