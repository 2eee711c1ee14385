//! # Redis Client for Session Lookup and Rate Limiting
//!
//! High-level Redis client used to back the session store consulted by the
//! [`auth::session`](crate::auth::session) authenticator, and available as
//! the multi-process alternative to the in-memory rate limiter bucket table.
//!
//! ## Why Redis, Here?
//!
//! The core never mints sessions itself (that's the external SSO callback's
//! job — see `auth::session::SessionAuthenticator`), but it does need a fast
//! shared place to resolve an opaque session credential to a user across
//! every process in the deployment. Redis is the natural fit since it's
//! already in the teacher's dependency stack for this purpose.
//!
//! ## Connection Management
//!
//! We use a `ConnectionManager` which automatically reconnects on failure.
//! This is more resilient than a simple connection for long-running services.
//!
//! ## Key Naming Convention
//!
//! | Pattern | Example | Purpose |
//! |---------|---------|---------|
//! | `session:{credential}` | `session:ab12ef…` | Resolves a session to a user |
//! | `cache:{entity}:{id}` | `cache:user:123` | Entity caching |
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::redis_client::RedisClient;
//! use shared::config::AppConfig;
//! use std::time::Duration;
//!
//! let config = AppConfig::from_env()?;
//! let redis = RedisClient::new(&config.redis).await?;
//!
//! // Store a value with TTL
//! redis.set("key", &"value", Some(Duration::from_secs(3600))).await?;
//!
//! // Retrieve a value
//! let value: Option<String> = redis.get("key").await?;
//! ```
//!
//! ## Related Documentation
//!
//! - [`crate::config::RedisConfig`] - Connection configuration
//! - [`crate::auth::session`] - Session resolution built on this client

use crate::config::RedisConfig;
use crate::errors::ApiError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

// =============================================================================
// Redis Client
// =============================================================================

/// Async Redis client with automatic reconnection.
///
/// This client wraps a `ConnectionManager` which handles connection
/// failures automatically. It's safe to clone and share across tasks.
///
/// ## Thread Safety
///
/// The client is `Clone + Send + Sync`. Cloning is cheap (just an Arc clone).
/// Each operation uses an async connection from the manager.
#[derive(Clone)]
pub struct RedisClient {
    /// Connection manager for automatic reconnection
    conn: ConnectionManager,
}

impl RedisClient {
    /// Creates a new Redis client and establishes connection.
    ///
    /// ## Parameters
    ///
    /// - `config`: Redis configuration (URL, pool size)
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::RedisError` if:
    /// - URL is invalid
    /// - Redis server is unreachable
    /// - Authentication fails
    pub async fn new(config: &RedisConfig) -> Result<Self, ApiError> {
        info!(url = %config.url, "Connecting to Redis");

        // Parse connection URL and create client
        let client = redis::Client::open(config.url.as_str())
            .map_err(ApiError::RedisError)?;

        // Create connection manager (handles reconnection automatically)
        let conn = ConnectionManager::new(client)
            .await
            .map_err(ApiError::RedisError)?;

        info!("Redis connection established");

        Ok(Self { conn })
    }

    // =========================================================================
    // Basic Operations
    // =========================================================================

    /// Stores a value with optional TTL (Time To Live).
    ///
    /// The value is serialized to JSON before storage.
    ///
    /// ## Parameters
    ///
    /// - `key`: Redis key
    /// - `value`: Any serializable value
    /// - `ttl`: Optional expiration time (None = no expiration)
    ///
    /// ## Example
    ///
    /// ```rust,ignore
    /// // Store with 1 hour TTL
    /// redis.set("user:123", &user, Some(Duration::from_secs(3600))).await?;
    ///
    /// // Store without expiration
    /// redis.set("config:feature", &true, None).await?;
    /// ```
    pub async fn set<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), ApiError> {
        // Serialize value to JSON
        let serialized = serde_json::to_string(value)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                // SET with expiration (SETEX)
                conn.set_ex::<_, _, ()>(key, &serialized, duration.as_secs())
                    .await
                    .map_err(ApiError::RedisError)?;
            }
            None => {
                // SET without expiration
                conn.set::<_, _, ()>(key, &serialized)
                    .await
                    .map_err(ApiError::RedisError)?;
            }
        }

        Ok(())
    }

    /// Retrieves and deserializes a value.
    ///
    /// ## Returns
    ///
    /// - `Ok(Some(value))` - Key exists and was deserialized
    /// - `Ok(None)` - Key doesn't exist
    /// - `Err(...)` - Redis error or deserialization failed
    ///
    /// ## Example
    ///
    /// ```rust,ignore
    /// let user: Option<User> = redis.get("user:123").await?;
    /// if let Some(user) = user {
    ///     // Cache hit
    /// }
    /// ```
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApiError> {
        let mut conn = self.conn.clone();

        let value: Option<String> = conn.get(key).await.map_err(ApiError::RedisError)?;

        match value {
            Some(s) => {
                let deserialized = serde_json::from_str(&s)
                    .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    /// Deletes a key.
    ///
    /// ## Returns
    ///
    /// - `true` - Key was deleted
    /// - `false` - Key didn't exist
    pub async fn delete(&self, key: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await.map_err(ApiError::RedisError)?;
        Ok(deleted > 0)
    }

    /// Checks if a key exists.
    pub async fn exists(&self, key: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(ApiError::RedisError)
    }

    /// Increments a counter (atomic operation).
    ///
    /// Creates the key with value 1 if it doesn't exist.
    /// Useful for rate limiting and counters.
    ///
    /// ## Returns
    ///
    /// The new value after incrementing.
    pub async fn incr(&self, key: &str) -> Result<i64, ApiError> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await.map_err(ApiError::RedisError)
    }

    /// Sets TTL on an existing key.
    ///
    /// ## Returns
    ///
    /// - `true` - TTL was set
    /// - `false` - Key doesn't exist
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl.as_secs() as i64)
            .await
            .map_err(ApiError::RedisError)
    }

    /// Health check - verifies Redis is responding.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(ApiError::RedisError)?;
        Ok(())
    }

    // =========================================================================
    // Session Lookup
    // =========================================================================
    // Backs `auth::session::SessionAuthenticator`. The core never writes
    // these keys itself in this revision — the external SSO callback
    // collaborator is responsible for minting a session and writing it here
    // after first-factor authentication succeeds — but it does read and
    // clear them.

    /// Looks up the user resolved by a session credential, if the session
    /// is still live.
    pub async fn get_session<T: serde::de::DeserializeOwned>(
        &self,
        credential: &str,
    ) -> Result<Option<T>, ApiError> {
        self.get(&Self::session_key(credential)).await
    }

    /// Clears a session (used by explicit sign-out, if ever exposed).
    pub async fn delete_session(&self, credential: &str) -> Result<bool, ApiError> {
        self.delete(&Self::session_key(credential)).await
    }

    fn session_key(credential: &str) -> String {
        format!("session:{}", credential)
    }
}

// Hide internal state in Debug output
impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient").finish_non_exhaustive()
    }
}

