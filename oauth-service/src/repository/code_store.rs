//! # Code Store (C3/C4 capability interface)
//!
//! Persists and redeems [`AuthorizationCode`]s. The trait exists so the
//! authorize/token handlers' service-layer logic can be unit tested against
//! an in-memory mock instead of a database.
//!
//! ## Redemption Is Two Steps, On Purpose
//!
//! `find` is read-only; `consume` is the atomic state transition. The token
//! endpoint calls `find` first to validate PKCE and `redirect_uri` against
//! the stored row *before* deciding whether to consume it — a failed PKCE
//! check must not burn the code, or a client could be denial-of-serviced by
//! someone replaying its authorization code with a wrong verifier. Only once
//! every check has passed does the handler call `consume`, which is the
//! single atomic "check-not-consumed, then mark-consumed" operation that
//! prevents two concurrent redemptions both succeeding.

use crate::domain::entities::{AuthorizationCode, NewAuthorizationCode};
use async_trait::async_trait;
use shared::errors::{ApiError, ApiResult};
use sqlx::PgPool;

#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Mints and persists a new authorization code.
    async fn create(&self, new_code: NewAuthorizationCode) -> ApiResult<AuthorizationCode>;

    /// Looks up a code without consuming it.
    async fn find(&self, code: &str) -> ApiResult<Option<AuthorizationCode>>;

    /// Atomically marks a code consumed if (and only if) it was not already
    /// consumed. Returns `true` if this call performed the consumption,
    /// `false` if the code was already consumed (or doesn't exist) and this
    /// call had no effect.
    async fn consume(&self, code: &str) -> ApiResult<bool>;

    /// Deletes every code whose `expires_at` has passed, regardless of
    /// consumption state. Run periodically (see `main.rs`'s sweep task) to
    /// bound table growth — nothing reads an expired code again, consumed or
    /// not.
    async fn sweep_expired(&self) -> ApiResult<u64>;
}

#[derive(Clone)]
pub struct PgCodeStore {
    pool: PgPool,
}

impl PgCodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeStore for PgCodeStore {
    async fn create(&self, new_code: NewAuthorizationCode) -> ApiResult<AuthorizationCode> {
        sqlx::query_as::<_, AuthorizationCode>(
            r#"
            INSERT INTO oauth_codes (
                code, user_id, application_id, redirect_uri, scopes, state,
                code_challenge, code_challenge_method, expires_at, consumed_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, now())
            RETURNING code, user_id, application_id, redirect_uri, scopes, state,
                      code_challenge, code_challenge_method, expires_at, consumed_at, created_at
            "#,
        )
        .bind(&new_code.code)
        .bind(new_code.user_id)
        .bind(new_code.application_id)
        .bind(&new_code.redirect_uri)
        .bind(&new_code.scopes)
        .bind(&new_code.state)
        .bind(&new_code.code_challenge)
        .bind(&new_code.code_challenge_method)
        .bind(new_code.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError {
            message: format!("failed to persist authorization code: {}", e),
        })
    }

    async fn find(&self, code: &str) -> ApiResult<Option<AuthorizationCode>> {
        sqlx::query_as::<_, AuthorizationCode>(
            r#"
            SELECT code, user_id, application_id, redirect_uri, scopes, state,
                   code_challenge, code_challenge_method, expires_at, consumed_at, created_at
            FROM oauth_codes
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    async fn consume(&self, code: &str) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE oauth_codes
            SET consumed_at = now()
            WHERE code = $1 AND consumed_at IS NULL
            "#,
        )
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected() == 1)
    }

    async fn sweep_expired(&self) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM oauth_codes WHERE expires_at < now()")
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CODE_CHALLENGE_METHOD_S256};
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// An in-memory mock used to unit test service-layer redemption logic
    /// without a database. Mirrors the atomicity contract of `PgCodeStore`.
    pub struct MockCodeStore {
        codes: Mutex<Vec<AuthorizationCode>>,
    }

    impl MockCodeStore {
        pub fn new() -> Self {
            Self { codes: Mutex::new(Vec::new()) }
        }

        pub fn seed(&self, code: AuthorizationCode) {
            self.codes.lock().unwrap().push(code);
        }
    }

    #[async_trait]
    impl CodeStore for MockCodeStore {
        async fn create(&self, new_code: NewAuthorizationCode) -> ApiResult<AuthorizationCode> {
            let code = AuthorizationCode {
                code: new_code.code,
                user_id: new_code.user_id,
                application_id: new_code.application_id,
                redirect_uri: new_code.redirect_uri,
                scopes: new_code.scopes,
                state: new_code.state,
                code_challenge: new_code.code_challenge,
                code_challenge_method: new_code.code_challenge_method,
                expires_at: new_code.expires_at,
                consumed_at: None,
                created_at: Utc::now(),
            };
            self.codes.lock().unwrap().push(code.clone());
            Ok(code)
        }

        async fn find(&self, code: &str) -> ApiResult<Option<AuthorizationCode>> {
            Ok(self.codes.lock().unwrap().iter().find(|c| c.code == code).cloned())
        }

        async fn consume(&self, code: &str) -> ApiResult<bool> {
            let mut codes = self.codes.lock().unwrap();
            if let Some(c) = codes.iter_mut().find(|c| c.code == code) {
                if c.consumed_at.is_none() {
                    c.consumed_at = Some(Utc::now());
                    return Ok(true);
                }
            }
            Ok(false)
        }

        async fn sweep_expired(&self) -> ApiResult<u64> {
            let mut codes = self.codes.lock().unwrap();
            let before = codes.len();
            let now = Utc::now();
            codes.retain(|c| c.expires_at >= now);
            Ok((before - codes.len()) as u64)
        }
    }

    fn sample_code() -> AuthorizationCode {
        AuthorizationCode {
            code: "abc123".into(),
            user_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            redirect_uri: "https://client.example.com/cb".into(),
            scopes: vec!["openid".into()],
            state: Some("xyz".into()),
            code_challenge: Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into()),
            code_challenge_method: Some(CODE_CHALLENGE_METHOD_S256.into()),
            expires_at: Utc::now() + chrono::Duration::minutes(10),
            consumed_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let store = MockCodeStore::new();
        store.seed(sample_code());

        assert!(store.consume("abc123").await.unwrap());
        assert!(!store.consume("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_does_not_consume() {
        let store = MockCodeStore::new();
        store.seed(sample_code());

        let found = store.find("abc123").await.unwrap().unwrap();
        assert!(found.consumed_at.is_none());
        assert!(store.consume("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_unknown_code_returns_false() {
        let store = MockCodeStore::new();
        assert!(!store.consume("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_expired_removes_only_expired_codes() {
        let store = MockCodeStore::new();
        let mut expired = sample_code();
        expired.code = "expired".into();
        expired.expires_at = Utc::now() - chrono::Duration::minutes(1);
        store.seed(expired);
        store.seed(sample_code());

        let swept = store.sweep_expired().await.unwrap();
        assert_eq!(swept, 1);
        assert!(store.find("expired").await.unwrap().is_none());
        assert!(store.find("abc123").await.unwrap().is_some());
    }
}
