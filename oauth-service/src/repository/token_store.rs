//! # Token Store (C4/C5 capability interface)
//!
//! Persists, looks up, and revokes opaque access/refresh tokens. Minting the
//! ID token is a separate concern (`shared::auth::IdTokenService`) — this
//! store only ever handles the two opaque kinds.

use crate::domain::entities::{NewToken, Token, TokenKind, TokenRow};
use async_trait::async_trait;
use shared::errors::{ApiError, ApiResult};
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn create(&self, new_token: NewToken) -> ApiResult<Token>;

    /// Looks up a live-or-not token by its value and expected kind. Returns
    /// `None` both when the token doesn't exist and when it exists but is
    /// the wrong kind — callers should not be able to distinguish the two.
    async fn find(&self, token: &str, kind: TokenKind) -> ApiResult<Option<Token>>;

    /// Revokes a single token, scoped to the application that's allowed to
    /// revoke it. Returns `true` if a live token matching both `token` and
    /// `application_id` was revoked, `false` if it was already revoked,
    /// expired, didn't exist, or belongs to a different application.
    async fn revoke(&self, token: &str, application_id: Uuid) -> ApiResult<bool>;

    /// Revokes every live token issued to `user_id` for `application_id`
    /// (both access and refresh). Used when rotating refresh tokens and by
    /// the admin "revoke all access" operation.
    async fn revoke_all_for_user_application(
        &self,
        user_id: Uuid,
        application_id: Uuid,
    ) -> ApiResult<u64>;

    /// Deletes every token whose `expires_at` has passed, revoked or not.
    /// Run periodically (see `main.rs`'s sweep task) to bound table growth.
    async fn sweep_expired(&self) -> ApiResult<u64>;
}

#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn create(&self, new_token: NewToken) -> ApiResult<Token> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            INSERT INTO oauth_tokens (
                token, kind, user_id, application_id, scopes, is_public_client,
                expires_at, revoked_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, now())
            RETURNING token, kind, user_id, application_id, scopes, is_public_client,
                      expires_at, revoked_at, created_at
            "#,
        )
        .bind(&new_token.token)
        .bind(new_token.kind.as_str())
        .bind(new_token.user_id)
        .bind(new_token.application_id)
        .bind(&new_token.scopes)
        .bind(new_token.is_public_client)
        .bind(new_token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError {
            message: format!("failed to persist token: {}", e),
        })?;

        Token::try_from(row).map_err(|e| ApiError::InternalError { message: e })
    }

    async fn find(&self, token: &str, kind: TokenKind) -> ApiResult<Option<Token>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT token, kind, user_id, application_id, scopes, is_public_client,
                   expires_at, revoked_at, created_at
            FROM oauth_tokens
            WHERE token = $1 AND kind = $2
            "#,
        )
        .bind(token)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        row.map(Token::try_from)
            .transpose()
            .map_err(|e| ApiError::InternalError { message: e })
    }

    async fn revoke(&self, token: &str, application_id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE oauth_tokens
            SET revoked_at = now()
            WHERE token = $1 AND application_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(token)
        .bind(application_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_user_application(
        &self,
        user_id: Uuid,
        application_id: Uuid,
    ) -> ApiResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE oauth_tokens
            SET revoked_at = now()
            WHERE user_id = $1 AND application_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(application_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }

    async fn sweep_expired(&self) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM oauth_tokens WHERE expires_at < now()")
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_token_row_round_trips_through_try_from() {
        let row = TokenRow {
            token: "opaque-token".into(),
            kind: "access".into(),
            user_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            scopes: vec!["openid".into(), "profile".into()],
            is_public_client: true,
            expires_at: Utc::now() + chrono::Duration::hours(1),
            revoked_at: None,
            created_at: Utc::now(),
        };
        let token = Token::try_from(row).unwrap();
        assert_eq!(token.kind, TokenKind::Access);
        assert!(token.is_live());
    }
}
