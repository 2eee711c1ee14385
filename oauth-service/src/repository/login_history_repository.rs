//! # Login History Repository
//!
//! Append-only record of authentication attempts (§4.8, invariant 5). Every
//! SSO callback, dev-login, and authorize-endpoint session resolution writes
//! exactly one row here, success or failure.

use crate::domain::entities::{
    LoginHistory, LoginHistoryFilter, LoginType, NewLoginHistory, Page, PagedResult,
};
use shared::errors::{ApiError, ApiResult};
use sqlx::PgPool;

const SELECT_COLUMNS: &str =
    "id, user_id, login_type, ip_address, user_agent, success, failure_reason, created_at";

#[derive(Clone)]
pub struct LoginHistoryRepository {
    pool: PgPool,
}

impl LoginHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, entry: NewLoginHistory) -> ApiResult<LoginHistory> {
        let query = format!(
            r#"
            INSERT INTO login_history (
                id, user_id, login_type, ip_address, user_agent, success,
                failure_reason, created_at
            )
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, now())
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, LoginHistory>(&query)
            .bind(entry.user_id)
            .bind(entry.login_type.as_str())
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .bind(entry.success)
            .bind(&entry.failure_reason)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("failed to write login history: {}", e) })
    }

    pub async fn list(
        &self,
        filter: LoginHistoryFilter,
        page: Page,
    ) -> ApiResult<PagedResult<LoginHistory>> {
        let query = format!(
            r#"
            SELECT {}
            FROM login_history
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR login_type = $2)
              AND ($3::bool IS NULL OR success = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            SELECT_COLUMNS
        );
        let items = sqlx::query_as::<_, LoginHistory>(&query)
            .bind(filter.user_id)
            .bind(&filter.login_type)
            .bind(filter.success)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM login_history
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR login_type = $2)
              AND ($3::bool IS NULL OR success = $3)
            "#,
        )
        .bind(filter.user_id)
        .bind(&filter.login_type)
        .bind(filter.success)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(PagedResult { items, total, page: page.page, per_page: page.per_page })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_type_wire_values_used_in_queries() {
        assert_eq!(LoginType::Sso.as_str(), "sso");
        assert_eq!(LoginType::OauthAuthorize.as_str(), "oauth_authorize");
    }
}
