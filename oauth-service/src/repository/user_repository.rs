//! # User Repository
//!
//! Data access for [`User`]. Rows are created (or refreshed) by the SSO
//! callback's upsert contract — this repository never mints a `User` any
//! other way — and mutated afterward only through the admin surface (§4.9):
//! department, job title, `is_active`, `is_admin`. `is_super_admin` has no
//! mutator here by design.

use crate::domain::entities::{Page, PagedResult, User, UserUpdate, UpsertUser};
use shared::errors::{ApiError, ApiResult};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
    id, email, display_name, given_name, family_name, middle_name, department,
    job_title, groups, is_active, is_admin, is_super_admin, last_login_at,
    created_at, updated_at
"#;

/// Conjunctive filters for the admin user-listing endpoint (§4.9).
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub department: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", SELECT_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Case-insensitive per the uniqueness rule in §3.
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", SELECT_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Inserts a new user on first SSO login, or refreshes the SSO-sourced
    /// fields (name, department, groups) on subsequent logins, per the
    /// callback's upsert contract. Leaves admin-managed fields (`is_active`,
    /// `is_admin`, `is_super_admin`) untouched on conflict.
    pub async fn upsert(&self, upsert: UpsertUser) -> ApiResult<User> {
        let query = format!(
            r#"
            INSERT INTO users (
                id, email, display_name, given_name, family_name, middle_name,
                department, job_title, groups, is_active, is_admin, is_super_admin,
                last_login_at, created_at, updated_at
            )
            VALUES (
                gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, true, false, false,
                now(), now(), now()
            )
            ON CONFLICT (email) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                given_name = EXCLUDED.given_name,
                family_name = EXCLUDED.family_name,
                middle_name = EXCLUDED.middle_name,
                department = EXCLUDED.department,
                job_title = EXCLUDED.job_title,
                groups = EXCLUDED.groups,
                last_login_at = now(),
                updated_at = now()
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&upsert.email)
            .bind(&upsert.display_name)
            .bind(&upsert.given_name)
            .bind(&upsert.family_name)
            .bind(&upsert.middle_name)
            .bind(&upsert.department)
            .bind(&upsert.job_title)
            .bind(&upsert.groups)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("failed to upsert user: {}", e) })
    }

    pub async fn list(&self, filter: UserFilter, page: Page) -> ApiResult<PagedResult<User>> {
        let query = format!(
            r#"
            SELECT {}
            FROM users
            WHERE ($1::text IS NULL OR department = $1)
              AND ($2::bool IS NULL OR is_active = $2)
              AND ($3::bool IS NULL OR is_admin = $3)
            ORDER BY display_name ASC
            LIMIT $4 OFFSET $5
            "#,
            SELECT_COLUMNS
        );
        let items = sqlx::query_as::<_, User>(&query)
            .bind(&filter.department)
            .bind(filter.is_active)
            .bind(filter.is_admin)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR department = $1)
              AND ($2::bool IS NULL OR is_active = $2)
              AND ($3::bool IS NULL OR is_admin = $3)
            "#,
        )
        .bind(&filter.department)
        .bind(filter.is_active)
        .bind(filter.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(PagedResult { items, total, page: page.page, per_page: page.per_page })
    }

    /// Partial update from the admin surface. `is_super_admin` is
    /// deliberately not a field of [`UserUpdate`]. Runs against the caller's
    /// open transaction so it commits atomically with the audit row that
    /// describes it (§4.8, invariant 4).
    pub async fn update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        update: UserUpdate,
    ) -> ApiResult<User> {
        let query = format!(
            r#"
            UPDATE users
            SET department = COALESCE($2, department),
                job_title = COALESCE($3, job_title),
                is_active = COALESCE($4, is_active),
                is_admin = COALESCE($5, is_admin),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&update.department)
            .bind(&update.job_title)
            .bind(update.is_active)
            .bind(update.is_admin)
            .fetch_optional(&mut **tx)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", id) })
    }

    /// Bulk activate/deactivate, idempotent per id. Transactional for the
    /// same reason as [`UserRepository::update`].
    pub async fn bulk_set_active(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ids: &[Uuid],
        is_active: bool,
    ) -> ApiResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET is_active = $2, updated_at = now() WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(is_active)
        .execute(&mut **tx)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_filter_default_has_no_constraints() {
        let filter = UserFilter::default();
        assert!(filter.department.is_none());
        assert!(filter.is_active.is_none());
        assert!(filter.is_admin.is_none());
    }
}
