//! # Client Store (C3/C4 capability interface)
//!
//! Persists and looks up [`Application`] — the OAuth client registry. Backs
//! both the OAuth runtime path (resolving `client_id` at `/oauth/authorize`
//! and `/oauth/token`) and the admin mutation surface (§4.9) for creating,
//! updating, and deleting applications.

use crate::domain::entities::{Application, ApplicationUpdate, NewApplication, Page, PagedResult};
use async_trait::async_trait;
use shared::errors::{ApiError, ApiResult};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn find_by_client_id(&self, client_id: &str) -> ApiResult<Option<Application>>;
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Application>>;
    async fn find_by_slug(&self, slug: &str) -> ApiResult<Option<Application>>;
    async fn list(&self, page: Page) -> ApiResult<PagedResult<Application>>;

    /// Inserts a new application. `client_id`/`client_secret_hash` are
    /// generated by the service layer, never accepted from the admin
    /// caller, so they're passed in already minted. Runs against the
    /// caller's open transaction so the insert commits atomically with the
    /// audit row that describes it (§4.8, invariant 4).
    async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new_app: NewApplication,
        client_id: String,
        client_secret_hash: String,
    ) -> ApiResult<Application>;

    async fn update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> ApiResult<Application>;

    /// Replaces only the secret hash, leaving `client_id` untouched.
    async fn regenerate_secret(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        new_secret_hash: String,
    ) -> ApiResult<Application>;

    /// Hard-deletes the application row. The deliberate scoped exception to
    /// the no-hard-delete-by-default posture: `ON DELETE CASCADE` on
    /// `oauth_codes`, `oauth_tokens`, and `application_access` foreign keys
    /// removes everything that referenced this application.
    async fn delete(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> ApiResult<()>;
}

#[derive(Clone)]
pub struct PgClientStore {
    pool: PgPool,
}

impl PgClientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_conflict(e: sqlx::Error) -> ApiError {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.constraint() == Some("applications_slug_key") {
                return ApiError::Conflict { resource: "slug".to_string() };
            }
        }
        ApiError::InternalError { message: format!("database error: {}", e) }
    }
}

const SELECT_COLUMNS: &str = r#"
    id, name, slug, client_id, client_secret_hash, redirect_uris, is_active,
    is_public, allowed_departments, description, base_url, icon_url,
    created_at, updated_at
"#;

#[async_trait]
impl ClientStore for PgClientStore {
    async fn find_by_client_id(&self, client_id: &str) -> ApiResult<Option<Application>> {
        let query = format!("SELECT {} FROM applications WHERE client_id = $1", SELECT_COLUMNS);
        sqlx::query_as::<_, Application>(&query)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Application>> {
        let query = format!("SELECT {} FROM applications WHERE id = $1", SELECT_COLUMNS);
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn find_by_slug(&self, slug: &str) -> ApiResult<Option<Application>> {
        let query = format!("SELECT {} FROM applications WHERE slug = $1", SELECT_COLUMNS);
        sqlx::query_as::<_, Application>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    async fn list(&self, page: Page) -> ApiResult<PagedResult<Application>> {
        let query = format!(
            "SELECT {} FROM applications ORDER BY name ASC LIMIT $1 OFFSET $2",
            SELECT_COLUMNS
        );
        let items = sqlx::query_as::<_, Application>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(PagedResult { items, total, page: page.page, per_page: page.per_page })
    }

    async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new_app: NewApplication,
        client_id: String,
        client_secret_hash: String,
    ) -> ApiResult<Application> {
        let query = format!(
            r#"
            INSERT INTO applications (
                id, name, slug, client_id, client_secret_hash, redirect_uris,
                is_active, is_public, allowed_departments, description, base_url,
                icon_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, true, $7, $8, $9, $10, $11, now(), now())
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(Uuid::new_v4())
            .bind(&new_app.name)
            .bind(&new_app.slug)
            .bind(&client_id)
            .bind(&client_secret_hash)
            .bind(&new_app.redirect_uris)
            .bind(new_app.is_public)
            .bind(&new_app.allowed_departments)
            .bind(&new_app.description)
            .bind(&new_app.base_url)
            .bind(&new_app.icon_url)
            .fetch_one(&mut **tx)
            .await
            .map_err(Self::map_conflict)
    }

    async fn update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> ApiResult<Application> {
        let query = format!(
            r#"
            UPDATE applications
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                base_url = COALESCE($4, base_url),
                icon_url = COALESCE($5, icon_url),
                redirect_uris = COALESCE($6, redirect_uris),
                is_active = COALESCE($7, is_active),
                is_public = COALESCE($8, is_public),
                allowed_departments = COALESCE($9, allowed_departments),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .bind(&update.name)
            .bind(&update.description)
            .bind(&update.base_url)
            .bind(&update.icon_url)
            .bind(&update.redirect_uris)
            .bind(update.is_active)
            .bind(update.is_public)
            .bind(&update.allowed_departments)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Self::map_conflict)?
            .ok_or_else(|| ApiError::NotFound { resource: format!("application:{}", id) })
    }

    async fn regenerate_secret(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        new_secret_hash: String,
    ) -> ApiResult<Application> {
        let query = format!(
            r#"
            UPDATE applications
            SET client_secret_hash = $2, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .bind(&new_secret_hash)
            .fetch_optional(&mut **tx)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound { resource: format!("application:{}", id) })
    }

    async fn delete(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: format!("application:{}", id) });
        }
        Ok(())
    }
}
