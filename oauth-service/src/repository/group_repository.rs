//! # Group Repository
//!
//! Data access for [`UserGroup`] and its membership join table
//! (`user_group_members`). Groups exist solely to fan access grants out to
//! many users at once (§4.9); membership add/remove is idempotent.

use crate::domain::entities::{NewUserGroup, Page, PagedResult, UserGroup, UserGroupUpdate};
use shared::errors::{ApiError, ApiResult};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "id, name, color, description, created_at, updated_at";

/// A group row annotated with its current member count, for the admin
/// group-listing endpoint.
#[derive(Debug, Clone)]
pub struct GroupWithMemberCount {
    pub group: UserGroup,
    pub member_count: i64,
}

#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<UserGroup>> {
        let query = format!("SELECT {} FROM user_groups WHERE id = $1", SELECT_COLUMNS);
        sqlx::query_as::<_, UserGroup>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Transactional so the row and its audit entry commit together (§4.8,
    /// invariant 4).
    pub async fn create(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        new_group: NewUserGroup,
    ) -> ApiResult<UserGroup> {
        let query = format!(
            r#"
            INSERT INTO user_groups (id, name, color, description, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, $3, now(), now())
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, UserGroup>(&query)
            .bind(&new_group.name)
            .bind(&new_group.color)
            .bind(&new_group.description)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.constraint() == Some("user_groups_name_key") {
                        return ApiError::Conflict { resource: "name".to_string() };
                    }
                }
                ApiError::InternalError { message: format!("database error: {}", e) }
            })
    }

    pub async fn update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        update: UserGroupUpdate,
    ) -> ApiResult<UserGroup> {
        let query = format!(
            r#"
            UPDATE user_groups
            SET name = COALESCE($2, name),
                color = COALESCE($3, color),
                description = COALESCE($4, description),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, UserGroup>(&query)
            .bind(id)
            .bind(&update.name)
            .bind(&update.color)
            .bind(&update.description)
            .fetch_optional(&mut **tx)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound { resource: format!("group:{}", id) })
    }

    pub async fn delete(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM user_groups WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: format!("group:{}", id) });
        }
        Ok(())
    }

    pub async fn list_with_member_counts(
        &self,
        page: Page,
    ) -> ApiResult<PagedResult<GroupWithMemberCount>> {
        let rows: Vec<(Uuid, String, String, Option<String>, _, _, i64)> = sqlx::query_as(
            r#"
            SELECT g.id, g.name, g.color, g.description, g.created_at, g.updated_at,
                   COUNT(m.user_id) as member_count
            FROM user_groups g
            LEFT JOIN user_group_members m ON m.group_id = g.id
            GROUP BY g.id
            ORDER BY g.name ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        let items = rows
            .into_iter()
            .map(|(id, name, color, description, created_at, updated_at, member_count)| {
                GroupWithMemberCount {
                    group: UserGroup { id, name, color, description, created_at, updated_at },
                    member_count,
                }
            })
            .collect();

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_groups")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(PagedResult { items, total, page: page.page, per_page: page.per_page })
    }

    /// Adds a user to a group. Idempotent — adding an already-present member
    /// is a no-op, not an error.
    pub async fn add_member(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_group_members (group_id, user_id, created_at)
            VALUES ($1, $2, now())
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    /// Removes a user from a group. Idempotent — removing an absent member
    /// is a no-op, not an error.
    pub async fn remove_member(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        group_id: Uuid,
        user_id: Uuid,
    ) -> ApiResult<()> {
        sqlx::query("DELETE FROM user_group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    /// Bulk variant outside the single-member transactional path above —
    /// each insert is independently idempotent, so there's no atomicity
    /// requirement tying them together.
    pub async fn add_members_bulk(&self, group_id: Uuid, user_ids: &[Uuid]) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_group_members (group_id, user_id, created_at)
            SELECT $1, unnest($2::uuid[]), now()
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_ids)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    pub async fn remove_members_bulk(&self, group_id: Uuid, user_ids: &[Uuid]) -> ApiResult<()> {
        sqlx::query("DELETE FROM user_group_members WHERE group_id = $1 AND user_id = ANY($2)")
            .bind(group_id)
            .bind(user_ids)
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    /// Names of every group `user_id` belongs to, used to resolve the
    /// access-decision engine's principal gate and the `groups` claim.
    pub async fn group_names_for_user(&self, user_id: Uuid) -> ApiResult<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT g.name
            FROM user_groups g
            JOIN user_group_members m ON m.group_id = g.id
            WHERE m.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }
}
