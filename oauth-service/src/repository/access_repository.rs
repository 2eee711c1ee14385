//! # Access Repository (C6)
//!
//! Data access for [`ApplicationAccess`] grants. Backs the Access-Decision
//! Engine's principal gate: does *this* user, or any group they belong to,
//! have a grant against *this* application? Also backs the admin grant/revoke
//! surface (§4.9), which is idempotent in both directions.

use crate::domain::entities::{AccessPrincipal, ApplicationAccess};
use shared::errors::{ApiError, ApiResult};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccessRepository {
    pool: PgPool,
}

impl AccessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grants access. Idempotent: granting an already-granted principal is a
    /// no-op, not a conflict. Transactional so the grant and its audit row
    /// commit together (§4.8, invariant 4).
    pub async fn grant(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        application_id: Uuid,
        principal: AccessPrincipal,
    ) -> ApiResult<ApplicationAccess> {
        let (user_id, group_id) = match principal {
            AccessPrincipal::User(id) => (Some(id), None),
            AccessPrincipal::Group(id) => (None, Some(id)),
        };

        sqlx::query_as::<_, ApplicationAccess>(
            r#"
            INSERT INTO application_access (id, application_id, user_id, group_id, created_at)
            VALUES (gen_random_uuid(), $1, $2, $3, now())
            ON CONFLICT (application_id, user_id, group_id) DO UPDATE
                SET application_id = EXCLUDED.application_id
            RETURNING id, application_id, user_id, group_id, created_at
            "#,
        )
        .bind(application_id)
        .bind(user_id)
        .bind(group_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("failed to write access grant: {}", e) })
    }

    /// Revokes access. Idempotent: revoking an ungranted principal is a
    /// no-op, not an error.
    pub async fn revoke(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        application_id: Uuid,
        principal: AccessPrincipal,
    ) -> ApiResult<()> {
        let (user_id, group_id) = match principal {
            AccessPrincipal::User(id) => (Some(id), None),
            AccessPrincipal::Group(id) => (None, Some(id)),
        };

        sqlx::query(
            r#"
            DELETE FROM application_access
            WHERE application_id = $1
              AND user_id IS NOT DISTINCT FROM $2
              AND group_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(application_id)
        .bind(user_id)
        .bind(group_id)
        .execute(&mut **tx)
        .await
        .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    pub async fn list_for_application(&self, application_id: Uuid) -> ApiResult<Vec<ApplicationAccess>> {
        sqlx::query_as::<_, ApplicationAccess>(
            r#"
            SELECT id, application_id, user_id, group_id, created_at
            FROM application_access
            WHERE application_id = $1
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Whether `user_id` (directly, or via any group membership) has been
    /// granted access to `application_id`. This is the principal-gate half
    /// of the Access-Decision Engine; the caller is responsible for
    /// combining it with the active-application and department gates.
    pub async fn user_has_access(&self, application_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM application_access aa
                WHERE aa.application_id = $1
                  AND (
                    aa.user_id = $2
                    OR aa.group_id IN (
                        SELECT group_id FROM user_group_members WHERE user_id = $2
                    )
                  )
            )
            "#,
        )
        .bind(application_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(exists.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_principal_splits_into_user_or_group() {
        let user_id = Uuid::new_v4();
        match AccessPrincipal::User(user_id) {
            AccessPrincipal::User(id) => assert_eq!(id, user_id),
            AccessPrincipal::Group(_) => panic!("expected user principal"),
        }
    }
}
