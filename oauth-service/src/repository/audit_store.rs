//! # Audit Sink (C8 capability interface)
//!
//! Write-only interface for the append-only audit log. Every admin-surface
//! mutation writes exactly one [`AuditLog`] row through this trait, against
//! the same open transaction as the mutation it describes, so the two either
//! both commit or both roll back. Reading the log back (pagination,
//! filtering) is a separate, concrete concern — see
//! [`crate::repository::audit_store::AuditLogRepository`] — since that side
//! isn't part of the mandated mockable write contract.

use crate::domain::entities::{AuditLog, AuditLogFilter, NewAuditLog, Page, PagedResult};
use async_trait::async_trait;
use shared::errors::{ApiError, ApiResult};
use sqlx::{PgPool, Postgres, Transaction};

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Writes one audit row against `tx`. The caller owns the transaction's
    /// lifecycle — this only queues the insert, it never commits.
    async fn record(&self, tx: &mut Transaction<'_, Postgres>, entry: NewAuditLog) -> ApiResult<AuditLog>;
}

#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, tx: &mut Transaction<'_, Postgres>, entry: NewAuditLog) -> ApiResult<AuditLog> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (
                id, actor_user_id, action, entity_type, entity_id, old_values,
                new_values, ip_address, user_agent, created_at
            )
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, now())
            RETURNING id, actor_user_id, action, entity_type, entity_id, old_values,
                      new_values, ip_address, user_agent, created_at
            "#,
        )
        .bind(entry.actor_user_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("failed to write audit log: {}", e) })
    }
}

/// Read side of the audit trail: paginated, filtered listing for the admin
/// surface. Kept out of [`AuditSink`] because it isn't part of the
/// write-path mockable contract the design calls for.
#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: AuditLogFilter,
        page: Page,
    ) -> ApiResult<PagedResult<AuditLog>> {
        let items = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, actor_user_id, action, entity_type, entity_id, old_values,
                   new_values, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE ($1::text IS NULL OR action = $1)
              AND ($2::text IS NULL OR entity_type = $2)
              AND ($3::uuid IS NULL OR actor_user_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&filter.action)
        .bind(&filter.entity_type)
        .bind(filter.user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM audit_logs
            WHERE ($1::text IS NULL OR action = $1)
              AND ($2::text IS NULL OR entity_type = $2)
              AND ($3::uuid IS NULL OR actor_user_id = $3)
            "#,
        )
        .bind(&filter.action)
        .bind(&filter.entity_type)
        .bind(filter.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(PagedResult { items, total, page: page.page, per_page: page.per_page })
    }
}
