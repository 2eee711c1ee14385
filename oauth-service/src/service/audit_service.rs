//! # Audit & Login History Service (C8)
//!
//! Thin convenience wrapper so callers don't juggle an `AuditSink` and a
//! `LoginHistoryRepository` separately. Every admin-surface mutation routes
//! its audit row through [`AuditService::record_mutation`]; every
//! authentication attempt (SSO callback, dev login, or a session resolved at
//! `/oauth/authorize`) routes through [`AuditService::record_login`].
//!
//! The two write paths are not symmetric. `record_login` is a standalone
//! append — a login failure still gets a `login_history` row even though
//! there's no mutation to audit. `record_mutation` is never standalone: it
//! always runs against a transaction opened with [`AuditService::begin`],
//! the same one the caller uses for the mutation it describes, so the audit
//! row commits atomically with that mutation (§4.8, invariant 4) — an admin
//! update that fails after its audit row is queued rolls the audit row back
//! too, instead of leaving an audit entry for a change that never took
//! effect.

use crate::domain::entities::{AuditLog, LoginHistory, LoginType, NewAuditLog, NewLoginHistory};
use crate::repository::AuditSink;
use crate::repository::LoginHistoryRepository;
use serde_json::Value;
use shared::errors::{ApiError, ApiResult};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
    audit_sink: Arc<dyn AuditSink>,
    login_history: LoginHistoryRepository,
}

impl AuditService {
    pub fn new(pool: PgPool, audit_sink: Arc<dyn AuditSink>, login_history: LoginHistoryRepository) -> Self {
        Self { pool, audit_sink, login_history }
    }

    /// Opens the transaction a mutation and its audit row will share.
    pub async fn begin(&self) -> ApiResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(ApiError::DatabaseError)
    }

    /// Records one admin-surface mutation against `tx`. `action` must be
    /// `entity.verb` (e.g. `user.update`, `group.create`, `access.grant`)
    /// per §4.9. The caller commits `tx` once the mutation and this call
    /// have both succeeded.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_mutation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor_user_id: Option<Uuid>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        old_values: Option<Value>,
        new_values: Option<Value>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> ApiResult<AuditLog> {
        self.audit_sink
            .record(
                tx,
                NewAuditLog {
                    actor_user_id,
                    action: action.into(),
                    entity_type: entity_type.into(),
                    entity_id: entity_id.into(),
                    old_values,
                    new_values,
                    ip_address,
                    user_agent,
                },
            )
            .await
    }

    /// Records one authentication attempt, success or failure.
    pub async fn record_login(
        &self,
        user_id: Option<Uuid>,
        login_type: LoginType,
        success: bool,
        failure_reason: Option<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> ApiResult<LoginHistory> {
        self.login_history
            .record(NewLoginHistory {
                user_id,
                login_type,
                ip_address,
                user_agent,
                success,
                failure_reason,
            })
            .await
    }
}
