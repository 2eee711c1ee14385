//! # Application Admin Service (§4.9)
//!
//! Admin CRUD over the OAuth client registry. Every mutation writes exactly
//! one [`AuditLog`] row (`application.create`, `application.update`,
//! `application.regenerate_secret`, `application.delete`) naming the acting
//! admin — the audit write and the mutation are the service's two
//! responsibilities per call, never one without the other.

use crate::domain::entities::{Application, ApplicationUpdate, NewApplication, Page, PagedResult};
use crate::repository::ClientStore;
use crate::service::audit_service::AuditService;
use serde_json::json;
use shared::auth::{generate_client_secret, ClientSecretHasher};
use shared::errors::{ApiError, ApiResult};
use std::sync::Arc;
use uuid::Uuid;

/// A newly created or re-secreted application, carrying the plaintext
/// secret that is shown to the admin exactly once.
#[derive(Debug, Clone)]
pub struct ApplicationWithSecret {
    pub application: Application,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct ApplicationService {
    client_store: Arc<dyn ClientStore>,
    secret_hasher: ClientSecretHasher,
    audit: AuditService,
}

impl ApplicationService {
    pub fn new(client_store: Arc<dyn ClientStore>, secret_hasher: ClientSecretHasher, audit: AuditService) -> Self {
        Self { client_store, secret_hasher, audit }
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Option<Application>> {
        self.client_store.find_by_id(id).await
    }

    pub async fn list(&self, page: Page) -> ApiResult<PagedResult<Application>> {
        self.client_store.list(page).await
    }

    /// Generates a fresh `client_id` and high-entropy secret, hashes the
    /// secret with Argon2id for storage, and returns the plaintext once.
    pub async fn create(
        &self,
        actor_user_id: Uuid,
        new_app: NewApplication,
    ) -> ApiResult<ApplicationWithSecret> {
        let client_id = format!("client_{}", Uuid::new_v4().simple());
        let client_secret = generate_client_secret();
        let client_secret_hash = self.secret_hasher.hash(&client_secret)?;

        let slug = new_app.slug.clone();
        let mut tx = self.audit.begin().await?;
        let application = self.client_store.create(&mut tx, new_app, client_id, client_secret_hash).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "application.create",
                "application",
                application.id.to_string(),
                None,
                Some(json!({ "name": application.name, "slug": slug })),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(ApplicationWithSecret { application, client_secret })
    }

    pub async fn update(
        &self,
        actor_user_id: Uuid,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> ApiResult<Application> {
        let before = self.client_store.find_by_id(id).await?;
        let mut tx = self.audit.begin().await?;
        let after = self.client_store.update(&mut tx, id, update).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "application.update",
                "application",
                id.to_string(),
                before.and_then(|b| serde_json::to_value(&b.name).ok().map(|n| json!({ "name": n }))),
                Some(json!({ "name": after.name, "is_active": after.is_active })),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(after)
    }

    /// Mints a new secret, replacing the old one; any token already issued
    /// under the old secret is unaffected (secrets authenticate the client
    /// at exchange time, not individual tokens).
    pub async fn regenerate_secret(&self, actor_user_id: Uuid, id: Uuid) -> ApiResult<ApplicationWithSecret> {
        let client_secret = generate_client_secret();
        let client_secret_hash = self.secret_hasher.hash(&client_secret)?;
        let mut tx = self.audit.begin().await?;
        let application = self.client_store.regenerate_secret(&mut tx, id, client_secret_hash).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "application.regenerate_secret",
                "application",
                id.to_string(),
                None,
                None,
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(ApplicationWithSecret { application, client_secret })
    }

    /// Hard-deletes the application; `ON DELETE CASCADE` removes every
    /// dependent code, token, and access grant.
    pub async fn delete(&self, actor_user_id: Uuid, id: Uuid) -> ApiResult<()> {
        let mut tx = self.audit.begin().await?;
        self.client_store.delete(&mut tx, id).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "application.delete",
                "application",
                id.to_string(),
                None,
                None,
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(())
    }
}
