//! # Admin Service (§4.9): Users, Groups, Access Grants, Stats
//!
//! The remainder of the admin mutation surface not covered by
//! [`crate::service::application_service`]. Users, Groups, and Access grants
//! each write one audit row per mutation; Stats is read-only and writes
//! none (§4.9's rollup explicitly isn't a mutation).

use crate::domain::entities::{
    AccessPrincipal, ApplicationAccess, NewUserGroup, Page, PagedResult, User, UserGroup,
    UserGroupUpdate, UserUpdate,
};
use crate::repository::access_repository::AccessRepository;
use crate::repository::group_repository::{GroupRepository, GroupWithMemberCount};
use crate::repository::user_repository::{UserFilter, UserRepository};
use crate::repository::ClientStore;
use crate::service::audit_service::AuditService;
use serde_json::json;
use shared::errors::{ApiError, ApiResult};
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// Users
// =============================================================================

#[derive(Clone)]
pub struct UserAdminService {
    user_repository: UserRepository,
    audit: AuditService,
}

impl UserAdminService {
    pub fn new(user_repository: UserRepository, audit: AuditService) -> Self {
        Self { user_repository, audit }
    }

    pub async fn list(&self, filter: UserFilter, page: Page) -> ApiResult<PagedResult<User>> {
        self.user_repository.list(filter, page).await
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Option<User>> {
        self.user_repository.find_by_id(id).await
    }

    pub async fn update(&self, actor_user_id: Uuid, id: Uuid, update: UserUpdate) -> ApiResult<User> {
        let mut tx = self.audit.begin().await?;
        let user = self.user_repository.update(&mut tx, id, update).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "user.update",
                "user",
                id.to_string(),
                None,
                Some(json!({ "is_active": user.is_active, "is_admin": user.is_admin })),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(user)
    }

    /// Bulk activate/deactivate. One audit row per call (not per user) —
    /// the mutation is the bulk operation, not each row it touches.
    pub async fn bulk_set_active(&self, actor_user_id: Uuid, ids: &[Uuid], is_active: bool) -> ApiResult<u64> {
        let mut tx = self.audit.begin().await?;
        let count = self.user_repository.bulk_set_active(&mut tx, ids, is_active).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                if is_active { "user.bulk_activate" } else { "user.bulk_deactivate" },
                "user",
                format!("{} users", ids.len()),
                None,
                Some(json!({ "user_ids": ids, "count": count })),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(count)
    }
}

// =============================================================================
// Groups
// =============================================================================

#[derive(Clone)]
pub struct GroupAdminService {
    group_repository: GroupRepository,
    audit: AuditService,
}

impl GroupAdminService {
    pub fn new(group_repository: GroupRepository, audit: AuditService) -> Self {
        Self { group_repository, audit }
    }

    pub async fn list(&self, page: Page) -> ApiResult<PagedResult<GroupWithMemberCount>> {
        self.group_repository.list_with_member_counts(page).await
    }

    pub async fn create(&self, actor_user_id: Uuid, new_group: NewUserGroup) -> ApiResult<UserGroup> {
        let name = new_group.name.clone();
        let mut tx = self.audit.begin().await?;
        let group = self.group_repository.create(&mut tx, new_group).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "group.create",
                "group",
                group.id.to_string(),
                None,
                Some(json!({ "name": name })),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(group)
    }

    pub async fn update(&self, actor_user_id: Uuid, id: Uuid, update: UserGroupUpdate) -> ApiResult<UserGroup> {
        let mut tx = self.audit.begin().await?;
        let group = self.group_repository.update(&mut tx, id, update).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "group.update",
                "group",
                id.to_string(),
                None,
                Some(json!({ "name": group.name })),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(group)
    }

    pub async fn delete(&self, actor_user_id: Uuid, id: Uuid) -> ApiResult<()> {
        let mut tx = self.audit.begin().await?;
        self.group_repository.delete(&mut tx, id).await?;

        self.audit
            .record_mutation(&mut tx, Some(actor_user_id), "group.delete", "group", id.to_string(), None, None, None, None)
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    pub async fn add_member(&self, actor_user_id: Uuid, group_id: Uuid, user_id: Uuid) -> ApiResult<()> {
        let mut tx = self.audit.begin().await?;
        self.group_repository.add_member(&mut tx, group_id, user_id).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "group.add_member",
                "group",
                group_id.to_string(),
                None,
                Some(json!({ "user_id": user_id })),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    pub async fn remove_member(&self, actor_user_id: Uuid, group_id: Uuid, user_id: Uuid) -> ApiResult<()> {
        let mut tx = self.audit.begin().await?;
        self.group_repository.remove_member(&mut tx, group_id, user_id).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "group.remove_member",
                "group",
                group_id.to_string(),
                None,
                Some(json!({ "user_id": user_id })),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(())
    }
}

// =============================================================================
// Access grants
// =============================================================================

#[derive(Clone)]
pub struct AccessAdminService {
    access_repository: AccessRepository,
    audit: AuditService,
}

impl AccessAdminService {
    pub fn new(access_repository: AccessRepository, audit: AuditService) -> Self {
        Self { access_repository, audit }
    }

    pub async fn list_for_application(&self, application_id: Uuid) -> ApiResult<Vec<ApplicationAccess>> {
        self.access_repository.list_for_application(application_id).await
    }

    pub async fn grant(
        &self,
        actor_user_id: Uuid,
        application_id: Uuid,
        principal: AccessPrincipal,
    ) -> ApiResult<ApplicationAccess> {
        let mut tx = self.audit.begin().await?;
        let grant = self.access_repository.grant(&mut tx, application_id, principal).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "access.grant",
                "application_access",
                grant.id.to_string(),
                None,
                Some(principal_to_json(principal, application_id)),
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(grant)
    }

    pub async fn revoke(&self, actor_user_id: Uuid, application_id: Uuid, principal: AccessPrincipal) -> ApiResult<()> {
        let mut tx = self.audit.begin().await?;
        self.access_repository.revoke(&mut tx, application_id, principal).await?;

        self.audit
            .record_mutation(
                &mut tx,
                Some(actor_user_id),
                "access.revoke",
                "application_access",
                application_id.to_string(),
                Some(principal_to_json(principal, application_id)),
                None,
                None,
                None,
            )
            .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(())
    }
}

fn principal_to_json(principal: AccessPrincipal, application_id: Uuid) -> serde_json::Value {
    match principal {
        AccessPrincipal::User(user_id) => json!({ "application_id": application_id, "user_id": user_id }),
        AccessPrincipal::Group(group_id) => json!({ "application_id": application_id, "group_id": group_id }),
    }
}

// =============================================================================
// Stats (read-only, no audit row)
// =============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_applications: i64,
    pub active_applications: i64,
    pub total_groups: i64,
}

#[derive(Clone)]
pub struct StatsService {
    user_repository: UserRepository,
    client_store: Arc<dyn ClientStore>,
    group_repository: GroupRepository,
}

impl StatsService {
    pub fn new(user_repository: UserRepository, client_store: Arc<dyn ClientStore>, group_repository: GroupRepository) -> Self {
        Self { user_repository, client_store, group_repository }
    }

    /// A coarse rollup across all four admin surfaces. Deliberately
    /// unfiltered (full-table counts), since it backs a dashboard summary
    /// rather than a paginated listing.
    pub async fn summary(&self) -> ApiResult<AdminStats> {
        let all_users = self.user_repository.list(UserFilter::default(), Page { page: 1, per_page: 1 }).await?;
        let active_users = self
            .user_repository
            .list(UserFilter { is_active: Some(true), ..Default::default() }, Page { page: 1, per_page: 1 })
            .await?;

        // `ClientStore::list` has no active-only filter (the admin listing
        // shows every application regardless of status), so the active
        // count is derived by paging through every row rather than a
        // second dedicated query.
        let total_apps = self.client_store.list(Page { page: 1, per_page: 1 }).await?.total;
        let mut active_applications = 0i64;
        let mut page_num = 1u32;
        loop {
            let page = self.client_store.list(Page { page: page_num, per_page: 100 }).await?;
            if page.items.is_empty() {
                break;
            }
            active_applications += page.items.iter().filter(|a| a.is_active).count() as i64;
            if (page_num as i64) * 100 >= page.total {
                break;
            }
            page_num += 1;
        }

        let all_groups = self.group_repository.list_with_member_counts(Page { page: 1, per_page: 1 }).await?;

        Ok(AdminStats {
            total_users: all_users.total,
            active_users: active_users.total,
            total_applications: total_apps,
            active_applications,
            total_groups: all_groups.total,
        })
    }
}
