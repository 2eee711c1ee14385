//! # Application Services
//!
//! The business-logic layer sitting between the HTTP handlers (`api`) and
//! the repositories (`repository`). Each service owns exactly one of the
//! system components described in the external interfaces:
//!
//! | Service | Component | Responsibility |
//! |---------|-----------|-----------------|
//! | [`oauth_service::OAuthService`] | C3/C4 | `/oauth/authorize`, `/oauth/token`, `/oauth/revoke` |
//! | [`userinfo_service::UserInfoService`] | C5 | `/oauth/userinfo`, discovery document |
//! | [`access_service::AccessService`] | C6 | Access-decision engine (active/department/principal gates) |
//! | [`audit_service::AuditService`] | C8 | Append-only audit log and login history writes |
//! | [`application_service::ApplicationService`] | §4.9 | Admin CRUD for applications (OAuth clients) |
//! | [`admin_service`] | §4.9 | Admin CRUD for users, groups, access grants; read-only stats |
//!
//! Every service takes its dependencies (repositories, other services) by
//! value/`Arc` in its constructor rather than reaching into a global state
//! object, so each is independently unit-testable.

pub mod access_service;
pub mod admin_service;
pub mod application_service;
pub mod audit_service;
pub mod oauth_service;
pub mod userinfo_service;

pub use access_service::AccessService;
pub use admin_service::{AccessAdminService, AdminStats, GroupAdminService, StatsService, UserAdminService};
pub use application_service::{ApplicationService, ApplicationWithSecret};
pub use audit_service::AuditService;
pub use oauth_service::{AuthorizeOutcome, AuthorizeRequest, IssuedTokenSet, OAuthService, RequestingUser, TokenRequest};
pub use userinfo_service::{DiscoveryDocument, UserInfoResponse, UserInfoService};
