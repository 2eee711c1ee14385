//! # Repository Layer
//!
//! Data access for the authorization core's nine tables. Four capability
//! interfaces are explicit `async_trait`s so the service layer can be tested
//! against a mock rather than a real database: [`CodeStore`], [`TokenStore`],
//! [`ClientStore`], [`AuditSink`]. Everything else — users, groups, access
//! grants, login history — stays a concrete struct wrapping a `PgPool`,
//! matching this codebase's usual preference for directness over an
//! interface it doesn't need.
//!
//! ## Clean Architecture Principles
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Service Layer                                  │
//! │                    (Business logic, validation)                         │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 │ Uses repositories/capability traits
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Repository Layer                                 │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────┐ ┌─────────────┐ │
//! │  │   CodeStore    │ │  TokenStore   │ │  ClientStore  │ │  AuditSink  │ │
//! │  │ (trait, C3/C4) │ │ (trait, C4/C5)│ │ (trait, C3/C4)│ │ (trait, C8) │ │
//! │  └───────────────┘ └───────────────┘ └───────────────┘ └─────────────┘ │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────────────────────┐ │
//! │  │ UserRepository │ │GroupRepository│ │   AccessRepository (C6)      │ │
//! │  └───────────────┘ └───────────────┘ └───────────────────────────────┘ │
//! │  ┌───────────────────────────┐                                        │
//! │  │  LoginHistoryRepository   │                                        │
//! │  └───────────────────────────┘                                        │
//! └───────────────────────────────────┬─────────────────────────────────────┘
//!                                     │
//!                                     │ sqlx queries
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PostgreSQL Database                             │
//! │  users │ applications │ oauth_codes │ oauth_tokens │ user_groups        │
//! │  user_group_members │ application_access │ audit_logs │ login_history  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Traits for the four capability interfaces only**: `CodeStore`,
//!    `TokenStore`, `ClientStore`, `AuditSink` are used by the OAuth runtime
//!    path (authorize/token/revoke/userinfo) and benefit from being mocked in
//!    service-layer unit tests without a database. Everything else is a
//!    concrete struct, per this crate's usual preference for directness.
//!
//! 2. **Connection Pool**: Every repository holds a `PgPool` clone (cheap —
//!    it's an `Arc` internally) for efficient connection sharing.
//!
//! 3. **Error Handling**: Database errors are mapped to [`shared::errors::ApiError`]
//!    for consistent HTTP responses; unique-constraint violations become
//!    `ApiError::Conflict` (400, not 409 — see `shared::errors`).
//!
//! 4. **No soft deletes on `User`**: accounts are retained indefinitely.
//!    Applications, groups, and access grants may be hard-deleted, which is
//!    why `delete` methods below are real `DELETE` statements, not a
//!    `deleted_at` flip.

pub mod access_repository;
pub mod audit_store;
pub mod client_store;
pub mod code_store;
pub mod group_repository;
pub mod login_history_repository;
pub mod token_store;
pub mod user_repository;

pub use access_repository::AccessRepository;
pub use audit_store::{AuditLogRepository, AuditSink, PgAuditSink};
pub use client_store::{ClientStore, PgClientStore};
pub use code_store::{CodeStore, PgCodeStore};
pub use group_repository::GroupRepository;
pub use login_history_repository::LoginHistoryRepository;
pub use token_store::{PgTokenStore, TokenStore};
pub use user_repository::UserRepository;
