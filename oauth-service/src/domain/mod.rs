//! # Domain Layer
//!
//! Core business entities and domain events for the authorization server.
//! This layer is **framework-agnostic** and represents the heart of the
//! OAuth2/OIDC business logic: users, registered applications, authorization
//! codes, tokens, groups, access grants, and the append-only audit/login
//! history trail.
//!
//! ## Clean Architecture Principles
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                         Domain Layer                              │
//! │  ┌─────────────────────────────────────────────────────────────┐  │
//! │  │                       Entities                              │  │
//! │  │  - User: a person authenticated via upstream SSO             │  │
//! │  │  - Application: a registered OAuth relying party (client)    │  │
//! │  │  - AuthorizationCode: single-use code for the token endpoint │  │
//! │  │  - Token: opaque access/refresh token                        │  │
//! │  │  - UserGroup / ApplicationAccess: access-grant fan-out       │  │
//! │  │  - AuditLog / LoginHistory: append-only history              │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! │                                                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐  │
//! │  │                     Domain Events                           │  │
//! │  │  - AuthorizationCodeIssued / Redeemed                        │  │
//! │  │  - TokenIssued / Refreshed / Revoked                         │  │
//! │  │  - LoginSucceeded / LoginFailed / AccessDenied               │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! | Module     | Purpose                                           |
//! |------------|---------------------------------------------------|
//! | `entities` | Core domain entities mapped to database tables    |
//! | `events`   | Domain events, not currently wired to a bus       |
//!
//! ## Design Decisions
//!
//! 1. **Entities vs DTOs**: Domain entities contain all database fields,
//!    while separate DTOs in the API layer handle request/response transformation.
//!
//! 2. **`FromRow` Derive**: Entities use sqlx's `FromRow` for automatic
//!    mapping from database rows, reducing boilerplate. Where a column's
//!    meaning is enum-like (`Token.kind`, `LoginHistory.login_type`) it is
//!    stored as text and matched at the repository boundary rather than via
//!    a custom sqlx `Type` impl.
//!
//! 3. **No soft-deletes on `User`**: users are retained indefinitely (the
//!    department/admin flags are mutated in place); applications, groups,
//!    and access grants may be hard-deleted, per the admin mutation surface.

pub mod entities;
pub mod events;

pub use entities::*;
