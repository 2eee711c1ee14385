//! # API Layer
//!
//! The API layer handles HTTP request/response processing for the OAuth 2.0 /
//! OpenID Connect authorization core. It bridges the HTTP world with the
//! service layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            HTTP Request                                 │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Routes (routes.rs)                             │
//! │  Define URL patterns and HTTP methods, map to handlers                  │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Handlers (handlers.rs)                           │
//! │  1. Extract request data (query/form/JSON, session, path params)        │
//! │  2. Validate input using DTOs                                           │
//! │  3. Call service layer                                                  │
//! │  4. Transform response                                                  │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          DTOs (dto.rs)                                  │
//! │  - Request validation (serde, validator)                                │
//! │  - Response serialization                                               │
//! │  - OAuth/OIDC wire shapes                                               │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! | Module       | Responsibility                                      |
//! |--------------|-----------------------------------------------------|
//! | `routes`     | Route definitions with actix-web's `configure()`    |
//! | `handlers`   | Request handlers (extractors → service → response)  |
//! | `dto`        | Data Transfer Objects for request/response          |
//!
//! ## Endpoint Summary
//!
//! See [`routes`] for the full route table. In short: the OAuth/OIDC runtime
//! (`/oauth/*`, discovery), the upstream SSO handoff (`/auth/sso/*`), and the
//! application hub API (`/api/applications`, `/api/admin/*`).
//!
//! ## Related Documentation
//!
//! - Service layer: [`crate::service`]
//! - Error responses: [`shared::errors::ApiError`]
//! - Session middleware: [`shared::auth::session`]

pub mod dto;
pub mod handlers;
pub mod routes;
