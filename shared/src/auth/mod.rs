//! # Authentication Module
//!
//! Authentication building blocks for the identity core.
//!
//! ## Module Structure
//!
//! ```text
//! auth/
//! ├── jwt.rs     - ID token minting and validation (HS256)
//! ├── password.rs - Client-secret hashing with Argon2id
//! └── session.rs  - Session Authenticator (C2): resolves a request to a User
//! ```
//!
//! ## Overview
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`IdTokenService`] | Mint/validate the OIDC ID token returned from `/oauth/token` |
//! | [`ClientSecretHasher`] | Argon2id hashing for `Application.client_secret_hash` |
//! | [`SessionAuthenticator`] | Resolve a request's session cookie/header to a `User` |
//! | [`AuthenticatedUser`] | Extractor for the resolved identity |
//!
//! This core performs no local password authentication — end users
//! authenticate exclusively through the upstream SSO collaborator (see
//! [`crate::redis_client`] for the session-lookup side of that contract).
//! What lives here is everything the core itself is responsible for:
//! minting the tokens it issues, authenticating the OAuth *clients* that
//! present a secret, and resolving who is calling.

pub mod jwt;
pub mod password;
pub mod session;

pub use jwt::{IdTokenClaims, IdTokenService, IdTokenSubject};
pub use password::{generate_client_secret, ClientSecretHasher};
pub use session::{AuthenticatedUser, MaybeAuthenticatedUser, SessionAuthenticator};
