//! # Client Secret Hashing with Argon2id
//!
//! Secure storage for OAuth client secrets (`Application.client_secret_hash`).
//!
//! ## Why Argon2id, for Client Secrets?
//!
//! This deployment has no local password auth — end users authenticate
//! exclusively through the upstream SSO collaborator. The one secret this
//! server stores a hash of is the **client secret** each registered
//! `Application` uses to authenticate itself at `/oauth/token` (and
//! `/oauth/revoke`). It's server-generated, high-entropy, and never
//! user-chosen, but it's still a bearer secret worth hashing at rest rather
//! than storing in plaintext — so the same Argon2id machinery applies.
//!
//! Argon2 won the [Password Hashing Competition](https://www.password-hashing.net/)
//! in 2015 and is recommended by [OWASP](https://cheatsheetseries.owasp.org/cheatsheets/Password_Storage_Cheat_Sheet.html)
//! for exactly this kind of secret-at-rest hashing.
//!
//! ## Security Parameters (OWASP Recommended)
//!
//! | Parameter | Value | Purpose |
//! |-----------|-------|---------|
//! | Memory | 64 MiB | Makes attacks expensive (GPU memory) |
//! | Iterations | 3 | Time cost (slows brute force) |
//! | Parallelism | 4 | CPU lanes (matches typical cores) |
//! | Output | 32 bytes | Hash length |
//!
//! ## PHC String Format
//!
//! ```text
//! $argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>
//! ```
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::auth::password::{ClientSecretHasher, generate_client_secret};
//!
//! let hasher = ClientSecretHasher::new();
//!
//! // When registering an application, mint and hash a secret once:
//! let plaintext_secret = generate_client_secret();
//! let hash = hasher.hash(&plaintext_secret)?;
//! // Store `hash`; return `plaintext_secret` to the admin exactly once.
//!
//! // At /oauth/token, verify the client's presented secret:
//! if hasher.verify(&presented_secret, &stored_hash)? {
//!     // client authenticated
//! } else {
//!     return Err(ApiError::invalid_grant());
//! }
//! ```

use crate::errors::ApiError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::Rng;

/// Secure client-secret hashing service using Argon2id.
///
/// ## Thread Safety
///
/// `Clone` and `Send + Sync`, safe for concurrent use. Each hash operation
/// generates a new random salt.
#[derive(Clone)]
pub struct ClientSecretHasher {
    argon2: Argon2<'static>,
}

impl Default for ClientSecretHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSecretHasher {
    /// Creates a new hasher with OWASP-recommended parameters.
    pub fn new() -> Self {
        let params = Params::new(
            64 * 1024, // 64 MiB memory cost
            3,         // 3 iterations (time cost)
            4,         // 4 lanes (parallelism)
            None,      // default output length (32 bytes)
        )
        .expect("Invalid Argon2 params"); // Safe: these params are always valid

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        Self { argon2 }
    }

    /// Hashes a client secret for storage as `Application.client_secret_hash`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InternalError` if hashing fails (rare).
    pub fn hash(&self, secret: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::InternalError {
                message: format!("client secret hashing failed: {}", e),
            })
    }

    /// Verifies a presented client secret against the stored hash.
    ///
    /// Uses constant-time comparison internally (via `argon2`'s
    /// `verify_password`), so it does not leak timing information about how
    /// close a guess was.
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool, ApiError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| ApiError::InternalError {
            message: format!("invalid client secret hash format: {}", e),
        })?;

        match self.argon2.verify_password(secret.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(ApiError::InternalError {
                message: format!("client secret verification failed: {}", e),
            }),
        }
    }
}

impl std::fmt::Debug for ClientSecretHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretHasher").finish_non_exhaustive()
    }
}

/// Generates a new high-entropy, URL-safe client secret.
///
/// Called once when an `Application` is created or its secret is
/// regenerated. The returned value is shown to the admin exactly once; only
/// its Argon2id hash is persisted.
pub fn generate_client_secret() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    const LEN: usize = 48;

    let mut rng = rand::thread_rng();
    (0..LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_correct_secret() {
        let hasher = ClientSecretHasher::new();
        let secret = generate_client_secret();

        let hash = hasher.hash(&secret).unwrap();

        assert_ne!(hash, secret);
        assert!(hasher.verify(&secret, &hash).unwrap());
    }

    #[test]
    fn test_verify_wrong_secret() {
        let hasher = ClientSecretHasher::new();
        let secret = generate_client_secret();
        let wrong_secret = generate_client_secret();

        let hash = hasher.hash(&secret).unwrap();

        assert!(!hasher.verify(&wrong_secret, &hash).unwrap());
    }

    #[test]
    fn test_different_hashes_for_same_secret() {
        let hasher = ClientSecretHasher::new();
        let secret = "fixed-secret-for-testing-purposes-only";

        let hash1 = hasher.hash(secret).unwrap();
        let hash2 = hasher.hash(secret).unwrap();

        assert_ne!(hash1, hash2);
        assert!(hasher.verify(secret, &hash1).unwrap());
        assert!(hasher.verify(secret, &hash2).unwrap());
    }

    #[test]
    fn test_hash_is_phc_format() {
        let hasher = ClientSecretHasher::new();
        let hash = hasher.hash(&generate_client_secret()).unwrap();

        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_generate_client_secret_is_high_entropy_and_unique() {
        let a = generate_client_secret();
        let b = generate_client_secret();

        assert_eq!(a.len(), 48);
        assert_ne!(a, b);
    }
}
