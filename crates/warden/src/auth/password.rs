//! Password storage formats and verification.
//!
//! Three formats exist in the user table:
//! - unsalted SHA-256 hex digests from before salting was introduced
//! - salted SHA-256 hex digests, `sha256(password || salt)` (current)
//! - bcrypt hashes written by the admin seeding script
//!
//! Verification dispatches on the stored format; nothing is tried in sequence.

use rand::Rng;
use sha2::{Digest, Sha256};

use warden_common::WardenError;
use warden_common::constants::PASSWORD_SALT_LEN;

const NO_SALT: &[u8] = &[];

/// A stored password in one of the known formats
#[derive(Clone, PartialEq, Eq)]
pub enum PasswordHash {
    /// `hex(sha256(password))`
    LegacySha256 { digest: String },
    /// `hex(sha256(password || salt))`
    SaltedSha256 { digest: String, salt: Vec<u8> },
    /// Modular-crypt bcrypt string (`$2b$...`)
    Bcrypt { hash: String },
}

impl PasswordHash {
    /// Hash a new password with a fresh random salt
    pub fn new(password: &str) -> Self {
        let mut salt = vec![0u8; PASSWORD_SALT_LEN];
        rand::rng().fill(&mut salt[..]);
        let digest = salted_digest(password, &salt);
        Self::SaltedSha256 { digest, salt }
    }

    /// Classify a persisted `(hash, salt)` row
    pub fn from_stored(hash: &str, salt: &[u8]) -> Self {
        if is_bcrypt(hash) {
            Self::Bcrypt {
                hash: hash.to_string(),
            }
        } else if salt.is_empty() {
            Self::LegacySha256 {
                digest: hash.to_string(),
            }
        } else {
            Self::SaltedSha256 {
                digest: hash.to_string(),
                salt: salt.to_vec(),
            }
        }
    }

    /// Check a candidate password against this record
    pub fn verify(&self, candidate: &str) -> bool {
        match self {
            Self::LegacySha256 { digest } => {
                constant_time_eq(plain_digest(candidate).as_bytes(), digest.as_bytes())
            }
            Self::SaltedSha256 { digest, salt } => constant_time_eq(
                salted_digest(candidate, salt).as_bytes(),
                digest.as_bytes(),
            ),
            Self::Bcrypt { hash } => bcrypt::verify(candidate, hash).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Unreadable bcrypt hash");
                false
            }),
        }
    }

    /// `verify` for async callers. Bcrypt comparisons run on the blocking pool.
    pub async fn verify_async(&self, candidate: &str) -> Result<bool, WardenError> {
        let Self::Bcrypt { .. } = self else {
            return Ok(self.verify(candidate));
        };

        let record = self.clone();
        let candidate = candidate.to_string();
        tokio::task::spawn_blocking(move || record.verify(&candidate))
            .await
            .map_err(|e| WardenError::Internal(format!("password verification task failed: {e}")))
    }

    /// True for formats that should be rewritten as salted SHA-256 on next login
    pub fn needs_upgrade(&self) -> bool {
        !matches!(self, Self::SaltedSha256 { .. })
    }

    /// Short format name for logs
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::LegacySha256 { .. } => "sha256",
            Self::SaltedSha256 { .. } => "sha256+salt",
            Self::Bcrypt { .. } => "bcrypt",
        }
    }

    /// `(hash, salt)` columns for persistence
    pub fn to_stored(&self) -> (&str, &[u8]) {
        match self {
            Self::LegacySha256 { digest } => (digest.as_str(), NO_SALT),
            Self::SaltedSha256 { digest, salt } => (digest.as_str(), salt.as_slice()),
            Self::Bcrypt { hash } => (hash.as_str(), NO_SALT),
        }
    }
}

// Keeps digests and salts out of debug output.
impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHash")
            .field("scheme", &self.scheme())
            .finish_non_exhaustive()
    }
}

fn plain_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn salted_digest(password: &str, salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt);
    hex::encode(hasher.finalize())
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

/// Constant-time comparison for digests
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
