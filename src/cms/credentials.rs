//! Credential store for sign-up and sign-in.
//!
//! Credentials live in a YAML mapping of username to Argon2 PHC hash:
//!
//! ```text
//! ---
//! admin: $argon2id$v=19$m=19456,t=2,p=1$...
//! testname: $argon2id$v=19$m=19456,t=2,p=1$...
//! ```
//!
//! The file is only ever appended to. It is re-read in full for every
//! operation, so edits made by `flatcms-admin` are picked up immediately.

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Errors that can occur when reading or writing the credential store.
#[derive(Debug)]
pub enum CredentialError {
    /// The credential file could not be read or appended to.
    StoreUnavailable(PathBuf, io::Error),
    /// The credential file is not a username-to-hash mapping.
    Malformed(PathBuf, serde_yaml::Error),
    /// Password hashing failed.
    Hash(String),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::StoreUnavailable(path, e) => {
                write!(f, "Credential store {} unavailable: {}", path.display(), e)
            }
            CredentialError::Malformed(path, e) => {
                write!(f, "Credential store {} is malformed: {}", path.display(), e)
            }
            CredentialError::Hash(e) => write!(f, "Password hashing failed: {}", e),
        }
    }
}

impl std::error::Error for CredentialError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CredentialError::StoreUnavailable(_, e) => Some(e),
            CredentialError::Malformed(_, e) => Some(e),
            CredentialError::Hash(_) => None,
        }
    }
}

/// Append-only username to password-hash store backed by a YAML file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store over the credential file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an empty credential file if none exists yet.
    pub fn ensure_exists(&self) -> Result<(), CredentialError> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CredentialError::StoreUnavailable(self.path.clone(), e))?;
        }

        fs::write(&self.path, "---\n")
            .map_err(|e| CredentialError::StoreUnavailable(self.path.clone(), e))?;
        tracing::info!("Created credential store {}", self.path.display());

        Ok(())
    }

    /// Loads every credential entry.
    pub fn load(&self) -> Result<HashMap<String, String>, CredentialError> {
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| CredentialError::StoreUnavailable(self.path.clone(), e))?;

        // An empty store is just the document marker, which serde_yaml
        // won't turn into a map.
        let is_empty = contents
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line == "---");
        if is_empty {
            return Ok(HashMap::new());
        }

        serde_yaml::from_str(&contents)
            .map_err(|e| CredentialError::Malformed(self.path.clone(), e))
    }

    /// Checks a sign-in attempt.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller. Stored hashes that fail to parse never match.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError> {
        let credentials = self.load()?;

        Ok(credentials
            .get(username)
            .is_some_and(|hash| verify_password(hash, password)))
    }

    /// Hashes `password` and appends a new entry for `username`.
    ///
    /// Uniqueness and format are the caller's responsibility; see
    /// [`crate::cms::validate::error_for_signup`].
    pub fn append(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        let hash = hash_password(password)?;

        let mut entry = BTreeMap::new();
        entry.insert(username, hash.as_str());
        let line = serde_yaml::to_string(&entry)
            .map_err(|e| CredentialError::Malformed(self.path.clone(), e))?;
        let line = line.strip_prefix("---\n").unwrap_or(&line);

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| CredentialError::StoreUnavailable(self.path.clone(), e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| CredentialError::StoreUnavailable(self.path.clone(), e))?;

        Ok(())
    }
}

/// Argon2id memory cost in KiB.
pub const HASH_MEMORY_KIB: u32 = 19 * 1024;
/// Argon2id passes. One verification must take at least 50ms.
pub const HASH_ITERATIONS: u32 = 4;
/// Argon2id lanes.
pub const HASH_PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>, CredentialError> {
    let params = Params::new(HASH_MEMORY_KIB, HASH_ITERATIONS, HASH_PARALLELISM, None)
        .map_err(|e| CredentialError::Hash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with Argon2id and a fresh random salt.
fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| CredentialError::Hash(e.to_string()))?;

    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

/// Constant-time comparison of `password` against a stored PHC hash.
///
/// Cost parameters come from the stored hash itself.
fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Ignoring unparseable password hash: {}", e);
            false
        }
    }
}
