//! Per-session server passwords derived from a persisted host salt.
//!
//! The salt is generated once per host and never rewritten. Every password
//! handed out so far depends on it.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::default_salt_path;
use crate::error::CaigedError;

const SALT_BYTES: usize = 32;

/// Loads or creates the salt file and derives passwords from it.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    salt_path: PathBuf,
}

impl CredentialStore {
    pub fn new(salt_path: impl Into<PathBuf>) -> Self {
        Self {
            salt_path: salt_path.into(),
        }
    }

    /// Store rooted at `<config root>/caiged/salt`.
    pub fn at_default_path() -> Result<Self, CaigedError> {
        default_salt_path().map(Self::new).ok_or_else(|| {
            CaigedError::Credential(std::io::Error::new(
                ErrorKind::NotFound,
                "unable to resolve config root for salt storage",
            ))
        })
    }

    pub fn salt_path(&self) -> &Path {
        &self.salt_path
    }

    /// Read the hex salt, generating it on first use.
    pub fn load_or_create_salt(&self) -> Result<String, CaigedError> {
        match std::fs::read_to_string(&self.salt_path) {
            Ok(text) => return non_empty_salt(&self.salt_path, text),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(CaigedError::Credential(err)),
        }

        let mut bytes = [0u8; SALT_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let salt = hex::encode(bytes);

        match write_new_salt(&self.salt_path, &salt) {
            Ok(()) => {
                info!(path = %self.salt_path.display(), "created credential salt");
                Ok(salt)
            }
            // Lost a race with another invocation; its salt wins.
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let text =
                    std::fs::read_to_string(&self.salt_path).map_err(CaigedError::Credential)?;
                non_empty_salt(&self.salt_path, text)
            }
            Err(err) => Err(CaigedError::Credential(err)),
        }
    }

    /// Password for `container_name` on this host.
    pub fn derive(&self, container_name: &str) -> Result<String, CaigedError> {
        let salt = self.load_or_create_salt()?;
        Ok(derive_password(container_name, &salt))
    }
}

/// `hex(sha256(container_name + salt))`.
pub fn derive_password(container_name: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(container_name.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

fn non_empty_salt(path: &Path, text: String) -> Result<String, CaigedError> {
    let salt = text.trim();
    if salt.is_empty() {
        return Err(CaigedError::Credential(std::io::Error::new(
            ErrorKind::InvalidData,
            format!("salt file `{}` is empty", path.display()),
        )));
    }
    Ok(salt.to_string())
}

fn write_new_salt(path: &Path, salt: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            let mut builder = std::fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o700);
            }
            builder.create(parent)?;
        }
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(format!("{salt}\n").as_bytes())?;
    file.flush()
}
