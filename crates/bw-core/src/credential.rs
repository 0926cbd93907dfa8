//! Credential resolution
//!
//! Locates the SSH identity offered to the relay and decodes it into a
//! signing key. A missing or unreadable file and an undecodable file are
//! reported as different errors so callers can tell "wrong path" apart
//! from "wrong file".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh_keys::key::KeyPair;

use crate::error::CredentialError;

/// Identity path relative to the home directory
pub const DEFAULT_IDENTITY: &str = ".ssh/id_rsa";

/// Resolve the identity path, defaulting to `~/.ssh/id_rsa`
///
/// An empty path counts as unset. If the home directory cannot be
/// determined this fails immediately instead of handing an unusable
/// path to the file read.
pub fn resolve_identity_path(identity: Option<&Path>) -> Result<PathBuf, CredentialError> {
    resolve_with_home(identity, dirs::home_dir())
}

fn resolve_with_home(
    identity: Option<&Path>,
    home: Option<PathBuf>,
) -> Result<PathBuf, CredentialError> {
    match identity.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => Ok(path.to_path_buf()),
        None => home
            .map(|home| home.join(DEFAULT_IDENTITY))
            .ok_or(CredentialError::HomeDirUnavailable),
    }
}

/// A decoded private key ready for public key authentication
#[derive(Clone)]
pub struct Credential {
    path: PathBuf,
    key: Arc<KeyPair>,
}

impl Credential {
    /// Resolve the path and load the key it names
    pub fn resolve(
        identity: Option<&Path>,
        passphrase: Option<&str>,
    ) -> Result<Self, CredentialError> {
        let path = resolve_identity_path(identity)?;
        Self::load(&path, passphrase)
    }

    /// Load and decode a private key file
    pub fn load(path: &Path, passphrase: Option<&str>) -> Result<Self, CredentialError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| CredentialError::Unavailable {
                path: path.to_path_buf(),
                source,
            })?;

        let key = russh_keys::decode_secret_key(&contents, passphrase).map_err(|source| {
            CredentialError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })?;

        tracing::debug!("Loaded identity from {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            key: Arc::new(key),
        })
    }

    /// File the key was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signing key for authentication
    pub fn key_pair(&self) -> Arc<KeyPair> {
        Arc::clone(&self.key)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
