//! Durable storage for the session token.
//!
//! A single token string lives under the fixed key [`TOKEN_KEY`]. The file
//! store writes it to `<state_dir>/adminToken`; the memory store backs tests
//! and embedders that keep nothing on disk.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fixed storage key for the persisted token.
pub const TOKEN_KEY: &str = "adminToken";

pub trait TokenStore: Send + Sync {
    /// Persisted token, if any. Blank values read as absent.
    fn load(&self) -> Option<String>;

    /// # Errors
    ///
    /// Returns the underlying I/O error if the token cannot be written.
    fn save(&self, token: &str) -> io::Result<()>;

    /// Remove the persisted token. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if removal fails.
    fn clear(&self) -> io::Result<()>;
}

/// Token file on local disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        (!token.is_empty()).then(|| token.to_owned())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-process token slot.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { slot: Mutex::new(Some(token.to_owned())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        let slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        slot.clone().filter(|t| !t.trim().is_empty())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}
