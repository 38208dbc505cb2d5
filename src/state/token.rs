//! # Access-token storage
//!
//! A [`TokenStore`] holds at most one access token. [`ApiClient`] reads it
//! once at startup and mirrors every change into it, playing the role browser
//! local storage plays for a web front end.
//!
//! [`FileTokenStore`] keeps the token in a single file (created with
//! owner-only permissions on Unix). [`MemoryTokenStore`] is used by tests and
//! by callers that do not want persistence.
//!
//! [`ApiClient`]: crate::net::client::ApiClient

#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::net::error::ApiError;

pub trait TokenStore: Send + Sync {
    /// Read the persisted token, `None` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] when the backing store cannot be read.
    fn load(&self) -> Result<Option<String>, ApiError>;

    /// Replace the persisted token; `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] when the backing store cannot be written.
    fn save(&self, token: Option<&str>) -> Result<(), ApiError>;
}

/// In-memory token slot for tests and non-persistent callers.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { slot: Mutex::new(Some(token.to_owned())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| ApiError::Storage("token slot poisoned".into()))?;
        Ok(slot.clone())
    }

    fn save(&self, token: Option<&str>) -> Result<(), ApiError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| ApiError::Storage("token slot poisoned".into()))?;
        *slot = token.map(ToOwned::to_owned);
        Ok(())
    }
}

/// Single-file token store.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_owned()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(&self.path, &e)),
        }
    }

    fn save(&self, token: Option<&str>) -> Result<(), ApiError> {
        let Some(token) = token else {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(storage_error(&self.path, &e)),
            };
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;
        }
        write_private(&self.path, token)
    }
}

/// Write `contents` to a sibling `.tmp` file created owner-only, then rename
/// it over `path`.
pub(crate) fn write_private(path: &Path, contents: &str) -> Result<(), ApiError> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    match std::fs::remove_file(&staging) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(storage_error(&staging, &e)),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&staging).map_err(|e| storage_error(&staging, &e))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| storage_error(&staging, &e))?;
    drop(file);

    std::fs::rename(&staging, path).map_err(|e| storage_error(path, &e))
}

fn storage_error(path: &Path, error: &std::io::Error) -> ApiError {
    ApiError::Storage(format!("{}: {error}", path.display()))
}
