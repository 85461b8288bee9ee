//! Token pair storage abstraction.
//!
//! - FileTokenStore: a single JSON file (~/.planview/tokens.json by default).
//! - MemoryTokenStore: process-local, for embedding and tests.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::PlanApiError;
use crate::types::TokenPair;

/// Persistence for the one TokenPair a session may hold.
///
/// `save` overwrites, `clear` is idempotent. Token contents are not validated.
pub trait TokenStore: Send + Sync {
    fn save(&self, pair: &TokenPair) -> Result<(), PlanApiError>;
    fn load(&self) -> Result<Option<TokenPair>, PlanApiError>;
    fn clear(&self) -> Result<(), PlanApiError>;
}

/// Default token file path.
pub fn default_token_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".planview")
        .join("tokens.json")
}

// ============================================================================
// File backend
// ============================================================================

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new(default_token_path())
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, pair: &TokenPair) -> Result<(), PlanApiError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
                }
            }
        }

        let content = serde_json::to_string_pretty(pair)?;
        crate::util::atomic_write_str(&self.path, &content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn load(&self) -> Result<Option<TokenPair>, PlanApiError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<TokenPair>(&content) {
            Ok(pair) => Ok(Some(pair)),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable token file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn clear(&self) -> Result<(), PlanApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, pair: &TokenPair) -> Result<(), PlanApiError> {
        *self.pair.lock() = Some(pair.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<TokenPair>, PlanApiError> {
        Ok(self.pair.lock().clone())
    }

    fn clear(&self) -> Result<(), PlanApiError> {
        *self.pair.lock() = None;
        Ok(())
    }
}
