use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::errors::{CoreError, Result};

/// Environment variable overriding the recycle root directory.
pub const ROOT_ENV: &str = "RECYCLE_HOME";

/// Directory created under the home directory when no root is configured.
pub const DEFAULT_ROOT_DIR: &str = ".recycle";

const VAR_DIR: &str = "var";
const CATALOG_FILE: &str = "main.db";
const STORAGE_DIR: &str = "storage";

/// Locations of the catalog and the storage area.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecycleConfig {
    root: PathBuf,
}

impl RecycleConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses `RECYCLE_HOME` when set and non-empty, else `~/.recycle`.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(ROOT_ENV) {
            Some(root) if !root.is_empty() => Ok(Self::new(root)),
            _ => Self::default_root().map(Self::new),
        }
    }

    fn default_root() -> Result<PathBuf> {
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(DEFAULT_ROOT_DIR))
            .ok_or_else(|| CoreError::missing("home directory"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn var_dir(&self) -> PathBuf {
        self.root.join(VAR_DIR)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.var_dir().join(CATALOG_FILE)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.var_dir().join(STORAGE_DIR)
    }
}
