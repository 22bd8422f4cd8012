//! Runtime configuration.
//!
//! Everything that used to be process-global (where the mount table lives,
//! where scratch files go) is carried by a [`Config`] value handed to each
//! driver.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Conventional location of the kernel mount table.
pub const DEFAULT_MOUNTS_PATH: &str = "/proc/mounts";

/// Environment variable overriding [`Config::mounts_path`].
pub const MOUNTS_ENV: &str = "VIRTFS_MOUNTS";

/// Environment variable overriding [`Config::scratch_root`].
pub const SCRATCH_ENV: &str = "VIRTFS_SCRATCH";

/// How a driver identifier is matched against mount table lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountMatch {
    /// First line containing the identifier anywhere in its text.
    #[default]
    Substring,
    /// First line whose filesystem type field equals the identifier.
    FsType,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mounts_path: PathBuf,
    /// Private root under which writable leaves stage their temp files.
    pub scratch_root: PathBuf,
    pub mount_match: MountMatch,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mounts_path: PathBuf::from(DEFAULT_MOUNTS_PATH),
            scratch_root: std::env::temp_dir().join("virtfs"),
            mount_match: MountMatch::default(),
        }
    }
}

impl Config {
    /// Defaults, overridden by `VIRTFS_MOUNTS` and `VIRTFS_SCRATCH` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(mounts) = std::env::var_os(MOUNTS_ENV) {
            config.mounts_path = PathBuf::from(mounts);
        }
        if let Some(scratch) = std::env::var_os(SCRATCH_ENV) {
            config.scratch_root = PathBuf::from(scratch);
        }
        config
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn with_mounts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mounts_path = path.into();
        self
    }

    pub fn with_scratch_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_root = path.into();
        self
    }

    pub fn with_mount_match(mut self, mode: MountMatch) -> Self {
        self.mount_match = mode;
        self
    }
}
