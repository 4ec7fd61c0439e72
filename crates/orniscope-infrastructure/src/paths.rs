//! Path management for orniscope configuration files.
//!
//! ```text
//! ~/.config/orniscope/         # Config directory
//! └── config.toml              # Engine settings and link origins
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Neither a platform config directory nor a home directory was found.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find a configuration directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Well-known locations used by orniscope.
pub struct OrniscopePaths;

impl OrniscopePaths {
    const APP_DIR: &'static str = "orniscope";
    const CONFIG_FILE: &'static str = "config.toml";

    /// Returns the orniscope configuration directory.
    ///
    /// Uses the platform config directory (e.g. `~/.config` on Linux), falling
    /// back to `~/.config` under the home directory.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|base| base.join(Self::APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the default path of `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(Self::CONFIG_FILE))
    }
}
