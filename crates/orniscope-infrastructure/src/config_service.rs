//! Configuration service implementation.
//!
//! Loads `EngineSettings` from a TOML file, by default
//! `~/.config/orniscope/config.toml`.

use crate::paths::OrniscopePaths;
use orniscope_core::{EngineError, EngineSettings, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads engine settings from disk.
///
/// A missing or empty file yields the default settings; a malformed one is
/// an error.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    /// Creates a service reading from the default config location.
    pub fn new() -> Result<Self> {
        let path = OrniscopePaths::config_file().map_err(|e| EngineError::config(e.to_string()))?;
        Ok(Self { path })
    }

    /// Creates a service reading from `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads, parses and validates the settings.
    pub fn load(&self) -> Result<EngineSettings> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "[ConfigService] no config file, using defaults");
            return Ok(EngineSettings::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(EngineSettings::default());
        }

        let settings: EngineSettings = toml::from_str(&content)?;
        settings.validate()?;

        tracing::info!(
            path = %self.path.display(),
            summary_threshold = settings.summary_threshold,
            link_origins = settings.link_origins.len(),
            "[ConfigService] loaded settings"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        let settings = service.load().unwrap();

        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_load_settings_and_link_origins() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
summary_threshold = 250
purge_removed = false

[[link_origins]]
type = "Gateway"
"#,
        )
        .unwrap();

        let settings = ConfigService::with_path(&path).load().unwrap();

        assert_eq!(settings.summary_threshold, 250);
        assert!(!settings.purge_removed);
        assert!(settings.link_origin_registry().has_outgoing_link("Gateway"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "summary_threshold = \"lots\"").unwrap();

        let err = ConfigService::with_path(&path).load().unwrap_err();

        assert!(matches!(err, EngineError::Serialization { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "summary_threshold = 0").unwrap();

        let err = ConfigService::with_path(&path).load().unwrap_err();

        assert!(matches!(err, EngineError::Config(_)));
    }
}
