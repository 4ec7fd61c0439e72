//! Engine configuration model.
//!
//! Loading from disk lives in `orniscope-infrastructure`; this module only
//! defines the shape and defaults.

use crate::link_origin::{LinkOrigin, LinkOriginRegistry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Threshold above which a session switches to summary rendering.
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 100;

fn default_summary_threshold() -> usize {
    DEFAULT_SUMMARY_THRESHOLD
}

fn default_inbox_capacity() -> usize {
    256
}

fn default_listener_capacity() -> usize {
    64
}

fn default_purge_removed() -> bool {
    true
}

/// Root configuration for the engine.
///
/// ```toml
/// summary_threshold = 100
/// external_call_timeout_ms = 5000
///
/// [[link_origins]]
/// type = "Gateway"
/// target_type = "Service"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Initial summary threshold for new sessions
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: usize,
    /// Capacity of each session's command inbox
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
    /// Capacity of each listener's delivery channel
    #[serde(default = "default_listener_capacity")]
    pub listener_capacity: usize,
    /// Upper bound on canonical source and resolver calls, unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_call_timeout_ms: Option<u64>,
    /// Drop removed entities from the retained set instead of keeping them forever
    #[serde(default = "default_purge_removed")]
    pub purge_removed: bool,
    #[serde(default)]
    pub link_origins: Vec<LinkOriginEntry>,
}

/// One `[[link_origins]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOriginEntry {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            summary_threshold: default_summary_threshold(),
            inbox_capacity: default_inbox_capacity(),
            listener_capacity: default_listener_capacity(),
            external_call_timeout_ms: None,
            purge_removed: default_purge_removed(),
            link_origins: Vec::new(),
        }
    }
}

impl EngineSettings {
    pub fn external_call_timeout(&self) -> Option<Duration> {
        self.external_call_timeout_ms.map(Duration::from_millis)
    }

    /// Builds the link-origin registry declared by `[[link_origins]]`.
    pub fn link_origin_registry(&self) -> LinkOriginRegistry {
        self.link_origins
            .iter()
            .map(|entry| {
                let origin = match &entry.target_type {
                    Some(target) => LinkOrigin::outgoing_to(target.clone()),
                    None => LinkOrigin::outgoing(),
                };
                (entry.entity_type.clone(), origin)
            })
            .collect()
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.summary_threshold == 0 {
            return Err(crate::error::EngineError::config(
                "summary_threshold must be greater than zero",
            ));
        }
        if self.inbox_capacity == 0 || self.listener_capacity == 0 {
            return Err(crate::error::EngineError::config(
                "inbox_capacity and listener_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();

        assert_eq!(settings.summary_threshold, 100);
        assert!(settings.purge_removed);
        assert_eq!(settings.external_call_timeout(), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: EngineSettings = toml::from_str(
            r#"
            external_call_timeout_ms = 250

            [[link_origins]]
            type = "Gateway"
            target_type = "Service"
            "#,
        )
        .unwrap();

        assert_eq!(settings.summary_threshold, 100);
        assert_eq!(settings.external_call_timeout(), Some(Duration::from_millis(250)));

        let registry = settings.link_origin_registry();
        assert!(registry.has_outgoing_link("Gateway"));
        assert_eq!(
            registry.get("Gateway").and_then(|o| o.target_type.as_deref()),
            Some("Service")
        );
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let settings = EngineSettings {
            summary_threshold: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
