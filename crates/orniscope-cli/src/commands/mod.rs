pub mod replay;
pub mod types;

use anyhow::{Context, Result};
use orniscope_application::SessionManager;
use orniscope_core::EngineSettings;
use orniscope_infrastructure::fixtures::PopulationFixture;
use orniscope_infrastructure::{ConfigService, InMemoryEntityRegistry, InMemoryFilterResolver};
use std::path::Path;
use std::sync::Arc;

pub fn load_settings(path: Option<&Path>) -> Result<EngineSettings> {
    let service = match path {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new().context("Failed to locate the config directory")?,
    };
    service
        .load()
        .with_context(|| format!("Failed to load settings from {}", service.path().display()))
}

/// Registry, resolver and manager built from one population fixture.
pub struct Replay {
    pub registry: Arc<InMemoryEntityRegistry>,
    pub manager: SessionManager,
}

impl Replay {
    pub fn from_fixture(fixture: PopulationFixture, settings: EngineSettings) -> Self {
        let registry =
            Arc::new(InMemoryEntityRegistry::new().with_population(fixture.entities));
        let resolver = Arc::new(InMemoryFilterResolver::with_values(fixture.filter_values));
        let link_origins = Arc::new(settings.link_origin_registry());
        let manager = SessionManager::new(registry.clone(), resolver, link_origins, settings);
        Self { registry, manager }
    }
}

pub fn load_population(path: &Path) -> Result<PopulationFixture> {
    orniscope_infrastructure::fixtures::load_population(path)
        .with_context(|| format!("Failed to read population {}", path.display()))
}
