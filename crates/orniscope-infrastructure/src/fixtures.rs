//! JSON fixture files for replaying a population through a session.
//!
//! - population file: `{ "entities": [...], "filterValues": { type: { filter: { id: value } } } }`
//! - filter file: a single `FilterSpec` object
//! - event log: one `DiffEvent` JSON object per line, blank lines ignored

use orniscope_core::{DiffEvent, EngineError, EntityRecord, FilterSpec, ResolvedFilters, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationFixture {
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub filter_values: ResolvedFilters,
}

pub fn load_population(path: &Path) -> Result<PopulationFixture> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn load_filter(path: &Path) -> Result<FilterSpec> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn load_event_log(path: &Path) -> Result<Vec<DiffEvent>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str::<DiffEvent>(line).map_err(EngineError::from))
        .collect()
}
