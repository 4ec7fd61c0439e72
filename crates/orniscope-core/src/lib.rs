//! Domain layer for Orniscope.
//!
//! Holds the shared data model, the filter and aggregation engines, the
//! collaborator interfaces and the engine settings. Nothing here spawns
//! tasks; sessions are built on top of this crate by `orniscope-application`.

pub mod aggregation;
pub mod error;
pub mod filter;
pub mod link_origin;
pub mod model;
pub mod settings;
pub mod source;

pub use aggregation::{AggregationEngine, Summary};
pub use error::{EngineError, Result};
pub use filter::FilterEngine;
pub use link_origin::{LinkOrigin, LinkOriginRegistry};
pub use model::{DiffEvent, EntityRecord, FilterSpec, GroupSummary, Link, TypeCounts, TypeFilter};
pub use settings::EngineSettings;
pub use source::{CanonicalSource, FilterValueResolver, ResolvedFilters, TypeFilterValues};
