//! Infrastructure layer for Orniscope.
//!
//! In-memory implementations of the engine's collaborators, configuration
//! loading, and fixture files for replays.

pub mod config_service;
pub mod fixtures;
pub mod memory_resolver;
pub mod memory_source;
pub mod paths;

pub use crate::config_service::ConfigService;
pub use crate::memory_resolver::InMemoryFilterResolver;
pub use crate::memory_source::InMemoryEntityRegistry;
pub use crate::paths::OrniscopePaths;
