//! Shared vocabulary of the engine.
//!
//! # Module Structure
//!
//! - `entity`: monitored entity records (`EntityRecord`)
//! - `diff`: diff events, group summaries and links (`DiffEvent`, `GroupSummary`, `Link`)
//! - `filter`: client filter specification (`FilterSpec`, `TypeFilter`)

mod diff;
mod entity;
mod filter;

pub use diff::{DiffEvent, GroupSummary, Link, TypeCounts, group_id};
pub use entity::EntityRecord;
pub use filter::{FilterSpec, TypeFilter};
