use super::EntityRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-type population counts supplied by the canonical source.
pub type TypeCounts = BTreeMap<String, u64>;

/// Builds the composite `Type_Location` identifier shared by group summaries
/// and link endpoints.
pub fn group_id(entity_type: &str, location: &str) -> String {
    format!("{}_{}", entity_type, location)
}

/// An incremental add/remove batch, or a full snapshot of a session's view.
///
/// Detail diffs carry entity records in `added`/`removed`. Summary diffs
/// (`is_summary == true`) carry the group aggregates in `summaries` and the
/// inter-group graph in `summary_links`; `added` is empty for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEvent {
    #[serde(default)]
    pub added: Vec<EntityRecord>,
    #[serde(default)]
    pub removed: Vec<EntityRecord>,
    #[serde(default)]
    pub type_counts: TypeCounts,
    #[serde(default)]
    pub is_summary: bool,
    #[serde(default)]
    pub summaries: Vec<GroupSummary>,
    #[serde(default)]
    pub summary_links: Vec<Link>,
}

impl DiffEvent {
    /// A detail diff forwarding filtered additions and the source's removals.
    pub fn detail(added: Vec<EntityRecord>, removed: Vec<EntityRecord>, type_counts: TypeCounts) -> Self {
        Self {
            added,
            removed,
            type_counts,
            ..Default::default()
        }
    }

    /// A detail snapshot of an entire retained set.
    pub fn snapshot(entities: Vec<EntityRecord>) -> Self {
        Self {
            added: entities,
            ..Default::default()
        }
    }

    /// A summary diff replacing the client's view with grouped counts.
    pub fn summary(summaries: Vec<GroupSummary>, links: Vec<Link>, type_counts: TypeCounts) -> Self {
        Self {
            type_counts,
            is_summary: true,
            summaries,
            summary_links: links,
            ..Default::default()
        }
    }

    /// True when a detail diff neither adds nor removes anything.
    pub fn is_empty_delta(&self) -> bool {
        !self.is_summary && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Aggregate of every entity sharing (`Type`, `Location`, `Colour`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub location: String,
    pub colour: String,
    pub count: usize,
}

/// Counted relationship edge between two summary groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub from_group_id: String,
    pub to_group_id: String,
    pub count: usize,
}
