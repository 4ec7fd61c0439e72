//! Group summaries and the inter-group relationship graph.

use crate::link_origin::LinkOriginRegistry;
use crate::model::{EntityRecord, GroupSummary, Link, group_id};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub groups: Vec<GroupSummary>,
    pub links: Vec<Link>,
}

/// Summarizes a filtered entity set into groups and links.
///
/// Aggregation is a pure function of its input and the injected
/// link-origin registry. Groups are emitted in first-seen order, but callers
/// must not depend on any ordering.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    link_origins: Arc<LinkOriginRegistry>,
}

impl AggregationEngine {
    pub fn new(link_origins: Arc<LinkOriginRegistry>) -> Self {
        Self { link_origins }
    }

    pub fn summarize(&self, entities: &[EntityRecord]) -> Summary {
        Summary {
            groups: self.group_summaries(entities),
            links: self.group_links(entities),
        }
    }

    /// One summary per distinct (`Type`, `Location`, `Colour`).
    pub fn group_summaries(&self, entities: &[EntityRecord]) -> Vec<GroupSummary> {
        let mut index: HashMap<(&str, &str, &str), usize> = HashMap::new();
        let mut groups: Vec<GroupSummary> = Vec::new();

        for entity in entities {
            let key = (
                entity.entity_type.as_str(),
                entity.location.as_str(),
                entity.colour.as_str(),
            );
            match index.get(&key) {
                Some(&slot) => groups[slot].count += 1,
                None => {
                    index.insert(key, groups.len());
                    groups.push(GroupSummary {
                        group_id: entity.group_id(),
                        entity_type: entity.entity_type.clone(),
                        location: entity.location.clone(),
                        colour: entity.colour.clone(),
                        count: 1,
                    });
                }
            }
        }

        groups
    }

    /// Counted edges between groups, one per ordered (from, to) pair.
    ///
    /// Only entities whose type originates links contribute, and only when
    /// their target is part of `entities` and has the declared target type.
    /// A target filtered out of the view silently drops the edge.
    pub fn group_links(&self, entities: &[EntityRecord]) -> Vec<Link> {
        let mut by_id: HashMap<&str, &EntityRecord> = HashMap::with_capacity(entities.len());
        for entity in entities {
            by_id.entry(entity.id.as_str()).or_insert(entity);
        }

        let mut index: HashMap<(String, String), usize> = HashMap::new();
        let mut links: Vec<Link> = Vec::new();

        for entity in entities {
            if !self.link_origins.has_outgoing_link(&entity.entity_type) {
                continue;
            }
            let Some(target) = entity
                .link_target_id
                .as_deref()
                .and_then(|target_id| by_id.get(target_id))
            else {
                continue;
            };
            if !self.link_origins.links_to(&entity.entity_type, &target.entity_type) {
                continue;
            }

            let from = entity.group_id();
            let to = group_id(&target.entity_type, &target.location);
            match index.get(&(from.clone(), to.clone())) {
                Some(&slot) => links[slot].count += 1,
                None => {
                    index.insert((from.clone(), to.clone()), links.len());
                    links.push(Link {
                        from_group_id: from,
                        to_group_id: to,
                        count: 1,
                    });
                }
            }
        }

        links
    }
}
