//! Read-only registry of which entity types originate links.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Link behaviour declared for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOrigin {
    /// Entities of this type point at another entity through `link_target_id`
    #[serde(default)]
    pub has_outgoing_link: bool,
    /// When set, only links landing on an entity of this type are counted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

impl LinkOrigin {
    pub fn outgoing() -> Self {
        Self {
            has_outgoing_link: true,
            target_type: None,
        }
    }

    pub fn outgoing_to(target_type: impl Into<String>) -> Self {
        Self {
            has_outgoing_link: true,
            target_type: Some(target_type.into()),
        }
    }
}

/// Entity type → declared link behaviour.
///
/// Built once (usually from configuration) and shared read-only with every
/// aggregation pass. Types that were never registered do not originate links.
#[derive(Debug, Clone, Default)]
pub struct LinkOriginRegistry {
    origins: HashMap<String, LinkOrigin>,
}

impl LinkOriginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, entity_type: impl Into<String>, origin: LinkOrigin) -> Self {
        self.insert(entity_type, origin);
        self
    }

    pub fn insert(&mut self, entity_type: impl Into<String>, origin: LinkOrigin) {
        self.origins.insert(entity_type.into(), origin);
    }

    pub fn get(&self, entity_type: &str) -> Option<&LinkOrigin> {
        self.origins.get(entity_type)
    }

    pub fn has_outgoing_link(&self, entity_type: &str) -> bool {
        self.get(entity_type)
            .is_some_and(|origin| origin.has_outgoing_link)
    }

    /// True when an entity of `from_type` may link to one of `to_type`.
    pub fn links_to(&self, from_type: &str, to_type: &str) -> bool {
        self.get(from_type).is_some_and(|origin| {
            origin.has_outgoing_link
                && origin
                    .target_type
                    .as_deref()
                    .is_none_or(|target| target == to_type)
        })
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, LinkOrigin)> for LinkOriginRegistry {
    fn from_iter<I: IntoIterator<Item = (S, LinkOrigin)>>(iter: I) -> Self {
        Self {
            origins: iter
                .into_iter()
                .map(|(entity_type, origin)| (entity_type.into(), origin))
                .collect(),
        }
    }
}
