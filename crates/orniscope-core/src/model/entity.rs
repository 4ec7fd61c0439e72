use serde::{Deserialize, Serialize};

/// A monitored entity as published by the canonical source.
///
/// Sessions only ever hold filtered copies of these records; the canonical
/// source owns the authoritative instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Unique within the canonical population
    pub id: String,
    /// Display/search identifier, not guaranteed unique
    pub key: String,
    /// Category tag
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Owning node/shard identifier
    pub location: String,
    /// Display grouping hint
    #[serde(default)]
    pub colour: String,
    /// Id of another record this entity points to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target_id: Option<String>,
}

impl EntityRecord {
    pub fn new(
        id: impl Into<String>,
        entity_type: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            key: id.clone(),
            id,
            entity_type: entity_type.into(),
            location: location.into(),
            colour: String::new(),
            link_target_id: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = colour.into();
        self
    }

    pub fn with_link_target(mut self, target_id: impl Into<String>) -> Self {
        self.link_target_id = Some(target_id.into());
        self
    }

    /// Identifier of the summary group this entity falls into (`Type_Location`).
    pub fn group_id(&self) -> String {
        super::group_id(&self.entity_type, &self.location)
    }
}
