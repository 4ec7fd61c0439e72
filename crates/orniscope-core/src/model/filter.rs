use super::EntityRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Client-chosen filter applied to every record a session retains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Substring the record key must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_substring: Option<String>,
    /// Locations a record may live on; empty or absent means any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_locations: Option<BTreeSet<String>>,
    /// Per-type value constraints, resolved through the filter-value resolver
    #[serde(default)]
    pub type_filters: Vec<TypeFilter>,
}

/// Value constraints for one entity type.
///
/// `selected_values` maps a filter name to the set of values that pass.
/// An empty map lets every entity of the type through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeFilter {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub selected_values: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSpec {
    pub fn with_key_substring(mut self, substring: impl Into<String>) -> Self {
        self.key_substring = Some(substring.into());
        self
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_locations = Some(locations.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_type_filter(mut self, type_filter: TypeFilter) -> Self {
        self.type_filters.push(type_filter);
        self
    }

    /// Key-substring and location predicate (filtering stage 1).
    pub fn matches_key_and_location(&self, entity: &EntityRecord) -> bool {
        let key_ok = match self.key_substring.as_deref() {
            None | Some("") => true,
            Some(substring) => entity.key.contains(substring),
        };
        let location_ok = match &self.allowed_locations {
            Some(locations) if !locations.is_empty() => locations.contains(&entity.location),
            _ => true,
        };
        key_ok && location_ok
    }

    /// The first type filter naming `entity_type`, if any.
    pub fn type_filter_for(&self, entity_type: &str) -> Option<&TypeFilter> {
        self.type_filters
            .iter()
            .find(|tf| tf.entity_type == entity_type)
    }
}

impl TypeFilter {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            selected_values: BTreeMap::new(),
        }
    }

    pub fn select<I, S>(mut self, filter_name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_values
            .entry(filter_name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// True when every entity of this type passes without consulting the resolver.
    pub fn selects_all(&self) -> bool {
        self.selected_values.is_empty()
    }

    /// Whether `value`, resolved for `filter_name`, is one of the selected values.
    pub fn accepts(&self, filter_name: &str, value: &str) -> bool {
        self.selected_values
            .get(filter_name)
            .is_some_and(|values| values.contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_substring_and_locations_match_everything() {
        let spec = FilterSpec::default()
            .with_key_substring("")
            .with_locations(Vec::<String>::new());
        let entity = EntityRecord::new("1", "Worker", "N1");

        assert!(spec.matches_key_and_location(&entity));
    }

    #[test]
    fn test_key_and_location_predicates() {
        let spec = FilterSpec::default()
            .with_key_substring("cart")
            .with_locations(["N1"]);

        let hit = EntityRecord::new("1", "Worker", "N1").with_key("cart-17");
        let wrong_key = EntityRecord::new("2", "Worker", "N1").with_key("basket-2");
        let wrong_location = EntityRecord::new("3", "Worker", "N2").with_key("cart-3");

        assert!(spec.matches_key_and_location(&hit));
        assert!(!spec.matches_key_and_location(&wrong_key));
        assert!(!spec.matches_key_and_location(&wrong_location));
    }

    #[test]
    fn test_type_filter_accepts() {
        let tf = TypeFilter::new("Worker").select("region", ["eu", "us"]);

        assert!(!tf.selects_all());
        assert!(tf.accepts("region", "eu"));
        assert!(!tf.accepts("region", "apac"));
        assert!(!tf.accepts("tier", "eu"));
        assert!(TypeFilter::new("Worker").selects_all());
    }

    #[test]
    fn test_deserialize_client_filter() {
        let spec: FilterSpec = serde_json::from_str(
            r#"{
                "keySubstring": "abc",
                "allowedLocations": ["N1"],
                "typeFilters": [{"type": "Worker", "selectedValues": {"region": ["eu"]}}]
            }"#,
        )
        .unwrap();

        assert_eq!(spec.type_filter_for("Worker").unwrap().selected_values.len(), 1);
        assert!(spec.type_filter_for("Gateway").is_none());
    }
}
