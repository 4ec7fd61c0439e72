//! Applies client filter specifications to entity records.

use crate::error::Result;
use crate::model::{EntityRecord, FilterSpec, TypeFilter};
use crate::source::{FilterValueResolver, ResolvedFilters, call_with_timeout};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Ids of one type that survive type filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PermittedIds {
    All,
    Only(HashSet<String>),
}

impl PermittedIds {
    fn permits(&self, id: &str) -> bool {
        match self {
            PermittedIds::All => true,
            PermittedIds::Only(ids) => ids.contains(id),
        }
    }
}

/// Two-stage entity filter.
///
/// Stage 1 checks key substring and location. Stage 2 runs only when the
/// filter carries type filters and keeps an entity only if its type resolved
/// to a permitted id list containing its id. Types that no type filter
/// names resolve to nothing, so their entities are dropped.
pub struct FilterEngine {
    resolver: Arc<dyn FilterValueResolver>,
    call_timeout: Option<Duration>,
}

impl FilterEngine {
    pub fn new(resolver: Arc<dyn FilterValueResolver>) -> Self {
        Self {
            resolver,
            call_timeout: None,
        }
    }

    /// Bounds every resolver call by `limit`.
    pub fn with_call_timeout(mut self, limit: Option<Duration>) -> Self {
        self.call_timeout = limit;
        self
    }

    /// Filters `entities`, preserving their relative order.
    ///
    /// A missing filter or an empty input is returned as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter-value resolver fails or times out.
    pub async fn apply(
        &self,
        filter: Option<&FilterSpec>,
        entities: Vec<EntityRecord>,
    ) -> Result<Vec<EntityRecord>> {
        let filter = match filter {
            Some(filter) if !entities.is_empty() => filter,
            _ => return Ok(entities),
        };

        let permitted = if filter.type_filters.is_empty() {
            None
        } else {
            Some(self.permitted_ids(filter, &entities).await?)
        };

        let before = entities.len();
        let kept: Vec<EntityRecord> = entities
            .into_iter()
            .filter(|e| filter.matches_key_and_location(e))
            .filter(|e| match &permitted {
                None => true,
                Some(by_type) => by_type
                    .get(&e.entity_type)
                    .is_some_and(|ids| ids.permits(&e.id)),
            })
            .collect();

        tracing::debug!(before, after = kept.len(), "[FilterEngine] applied filter");
        Ok(kept)
    }

    /// Builds the per-type permitted id lists for every type that is both
    /// present in `entities` and named by a type filter.
    ///
    /// The resolver is consulted at most once, for exactly the types whose
    /// filter selects specific values.
    async fn permitted_ids(
        &self,
        filter: &FilterSpec,
        entities: &[EntityRecord],
    ) -> Result<HashMap<String, PermittedIds>> {
        let present: BTreeSet<&str> = entities.iter().map(|e| e.entity_type.as_str()).collect();
        let filtered: Vec<&TypeFilter> = present
            .into_iter()
            .filter_map(|ty| filter.type_filter_for(ty))
            .collect();

        let to_resolve: BTreeSet<String> = filtered
            .iter()
            .filter(|tf| !tf.selects_all())
            .map(|tf| tf.entity_type.clone())
            .collect();

        let resolved = if to_resolve.is_empty() {
            ResolvedFilters::new()
        } else {
            tracing::debug!(types = ?to_resolve, "[FilterEngine] resolving type filter values");
            call_with_timeout(
                "filter resolver",
                self.call_timeout,
                self.resolver.resolve_filters(&to_resolve),
            )
            .await?
        };

        Ok(filtered
            .into_iter()
            .map(|tf| {
                let permitted = if tf.selects_all() {
                    PermittedIds::All
                } else {
                    PermittedIds::Only(matching_ids(tf, &resolved))
                };
                (tf.entity_type.clone(), permitted)
            })
            .collect())
    }
}

/// Ids whose resolved value for some selected filter name is one of the
/// selected values. A type the resolver knows nothing about yields no ids.
fn matching_ids(type_filter: &TypeFilter, resolved: &ResolvedFilters) -> HashSet<String> {
    let Some(values) = resolved.get(&type_filter.entity_type) else {
        return HashSet::new();
    };

    values
        .iter()
        .flat_map(|(filter_name, by_id)| {
            by_id
                .iter()
                .filter(move |(_, value)| type_filter.accepts(filter_name, value))
                .map(|(id, _)| id.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::source::TypeFilterValues;
    use std::sync::Mutex;

    /// Resolver backed by a fixed table that records every call.
    struct TableResolver {
        table: ResolvedFilters,
        calls: Mutex<Vec<BTreeSet<String>>>,
    }

    impl TableResolver {
        fn new(table: ResolvedFilters) -> Self {
            Self {
                table,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<BTreeSet<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl FilterValueResolver for TableResolver {
        async fn resolve_filters(&self, types: &BTreeSet<String>) -> Result<ResolvedFilters> {
            self.calls.lock().unwrap().push(types.clone());
            Ok(self
                .table
                .iter()
                .filter(|(ty, _)| types.contains(*ty))
                .map(|(ty, values)| (ty.clone(), values.clone()))
                .collect())
        }
    }

    struct FailingResolver;

    #[async_trait::async_trait]
    impl FilterValueResolver for FailingResolver {
        async fn resolve_filters(&self, _types: &BTreeSet<String>) -> Result<ResolvedFilters> {
            Err(EngineError::resolver_unavailable("resolver offline"))
        }
    }

    fn region_values(pairs: &[(&str, &str)]) -> TypeFilterValues {
        let by_id = pairs
            .iter()
            .map(|(id, value)| (id.to_string(), value.to_string()))
            .collect();
        HashMap::from([("region".to_string(), by_id)])
    }

    fn population() -> Vec<EntityRecord> {
        vec![
            EntityRecord::new("w1", "Worker", "N1").with_key("cart-1"),
            EntityRecord::new("w2", "Worker", "N2").with_key("cart-2"),
            EntityRecord::new("g1", "Gateway", "N1").with_key("edge-1"),
            EntityRecord::new("w3", "Worker", "N1").with_key("basket-3"),
            EntityRecord::new("s1", "Service", "N2").with_key("cart-svc"),
        ]
    }

    fn engine(resolver: TableResolver) -> (FilterEngine, Arc<TableResolver>) {
        let resolver = Arc::new(resolver);
        (FilterEngine::new(resolver.clone()), resolver)
    }

    fn ids(entities: &[EntityRecord]) -> Vec<&str> {
        entities.iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_no_filter_is_identity() {
        let (engine, resolver) = engine(TableResolver::new(ResolvedFilters::new()));

        let result = engine.apply(None, population()).await.unwrap();

        assert_eq!(result, population());
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_filter_is_identity() {
        let (engine, _) = engine(TableResolver::new(ResolvedFilters::new()));
        let spec = FilterSpec::default()
            .with_key_substring("")
            .with_locations(Vec::<String>::new());

        let result = engine.apply(Some(&spec), population()).await.unwrap();

        assert_eq!(result, population());
    }

    #[tokio::test]
    async fn test_empty_input_skips_resolver() {
        let (engine, resolver) = engine(TableResolver::new(ResolvedFilters::new()));
        let spec = FilterSpec::default()
            .with_type_filter(TypeFilter::new("Worker").select("region", ["eu"]));

        let result = engine.apply(Some(&spec), Vec::new()).await.unwrap();

        assert!(result.is_empty());
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_substring_and_location_keep_order() {
        let (engine, _) = engine(TableResolver::new(ResolvedFilters::new()));
        let spec = FilterSpec::default()
            .with_key_substring("cart")
            .with_locations(["N1", "N2"]);

        let result = engine.apply(Some(&spec), population()).await.unwrap();

        assert_eq!(ids(&result), vec!["w1", "w2", "s1"]);
        for entity in &result {
            assert!(entity.key.contains("cart"));
        }
    }

    #[tokio::test]
    async fn test_location_only() {
        let (engine, _) = engine(TableResolver::new(ResolvedFilters::new()));
        let spec = FilterSpec::default().with_locations(["N2"]);

        let result = engine.apply(Some(&spec), population()).await.unwrap();

        assert_eq!(ids(&result), vec!["w2", "s1"]);
    }

    #[tokio::test]
    async fn test_unnamed_types_are_excluded_by_type_filters() {
        let (engine, resolver) = engine(TableResolver::new(ResolvedFilters::new()));
        let spec = FilterSpec::default().with_type_filter(TypeFilter::new("Worker"));

        let result = engine.apply(Some(&spec), population()).await.unwrap();

        // Gateway and Service are never named, so they are dropped.
        assert_eq!(ids(&result), vec!["w1", "w2", "w3"]);
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_selected_values_restrict_ids() {
        let table = ResolvedFilters::from([(
            "Worker".to_string(),
            region_values(&[("w1", "eu"), ("w2", "us"), ("w3", "eu")]),
        )]);
        let (engine, resolver) = engine(TableResolver::new(table));
        let spec = FilterSpec::default()
            .with_type_filter(TypeFilter::new("Worker").select("region", ["eu"]))
            .with_type_filter(TypeFilter::new("Gateway"));

        let result = engine.apply(Some(&spec), population()).await.unwrap();

        assert_eq!(ids(&result), vec!["w1", "g1", "w3"]);
        assert_eq!(
            resolver.calls(),
            vec![BTreeSet::from(["Worker".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_resolver_called_once_for_all_types() {
        let table = ResolvedFilters::from([
            ("Worker".to_string(), region_values(&[("w2", "us")])),
            ("Service".to_string(), region_values(&[("s1", "us")])),
        ]);
        let (engine, resolver) = engine(TableResolver::new(table));
        let spec = FilterSpec::default()
            .with_type_filter(TypeFilter::new("Worker").select("region", ["us"]))
            .with_type_filter(TypeFilter::new("Service").select("region", ["us"]))
            .with_type_filter(TypeFilter::new("Absent").select("region", ["us"]));

        let result = engine.apply(Some(&spec), population()).await.unwrap();

        assert_eq!(ids(&result), vec!["w2", "s1"]);
        let calls = resolver.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            BTreeSet::from(["Service".to_string(), "Worker".to_string()])
        );
    }

    #[tokio::test]
    async fn test_type_without_resolver_entry_passes_nothing() {
        let (engine, _) = engine(TableResolver::new(ResolvedFilters::new()));
        let spec = FilterSpec::default()
            .with_type_filter(TypeFilter::new("Worker").select("region", ["eu"]));

        let result = engine.apply(Some(&spec), population()).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_stages_combine() {
        let table = ResolvedFilters::from([(
            "Worker".to_string(),
            region_values(&[("w1", "eu"), ("w2", "eu"), ("w3", "eu")]),
        )]);
        let (engine, _) = engine(TableResolver::new(table));
        let spec = FilterSpec::default()
            .with_locations(["N1"])
            .with_type_filter(TypeFilter::new("Worker").select("region", ["eu"]));

        let result = engine.apply(Some(&spec), population()).await.unwrap();

        assert_eq!(ids(&result), vec!["w1", "w3"]);
    }

    #[tokio::test]
    async fn test_resolver_failure_propagates() {
        let engine = FilterEngine::new(Arc::new(FailingResolver));
        let spec = FilterSpec::default()
            .with_type_filter(TypeFilter::new("Worker").select("region", ["eu"]));

        let err = engine.apply(Some(&spec), population()).await.unwrap_err();

        assert!(err.is_collaborator_failure());
    }
}
