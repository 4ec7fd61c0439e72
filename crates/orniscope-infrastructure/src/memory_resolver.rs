//! In-memory filter-value resolver.

use async_trait::async_trait;
use orniscope_core::{FilterValueResolver, ResolvedFilters, Result, TypeFilterValues};
use std::collections::BTreeSet;
use tokio::sync::RwLock;

/// Filter values registered per entity type.
#[derive(Default)]
pub struct InMemoryFilterResolver {
    values: RwLock<ResolvedFilters>,
}

impl InMemoryFilterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: ResolvedFilters) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Records `value` as the value of `filter_name` for entity `id`.
    pub async fn register(
        &self,
        entity_type: impl Into<String>,
        filter_name: impl Into<String>,
        id: impl Into<String>,
        value: impl Into<String>,
    ) {
        let mut values = self.values.write().await;
        values
            .entry(entity_type.into())
            .or_default()
            .entry(filter_name.into())
            .or_default()
            .insert(id.into(), value.into());
    }

    /// Replaces every registered value of one type.
    pub async fn set_type_values(&self, entity_type: impl Into<String>, type_values: TypeFilterValues) {
        self.values
            .write()
            .await
            .insert(entity_type.into(), type_values);
    }
}

#[async_trait]
impl FilterValueResolver for InMemoryFilterResolver {
    async fn resolve_filters(&self, types: &BTreeSet<String>) -> Result<ResolvedFilters> {
        let values = self.values.read().await;
        Ok(types
            .iter()
            .filter_map(|ty| values.get(ty).map(|v| (ty.clone(), v.clone())))
            .collect())
    }
}
