//! In-memory canonical entity registry.

use async_trait::async_trait;
use orniscope_core::{CanonicalSource, DiffEvent, EntityRecord, Result, TypeCounts};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{RwLock, broadcast};

/// Default capacity of the canonical diff stream.
pub const DEFAULT_STREAM_CAPACITY: usize = 1024;

/// Canonical population held in memory.
///
/// Every `publish` updates the population and broadcasts one diff, with
/// per-type counts of the resulting population, to every subscriber.
/// `close` completes the stream.
pub struct InMemoryEntityRegistry {
    population: RwLock<Vec<EntityRecord>>,
    changes: Mutex<Option<broadcast::Sender<Arc<DiffEvent>>>>,
}

impl InMemoryEntityRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STREAM_CAPACITY)
    }

    pub fn with_capacity(stream_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(stream_capacity.max(1));
        Self {
            population: RwLock::new(Vec::new()),
            changes: Mutex::new(Some(changes)),
        }
    }

    /// Seeds the population without publishing a diff.
    pub fn with_population(self, entities: Vec<EntityRecord>) -> Self {
        Self {
            population: RwLock::new(entities),
            changes: self.changes,
        }
    }

    /// Applies additions and removals and broadcasts the resulting diff.
    ///
    /// Additions replace any entity with the same id. Returns the published
    /// diff.
    pub async fn publish(
        &self,
        added: Vec<EntityRecord>,
        removed: Vec<EntityRecord>,
    ) -> DiffEvent {
        let type_counts = {
            let mut population = self.population.write().await;
            let replaced: HashSet<&str> = removed
                .iter()
                .chain(added.iter())
                .map(|e| e.id.as_str())
                .collect();
            population.retain(|e| !replaced.contains(e.id.as_str()));
            population.extend(added.iter().cloned());
            count_types(&population)
        };

        let event = DiffEvent::detail(added, removed, type_counts);
        let Some(changes) = self.sender() else {
            tracing::debug!("[InMemoryEntityRegistry] stream closed, diff not broadcast");
            return event;
        };
        match changes.send(Arc::new(event.clone())) {
            Ok(receivers) => {
                tracing::debug!(receivers, "[InMemoryEntityRegistry] published diff");
            }
            Err(_) => {
                tracing::debug!("[InMemoryEntityRegistry] published diff with no subscribers");
            }
        }
        event
    }

    /// Completes the diff stream. Subscribers receive every diff already
    /// published, then see the stream end.
    pub fn close(&self) {
        let closed = self
            .changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if closed {
            tracing::info!("[InMemoryEntityRegistry] diff stream closed");
        }
    }

    fn sender(&self) -> Option<broadcast::Sender<Arc<DiffEvent>>> {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.population.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.population.read().await.is_empty()
    }
}

impl Default for InMemoryEntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn count_types(population: &[EntityRecord]) -> TypeCounts {
    let mut counts = TypeCounts::new();
    for entity in population {
        *counts.entry(entity.entity_type.clone()).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl CanonicalSource for InMemoryEntityRegistry {
    async fn get_all(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.population.read().await.clone())
    }

    async fn list_types(&self) -> Result<Vec<String>> {
        let population = self.population.read().await;
        let types: BTreeSet<&str> = population.iter().map(|e| e.entity_type.as_str()).collect();
        Ok(types.into_iter().map(str::to_string).collect())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<Arc<DiffEvent>> {
        match self.sender() {
            Some(changes) => changes.subscribe(),
            None => broadcast::channel(1).1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_updates_population_and_counts() {
        let registry = InMemoryEntityRegistry::new().with_population(vec![
            EntityRecord::new("w1", "Worker", "N1"),
            EntityRecord::new("g1", "Gateway", "N1"),
        ]);
        let mut changes = registry.subscribe_changes();

        let published = registry
            .publish(
                vec![EntityRecord::new("w2", "Worker", "N2")],
                vec![EntityRecord::new("g1", "Gateway", "N1")],
            )
            .await;

        assert_eq!(registry.len().await, 2);
        assert_eq!(published.type_counts.get("Worker"), Some(&2));
        assert_eq!(published.type_counts.get("Gateway"), None);

        let received = changes.recv().await.unwrap();
        assert_eq!(*received, published);
    }

    #[tokio::test]
    async fn test_readd_replaces_existing() {
        let registry = InMemoryEntityRegistry::new()
            .with_population(vec![EntityRecord::new("w1", "Worker", "N1")]);

        registry
            .publish(vec![EntityRecord::new("w1", "Worker", "N2")], Vec::new())
            .await;

        let all = registry.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].location, "N2");
    }

    #[tokio::test]
    async fn test_list_types_sorted_and_distinct() {
        let registry = InMemoryEntityRegistry::new().with_population(vec![
            EntityRecord::new("w1", "Worker", "N1"),
            EntityRecord::new("g1", "Gateway", "N1"),
            EntityRecord::new("w2", "Worker", "N2"),
        ]);

        assert_eq!(registry.list_types().await.unwrap(), vec!["Gateway", "Worker"]);
    }

    #[tokio::test]
    async fn test_close_ends_stream_after_pending_diffs() {
        let registry = InMemoryEntityRegistry::new();
        let mut changes = registry.subscribe_changes();

        registry
            .publish(vec![EntityRecord::new("w1", "Worker", "N1")], Vec::new())
            .await;
        registry.close();

        assert_eq!(changes.recv().await.unwrap().added.len(), 1);
        assert!(matches!(
            changes.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert!(matches!(
            registry.subscribe_changes().recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let registry = InMemoryEntityRegistry::new();

        let published = registry
            .publish(vec![EntityRecord::new("w1", "Worker", "N1")], Vec::new())
            .await;

        assert_eq!(published.added.len(), 1);
        assert!(!registry.is_empty().await);
    }
}
