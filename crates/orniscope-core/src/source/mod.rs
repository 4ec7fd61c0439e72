//! Interfaces of the external collaborators the engine depends on.
//!
//! The canonical source owns the full entity population and the shared diff
//! stream; the filter-value resolver supplies per-type filter values during
//! type filtering. Both are implemented outside the engine (see
//! `orniscope-infrastructure` for the in-memory implementations).

use crate::error::{EngineError, Result};
use crate::model::{DiffEvent, EntityRecord};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Filter name → entity id → resolved value, for a single entity type.
pub type TypeFilterValues = HashMap<String, HashMap<String, String>>;

/// Entity type → its resolved filter values.
pub type ResolvedFilters = HashMap<String, TypeFilterValues>;

/// The authoritative registry of monitored entities.
///
/// # Implementation Notes
///
/// The change stream is one logical broadcast shared by every session.
/// Adds and removes for the same entity must not be reordered relative to
/// each other; nothing stronger is promised.
#[async_trait]
pub trait CanonicalSource: Send + Sync {
    /// Returns the entire current population.
    async fn get_all(&self) -> Result<Vec<EntityRecord>>;

    /// Lists every entity type known to the source.
    async fn list_types(&self) -> Result<Vec<String>>;

    /// Opens a new receiver on the canonical diff stream.
    fn subscribe_changes(&self) -> broadcast::Receiver<Arc<DiffEvent>>;
}

/// Resolves the filterable values of entities, per type.
#[async_trait]
pub trait FilterValueResolver: Send + Sync {
    /// Resolves filter values for every requested type.
    ///
    /// Types without registered filters are simply absent from the result.
    async fn resolve_filters(&self, types: &BTreeSet<String>) -> Result<ResolvedFilters>;
}

/// Awaits a collaborator call, bounded by `limit` when one is configured.
///
/// Without a limit the call may stall indefinitely, which stalls the
/// requesting session with it.
pub async fn call_with_timeout<T, F>(
    operation: &'static str,
    limit: Option<Duration>,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        None => call.await,
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| EngineError::Timeout {
                operation,
                after_ms: limit.as_millis() as u64,
            })?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_without_limit_passes_result_through() {
        let value = call_with_timeout("noop", None, async { Ok::<_, EngineError>(5) })
            .await
            .unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_call_exceeding_limit_times_out() {
        let result: Result<()> = call_with_timeout(
            "get_all",
            Some(Duration::from_millis(10)),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("get_all"));
    }
}
