//! Per-session view state.
//!
//! `SessionState` owns the client's current filter, its retained filtered
//! copy of the population and the summary threshold. It is driven by a
//! single worker task (see `worker`), so nothing here is shared or locked.

use orniscope_core::source::call_with_timeout;
use orniscope_core::{
    AggregationEngine, CanonicalSource, DiffEvent, EngineSettings, EntityRecord, FilterEngine,
    FilterSpec, Result,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Mutable view state of one dashboard client.
pub struct SessionState {
    current_filter: Option<FilterSpec>,
    retained: Vec<EntityRecord>,
    summary_threshold: usize,
    showing_summary: bool,
    purge_removed: bool,
    call_timeout: Option<Duration>,
    source: Arc<dyn CanonicalSource>,
    filter_engine: Arc<FilterEngine>,
    aggregation: AggregationEngine,
}

impl SessionState {
    pub fn new(
        source: Arc<dyn CanonicalSource>,
        filter_engine: Arc<FilterEngine>,
        aggregation: AggregationEngine,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            current_filter: None,
            retained: Vec::new(),
            summary_threshold: settings.summary_threshold.max(1),
            showing_summary: false,
            purge_removed: settings.purge_removed,
            call_timeout: settings.external_call_timeout(),
            source,
            filter_engine,
            aggregation,
        }
    }

    pub fn current_filter(&self) -> Option<&FilterSpec> {
        self.current_filter.as_ref()
    }

    pub fn retained(&self) -> &[EntityRecord] {
        &self.retained
    }

    pub fn summary_threshold(&self) -> usize {
        self.summary_threshold
    }

    /// True while the retained set is larger than the summary threshold.
    pub fn in_summary_mode(&self) -> bool {
        self.retained.len() > self.summary_threshold
    }

    /// Replaces the filter and rebuilds the retained set from the full
    /// canonical population.
    ///
    /// Returns a summary snapshot when the result is over the threshold,
    /// otherwise a detail snapshot of every retained entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the canonical source or the filter-value resolver
    /// fails. The previous filter and retained set are left untouched.
    pub async fn full_refresh(&mut self, filter: Option<FilterSpec>) -> Result<DiffEvent> {
        let population = call_with_timeout(
            "canonical source",
            self.call_timeout,
            self.source.get_all(),
        )
        .await?;
        let retained = self.filter_engine.apply(filter.as_ref(), population).await?;

        self.current_filter = filter;
        self.retained = retained;

        tracing::debug!(
            retained = self.retained.len(),
            threshold = self.summary_threshold,
            "[SessionState] full refresh complete"
        );

        self.showing_summary = self.in_summary_mode();
        if self.showing_summary {
            return Ok(self.summary_diff(Default::default()));
        }
        Ok(DiffEvent::snapshot(self.retained.clone()))
    }

    /// Re-runs the full refresh with the current filter.
    ///
    /// Used when incoming diffs were lost and the retained set can no longer
    /// be trusted.
    pub async fn resync(&mut self) -> Result<DiffEvent> {
        let filter = self.current_filter.clone();
        self.full_refresh(filter).await
    }

    /// Folds one canonical diff into the retained set.
    ///
    /// In summary mode a summary diff is produced for every incoming event,
    /// even when the filtered delta is empty. Dropping back from summary to
    /// detail mode produces a detail snapshot of the whole retained set, since
    /// the client only holds group summaries at that point. Otherwise `None`
    /// is returned when the event neither adds (after filtering) nor removes
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter-value resolver fails; the retained set
    /// is unchanged in that case.
    pub async fn apply_incoming(&mut self, event: &DiffEvent) -> Result<Option<DiffEvent>> {
        let filtered_adds = self
            .filter_engine
            .apply(self.current_filter.as_ref(), event.added.clone())
            .await?;

        tracing::debug!(
            incoming = event.added.len(),
            kept = filtered_adds.len(),
            removed = event.removed.len(),
            "[SessionState] applying incoming diff"
        );

        let evicted = if self.purge_removed {
            self.reconcile(event, &filtered_adds)
        } else {
            self.retained.extend(filtered_adds.iter().cloned());
            Vec::new()
        };

        let was_summary = self.showing_summary;
        self.showing_summary = self.in_summary_mode();

        if self.showing_summary {
            return Ok(Some(self.summary_diff(event.type_counts.clone())));
        }

        if was_summary {
            tracing::debug!(
                retained = self.retained.len(),
                "[SessionState] back under threshold, sending detail snapshot"
            );
            let mut snapshot = DiffEvent::snapshot(self.retained.clone());
            snapshot.type_counts = event.type_counts.clone();
            return Ok(Some(snapshot));
        }

        let mut removed = event.removed.clone();
        removed.extend(evicted);
        if filtered_adds.is_empty() && removed.is_empty() {
            return Ok(None);
        }
        Ok(Some(DiffEvent::detail(
            filtered_adds,
            removed,
            event.type_counts.clone(),
        )))
    }

    /// Updates the threshold when `limit` is positive; anything else is ignored.
    pub fn set_summary_threshold(&mut self, limit: i64) {
        if limit > 0 {
            self.summary_threshold = usize::try_from(limit).unwrap_or(usize::MAX);
        } else {
            tracing::debug!(limit, "[SessionState] ignoring non-positive summary threshold");
        }
    }

    /// Lists entity types known to the canonical source.
    pub async fn entity_types(&self) -> Result<Vec<String>> {
        call_with_timeout("canonical source", self.call_timeout, self.source.list_types()).await
    }

    fn summary_diff(&self, type_counts: orniscope_core::TypeCounts) -> DiffEvent {
        let summary = self.aggregation.summarize(&self.retained);
        DiffEvent::summary(summary.groups, summary.links, type_counts)
    }

    /// Drops removed entities and every retained copy of a re-added id,
    /// then appends the additions that passed the filter.
    ///
    /// Returns the retained copies of re-added ids that no longer pass the
    /// filter; the client still shows them and has to be told they left.
    fn reconcile(&mut self, event: &DiffEvent, filtered_adds: &[EntityRecord]) -> Vec<EntityRecord> {
        let removed: HashSet<&str> = event.removed.iter().map(|e| e.id.as_str()).collect();
        let readded: HashSet<&str> = event.added.iter().map(|e| e.id.as_str()).collect();
        let kept: HashSet<&str> = filtered_adds.iter().map(|e| e.id.as_str()).collect();

        let mut evicted = Vec::new();
        if !removed.is_empty() || !readded.is_empty() {
            let mut retained = Vec::with_capacity(self.retained.len());
            for entity in self.retained.drain(..) {
                let id = entity.id.as_str();
                if removed.contains(id) {
                    continue;
                }
                if readded.contains(id) {
                    if !kept.contains(id) {
                        evicted.push(entity);
                    }
                    continue;
                }
                retained.push(entity);
            }
            self.retained = retained;
        }
        self.retained.extend(filtered_adds.iter().cloned());
        evicted
    }
}
