use super::pump::spawn_pump;
use super::state::SessionState;
use super::worker::DashboardSession;
use orniscope_core::{
    AggregationEngine, CanonicalSource, EngineSettings, FilterEngine, FilterValueResolver,
    LinkOriginRegistry,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

struct AttachedSession {
    handle: DashboardSession,
    worker: JoinHandle<()>,
    pump: JoinHandle<()>,
}

/// Manages the sessions of every attached dashboard client.
///
/// `SessionManager` is responsible for:
/// - Creating a session worker when a client attaches
/// - Feeding the canonical diff stream into each session
/// - Tearing both down when the client detaches
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, AttachedSession>>>,
    source: Arc<dyn CanonicalSource>,
    filter_engine: Arc<FilterEngine>,
    aggregation: AggregationEngine,
    settings: EngineSettings,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `source` - The canonical source every session reads from
    /// * `resolver` - Resolver used for type filters
    /// * `link_origins` - Link-origin registry shared by all aggregation passes
    /// * `settings` - Engine settings applied to new sessions
    pub fn new(
        source: Arc<dyn CanonicalSource>,
        resolver: Arc<dyn FilterValueResolver>,
        link_origins: Arc<LinkOriginRegistry>,
        settings: EngineSettings,
    ) -> Self {
        let filter_engine =
            FilterEngine::new(resolver).with_call_timeout(settings.external_call_timeout());
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            source,
            filter_engine: Arc::new(filter_engine),
            aggregation: AggregationEngine::new(link_origins),
            settings,
        }
    }

    /// Attaches a client, returning the existing session if one is already
    /// attached under `session_id`.
    pub async fn attach(&self, session_id: &str) -> DashboardSession {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(session_id) {
            if !existing.handle.is_closed() {
                return existing.handle.clone();
            }
        }
        if let Some(stale) = sessions.remove(session_id) {
            stale.pump.abort();
            tracing::warn!(
                session = session_id,
                worker_finished = stale.worker.is_finished(),
                "[SessionManager] replacing session whose worker had stopped"
            );
        }

        // Subscribe before the worker starts so no diff published after
        // attach is missed.
        let changes = self.source.subscribe_changes();
        let state = SessionState::new(
            Arc::clone(&self.source),
            Arc::clone(&self.filter_engine),
            self.aggregation.clone(),
            &self.settings,
        );
        let (handle, worker) = DashboardSession::spawn(session_id, state, self.settings.inbox_capacity);
        let pump = spawn_pump(changes, handle.clone());

        tracing::info!(session = session_id, "[SessionManager] session attached");
        sessions.insert(
            session_id.to_string(),
            AttachedSession {
                handle: handle.clone(),
                worker,
                pump,
            },
        );
        handle
    }

    /// Gets a live attached session by ID.
    pub async fn get(&self, session_id: &str) -> Option<DashboardSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .filter(|s| !s.handle.is_closed())
            .map(|s| s.handle.clone())
    }

    /// Detaches a client and stops its worker.
    ///
    /// Returns `false` if no session was attached under `session_id`.
    pub async fn detach(&self, session_id: &str) -> bool {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };
        let Some(attached) = removed else {
            return false;
        };

        attached.pump.abort();
        Self::stop(session_id, attached).await;
        true
    }

    /// Detaches a client once the canonical stream has completed and every
    /// diff it carried has been handled by the session.
    ///
    /// Waits for the stream to close; callers close the source first.
    /// Returns `false` if no session was attached under `session_id`.
    pub async fn detach_when_drained(&self, session_id: &str) -> bool {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };
        let Some(mut attached) = removed else {
            return false;
        };

        if let Err(e) = (&mut attached.pump).await {
            tracing::warn!(session = session_id, error = %e, "[SessionManager] pump ended abnormally");
        }
        Self::stop(session_id, attached).await;
        true
    }

    async fn stop(session_id: &str, attached: AttachedSession) {
        attached.handle.shutdown().await;
        if let Err(e) = attached.worker.await {
            tracing::warn!(session = session_id, error = %e, "[SessionManager] worker ended abnormally");
        }
        tracing::info!(session = session_id, "[SessionManager] session detached");
    }

    /// Detaches every client.
    pub async fn detach_all(&self) {
        let ids: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions.keys().cloned().collect()
        };
        for id in ids {
            self.detach(&id).await;
        }
    }

    /// Number of attached sessions whose worker is still running.
    pub async fn session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| !s.handle.is_closed())
            .count()
    }
}
