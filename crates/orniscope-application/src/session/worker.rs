//! Single-worker command queue for one session.
//!
//! Every request against a session is a `SessionCommand` pushed into its
//! inbox. One task drains the inbox in arrival order, so a request that is
//! suspended on the canonical source or the filter resolver holds back the
//! requests queued behind it instead of interleaving with them.

use super::hub::{Listener, ListenerId, SubscriptionHub};
use super::state::SessionState;
use orniscope_core::{DiffEvent, EngineError, FilterSpec, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum SessionCommand {
    GetAll {
        filter: Option<FilterSpec>,
        reply: oneshot::Sender<Result<DiffEvent>>,
    },
    Incoming(Arc<DiffEvent>),
    Resync,
    Subscribe {
        listener: Listener,
        reply: oneshot::Sender<bool>,
    },
    Unsubscribe {
        listener_id: ListenerId,
        reply: oneshot::Sender<bool>,
    },
    SetSummaryViewLimit {
        limit: i64,
        reply: oneshot::Sender<()>,
    },
    GetEntityTypes {
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
    Shutdown,
}

/// Cloneable handle to a running session worker.
///
/// This is the surface a dashboard client talks to. All methods enqueue a
/// command and, where there is an answer, wait for it.
#[derive(Clone)]
pub struct DashboardSession {
    id: Arc<str>,
    inbox: mpsc::Sender<SessionCommand>,
}

impl DashboardSession {
    /// Starts the worker for `state` and returns its handle.
    pub fn spawn(
        id: impl Into<String>,
        state: SessionState,
        inbox_capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let id: Arc<str> = Arc::from(id.into());
        let (inbox, commands) = mpsc::channel(inbox_capacity.max(1));
        let worker = SessionWorker {
            id: Arc::clone(&id),
            state,
            hub: SubscriptionHub::new(),
            commands,
        };
        let handle = tokio::spawn(worker.run());
        (Self { id, inbox }, handle)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True once the worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    /// Replaces the session filter and returns a full snapshot of the view.
    ///
    /// # Errors
    ///
    /// Returns an error if the canonical source or the filter resolver
    /// fails, or if the session is closed.
    pub async fn get_all(&self, filter: Option<FilterSpec>) -> Result<DiffEvent> {
        let (reply, answer) = oneshot::channel();
        self.send(SessionCommand::GetAll { filter, reply }).await?;
        self.receive(answer).await?
    }

    /// Subscribes `listener`; returns `false` if it was already subscribed.
    pub async fn subscribe(&self, listener: Listener) -> Result<bool> {
        let (reply, answer) = oneshot::channel();
        self.send(SessionCommand::Subscribe { listener, reply }).await?;
        self.receive(answer).await
    }

    /// Unsubscribes a listener; returns `false` if it was not subscribed.
    pub async fn unsubscribe(&self, listener_id: ListenerId) -> Result<bool> {
        let (reply, answer) = oneshot::channel();
        self.send(SessionCommand::Unsubscribe { listener_id, reply })
            .await?;
        self.receive(answer).await
    }

    /// Lists entity types known to the canonical source.
    pub async fn get_entity_types(&self) -> Result<Vec<String>> {
        let (reply, answer) = oneshot::channel();
        self.send(SessionCommand::GetEntityTypes { reply }).await?;
        self.receive(answer).await?
    }

    /// Sets the summary threshold. Non-positive limits are ignored.
    pub async fn set_summary_view_limit(&self, limit: i64) -> Result<()> {
        let (reply, answer) = oneshot::channel();
        self.send(SessionCommand::SetSummaryViewLimit { limit, reply })
            .await?;
        self.receive(answer).await
    }

    /// Queues a canonical diff for this session.
    pub async fn push_diff(&self, event: Arc<DiffEvent>) -> Result<()> {
        self.send(SessionCommand::Incoming(event)).await
    }

    /// Queues a full refresh with the current filter, broadcast to every
    /// listener. Used after diffs from the canonical stream were lost.
    pub async fn request_resync(&self) -> Result<()> {
        self.send(SessionCommand::Resync).await
    }

    /// Asks the worker to stop after the commands already queued.
    pub async fn shutdown(&self) {
        // A closed inbox means the worker is already gone.
        let _ = self.inbox.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.inbox
            .send(command)
            .await
            .map_err(|_| EngineError::session_closed(self.id.as_ref()))
    }

    async fn receive<T>(&self, answer: oneshot::Receiver<T>) -> Result<T> {
        answer
            .await
            .map_err(|_| EngineError::session_closed(self.id.as_ref()))
    }
}

struct SessionWorker {
    id: Arc<str>,
    state: SessionState,
    hub: SubscriptionHub,
    commands: mpsc::Receiver<SessionCommand>,
}

impl SessionWorker {
    async fn run(mut self) {
        tracing::info!(session = %self.id, "[SessionWorker] started");

        while let Some(command) = self.commands.recv().await {
            match command {
                SessionCommand::GetAll { filter, reply } => {
                    let result = self.state.full_refresh(filter).await;
                    if let Err(e) = &result {
                        tracing::warn!(session = %self.id, error = %e, "[SessionWorker] full refresh failed");
                    }
                    let _ = reply.send(result);
                }
                SessionCommand::Incoming(event) => self.handle_incoming(&event).await,
                SessionCommand::Resync => self.handle_resync().await,
                SessionCommand::Subscribe { listener, reply } => {
                    let added = self.hub.subscribe(listener);
                    tracing::debug!(session = %self.id, added, listeners = self.hub.len(), "[SessionWorker] subscribe");
                    let _ = reply.send(added);
                }
                SessionCommand::Unsubscribe { listener_id, reply } => {
                    let removed = self.hub.unsubscribe(listener_id);
                    tracing::debug!(session = %self.id, removed, listeners = self.hub.len(), "[SessionWorker] unsubscribe");
                    let _ = reply.send(removed);
                }
                SessionCommand::SetSummaryViewLimit { limit, reply } => {
                    self.state.set_summary_threshold(limit);
                    let _ = reply.send(());
                }
                SessionCommand::GetEntityTypes { reply } => {
                    let _ = reply.send(self.state.entity_types().await);
                }
                SessionCommand::Shutdown => break,
            }
        }

        tracing::info!(session = %self.id, "[SessionWorker] stopped");
    }

    async fn handle_incoming(&mut self, event: &DiffEvent) {
        let diff = match self.state.apply_incoming(event).await {
            Ok(Some(diff)) => diff,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "[SessionWorker] dropping incoming diff");
                return;
            }
        };

        self.broadcast(diff);
    }

    async fn handle_resync(&mut self) {
        match self.state.resync().await {
            Ok(snapshot) => {
                tracing::info!(session = %self.id, "[SessionWorker] resynced with canonical source");
                self.broadcast(snapshot);
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "[SessionWorker] resync failed");
            }
        }
    }

    fn broadcast(&mut self, diff: DiffEvent) {
        let report = self.hub.broadcast(Arc::new(diff));
        tracing::debug!(
            session = %self.id,
            delivered = report.delivered,
            failed = report.failures.len(),
            "[SessionWorker] broadcast diff"
        );
    }
}
