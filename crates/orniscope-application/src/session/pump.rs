use super::worker::DashboardSession;
use orniscope_core::DiffEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Forwards the canonical diff stream into one session's inbox.
///
/// Stops when the stream completes or the session is gone. When the
/// receiver lags, the missed diffs are gone for good, so the session is asked
/// to rebuild its view from the canonical source before forwarding resumes.
pub fn spawn_pump(
    mut changes: broadcast::Receiver<Arc<DiffEvent>>,
    session: DashboardSession,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(event) => {
                    if session.push_diff(event).await.is_err() {
                        tracing::debug!(session = session.id(), "[StreamPump] session closed, stopping");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        session = session.id(),
                        skipped,
                        "[StreamPump] fell behind the canonical stream, resyncing"
                    );
                    if session.request_resync().await.is_err() {
                        tracing::debug!(session = session.id(), "[StreamPump] session closed, stopping");
                        break;
                    }
                }
                Err(RecvError::Closed) => {
                    tracing::info!(session = session.id(), "[StreamPump] canonical stream completed");
                    break;
                }
            }
        }
    })
}
