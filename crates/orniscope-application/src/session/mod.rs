//! Session application services.
//!
//! This module contains the per-client session engine: its view state, the
//! single-worker command queue that serializes access to it, listener
//! fan-out, and the manager that attaches and detaches clients.

mod hub;
mod manager;
mod pump;
mod state;
mod worker;

pub use hub::{BroadcastReport, DeliveryFailure, Listener, ListenerId, SubscriptionHub};
pub use manager::SessionManager;
pub use pump::spawn_pump;
pub use state::SessionState;
pub use worker::DashboardSession;
