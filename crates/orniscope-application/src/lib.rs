//! Application layer for Orniscope.
//!
//! This crate turns the domain engines of `orniscope-core` into live,
//! per-client dashboard sessions fed by the canonical diff stream.

pub mod session;

pub use session::{DashboardSession, Listener, ListenerId, SessionManager};
