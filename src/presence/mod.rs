//! Router presence integration module
//!
//! - `client`: Session capability the router integration provides
//! - `coordinator`: Refresh cycle, single-flight gate, committed snapshot
//! - `reconcile`: Host list + mesh presence merge
//! - `sync`: Background polling loop

pub mod client;
pub mod coordinator;
pub mod reconcile;
pub mod sync;

pub use client::SessionClient;
pub use coordinator::{CoordinatorSettings, PresenceCoordinator, PresenceSnapshot};
pub use sync::PresenceSyncer;
