//! sagemcom-presence - connected-device presence for Sagemcom F@st routers
//!
//! Polls the router over an authenticated session, merges the host list with
//! mesh presence, and keeps a cumulative, timestamped host table that an HTTP
//! API and in-process subscribers can read at any time.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod presence;
pub mod server;

#[cfg(test)]
mod testutil;

pub use crate::config::Config;
pub use crate::error::{ClientError, RefreshError, Stage};
pub use crate::models::{normalize_mac, Host, HostTable, MeshDevice};
pub use crate::presence::{
    CoordinatorSettings, PresenceCoordinator, PresenceSnapshot, PresenceSyncer, SessionClient,
};
pub use crate::server::{init_tracing, serve};
