//! API module - HTTP handlers and routes

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::presence::{PresenceCoordinator, PresenceSyncer};

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<PresenceCoordinator>,
    pub syncer: Arc<PresenceSyncer>,
}

impl ApiState {
    pub fn new(syncer: Arc<PresenceSyncer>) -> Self {
        Self {
            coordinator: syncer.coordinator().clone(),
            syncer,
        }
    }
}

pub fn routes(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Presence snapshot
        .route("/api/hosts", get(handlers::list_hosts))
        .route("/api/hosts/:mac", get(handlers::get_host))
        .route("/api/status", get(handlers::get_status))
        // Refresh
        .route("/api/refresh", post(handlers::refresh_now))
        .route("/api/refresh/trigger", post(handlers::trigger_refresh))
        .with_state(state)
}
