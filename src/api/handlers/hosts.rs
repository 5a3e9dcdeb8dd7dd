//! Presence API handlers
//!
//! Read-only views over the committed host table, plus on-demand refresh.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::ApiState;
use crate::error::AppError;
use crate::models::normalize_mac;

// ============================================================================
// Request types
// ============================================================================

#[derive(Deserialize, Default)]
pub struct HostQuery {
    pub active: Option<bool>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/hosts - List hosts from the last committed snapshot
pub async fn list_hosts(
    State(state): State<ApiState>,
    Query(query): Query<HostQuery>,
) -> Json<serde_json::Value> {
    let table = state.coordinator.hosts();
    let hosts: Vec<_> = table
        .hosts()
        .filter(|h| query.active.map_or(true, |active| h.active == active))
        .collect();

    Json(serde_json::json!({
        "ok": true,
        "hosts": hosts,
        "total": hosts.len(),
    }))
}

/// GET /api/hosts/:mac - Get a single host by MAC (any case or separator)
pub async fn get_host(
    State(state): State<ApiState>,
    Path(mac): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let table = state.coordinator.hosts();
    let host = table
        .get(&mac)
        .ok_or_else(|| AppError::NotFound(format!("Host {} not found", normalize_mac(&mac))))?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "host": host,
    })))
}

/// GET /api/status - Refresh bookkeeping for the coordinator
pub async fn get_status(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let snapshot = state.coordinator.snapshot();

    Json(serde_json::json!({
        "ok": true,
        "last_update_success": snapshot.last_update_success,
        "last_refreshed_at": snapshot.last_refreshed_at,
        "last_attempt_at": snapshot.last_attempt_at,
        "last_error": snapshot.last_error,
        "cycles": snapshot.cycles,
        "host_count": snapshot.hosts.len(),
        "active_count": snapshot.hosts.active_count(),
        "refreshing": state.coordinator.is_refreshing(),
    }))
}

/// POST /api/refresh - Run a refresh cycle now and return its table
pub async fn refresh_now(
    State(state): State<ApiState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let table = state.coordinator.refresh().await?;
    let hosts: Vec<_> = table.hosts().collect();

    Ok(Json(serde_json::json!({
        "ok": true,
        "hosts": hosts,
        "total": table.len(),
        "active": table.active_count(),
    })))
}

/// POST /api/refresh/trigger - Queue a cycle on the background syncer
pub async fn trigger_refresh(State(state): State<ApiState>) -> impl IntoResponse {
    state.syncer.trigger();

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "ok": true,
            "message": "Refresh scheduled",
        })),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::api::{routes, ApiState};
    use crate::error::{ClientError, Stage};
    use crate::models::{Host, MeshDevice};
    use crate::presence::{CoordinatorSettings, PresenceCoordinator, PresenceSyncer};
    use crate::testutil::MockClient;

    fn app(mock: &Arc<MockClient>) -> (Router, ApiState) {
        let coordinator = Arc::new(PresenceCoordinator::new(
            mock.clone(),
            CoordinatorSettings::default(),
        ));
        let syncer = Arc::new(PresenceSyncer::new(
            coordinator,
            Duration::from_secs(60),
            Duration::ZERO,
        ));
        let state = ApiState::new(syncer);
        (routes(state.clone()), state)
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn seeded_mock() -> Arc<MockClient> {
        let mock = Arc::new(MockClient::new());
        mock.set_hosts(vec![
            Host::new("aa:bb:cc:00:11:22", false).with_name("phone"),
            Host::new("AA:BB:CC:00:11:33", true).with_name("laptop"),
        ]);
        mock.set_mesh(vec![MeshDevice::new("AA:BB:CC:00:11:22", true)]);
        mock
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(&Arc::new(MockClient::new()));
        let (status, body) = call(app, "GET", "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_hosts_empty_before_first_cycle() {
        let (app, _) = app(&seeded_mock());
        let (status, body) = call(app, "GET", "/api/hosts").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_list_hosts_after_refresh() {
        let mock = seeded_mock();
        let (app, state) = app(&mock);
        state.coordinator.refresh().await.unwrap();

        let (_, body) = call(app.clone(), "GET", "/api/hosts").await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["hosts"][0]["id"], "AA:BB:CC:00:11:22");
        assert_eq!(body["hosts"][0]["active"], true);

        mock.set_hosts(vec![Host::new("AA:BB:CC:00:11:33", true)]);
        mock.set_mesh(vec![]);
        state.coordinator.refresh().await.unwrap();

        let (_, body) = call(app, "GET", "/api/hosts?active=false").await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["hosts"][0]["name"], "phone");
    }

    #[tokio::test]
    async fn test_get_host_by_any_case() {
        let mock = seeded_mock();
        let (app, state) = app(&mock);
        state.coordinator.refresh().await.unwrap();

        let (status, body) = call(app.clone(), "GET", "/api/hosts/aa-bb-cc-00-11-33").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["host"]["name"], "laptop");

        let (status, body) = call(app, "GET", "/api/hosts/AA:BB:CC:99:99:99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_refresh_now_reports_errors() {
        let mock = seeded_mock();
        let (app, _) = app(&mock);

        let (status, body) = call(app.clone(), "POST", "/api/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["active"], 2);

        mock.fail(Stage::Hosts, ClientError::Transport("unreachable".into()));
        let (status, body) = call(app.clone(), "POST", "/api/refresh").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("unreachable"));

        let (_, status_body) = call(app, "GET", "/api/status").await;
        assert_eq!(status_body["last_update_success"], false);
        assert_eq!(status_body["host_count"], 2);
        assert_eq!(status_body["cycles"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_now_times_out() {
        let mock = seeded_mock();
        mock.hang(Stage::Mesh);
        let (app, _) = app(&mock);

        let (status, _) = call(app, "POST", "/api/refresh").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(mock.logouts(), 1);
    }

    #[tokio::test]
    async fn test_refresh_now_conflicts_with_running_cycle() {
        let mock = seeded_mock();
        mock.hang(Stage::Hosts);
        let (app, state) = app(&mock);

        let coordinator = state.coordinator.clone();
        let running = tokio::spawn(async move { coordinator.refresh().await });
        while !state.coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let (status, _) = call(app.clone(), "POST", "/api/refresh").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = call(app, "GET", "/api/status").await;
        assert_eq!(body["refreshing"], true);

        running.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_runs_background_cycle() {
        let mock = seeded_mock();
        let (app, state) = app(&mock);

        let sync_task = tokio::spawn(state.syncer.clone().start());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(mock.logins(), 1);

        let (status, body) = call(app.clone(), "POST", "/api/refresh/trigger").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["ok"], true);

        tokio::time::sleep(Duration::from_secs(1)).await;
        sync_task.abort();

        assert_eq!(mock.logins(), 2);
        assert_eq!(mock.logouts(), 2);
        let (_, status_body) = call(app, "GET", "/api/status").await;
        assert_eq!(status_body["cycles"], 2);
    }
}
