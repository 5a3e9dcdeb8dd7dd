//! Error handling module

use std::fmt;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failure reported by a [`SessionClient`](crate::presence::SessionClient) call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// Which step of the refresh cycle a communication error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Login,
    Hosts,
    Mesh,
    Logout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Login => "login",
            Stage::Hosts => "host list fetch",
            Stage::Mesh => "mesh device fetch",
            Stage::Logout => "logout",
        };
        f.write_str(name)
    }
}

/// Classified outcome of a failed refresh cycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("Update failed: timed out after {0:?}")]
    Timeout(Duration),

    #[error("Update failed: error communicating with API during {stage}: {source}")]
    Communication {
        stage: Stage,
        #[source]
        source: ClientError,
    },

    #[error("Update failed: refresh already in progress")]
    InProgress,

    #[error("Update failed: refresh task aborted")]
    Aborted,
}

impl RefreshError {
    pub fn communication(stage: Stage, source: ClientError) -> Self {
        RefreshError::Communication { stage, source }
    }

    /// Stage of a communication failure, `None` for the other variants
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RefreshError::Communication { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Refresh(RefreshError::InProgress) => StatusCode::CONFLICT,
            AppError::Refresh(RefreshError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Refresh(RefreshError::Communication { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Refresh(RefreshError::Aborted) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
