//! Snapshot endpoint handler.
//!
//! Takes a fresh snapshot on a blocking thread; tiers that are still fresh
//! are served from the cache.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotQuery {
    #[serde(default)]
    pub pretty: bool,
}

/// Error type for snapshot endpoint failures.
#[derive(Debug)]
pub enum SnapshotError {
    Unavailable(String),
    EncodingFailed,
}

impl IntoResponse for SnapshotError {
    fn into_response(self) -> Response {
        match self {
            SnapshotError::Unavailable(reason) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Snapshot unavailable: {}", reason),
            )
                .into_response(),
            SnapshotError::EncodingFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode snapshot",
            )
                .into_response(),
        }
    }
}

/// Handler for the /snapshot endpoint.
#[instrument(skip(state))]
pub async fn snapshot_handler(
    State(state): State<SharedState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Response, SnapshotError> {
    debug!("Processing /snapshot request");

    let monitor = Arc::clone(&state.monitor);
    let snapshot = tokio::task::spawn_blocking(move || monitor.state())
        .await
        .map_err(|e| SnapshotError::Unavailable(e.to_string()))?
        .map_err(|e| {
            warn!("Snapshot request failed: {}", e);
            SnapshotError::Unavailable(e.to_string())
        })?;

    let body = snapshot
        .to_json(query.pretty)
        .map_err(|_| SnapshotError::EncodingFailed)?;

    Ok((
        StatusCode::OK,
        [("Content-Type", "application/json")],
        body,
    )
        .into_response())
}
