//! History endpoint handler.

use axum::{
    extract::{Query, State},
    Json,
};
use herakles_sysmon::snapshot::SnapshotRecord;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Only the newest `limit` snapshots.
    pub limit: Option<usize>,
}

/// Handler for the /history endpoint. Oldest snapshot first.
#[instrument(skip(state))]
pub async fn history_handler(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<SnapshotRecord>> {
    debug!("Processing /history request");

    let history = state.monitor.history();
    let skip = query
        .limit
        .map(|limit| history.len().saturating_sub(limit))
        .unwrap_or(0);

    Json(history.iter().skip(skip).map(|s| s.to_record()).collect())
}
