//! Sensor Routes

use axum::{extract::State, Json};
use storage::LatestReading;

use crate::AppState;

/// Most recent readings in chronological order.
///
/// Degrades to an empty array when the store cannot be queried.
pub async fn get_latest(State(state): State<AppState>) -> Json<Vec<LatestReading>> {
    let readings = state.repository.find_latest(state.latest_limit).await;
    Json(readings.iter().map(LatestReading::from).collect())
}
