//! Service Status Routes

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::ErrorBody;
use crate::AppState;

/// Response for the root endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub message: String,
    pub status: String,
    /// RFC 3339, UTC
    pub timestamp: String,
}

/// Response for the stats endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_records: u64,
    /// `YYYY-MM-DD HH:MM:SS`, or `"No data"` on an empty store
    pub latest_timestamp: String,
    /// `"active"` when at least one reading exists, otherwise `"inactive"`
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthyResponse {
    pub status: String,
    pub database: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Liveness and identity
pub async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    Json(HomeResponse {
        message: state.message.clone(),
        status: "active".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Record count and freshness of the newest reading
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ErrorBody>)> {
    let stats = async {
        let total_records = state.repository.count().await?;
        let latest = state.repository.find_most_recent().await?;
        Ok::<_, storage::StorageError>((total_records, latest))
    };

    match stats.await {
        Ok((total_records, latest)) => Ok(Json(StatsResponse {
            total_records,
            latest_timestamp: latest
                .as_ref()
                .map(|r| r.display_time())
                .unwrap_or_else(|| "No data".to_string()),
            status: if latest.is_some() { "active" } else { "inactive" }.to_string(),
        })),
        Err(e) => {
            error!("Failed to compute stats: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            ))
        }
    }
}

/// Backend connectivity probe
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthyResponse>, (StatusCode, Json<UnhealthyResponse>)> {
    match state.repository.ping().await {
        Ok(()) => Ok(Json(HealthyResponse {
            status: "healthy".to_string(),
            database: "connected".to_string(),
        })),
        Err(e) => {
            error!("Health check failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: e.to_string(),
                }),
            ))
        }
    }
}
