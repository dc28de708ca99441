use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    constants::{RECENT_LIMIT_DEFAULT, RECENT_LIMIT_MAX},
    error::Result,
    models::{ApiResponse, PlatformStats, RecentMatch},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// GET /api/stats/platform
pub async fn platform_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PlatformStats>>> {
    let mut stats = state.duel.platform_stats().await?;
    stats.recent_matches.truncate(RECENT_LIMIT_DEFAULT);
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/stats/recent
pub async fn recent_matches(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<ApiResponse<Vec<RecentMatch>>>> {
    let limit = query
        .limit
        .unwrap_or(RECENT_LIMIT_DEFAULT)
        .clamp(1, RECENT_LIMIT_MAX);
    let recent = state.duel.recent_matches(limit).await?;
    Ok(Json(ApiResponse::success(recent)))
}
