use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    chain::parse_address,
    error::Result,
    models::{ApiResponse, Match, PaginatedResponse, UserStats},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct UserMatchesQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// GET /api/users/:address/stats
pub async fn user_stats(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<UserStats>>> {
    let address = parse_address(&address)?;
    let stats = state.duel.user_stats(address).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/users/:address/matches
pub async fn user_matches(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<UserMatchesQuery>,
) -> Result<Json<PaginatedResponse<Match>>> {
    let address = parse_address(&address)?;
    let page = state
        .duel
        .user_matches(address, query.limit, query.offset)
        .await?;

    Ok(Json(PaginatedResponse::new(
        page.matches,
        page.total,
        page.limit,
        page.offset,
    )))
}
