use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    fees::{payout_preview, SettlementBreakdown},
    models::{ApiResponse, Match, PaginatedResponse},
    services::duel_platform::ListQuery,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ListMatchesQuery {
    pub status: Option<u8>,
    pub mode: Option<u8>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetail {
    #[serde(flatten)]
    pub r#match: Match,
    /// Projected settlement split while the match can still pay out.
    pub payout: Option<SettlementBreakdown>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchWebhook {
    pub match_id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchWebhookResponse {
    pub message: String,
    pub match_id: u64,
}

/// GET /api/matches
pub async fn list_matches(
    State(state): State<AppState>,
    Query(query): Query<ListMatchesQuery>,
) -> Result<Json<PaginatedResponse<Match>>> {
    let page = state
        .duel
        .list_matches(ListQuery {
            status: query.status,
            mode: query.mode,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;

    Ok(Json(PaginatedResponse::new(
        page.matches,
        page.total,
        page.limit,
        page.offset,
    )))
}

/// GET /api/matches/:id
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<u64>,
) -> Result<Json<ApiResponse<MatchDetail>>> {
    let m = state.duel.require_match(match_id).await?;
    let payout = payout_preview(&m);

    Ok(Json(ApiResponse::success(MatchDetail { r#match: m, payout })))
}

/// POST /api/matches, the chain webhook. Nothing is persisted off-chain; the
/// notification just drops the cached entry so the next read is fresh.
pub async fn match_webhook(
    State(state): State<AppState>,
    Json(payload): Json<MatchWebhook>,
) -> Result<(StatusCode, Json<MatchWebhookResponse>)> {
    state.duel.invalidate(payload.match_id).await;
    state.duel.invalidate_counter().await;
    tracing::info!(match_id = payload.match_id, "Match webhook received");

    Ok((
        StatusCode::CREATED,
        Json(MatchWebhookResponse {
            message: "Match cache refreshed".to_string(),
            match_id: payload.match_id,
        }),
    ))
}
