use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    chain::parse_address,
    error::{AppError, Result},
    models::ApiResponse,
    services::oracle::OracleStatus,
};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub match_id: Option<u64>,
    pub external_match_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub match_id: u64,
    pub winner: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub message: String,
    pub match_id: u64,
    pub tx_hash: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /api/oracle/status
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<OracleStatus>> {
    Json(ApiResponse::success(state.oracle.status().await))
}

/// POST /api/oracle/start
pub async fn start(State(state): State<AppState>) -> Json<ApiResponse<MessageResponse>> {
    state.oracle.clone().start();
    Json(ApiResponse::success(MessageResponse {
        message: "Oracle service started".to_string(),
    }))
}

/// POST /api/oracle/stop
pub async fn stop(State(state): State<AppState>) -> Json<ApiResponse<MessageResponse>> {
    state.oracle.stop();
    Json(ApiResponse::success(MessageResponse {
        message: "Oracle service stopped".to_string(),
    }))
}

/// POST /api/oracle/settle: fetches the result from the external feed and
/// submits it on-chain. Missing fields are a 400, not an extractor rejection.
pub async fn settle(
    State(state): State<AppState>,
    Json(payload): Json<SettleRequest>,
) -> Result<Json<ApiResponse<SettlementResponse>>> {
    let (match_id, external_match_id) = validate_settle(&payload)?;
    let tx_hash = state.oracle.manual_settle(match_id, external_match_id).await?;

    Ok(Json(ApiResponse::success(SettlementResponse {
        message: "Match settled".to_string(),
        match_id,
        tx_hash,
    })))
}

fn validate_settle(payload: &SettleRequest) -> Result<(u64, &str)> {
    let match_id = payload
        .match_id
        .ok_or_else(|| AppError::BadRequest("matchId is required".to_string()))?;
    let external_match_id = payload
        .external_match_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("externalMatchId must not be empty".to_string()))?;
    Ok((match_id, external_match_id))
}

/// POST /api/oracle/submit: submits a known winner directly, bypassing the
/// result feed.
pub async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<ApiResponse<SettlementResponse>>> {
    let winner = parse_address(&payload.winner)?;
    let tx_hash = state.oracle.submit_result(payload.match_id, winner).await?;

    Ok(Json(ApiResponse::success(SettlementResponse {
        message: "Result submitted".to_string(),
        match_id: payload.match_id,
        tx_hash,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle_request(json: serde_json::Value) -> SettleRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn settle_without_match_id_is_a_bad_request() {
        let payload = settle_request(serde_json::json!({ "externalMatchId": "dupr-42" }));
        assert!(matches!(
            validate_settle(&payload),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn settle_without_external_match_id_is_a_bad_request() {
        for body in [
            serde_json::json!({ "matchId": 7 }),
            serde_json::json!({ "matchId": 7, "externalMatchId": "" }),
            serde_json::json!({ "matchId": 7, "externalMatchId": "   " }),
        ] {
            let payload = settle_request(body);
            assert!(matches!(
                validate_settle(&payload),
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn settle_trims_the_external_match_id() {
        let payload = settle_request(serde_json::json!({
            "matchId": 7,
            "externalMatchId": " dupr-42 "
        }));
        assert_eq!(validate_settle(&payload).unwrap(), (7, "dupr-42"));
    }
}
