use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Blockchain RPC error: {0}")]
    BlockchainRpc(String),

    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("Result feed error: {0}")]
    ResultFeed(String),

    #[error("No result available yet for external match {0}")]
    ResultPending(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BlockchainRpc(ref msg) => {
                (StatusCode::BAD_GATEWAY, "BLOCKCHAIN_RPC_ERROR", msg.clone())
            }
            AppError::TransactionReverted(ref msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TRANSACTION_REVERTED",
                msg.clone(),
            ),
            AppError::ResultFeed(ref msg) => {
                (StatusCode::BAD_GATEWAY, "RESULT_FEED_ERROR", msg.clone())
            }
            AppError::ResultPending(_) => {
                (StatusCode::CONFLICT, "RESULT_PENDING", self.to_string())
            }
            AppError::InvalidAddress(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_ADDRESS", self.to_string())
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(ref msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
