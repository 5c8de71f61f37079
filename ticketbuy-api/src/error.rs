use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use ticketbuy_booking::BookingError;
use ticketbuy_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{message}")]
    SeatConflict { message: String, seats: Vec<String> },
    #[error("{0}")]
    InsufficientInventory(String),
    #[error("{0}")]
    PromotionInvalid(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::SeatConflict { .. } | AppError::InsufficientInventory(_) => StatusCode::CONFLICT,
            AppError::PromotionInvalid(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                json!({ "status": "error", "message": "Internal Server Error" })
            }
            AppError::SeatConflict { message, seats } => json!({
                "status": "error",
                "message": message,
                "data": { "seats": seats },
            }),
            other => json!({ "status": "error", "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) => AppError::Validation(msg),
            BookingError::NotFound(msg) => AppError::NotFound(msg),
            BookingError::Forbidden(msg) => AppError::Forbidden(msg),
            BookingError::SeatConflict(ref seats) => AppError::SeatConflict {
                message: err.to_string(),
                seats: seats.clone(),
            },
            BookingError::InsufficientInventory { .. } => AppError::InsufficientInventory(err.to_string()),
            BookingError::Promotion(rejection) => AppError::PromotionInvalid(rejection.to_string()),
            BookingError::Store(store) => AppError::Internal(anyhow::anyhow!(store)),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// `{status: "ok", message?, data}`
pub fn ok<T: serde::Serialize>(data: T) -> Json<Value> {
    Json(json!({ "status": "ok", "data": data }))
}

pub fn ok_with_message<T: serde::Serialize>(message: &str, data: T) -> Json<Value> {
    Json(json!({ "status": "ok", "message": message, "data": data }))
}
