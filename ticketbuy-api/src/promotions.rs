use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ok_with_message, AppError};
use crate::extract::AppJson;
use crate::middleware::resolve_actor;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/promotions/validate", post(validate_promotion))
}

#[derive(Debug, Deserialize)]
struct ValidatePromotion {
    code: String,
    #[serde(default)]
    check_usage: bool,
}

/// Anonymous callers may check a code; usage checks need a signed-in user.
async fn validate_promotion(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(req): AppJson<ValidatePromotion>,
) -> Result<Json<Value>, AppError> {
    let actor = if req.check_usage {
        Some(
            resolve_actor(&state, &headers)?
                .ok_or_else(|| AppError::Unauthenticated("Sign in to check promotion usage".to_string()))?,
        )
    } else {
        resolve_actor(&state, &headers).ok().flatten()
    };

    let promotion = state
        .bookings
        .validate_promotion(&req.code, actor.as_ref().map(|a| a.id.as_str()), req.check_usage)
        .await?;
    Ok(ok_with_message("Promotion code is valid", promotion))
}
