use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Per-IP fixed window. Fails open when Redis is unset or unreachable.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(redis) = state.redis.as_ref() else {
        return Ok(next.run(req).await);
    };

    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = format!("ratelimit:{}", ip);

    match redis
        .check_rate_limit(&key, state.rate_limit.requests_per_window, state.rate_limit.window_seconds)
        .await
    {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => {
            tracing::warn!(%ip, "Rate limit exceeded");
            Err(AppError::RateLimited)
        }
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, allowing request: {}", e);
            Ok(next.run(req).await)
        }
    }
}
