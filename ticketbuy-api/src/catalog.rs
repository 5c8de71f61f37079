use axum::{extract::State, routing::get, Json, Router};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ok, AppError};
use crate::extract::AppPath;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/routes", get(list_routes))
        .route("/routes/{id}", get(get_route))
}

async fn list_routes(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let routes = state.routes.list_routes().await?;
    Ok(ok(routes))
}

async fn get_route(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let route = state
        .routes
        .get_route(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route {} not found", id)))?;
    Ok(ok(route))
}
