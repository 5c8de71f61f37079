use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
    Extension, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use ticketbuy_catalog::{Promotion, PromotionStatus, Route, Trip};
use ticketbuy_core::{Actor, StoreError};

use crate::error::{ok_with_message, AppError};
use crate::extract::AppJson;
use crate::middleware::require_admin;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/routes", post(create_route))
        .route("/admin/trips", post(create_trip))
        .route("/admin/promotions", post(create_promotion))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

#[derive(Debug, Deserialize)]
struct NewRoute {
    name: String,
    details: Option<String>,
    price: Decimal,
}

async fn create_route(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppJson(req): AppJson<NewRoute>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if req.price < Decimal::ZERO {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }

    let route = Route::new(name, req.details, req.price);
    state.routes.create_route(&route).await?;

    info!(route_id = %route.id, admin = %actor.id, "Route created");
    Ok((StatusCode::CREATED, ok_with_message("Route created", route)))
}

#[derive(Debug, Deserialize)]
struct NewTrip {
    route_id: Uuid,
    departure_date: NaiveDate,
    departure_time: NaiveTime,
    total_seats: i32,
}

async fn create_trip(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppJson(req): AppJson<NewTrip>,
) -> Result<impl IntoResponse, AppError> {
    state
        .routes
        .get_route(req.route_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route {} not found", req.route_id)))?;

    let trip = Trip::new(req.route_id, req.departure_date, req.departure_time, req.total_seats)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    state.trips.create_trip(&trip).await?;

    info!(trip_id = %trip.id, route_id = %trip.route_id, total_seats = trip.total_seats, admin = %actor.id, "Trip scheduled");
    Ok((StatusCode::CREATED, ok_with_message("Trip created", trip)))
}

#[derive(Debug, Deserialize)]
struct NewPromotion {
    code: String,
    description: Option<String>,
    discount_percent: Decimal,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    status: Option<PromotionStatus>,
}

async fn create_promotion(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppJson(req): AppJson<NewPromotion>,
) -> Result<impl IntoResponse, AppError> {
    let mut promotion = Promotion::new(
        req.code,
        req.description,
        req.discount_percent,
        req.valid_from,
        req.valid_until,
    )
    .map_err(|e| AppError::Validation(e.to_string()))?;
    if let Some(status) = req.status {
        promotion.status = status;
    }

    match state.promotions.create_promotion(&promotion).await {
        Ok(()) => {}
        Err(StoreError::UniqueViolation(_)) => {
            return Err(AppError::Validation(format!(
                "Promotion code {} already exists",
                promotion.code
            )))
        }
        Err(other) => return Err(other.into()),
    }

    info!(code = %promotion.code, admin = %actor.id, "Promotion created");
    Ok((StatusCode::CREATED, ok_with_message("Promotion created", promotion)))
}
