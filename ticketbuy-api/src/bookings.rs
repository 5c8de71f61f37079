use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde_json::Value;
use uuid::Uuid;

use ticketbuy_booking::{BookingUpdate, CreateBooking, SeatQuery};
use ticketbuy_core::Actor;

use crate::error::{ok, ok_with_message, AppError};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/bookings/seats", get(booked_seats));

    let authenticated = Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route(
            "/bookings/{id}",
            get(get_booking)
                .put(update_booking)
                .patch(update_booking)
                .delete(cancel_booking),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(authenticated)
}

async fn booked_seats(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SeatQuery>,
) -> Result<Json<Value>, AppError> {
    let seats = state.bookings.booked_seats(&query).await?;
    Ok(ok(seats))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppJson(req): AppJson<CreateBooking>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.bookings.create(&actor, req).await.map_err(|e| {
        state.metrics.observe_error(&e);
        e
    })?;

    state.metrics.bookings_created.inc();
    state.publish(outcome.events);
    Ok((StatusCode::CREATED, ok_with_message("Booking created", outcome.booking)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let bookings = state.bookings.list(&actor).await?;
    Ok(ok(bookings))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state.bookings.get(&actor, id).await?;
    Ok(ok(booking))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(id): AppPath<Uuid>,
    AppJson(update): AppJson<BookingUpdate>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.bookings.update(&actor, id, update).await.map_err(|e| {
        state.metrics.observe_error(&e);
        e
    })?;

    if outcome.cancelled {
        state.metrics.cancellations.inc();
    }
    state.publish(outcome.events);
    Ok(ok_with_message("Booking updated", outcome.booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.bookings.cancel(&actor, id).await.map_err(|e| {
        state.metrics.observe_error(&e);
        e
    })?;

    if outcome.cancelled {
        state.metrics.cancellations.inc();
    }
    state.publish(outcome.events);
    Ok(ok_with_message("Booking cancelled", outcome.booking))
}
