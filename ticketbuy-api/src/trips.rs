use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::error::{ok, AppError};
use crate::extract::{AppPath, AppQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips))
        .route("/trips/{id}", get(get_trip))
        .route("/trips/{id}/seats/stream", get(seat_stream))
}

#[derive(Debug, Deserialize)]
struct TripsQuery {
    date: NaiveDate,
}

async fn list_trips(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TripsQuery>,
) -> Result<Json<Value>, AppError> {
    let trips = state.trips.list_trips_on(query.date).await?;
    Ok(ok(trips))
}

async fn get_trip(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let trip = state
        .trips
        .get_trip(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trip {} not found", id)))?;
    Ok(ok(trip))
}

/// Server-sent seat events for one trip. Lagging subscribers skip what they missed.
async fn seat_stream(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state
        .trips
        .get_trip(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trip {} not found", id)))?;

    let rx = state.seat_events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| async move {
        match msg {
            Ok(event) if event.trip_id == id => {
                let kind = match event.kind {
                    ticketbuy_shared::SeatEventKind::Reserved => "reserved",
                    ticketbuy_shared::SeatEventKind::Released => "released",
                };
                Event::default().event(kind).json_data(&event).ok().map(Ok)
            }
            Ok(_) => None,
            Err(lagged) => {
                tracing::debug!(trip_id = %id, "Seat stream subscriber lagged: {}", lagged);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
