use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use ticketbuy_booking::BookingError;

use crate::error::AppError;
use crate::state::AppState;

pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub seat_conflicts: IntCounter,
    pub inventory_rejections: IntCounter,
    pub cancellations: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let bookings_created = IntCounter::new("ticketbuy_bookings_created_total", "Bookings created")?;
        let seat_conflicts = IntCounter::new(
            "ticketbuy_seat_conflicts_total",
            "Booking writes rejected because a seat was already taken",
        )?;
        let inventory_rejections = IntCounter::new(
            "ticketbuy_inventory_rejections_total",
            "Booking writes rejected for lack of available seats",
        )?;
        let cancellations = IntCounter::new("ticketbuy_booking_cancellations_total", "Bookings cancelled")?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(seat_conflicts.clone()))?;
        registry.register(Box::new(inventory_rejections.clone()))?;
        registry.register(Box::new(cancellations.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            seat_conflicts,
            inventory_rejections,
            cancellations,
        })
    }

    pub fn observe_error(&self, err: &BookingError) {
        match err {
            BookingError::SeatConflict(_) => self.seat_conflicts.inc(),
            BookingError::InsufficientInventory { .. } => self.inventory_rejections.inc(),
            _ => {}
        }
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(export))
}

async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
