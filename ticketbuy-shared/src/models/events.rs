use uuid::Uuid;
use chrono::{DateTime, Utc};

/// What happened to a set of seats on a trip.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatEventKind {
    Reserved,
    Released,
}

/// Broadcast to open seat maps after a booking transaction commits.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatEvent {
    pub kind: SeatEventKind,
    pub trip_id: Uuid,
    pub booking_id: Uuid,
    pub seat_codes: Vec<String>,
    pub available_seats: i32,
    pub occurred_at: DateTime<Utc>,
}

impl SeatEvent {
    pub fn reserved(trip_id: Uuid, booking_id: Uuid, seat_codes: Vec<String>, available_seats: i32) -> Self {
        Self {
            kind: SeatEventKind::Reserved,
            trip_id,
            booking_id,
            seat_codes,
            available_seats,
            occurred_at: Utc::now(),
        }
    }

    pub fn released(trip_id: Uuid, booking_id: Uuid, seat_codes: Vec<String>, available_seats: i32) -> Self {
        Self {
            kind: SeatEventKind::Released,
            trip_id,
            booking_id,
            seat_codes,
            available_seats,
            occurred_at: Utc::now(),
        }
    }
}
