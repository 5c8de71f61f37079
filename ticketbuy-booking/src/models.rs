use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ticketbuy_shared::Masked;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    /// Every status except `cancelled` occupies seats and inventory.
    pub fn holds_seats(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer's reservation of one or more seats on one trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub route_id: Uuid,
    /// `None` only for legacy rows created before trips were tracked.
    pub trip_id: Option<Uuid>,
    pub seat_quantity: i32,
    pub seat_numbers: Vec<String>,
    pub status: BookingStatus,
    pub departure_date: NaiveDate,
    pub promotion_code: Option<String>,
    pub total_price: Decimal,
    pub discount_amount: Decimal,
    pub contact_name: Option<Masked<String>>,
    pub contact_phone: Option<Masked<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn update_status(&mut self, status: BookingStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn replace_seats(&mut self, seats: Vec<String>) {
        self.seat_quantity = seats.len() as i32;
        self.seat_numbers = seats;
        self.updated_at = Utc::now();
    }
}

/// Body of `POST /bookings`. Unknown fields such as client-side price hints
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBooking {
    pub route_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub departure_date: Option<NaiveDate>,
    pub seat_quantity: i32,
    #[serde(default)]
    pub seat_numbers: Vec<String>,
    pub promotion_code: Option<String>,
    pub status: Option<BookingStatus>,
    pub user_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
}

/// Administrative edit of an existing booking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingUpdate {
    pub status: Option<BookingStatus>,
    pub seat_numbers: Option<Vec<String>>,
    pub seat_quantity: Option<i32>,
    pub departure_date: Option<NaiveDate>,
}

impl BookingUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.seat_numbers.is_none()
            && self.seat_quantity.is_none()
            && self.departure_date.is_none()
    }
}

/// Query of `GET /bookings/seats`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeatQuery {
    pub route_id: Option<Uuid>,
    pub departure_date: Option<NaiveDate>,
    pub trip_id: Option<Uuid>,
}
