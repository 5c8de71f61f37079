use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Active,
    Inactive,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(TripStatus::Active),
            "inactive" => Some(TripStatus::Inactive),
            _ => None,
        }
    }
}

/// One scheduled departure of a route, with its own seat inventory.
///
/// `available_seats` is only ever changed through [`Trip::reserve`] and
/// [`Trip::release`], which keep `0 <= available_seats <= total_seats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: Uuid,
    pub route_id: Uuid,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// A fresh trip starts fully available.
    pub fn new(
        route_id: Uuid,
        departure_date: NaiveDate,
        departure_time: NaiveTime,
        total_seats: i32,
    ) -> Result<Self, InventoryError> {
        if total_seats <= 0 {
            return Err(InventoryError::InvalidCapacity(total_seats));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            route_id,
            departure_date,
            departure_time,
            total_seats,
            available_seats: total_seats,
            status: TripStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_bookable(&self) -> bool {
        self.status == TripStatus::Active
    }

    /// Takes `count` seats out of inventory, or leaves the trip untouched and
    /// fails when fewer than `count` are left.
    pub fn reserve(&mut self, count: i32) -> Result<(), InventoryError> {
        if count <= 0 {
            return Err(InventoryError::InvalidQuantity(count));
        }
        if self.available_seats < count {
            return Err(InventoryError::InsufficientInventory {
                requested: count,
                available: self.available_seats,
            });
        }

        self.available_seats -= count;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Puts `count` seats back, clamped at `total_seats`.
    pub fn release(&mut self, count: i32) -> Result<(), InventoryError> {
        if count <= 0 {
            return Err(InventoryError::InvalidQuantity(count));
        }

        self.available_seats = self.available_seats.saturating_add(count).min(self.total_seats);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A trip as shown in a departure board, joined with its route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripListing {
    #[serde(flatten)]
    pub trip: Trip,
    pub route_name: String,
    pub price: rust_decimal::Decimal,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        requested: i32,
        available: i32,
    },

    #[error("Seat count must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("Trip capacity must be positive, got {0}")]
    InvalidCapacity(i32),
}
