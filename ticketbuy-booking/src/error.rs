use uuid::Uuid;

use ticketbuy_catalog::PromotionRejection;
use ticketbuy_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// Carries the normalized codes that are already taken.
    #[error("One or more seats are already booked: {}. Please choose other seats.", .0.join(", "))]
    SeatConflict(Vec<String>),

    #[error("Trip {trip_id} has {available} seats left, {requested} requested")]
    InsufficientInventory {
        trip_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error(transparent)]
    Promotion(#[from] PromotionRejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type BookingResult<T> = Result<T, BookingError>;
