use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use ticketbuy_catalog::Trip;
use ticketbuy_core::StoreResult;

use crate::models::Booking;

/// Which bookings a seat lookup covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatScope {
    /// Seats held on one trip.
    Trip(Uuid),
    /// Best-effort legacy lookup: every active booking of the route on that date.
    RouteDate { route_id: Uuid, departure_date: NaiveDate },
}

/// Booking ledger: booking records plus the per-seat occupancy derived from them.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Opens a unit of work. Dropping it without `commit` discards every write.
    async fn begin(&self) -> StoreResult<Box<dyn BookingTx>>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Newest first. `None` lists every user's bookings.
    async fn list_bookings(&self, user_id: Option<&str>) -> StoreResult<Vec<Booking>>;

    /// Seat codes held by non-cancelled bookings in `scope`.
    async fn occupied_seats(&self, scope: SeatScope) -> StoreResult<Vec<String>>;

    /// Non-cancelled bookings of `user_id` that used `code`.
    async fn count_promotion_uses(&self, user_id: &str, code: &str) -> StoreResult<i64>;
}

/// One atomic booking transaction. Callers lock the trip before reading its
/// seats so that check-then-write is serialized per trip.
#[async_trait]
pub trait BookingTx: Send {
    async fn lock_trip(&mut self, trip_id: Uuid) -> StoreResult<Option<Trip>>;

    /// Locks and returns a booking row.
    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Like [`BookingStore::occupied_seats`], optionally ignoring one booking.
    async fn occupied_seats(&mut self, scope: SeatScope, excluding: Option<Uuid>) -> StoreResult<Vec<String>>;

    async fn count_promotion_uses(&mut self, user_id: &str, code: &str) -> StoreResult<i64>;

    /// Conditional decrement. Returns the new available count, or `None`
    /// (and changes nothing) when fewer than `count` seats are left.
    async fn reserve_seats(&mut self, trip_id: Uuid, count: i32) -> StoreResult<Option<i32>>;

    /// Increment clamped at the trip's capacity. Returns the new available count.
    async fn release_seats(&mut self, trip_id: Uuid, count: i32) -> StoreResult<i32>;

    /// Inserts the booking and, when it holds seats on a trip, its seat rows.
    /// A taken seat fails with `StoreError::UniqueViolation`.
    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    /// Rewrites the booking and resynchronizes its seat rows with its status
    /// and seat list.
    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
