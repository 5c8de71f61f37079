//! In-process backend for every repository. A transaction holds the whole
//! state lock and works on a copy that replaces the state on commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use ticketbuy_catalog::{InventoryError, Promotion, Route, Trip, TripListing, TripStatus};
use ticketbuy_core::repository::{PromotionRepository, RouteRepository, TripRepository};
use ticketbuy_core::{StoreError, StoreResult};

use crate::ledger::{BookingStore, BookingTx, SeatScope};
use crate::models::Booking;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    routes: HashMap<Uuid, Route>,
    trips: HashMap<Uuid, Trip>,
    promotions: HashMap<String, Promotion>,
    bookings: HashMap<Uuid, Booking>,
    /// (trip_id, seat_code) -> booking_id
    seats: HashMap<(Uuid, String), Uuid>,
}

impl MemoryState {
    fn occupied(&self, scope: SeatScope, excluding: Option<Uuid>) -> Vec<String> {
        match scope {
            SeatScope::Trip(trip_id) => self
                .seats
                .iter()
                .filter(|((trip, _), owner)| *trip == trip_id && Some(**owner) != excluding)
                .map(|((_, seat), _)| seat.clone())
                .collect(),
            SeatScope::RouteDate {
                route_id,
                departure_date,
            } => self
                .bookings
                .values()
                .filter(|b| {
                    b.route_id == route_id
                        && b.departure_date == departure_date
                        && b.status.holds_seats()
                        && Some(b.id) != excluding
                })
                .flat_map(|b| b.seat_numbers.iter().cloned())
                .collect(),
        }
    }

    fn promotion_uses(&self, user_id: &str, code: &str) -> i64 {
        self.bookings
            .values()
            .filter(|b| {
                b.user_id == user_id && b.status.holds_seats() && b.promotion_code.as_deref() == Some(code)
            })
            .count() as i64
    }

    fn sync_seats(&mut self, booking: &Booking) -> StoreResult<()> {
        self.seats.retain(|_, owner| *owner != booking.id);

        if let (Some(trip_id), true) = (booking.trip_id, booking.status.holds_seats()) {
            for seat in &booking.seat_numbers {
                let key = (trip_id, seat.clone());
                if self.seats.contains_key(&key) {
                    return Err(StoreError::UniqueViolation("booking_seats_pkey".to_string()));
                }
                self.seats.insert(key, booking.id);
            }
        }
        Ok(())
    }

    fn trip_mut(&mut self, trip_id: Uuid) -> StoreResult<&mut Trip> {
        self.trips
            .get_mut(&trip_id)
            .ok_or_else(|| StoreError::Backend(format!("trip {} not found", trip_id)))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteRepository for MemoryStore {
    async fn get_route(&self, id: Uuid) -> StoreResult<Option<Route>> {
        Ok(self.state.lock().await.routes.get(&id).cloned())
    }

    async fn list_routes(&self) -> StoreResult<Vec<Route>> {
        let state = self.state.lock().await;
        let mut routes: Vec<Route> = state.routes.values().cloned().collect();
        routes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(routes)
    }

    async fn create_route(&self, route: &Route) -> StoreResult<()> {
        self.state.lock().await.routes.insert(route.id, route.clone());
        Ok(())
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        Ok(self.state.lock().await.trips.get(&id).cloned())
    }

    async fn list_trips_on(&self, date: NaiveDate) -> StoreResult<Vec<TripListing>> {
        let state = self.state.lock().await;
        let mut listings: Vec<TripListing> = state
            .trips
            .values()
            .filter(|t| t.departure_date == date && t.status == TripStatus::Active)
            .filter_map(|t| {
                state.routes.get(&t.route_id).map(|route| TripListing {
                    trip: t.clone(),
                    route_name: route.name.clone(),
                    price: route.price,
                })
            })
            .collect();
        listings.sort_by(|a, b| {
            (a.trip.departure_time, &a.route_name).cmp(&(b.trip.departure_time, &b.route_name))
        });
        Ok(listings)
    }

    async fn find_trips_for_route(&self, route_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Trip>> {
        let state = self.state.lock().await;
        let mut trips: Vec<Trip> = state
            .trips
            .values()
            .filter(|t| t.route_id == route_id && t.departure_date == date && t.status == TripStatus::Active)
            .cloned()
            .collect();
        trips.sort_by_key(|t| t.departure_time);
        Ok(trips)
    }

    async fn create_trip(&self, trip: &Trip) -> StoreResult<()> {
        self.state.lock().await.trips.insert(trip.id, trip.clone());
        Ok(())
    }
}

#[async_trait]
impl PromotionRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Promotion>> {
        Ok(self.state.lock().await.promotions.get(code).cloned())
    }

    async fn create_promotion(&self, promotion: &Promotion) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.promotions.contains_key(&promotion.code) {
            return Err(StoreError::UniqueViolation("promotions_code_key".to_string()));
        }
        state.promotions.insert(promotion.code.clone(), promotion.clone());
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn BookingTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, user_id: Option<&str>) -> StoreResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| user_id.map_or(true, |u| b.user_id == u))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn occupied_seats(&self, scope: SeatScope) -> StoreResult<Vec<String>> {
        Ok(self.state.lock().await.occupied(scope, None))
    }

    async fn count_promotion_uses(&self, user_id: &str, code: &str) -> StoreResult<i64> {
        Ok(self.state.lock().await.promotion_uses(user_id, code))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl BookingTx for MemoryTx {
    async fn lock_trip(&mut self, trip_id: Uuid) -> StoreResult<Option<Trip>> {
        Ok(self.working.trips.get(&trip_id).cloned())
    }

    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.working.bookings.get(&id).cloned())
    }

    async fn occupied_seats(&mut self, scope: SeatScope, excluding: Option<Uuid>) -> StoreResult<Vec<String>> {
        Ok(self.working.occupied(scope, excluding))
    }

    async fn count_promotion_uses(&mut self, user_id: &str, code: &str) -> StoreResult<i64> {
        Ok(self.working.promotion_uses(user_id, code))
    }

    async fn reserve_seats(&mut self, trip_id: Uuid, count: i32) -> StoreResult<Option<i32>> {
        let trip = self.working.trip_mut(trip_id)?;
        match trip.reserve(count) {
            Ok(()) => Ok(Some(trip.available_seats)),
            Err(InventoryError::InsufficientInventory { .. }) => Ok(None),
            Err(other) => Err(StoreError::Backend(other.to_string())),
        }
    }

    async fn release_seats(&mut self, trip_id: Uuid, count: i32) -> StoreResult<i32> {
        let trip = self.working.trip_mut(trip_id)?;
        trip.release(count).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(trip.available_seats)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        if self.working.bookings.contains_key(&booking.id) {
            return Err(StoreError::UniqueViolation("bookings_pkey".to_string()));
        }
        self.working.sync_seats(booking)?;
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        if !self.working.bookings.contains_key(&booking.id) {
            return Err(StoreError::Backend(format!("booking {} not found", booking.id)));
        }
        self.working.sync_seats(booking)?;
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
