use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use ticketbuy_catalog::{Promotion, Route, Trip, TripListing};

use crate::StoreResult;

/// Route catalog: names and base prices.
#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn get_route(&self, id: Uuid) -> StoreResult<Option<Route>>;

    async fn list_routes(&self) -> StoreResult<Vec<Route>>;

    async fn create_route(&self, route: &Route) -> StoreResult<()>;
}

/// Trip schedule. Seat counters are never written here; they move only
/// inside a booking transaction.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>>;

    /// Active trips departing on `date`, ordered by departure time then route name.
    async fn list_trips_on(&self, date: NaiveDate) -> StoreResult<Vec<TripListing>>;

    /// Active trips of one route on `date`, earliest departure first.
    async fn find_trips_for_route(&self, route_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Trip>>;

    async fn create_trip(&self, trip: &Trip) -> StoreResult<()>;
}

/// Promotion codes, looked up by their normalized (upper-case) code.
#[async_trait]
pub trait PromotionRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Promotion>>;

    async fn create_promotion(&self, promotion: &Promotion) -> StoreResult<()>;
}
