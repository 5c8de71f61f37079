use std::sync::Arc;

use tokio::sync::broadcast;

use ticketbuy_booking::{BookingManager, BookingStore, MemoryStore};
use ticketbuy_core::repository::{PromotionRepository, RouteRepository, TripRepository};
use ticketbuy_shared::SeatEvent;
use ticketbuy_store::app_config::RateLimitConfig;
use ticketbuy_store::RedisClient;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub routes: Arc<dyn RouteRepository>,
    pub trips: Arc<dyn TripRepository>,
    pub promotions: Arc<dyn PromotionRepository>,
    /// Rate limiting is skipped when absent.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub seat_events: broadcast::Sender<SeatEvent>,
    pub auth: AuthConfig,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        trips: Arc<dyn TripRepository>,
        promotions: Arc<dyn PromotionRepository>,
        store: Arc<dyn BookingStore>,
        auth: AuthConfig,
        max_seats_per_booking: i32,
    ) -> Result<Self, prometheus::Error> {
        let bookings = BookingManager::new(
            routes.clone(),
            trips.clone(),
            promotions.clone(),
            store,
            max_seats_per_booking,
        );
        let (seat_events, _) = broadcast::channel(256);

        Ok(Self {
            bookings: Arc::new(bookings),
            routes,
            trips,
            promotions,
            redis: None,
            rate_limit: RateLimitConfig::default(),
            seat_events,
            auth,
            metrics: Arc::new(Metrics::new()?),
        })
    }

    /// Whole service on the in-process store.
    pub fn in_memory(auth: AuthConfig, max_seats_per_booking: i32) -> Result<Self, prometheus::Error> {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store.clone(), store.clone(), store, auth, max_seats_per_booking)
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, limits: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = limits;
        self
    }

    /// Fans committed seat changes out to open seat-map streams.
    pub fn publish(&self, events: Vec<SeatEvent>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.seat_events.send(event);
        }
    }
}
