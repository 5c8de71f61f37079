pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod route_repo;
pub mod trip_repo;
pub mod promotion_repo;
pub mod booking_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use route_repo::StoreRouteRepository;
pub use trip_repo::StoreTripRepository;
pub use promotion_repo::StorePromotionRepository;
pub use booking_repo::StoreBookingStore;

use ticketbuy_core::StoreError;

/// Unique violations keep their constraint name; everything else is opaque.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::UniqueViolation(db.constraint().unwrap_or("unknown").to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

pub(crate) fn corrupt_row(table: &str, column: &str, value: &str) -> StoreError {
    StoreError::Backend(format!("{}.{} holds unexpected value {:?}", table, column, value))
}
