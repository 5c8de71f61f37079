pub mod route;
pub mod inventory;
pub mod promotion;
pub mod pricing;

pub use route::Route;
pub use inventory::{InventoryError, Trip, TripListing, TripStatus};
pub use promotion::{Promotion, PromotionRejection, PromotionStatus};
pub use pricing::PriceQuote;
