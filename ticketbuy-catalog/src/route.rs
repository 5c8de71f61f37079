use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named origin → destination service with a per-seat price.
/// Routes carry no dates; scheduled departures are [`crate::Trip`]s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub details: Option<String>,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn new(name: String, details: Option<String>, price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            details,
            price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Splits "Origin → Destination" names. Names without the arrow yield `None`.
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        let (origin, destination) = self.name.split_once('→')?;
        let origin = origin.trim();
        let destination = destination.trim();
        if origin.is_empty() || destination.is_empty() {
            return None;
        }
        Some((origin, destination))
    }
}
