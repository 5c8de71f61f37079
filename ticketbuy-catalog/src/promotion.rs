use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Active,
    Inactive,
}

impl PromotionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionStatus::Active => "active",
            PromotionStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(PromotionStatus::Active),
            "inactive" => Some(PromotionStatus::Inactive),
            _ => None,
        }
    }
}

/// A percentage discount code, optionally bounded by a validity window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Promotion {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_percent: Decimal,
    pub status: PromotionStatus,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    pub fn new(
        code: String,
        description: Option<String>,
        discount_percent: Decimal,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Result<Self, PromotionRejection> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(PromotionRejection::Malformed("code must not be empty".to_string()));
        }
        if discount_percent < Decimal::ZERO || discount_percent > Decimal::ONE_HUNDRED {
            return Err(PromotionRejection::Malformed(format!(
                "discount_percent must be within 0..=100, got {}",
                discount_percent
            )));
        }
        if let (Some(from), Some(until)) = (valid_from, valid_until) {
            if from > until {
                return Err(PromotionRejection::Malformed(
                    "valid_from must not be after valid_until".to_string(),
                ));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            code,
            description,
            discount_percent,
            status: PromotionStatus::Active,
            valid_from,
            valid_until,
            created_at: now,
            updated_at: now,
        })
    }

    /// Status and validity-window checks, in that order. Usage limits need
    /// booking history and are checked by the booking side.
    pub fn check_at(&self, now: DateTime<Utc>) -> Result<(), PromotionRejection> {
        if self.status != PromotionStatus::Active {
            return Err(PromotionRejection::Inactive(self.code.clone()));
        }
        if let Some(from) = self.valid_from {
            if now < from {
                return Err(PromotionRejection::NotYetValid(self.code.clone()));
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return Err(PromotionRejection::Expired(self.code.clone()));
            }
        }
        Ok(())
    }
}

/// Why a promotion code cannot be applied.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PromotionRejection {
    #[error("Promotion code {0} does not exist")]
    Unknown(String),

    #[error("Promotion code {0} is no longer active")]
    Inactive(String),

    #[error("Promotion code {0} is not valid yet")]
    NotYetValid(String),

    #[error("Promotion code {0} has expired")]
    Expired(String),

    #[error("Promotion code {0} has already been used")]
    AlreadyUsed(String),

    #[error("Invalid promotion: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(from: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Promotion {
        Promotion::new("TET2026".to_string(), None, Decimal::new(10, 0), from, until).unwrap()
    }

    #[test]
    fn test_open_ended_promotion_is_valid() {
        assert!(promo(None, None).check_at(Utc::now()).is_ok());
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let p = promo(Some(now - Duration::days(1)), Some(now + Duration::days(1)));
        assert!(p.check_at(now).is_ok());
        assert_eq!(
            p.check_at(now - Duration::days(2)),
            Err(PromotionRejection::NotYetValid("TET2026".to_string()))
        );
        assert_eq!(
            p.check_at(now + Duration::days(2)),
            Err(PromotionRejection::Expired("TET2026".to_string()))
        );
    }

    #[test]
    fn test_inactive_checked_before_window() {
        let now = Utc::now();
        let mut p = promo(None, Some(now - Duration::days(1)));
        p.status = PromotionStatus::Inactive;
        assert_eq!(p.check_at(now), Err(PromotionRejection::Inactive("TET2026".to_string())));
    }

    #[test]
    fn test_constructor_validation() {
        assert!(Promotion::new("  ".to_string(), None, Decimal::TEN, None, None).is_err());
        assert!(Promotion::new("X".to_string(), None, Decimal::new(101, 0), None, None).is_err());
        let now = Utc::now();
        assert!(Promotion::new("X".to_string(), None, Decimal::TEN, Some(now), Some(now - Duration::hours(1))).is_err());
    }
}
