use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Price breakdown for one booking.
///
/// `base_price = unit_price * seat_count`,
/// `discount_amount = round(base_price * discount_percent / 100, 2)` (half away from zero),
/// `total_price = max(0, base_price - discount_amount)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceQuote {
    pub unit_price: Decimal,
    pub seat_count: i32,
    pub base_price: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub total_price: Decimal,
}

impl PriceQuote {
    pub fn compute(unit_price: Decimal, seat_count: i32, discount_percent: Option<Decimal>) -> Self {
        let base_price = unit_price * Decimal::from(seat_count);
        let discount_percent = discount_percent.unwrap_or(Decimal::ZERO);

        let discount_amount = (base_price * discount_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let total_price = (base_price - discount_amount)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .max(Decimal::ZERO);

        Self {
            unit_price,
            seat_count,
            base_price,
            discount_percent,
            discount_amount,
            total_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ten_percent_on_two_seats() {
        let quote = PriceQuote::compute(Decimal::new(100_000, 0), 2, Some(Decimal::TEN));
        assert_eq!(quote.base_price, Decimal::new(200_000, 0));
        assert_eq!(quote.discount_amount, Decimal::new(20_000, 0));
        assert_eq!(quote.total_price, Decimal::new(180_000, 0));
    }

    #[test]
    fn test_no_promotion() {
        let quote = PriceQuote::compute(Decimal::new(150_000, 0), 3, None);
        assert_eq!(quote.base_price, Decimal::new(450_000, 0));
        assert_eq!(quote.discount_amount, Decimal::ZERO);
        assert_eq!(quote.total_price, quote.base_price);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        // 0.25 * 10% = 0.025 -> 0.03
        let quote = PriceQuote::compute(Decimal::from_str("0.25").unwrap(), 1, Some(Decimal::TEN));
        assert_eq!(quote.discount_amount, Decimal::from_str("0.03").unwrap());
        assert_eq!(quote.total_price, Decimal::from_str("0.22").unwrap());
    }

    #[test]
    fn test_full_discount_is_free() {
        let quote = PriceQuote::compute(Decimal::new(99_000, 0), 1, Some(Decimal::ONE_HUNDRED));
        assert_eq!(quote.total_price, Decimal::ZERO);
    }
}
