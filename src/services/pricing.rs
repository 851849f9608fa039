//! Checkout price computation.
//!
//! Everything is computed in integer cents. Plan prices and fixed coupon values
//! are stored in reais and converted once with `reais_to_cents`.

use crate::entities::{BillingPeriod, CouponType};
use crate::utils::format::reais_to_cents;

/// Plans billed yearly. Their price is the monthly list price times twelve.
const ANNUAL_PLAN_MARKERS: &[&str] = &["COMFORT", "PLATINUM"];

/// Plans that discount every pet after the first.
const MULTI_PET_PLAN_MARKERS: &[&str] = &["BASIC", "INFINITY"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub billing_period: BillingPeriod,
    /// Price of one pet for one billing period, before multi-pet discounts.
    pub unit_cents: i64,
    pub pet_prices: Vec<i64>,
    pub total_cents: i64,
    pub coupon_discount_cents: i64,
    pub final_cents: i64,
}

impl PriceQuote {
    /// Monthly equivalent stored on the contract.
    pub fn monthly_cents(&self) -> i64 {
        match self.billing_period {
            BillingPeriod::Monthly => self.final_cents,
            BillingPeriod::Annual => (self.final_cents + 6) / 12,
        }
    }

    pub fn annual_cents(&self) -> Option<i64> {
        match self.billing_period {
            BillingPeriod::Annual => Some(self.final_cents),
            BillingPeriod::Monthly => None,
        }
    }
}

fn name_has_any(plan_name: &str, markers: &[&str]) -> bool {
    let upper = plan_name.to_uppercase();
    markers.iter().any(|m| upper.contains(m))
}

pub fn billing_period_for(plan_name: &str) -> BillingPeriod {
    if name_has_any(plan_name, ANNUAL_PLAN_MARKERS) {
        BillingPeriod::Annual
    } else {
        BillingPeriod::Monthly
    }
}

/// Discount percent applied to the pet at `index` (0-based).
pub fn multi_pet_discount_percent(plan_name: &str, index: usize) -> i64 {
    if !name_has_any(plan_name, MULTI_PET_PLAN_MARKERS) {
        return 0;
    }
    match index {
        0 => 0,
        1 => 5,
        2 => 10,
        _ => 15,
    }
}

fn apply_percent(cents: i64, percent: i64) -> i64 {
    // round half up on a non-negative amount
    (cents * (100 - percent) + 50) / 100
}

/// Price for `pet_count` pets before any coupon.
pub fn quote(plan_name: &str, base_price: f64, pet_count: usize) -> PriceQuote {
    let billing_period = billing_period_for(plan_name);
    let base_cents = reais_to_cents(base_price);
    let unit_cents = match billing_period {
        BillingPeriod::Annual => base_cents * 12,
        BillingPeriod::Monthly => base_cents,
    };

    let pet_prices: Vec<i64> = (0..pet_count)
        .map(|i| apply_percent(unit_cents, multi_pet_discount_percent(plan_name, i)))
        .collect();
    let total_cents = pet_prices.iter().sum();

    PriceQuote {
        billing_period,
        unit_cents,
        pet_prices,
        total_cents,
        coupon_discount_cents: 0,
        final_cents: total_cents,
    }
}

/// Amount left after a coupon, never below zero.
pub fn apply_coupon(total_cents: i64, discount_type: CouponType, value: f64) -> i64 {
    match discount_type {
        CouponType::Percentage => {
            let discount = (total_cents as f64 * value / 100.0).round() as i64;
            (total_cents - discount).max(0)
        }
        CouponType::Fixed => (total_cents - reais_to_cents(value)).max(0),
    }
}

impl PriceQuote {
    pub fn with_coupon(mut self, discount_type: CouponType, value: f64) -> Self {
        self.final_cents = apply_coupon(self.total_cents, discount_type, value);
        self.coupon_discount_cents = self.total_cents - self.final_cents;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pet_is_base_price() {
        let q = quote("Plano BASIC", 50.0, 1);
        assert_eq!(q.billing_period, BillingPeriod::Monthly);
        assert_eq!(q.total_cents, 5000);
    }

    #[test]
    fn test_basic_multi_pet_schedule() {
        let q = quote("BASIC", 100.0, 5);
        assert_eq!(q.pet_prices, vec![10000, 9500, 9000, 8500, 8500]);
        assert_eq!(q.total_cents, 45500);
    }

    #[test]
    fn test_infinity_rounds_to_nearest_cent() {
        // 5% of 49.99 = 2.4995
        let q = quote("Infinity", 49.99, 2);
        assert_eq!(q.pet_prices, vec![4999, 4749]);
    }

    #[test]
    fn test_other_plans_have_no_multi_pet_discount() {
        let q = quote("ESSENCIAL", 80.0, 3);
        assert_eq!(q.total_cents, 24000);
        assert_eq!(multi_pet_discount_percent("ESSENCIAL", 2), 0);
    }

    #[test]
    fn test_annual_plans_multiply_by_twelve_without_multi_pet_discount() {
        let q = quote("COMFORT", 100.0, 2);
        assert_eq!(q.billing_period, BillingPeriod::Annual);
        assert_eq!(q.unit_cents, 120000);
        assert_eq!(q.total_cents, 240000);

        let q = quote("Platinum Plus", 10.0, 1);
        assert_eq!(q.total_cents, 12000);
        assert_eq!(q.annual_cents(), Some(12000));
        assert_eq!(q.monthly_cents(), 1000);
    }

    #[test]
    fn test_percentage_coupon() {
        assert_eq!(apply_coupon(10000, CouponType::Percentage, 10.0), 9000);
        assert_eq!(apply_coupon(999, CouponType::Percentage, 15.0), 849);
        assert_eq!(apply_coupon(1000, CouponType::Percentage, 150.0), 0);
    }

    #[test]
    fn test_fixed_coupon_never_goes_negative() {
        assert_eq!(apply_coupon(10000, CouponType::Fixed, 25.5), 7450);
        assert_eq!(apply_coupon(1000, CouponType::Fixed, 20.0), 0);
    }

    #[test]
    fn test_quote_with_coupon_tracks_discount() {
        let q = quote("BASIC", 100.0, 2).with_coupon(CouponType::Percentage, 10.0);
        assert_eq!(q.total_cents, 19500);
        assert_eq!(q.final_cents, 17550);
        assert_eq!(q.coupon_discount_cents, 1950);
    }
}
