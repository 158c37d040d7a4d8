//! Loyalty points
//!
//! Points are earned on the final charged total and spent against the
//! subtotal of a later purchase. Both directions are integral: a fractional
//! rupee never earns a fraction of a point, and a point is never partially
//! redeemed.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Totals below this amount earn no points at all.
pub const EARNING_MINIMUM: u64 = 500;

/// One point is earned for every full multiple of this amount in the total.
pub const AMOUNT_PER_POINT_EARNED: u64 = 100;

/// Each redeemed point reduces the amount due by this much.
pub const VALUE_PER_POINT_REDEEMED: u64 = 1;

/// Points earned by a completed purchase of `total`.
///
/// Purchases under [`EARNING_MINIMUM`] earn nothing; from there on it is one
/// point per full [`AMOUNT_PER_POINT_EARNED`], remainder discarded.
#[must_use]
pub fn points_earned(total: Decimal) -> u64 {
    if total < Decimal::from(EARNING_MINIMUM) {
        return 0;
    }

    (total / Decimal::from(AMOUNT_PER_POINT_EARNED))
        .floor()
        .to_u64()
        .unwrap_or(0)
}

/// How many of `available` points a redemption may spend against `subtotal`.
///
/// A redemption never exceeds the whole-unit part of the subtotal, so the
/// discount it produces can never push the amount due below zero.
#[must_use]
pub fn points_to_redeem(available: u64, subtotal: Decimal) -> u64 {
    let cap = subtotal.floor().to_u64().unwrap_or(0);
    available.min(cap)
}

/// The monetary value of `points` redeemed points.
#[must_use]
pub fn redemption_value(points: u64) -> Decimal {
    Decimal::from(points * VALUE_PER_POINT_REDEEMED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_under_the_minimum_earn_nothing() {
        assert_eq!(points_earned(Decimal::from(499)), 0);
        assert_eq!(points_earned(Decimal::new(499_99, 2)), 0);
        assert_eq!(points_earned(Decimal::from(99)), 0);
        assert_eq!(points_earned(Decimal::ZERO), 0);
    }

    #[test]
    fn earning_starts_exactly_at_the_minimum() {
        assert_eq!(points_earned(Decimal::from(500)), 5);
    }

    #[test]
    fn earned_points_are_floored_per_hundred() {
        assert_eq!(points_earned(Decimal::from(750)), 7);
        assert_eq!(points_earned(Decimal::from(999)), 9);
        assert_eq!(points_earned(Decimal::from(1000)), 10);
        assert_eq!(points_earned(Decimal::new(649_99, 2)), 6);
    }

    #[test]
    fn redemption_is_capped_by_available_points() {
        assert_eq!(points_to_redeem(50, Decimal::from(400)), 50);
    }

    #[test]
    fn redemption_is_capped_by_the_subtotal() {
        assert_eq!(points_to_redeem(600, Decimal::from(400)), 400);
    }

    #[test]
    fn redemption_cap_ignores_the_fractional_part_of_the_subtotal() {
        assert_eq!(points_to_redeem(600, Decimal::new(400_75, 2)), 400);
    }

    #[test]
    fn no_points_means_no_redemption() {
        assert_eq!(points_to_redeem(0, Decimal::from(400)), 0);
    }

    #[test]
    fn zero_subtotal_means_no_redemption() {
        assert_eq!(points_to_redeem(50, Decimal::ZERO), 0);
    }

    #[test]
    fn each_redeemed_point_is_worth_one_unit() {
        assert_eq!(redemption_value(50), Decimal::from(50));
        assert_eq!(redemption_value(0), Decimal::ZERO);
    }
}
