//! Discounts
//!
//! A sale carries at most one discount: the birthday discount when the
//! customer's birth month matches the register date, otherwise an optional
//! loyalty-point redemption. The birthday discount always wins, and while it
//! is active redemption cannot be turned on at all.

use jiff::civil::Date;
use rust_decimal::Decimal;

use crate::loyalty;

/// Flat percentage taken off the subtotal during the customer's birth month.
pub const BIRTHDAY_DISCOUNT_PERCENT: u64 = 20;

/// The birthday percentage for a customer born on `birth_date`.
///
/// Only the month is compared, so the discount applies for the whole birth
/// month and not just the birthday itself. Customers with no recorded birth
/// date never qualify.
#[must_use]
pub fn birthday_percent(birth_date: Option<Date>, today: Date) -> Decimal {
    match birth_date {
        Some(birth) if birth.month() == today.month() => {
            Decimal::from(BIRTHDAY_DISCOUNT_PERCENT)
        }
        _ => Decimal::ZERO,
    }
}

/// The full pricing of one sale: subtotal, the discount applied to it, and
/// the resulting amount due.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountBreakdown {
    subtotal: Decimal,
    birthday_percent: Decimal,
    points_redeemed: u64,
    discount_amount: Decimal,
    effective_percent: Decimal,
    total: Decimal,
}

impl DiscountBreakdown {
    /// Price a sale.
    ///
    /// `available_points` and `redeem_points` describe the loyalty side:
    /// how many points the customer holds and whether the operator switched
    /// redemption on. Redemption spends whole points, capped by
    /// [`loyalty::points_to_redeem`], and is ignored entirely when the
    /// birthday discount applies.
    #[must_use]
    pub fn compute(
        subtotal: Decimal,
        birth_date: Option<Date>,
        redeem_points: bool,
        available_points: u64,
        today: Date,
    ) -> Self {
        let birthday_percent = birthday_percent(birth_date, today);

        let points_redeemed = if birthday_percent.is_zero() && redeem_points {
            loyalty::points_to_redeem(available_points, subtotal)
        } else {
            0
        };

        let (discount_amount, effective_percent) = if birthday_percent.is_zero() {
            let amount = loyalty::redemption_value(points_redeemed);
            let percent = if subtotal.is_zero() {
                Decimal::ZERO
            } else {
                amount / subtotal * Decimal::ONE_HUNDRED
            };
            (amount, percent)
        } else {
            let amount = subtotal * birthday_percent / Decimal::ONE_HUNDRED;
            (amount, birthday_percent)
        };

        Self {
            subtotal,
            birthday_percent,
            points_redeemed,
            discount_amount,
            effective_percent,
            total: subtotal - discount_amount,
        }
    }

    /// The undiscounted sum of the cart.
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// The birthday percentage in effect, zero when it does not apply.
    pub fn birthday_percent(&self) -> Decimal {
        self.birthday_percent
    }

    /// Whether the birthday discount is the one being applied.
    pub fn is_birthday(&self) -> bool {
        !self.birthday_percent.is_zero()
    }

    /// Whether the redemption toggle must be refused right now.
    pub fn redemption_locked(&self) -> bool {
        self.is_birthday()
    }

    /// Whole points spent by this sale.
    pub fn points_redeemed(&self) -> u64 {
        self.points_redeemed
    }

    /// The discount in currency, whichever source it came from.
    pub fn discount_amount(&self) -> Decimal {
        self.discount_amount
    }

    /// The discount expressed as a percentage of the subtotal.
    pub fn effective_percent(&self) -> Decimal {
        self.effective_percent
    }

    /// The amount due after the discount.
    pub fn total(&self) -> Decimal {
        self.total
    }
}
