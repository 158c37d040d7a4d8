//! Receipt
//!
//! A [`ChargeReceipt`] is the register's record of one completed sale. It
//! carries the backend's confirmed figures together with the outcome of the
//! two follow-up steps that can fail without voiding the sale: the loyalty
//! write-back and the invoice email.

use std::fmt;
use std::io;

use rust_decimal::Decimal;
use rusty_money::{Money, iso};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

use crate::customers::CustomerId;
use crate::orders::TransactionId;

/// Format an amount the way the register prints money.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    Money::from_decimal(amount, iso::LKR).to_string()
}

/// Outcome of the loyalty write-back that follows a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoyaltyStatus {
    /// The backend accepted the new balance.
    Applied {
        /// The balance the customer record now holds.
        balance: u64,
    },

    /// The order exists but the balance write-back failed, so the backend
    /// still holds the old balance.
    Stale {
        /// The balance the write-back tried to store.
        intended: u64,

        /// Why the write-back failed.
        error: String,
    },
}

/// Outcome of the optional invoice email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailStatus {
    /// No email was requested, or the customer has no address to send to.
    NotRequested,

    /// The backend accepted the send request.
    Sent,

    /// The send failed. The sale itself is unaffected.
    Failed(String),
}

/// The record of one completed sale.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeReceipt {
    /// Identifier the backend issued for this sale.
    pub transaction_id: TransactionId,

    /// The charged customer.
    pub customer_id: CustomerId,

    /// Cart sum before any discount, as the register computed it.
    pub subtotal: Decimal,

    /// Discount applied, as a percentage of the subtotal.
    pub discount_percent: Decimal,

    /// Points spent on this sale.
    pub points_redeemed: u64,

    /// The charged amount, as the backend confirmed it.
    pub total: Decimal,

    /// Points this sale earned, computed from the confirmed total.
    pub points_earned: u64,

    /// Outcome of the loyalty write-back.
    pub loyalty: LoyaltyStatus,

    /// Outcome of the invoice email.
    pub email: EmailStatus,
}

impl ChargeReceipt {
    /// What the discount saved, measured against the charged total.
    #[must_use]
    pub fn savings(&self) -> Decimal {
        self.subtotal - self.total
    }
}

impl fmt::Display for ChargeReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = Money::from_decimal(self.total, iso::LKR);

        if self.discount_percent.is_zero() {
            write!(f, "order {} charged {total}", self.transaction_id)
        } else {
            write!(
                f,
                "order {} charged {total} ({}% off)",
                self.transaction_id, self.discount_percent
            )
        }
    }
}

/// Write the printed form of a receipt.
///
/// Zero-valued lines are left off: no discount row without a discount, no
/// redemption row without spent points, no invoice row unless an email was
/// attempted.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_receipt(out: &mut impl io::Write, receipt: &ChargeReceipt) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["Transaction", receipt.transaction_id.as_str()]);

    let subtotal = format_amount(receipt.subtotal);
    builder.push_record(["Subtotal", subtotal.as_str()]);

    if !receipt.discount_percent.is_zero() {
        let discount = format!(
            "{}% (-{})",
            receipt.discount_percent,
            format_amount(receipt.savings())
        );
        builder.push_record(["Discount", discount.as_str()]);
    }

    if receipt.points_redeemed > 0 {
        let redeemed = receipt.points_redeemed.to_string();
        builder.push_record(["Points redeemed", redeemed.as_str()]);
    }

    let total = format_amount(receipt.total);
    builder.push_record(["Total", total.as_str()]);

    let earned = receipt.points_earned.to_string();
    builder.push_record(["Points earned", earned.as_str()]);

    let balance = match &receipt.loyalty {
        LoyaltyStatus::Applied { balance } => balance.to_string(),
        LoyaltyStatus::Stale { intended, .. } => format!("{intended} (update failed)"),
    };
    builder.push_record(["Loyalty balance", balance.as_str()]);

    match &receipt.email {
        EmailStatus::Sent => builder.push_record(["Invoice", "emailed"]),
        EmailStatus::Failed(_) => builder.push_record(["Invoice", "email failed"]),
        EmailStatus::NotRequested => {}
    }

    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.modify(Columns::last(), Alignment::right());

    writeln!(out, "{table}")
}
