//! Monetary amounts and the direct-transfer discount quote.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Rounds to cents (half away from zero) and fixes the scale at two places,
/// so `35` and `35.0000` both render as `"35.00"`.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Parses a stored amount column.
pub fn parse_money(raw: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(raw.trim())
}

/// Price breakdown for paying by direct bank transfer.
///
/// Computed once at order creation and copied onto the order; later changes
/// to the global discount percentage never touch existing orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferQuote {
    pub original_amount: Decimal,
    pub discount_percentage: Decimal,
    pub discount_applied: Decimal,
    pub total_amount: Decimal,
}

impl TransferQuote {
    /// `discount_applied = original × pct / 100`, `total = original − discount`.
    ///
    /// Returns `None` when the percentage is outside `[0, 100]` or the
    /// original amount is negative.
    #[must_use]
    pub fn compute(original_amount: Decimal, discount_percentage: Decimal) -> Option<Self> {
        if original_amount.is_sign_negative() || !is_valid_percentage(discount_percentage) {
            return None;
        }

        let original_amount = round_money(original_amount);
        let discount_applied =
            round_money(original_amount * discount_percentage / Decimal::ONE_HUNDRED);
        let total_amount = round_money(original_amount - discount_applied);

        Some(Self {
            original_amount,
            discount_percentage,
            discount_applied,
            total_amount,
        })
    }

    /// True when client-submitted amounts agree with this quote to the cent.
    #[must_use]
    pub fn matches(&self, original_amount: Decimal, discount_applied: Decimal) -> bool {
        round_money(original_amount) == self.original_amount
            && round_money(discount_applied) == self.discount_applied
    }
}

#[must_use]
pub fn is_valid_percentage(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE_HUNDRED
}

/// Amounts and percentages carry at most two decimal places; trailing zeros
/// do not count.
#[must_use]
pub fn has_cent_precision(value: Decimal) -> bool {
    value.normalize().scale() <= 2
}
