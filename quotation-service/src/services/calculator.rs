//! Pure monetary computation for quotations and line items.
//!
//! No I/O and no hidden state: identical inputs always produce identical
//! outputs. Monetary values are rounded to 2 decimal places, round-half-up,
//! exactly once per derived field.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use service_core::error::AppError;

const HUNDRED: Decimal = dec!(100);

/// Derived monetary fields of a quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotationTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

/// Round a monetary value to 2 decimal places, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn check_rate(name: &str, rate: Decimal) -> Result<(), AppError> {
    if rate < Decimal::ZERO || rate > HUNDRED {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} must be between 0 and 100, got {}",
            name,
            rate
        )));
    }
    Ok(())
}

/// Compute the total of a single line: `quantity * unit_price`, with the
/// line's own discount applied before its own tax.
pub fn line_total(
    quantity: Decimal,
    unit_price: Decimal,
    discount_pct: Decimal,
    tax_pct: Decimal,
) -> Result<Decimal, AppError> {
    if quantity < Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Quantity must not be negative, got {}",
            quantity
        )));
    }
    if unit_price < Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Unit price must not be negative, got {}",
            unit_price
        )));
    }
    check_rate("Discount percentage", discount_pct)?;
    check_rate("Tax percentage", tax_pct)?;

    let base = quantity * unit_price;
    let after_discount = base * (Decimal::ONE - discount_pct / HUNDRED);
    let amount = after_discount * (Decimal::ONE + tax_pct / HUNDRED);

    Ok(round_money(amount))
}

/// Derive tax, discount, and total from an already-established subtotal.
pub fn totals_from_subtotal(
    subtotal: Decimal,
    tax_rate: Decimal,
    discount_rate: Decimal,
) -> Result<QuotationTotals, AppError> {
    check_rate("Tax rate", tax_rate)?;
    check_rate("Discount rate", discount_rate)?;

    let subtotal = round_money(subtotal);
    let discount_amount = round_money(subtotal * discount_rate / HUNDRED);
    let tax_amount = round_money(subtotal * tax_rate / HUNDRED);
    let total = round_money(subtotal + tax_amount - discount_amount);

    Ok(QuotationTotals {
        subtotal,
        tax_amount,
        discount_amount,
        total,
    })
}

/// Compute quotation-level totals from its line totals and rates.
pub fn quotation_totals(
    line_totals: &[Decimal],
    tax_rate: Decimal,
    discount_rate: Decimal,
) -> Result<QuotationTotals, AppError> {
    let subtotal: Decimal = line_totals.iter().copied().sum();
    totals_from_subtotal(subtotal, tax_rate, discount_rate)
}
