//! Fixed-point sale arithmetic
//!
//! Quantities are asset base units and prices are payment base units per
//! whole asset unit, both with 18 decimals. All math is checked u128; a
//! result that does not fit is reported as `None`, never wrapped.

/// Decimal places shared by asset quantities and prices
pub const TOKEN_DECIMALS: u8 = 18;

/// Base units per whole asset unit
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Smallest quantity accepted in a single purchase (5 whole units)
pub const MIN_PURCHASE: u128 = 5 * SCALE;

/// Largest quantity accepted in a single purchase (100 whole units)
pub const MAX_PURCHASE: u128 = 100 * SCALE;

/// Exact `floor(quantity * price / SCALE)`
///
/// Splits both operands around `SCALE` so no intermediate product is wider
/// than the final result:
/// `q = w*S + f`, `p = a*S + b` gives `q*p/S = w*p + f*a + f*b/S`.
pub fn cost_of(quantity: u128, price: u128) -> Option<u128> {
    let (whole, frac) = (quantity / SCALE, quantity % SCALE);
    let (price_whole, price_frac) = (price / SCALE, price % SCALE);

    // frac and price_frac are both below 10^18, their product fits in u128
    let frac_part = frac * price_frac / SCALE;

    whole
        .checked_mul(price)?
        .checked_add(frac.checked_mul(price_whole)?)?
        .checked_add(frac_part)
}

/// Quantity bought by a bare payment: whole units the payment covers,
/// rounded down, expressed in base units
pub fn quantity_for_payment(payment: u128, price: u128) -> Option<u128> {
    if price == 0 {
        return None;
    }
    (payment / price).checked_mul(SCALE)
}

/// Whether a quantity lies within the per-purchase bounds
pub fn within_purchase_bounds(quantity: u128) -> bool {
    (MIN_PURCHASE..=MAX_PURCHASE).contains(&quantity)
}
