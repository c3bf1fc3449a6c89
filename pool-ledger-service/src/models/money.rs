//! Conversions between API amounts and stored cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Largest amount accepted anywhere in the ledger.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Amounts are stored as integer cents; `None` when out of range.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// True when the amount has no more precision than a cent.
pub fn is_whole_cents(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_conversion_is_exact_for_two_places() {
        let amount = Decimal::new(12_345, 2);
        assert_eq!(to_cents(amount), Some(12_345));
        assert_eq!(from_cents(12_345), amount);
    }

    #[test]
    fn whole_cents_detection() {
        assert!(is_whole_cents(Decimal::new(65, 0)));
        assert!(is_whole_cents(Decimal::new(1050, 3))); // 1.050
        assert!(!is_whole_cents(Decimal::new(1001, 3)));
    }

    #[test]
    fn max_amount_fits_in_cents() {
        assert_eq!(MAX_AMOUNT, Decimal::new(1_000_000_000, 0));
        assert!(to_cents(MAX_AMOUNT).is_some());
    }
}
