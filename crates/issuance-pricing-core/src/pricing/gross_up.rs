use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::checked;
use crate::types::*;
use crate::PricingResult;

/// Normalise a gross-up rate that may arrive either as a fraction (0.1215) or
/// in percentage points (12.15). Values up to 1 are fractions.
pub fn normalize_gross_up_rate(rate: Rate) -> Rate {
    if rate <= Decimal::ONE {
        debug!(%rate, "gross-up rate read as fraction");
        rate
    } else {
        debug!(%rate, "gross-up rate read as percentage points");
        rate / dec!(100)
    }
}

/// Tax-equalised gross amount: the value whose net of the deduction equals
/// `net`. Rates at or above 100% leave the amount unchanged.
pub fn gross_up(net: Money, rate: Rate) -> PricingResult<Money> {
    gross_up_fraction(net, normalize_gross_up_rate(rate))
}

/// Same as [`gross_up`] for a rate already known to be a fraction.
pub fn gross_up_fraction(net: Money, fraction: Rate) -> PricingResult<Money> {
    if fraction >= Decimal::ONE || fraction <= Decimal::ZERO {
        return Ok(net);
    }
    checked::div(net, Decimal::ONE - fraction, "gross-up")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_and_percentage_agree() {
        let from_fraction = gross_up(dec!(1000), dec!(0.1215)).unwrap();
        let from_percent = gross_up(dec!(1000), dec!(12.15)).unwrap();
        assert_eq!(from_fraction, from_percent);
    }

    #[test]
    fn test_known_value() {
        // 1000 / (1 - 0.2) = 1250
        assert_eq!(gross_up(dec!(1000), dec!(0.2)).unwrap(), dec!(1250));
        assert_eq!(gross_up(dec!(1000), dec!(20)).unwrap(), dec!(1250));
    }

    #[test]
    fn test_zero_rate_is_identity() {
        assert_eq!(gross_up(dec!(1234.56), Decimal::ZERO).unwrap(), dec!(1234.56));
    }

    #[test]
    fn test_degenerate_rate_is_identity() {
        // Exactly 1 is a fraction of 100%
        assert_eq!(gross_up(dec!(500), Decimal::ONE).unwrap(), dec!(500));
        // 100 percentage points
        assert_eq!(gross_up(dec!(500), dec!(100)).unwrap(), dec!(500));
        assert_eq!(gross_up(dec!(500), dec!(250)).unwrap(), dec!(500));
    }

    #[test]
    fn test_round_trip() {
        let net = dec!(9919);
        let rate = dec!(0.1425);
        let gross = gross_up(net, rate).unwrap();
        let recovered = gross * (Decimal::ONE - rate);
        assert!((recovered - net).abs() < dec!(0.000001));
    }

    #[test]
    fn test_rate_just_below_one_overflows_instead_of_panicking() {
        let near_one = Decimal::ONE - Decimal::new(1, 27);
        let err = gross_up(dec!(1_000_000_000_000), near_one).unwrap_err();
        assert!(matches!(err, crate::error::PricingError::Overflow { .. }));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_gross_up_rate(dec!(0.5)), dec!(0.5));
        assert_eq!(normalize_gross_up_rate(dec!(14.25)), dec!(0.1425));
    }
}
