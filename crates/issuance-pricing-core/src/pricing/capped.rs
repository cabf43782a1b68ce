use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::checked;
use crate::error::PricingError;
use crate::types::*;
use crate::PricingResult;

/// A percentage-of-volume fee bounded by absolute floor and ceiling values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CappedRate {
    pub rate: Rate,
    pub min: Money,
    pub max: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CappedAmount {
    pub amount: Money,
    /// `volume × rate` before clamping
    pub raw_amount: Money,
    pub min: Money,
    pub max: Money,
    pub applied_min: bool,
    pub applied_max: bool,
}

impl CappedRate {
    pub fn new(rate: Rate, min: Money, max: Money) -> Self {
        Self { rate, min, max }
    }

    pub fn validate(&self, name: &str) -> PricingResult<()> {
        if self.rate < Decimal::ZERO || self.min < Decimal::ZERO {
            return Err(PricingError::InvalidInput {
                field: name.to_string(),
                reason: "Capped rate and minimum must be non-negative".into(),
            });
        }
        if self.min > self.max {
            return Err(PricingError::InvalidInput {
                field: name.to_string(),
                reason: format!("Minimum {} exceeds maximum {}", self.min, self.max),
            });
        }
        Ok(())
    }

    pub fn compute(&self, volume: Money) -> PricingResult<CappedAmount> {
        compute_capped(volume, self.rate, self.min, self.max)
    }
}

/// `clamp(volume × rate, min, max)`, reporting which bound was hit.
pub fn compute_capped(volume: Money, rate: Rate, min: Money, max: Money) -> PricingResult<CappedAmount> {
    if volume < Decimal::ZERO {
        return Err(PricingError::InvalidInput {
            field: "volume".into(),
            reason: "Volume cannot be negative".into(),
        });
    }
    if min > max {
        return Err(PricingError::InvalidInput {
            field: "min".into(),
            reason: format!("Minimum {} exceeds maximum {}", min, max),
        });
    }

    let raw_amount = checked::mul(volume, rate, "capped fee")?;
    Ok(CappedAmount {
        amount: raw_amount.max(min).min(max),
        raw_amount,
        min,
        max,
        applied_min: raw_amount < min,
        applied_max: raw_amount > max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minimum_applied() {
        let out = compute_capped(dec!(50_000_000), dec!(0.00002778), dec!(9919), dec!(69436)).unwrap();
        assert_eq!(out.raw_amount, dec!(1389));
        assert_eq!(out.amount, dec!(9919));
        assert!(out.applied_min);
        assert!(!out.applied_max);
    }

    #[test]
    fn test_maximum_applied() {
        let out = compute_capped(dec!(200_000_000), dec!(0.00003968), dec!(1416), dec!(2830)).unwrap();
        assert_eq!(out.raw_amount, dec!(7936));
        assert_eq!(out.amount, dec!(2830));
        assert!(out.applied_max);
        assert!(!out.applied_min);
    }

    #[test]
    fn test_inside_bounds() {
        let out = compute_capped(dec!(1_000_000_000), dec!(0.00002778), dec!(9919), dec!(69436)).unwrap();
        assert_eq!(out.amount, dec!(27780));
        assert!(!out.applied_min && !out.applied_max);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(compute_capped(dec!(-1), dec!(0.01), dec!(0), dec!(10)).is_err());
        assert!(compute_capped(dec!(1), dec!(0.01), dec!(10), dec!(5)).is_err());
    }

    #[test]
    fn test_capped_rate_validation() {
        assert!(CappedRate::new(dec!(0.01), dec!(10), dec!(5)).validate("x").is_err());
        assert!(CappedRate::new(dec!(-0.01), dec!(0), dec!(5)).validate("x").is_err());
        assert!(CappedRate::new(dec!(0.01), dec!(0), dec!(5)).validate("x").is_ok());
    }

    #[test]
    fn test_overflowing_product_is_an_error() {
        let err = compute_capped(Decimal::MAX, dec!(2), dec!(0), Decimal::MAX).unwrap_err();
        assert!(matches!(err, PricingError::Overflow { .. }));
    }
}
