use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::checked;
use crate::error::PricingError;
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One progressive bracket. The lower bound is implied by the previous
/// bracket's upper bound (0 for the first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    /// Exclusive upper bound of the bracket; `None` = unbounded
    pub upper_bound: Option<Money>,
    /// Rate applied to the volume inside the bracket
    pub rate: Rate,
}

impl Bracket {
    pub fn new(upper_bound: Option<Money>, rate: Rate) -> Self {
        Self { upper_bound, rate }
    }
}

/// An ordered set of brackets covering [0, ∞).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketTable {
    pub name: String,
    pub brackets: Vec<Bracket>,
}

/// How much of the amount one bracket consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketAllocation {
    pub lower: Money,
    pub upper: Option<Money>,
    pub rate: Rate,
    pub amount_in_bracket: Money,
    pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredResult {
    /// Sum of bracket values, before any tenor multiplier
    pub base: Money,
    pub tenor_multiplier: Years,
    /// `base × tenor_multiplier`
    pub total: Money,
    pub allocations: Vec<BracketAllocation>,
}

// ---------------------------------------------------------------------------
// Table construction and validation
// ---------------------------------------------------------------------------

impl BracketTable {
    /// Build a table, rejecting anything that is not ascending, contiguous and
    /// open-ended.
    pub fn new(name: &str, brackets: Vec<Bracket>) -> PricingResult<Self> {
        let table = Self {
            name: name.to_string(),
            brackets,
        };
        table.validate()?;
        Ok(table)
    }

    /// Unchecked constructor for the built-in schedules; those are covered by
    /// table-validation tests instead of runtime checks.
    pub(crate) fn from_static(name: &str, brackets: &[(Option<Money>, Rate)]) -> Self {
        Self {
            name: name.to_string(),
            brackets: brackets
                .iter()
                .map(|(upper, rate)| Bracket::new(*upper, *rate))
                .collect(),
        }
    }

    pub fn validate(&self) -> PricingResult<()> {
        if self.brackets.is_empty() {
            return Err(self.config_error("table has no brackets"));
        }

        let last = self.brackets.len() - 1;
        let mut previous = Decimal::ZERO;
        for (i, bracket) in self.brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO {
                return Err(self.config_error(&format!("bracket {} has a negative rate", i + 1)));
            }
            match bracket.upper_bound {
                Some(upper) => {
                    if i == last {
                        return Err(self.config_error("last bracket must be unbounded"));
                    }
                    if upper <= previous {
                        return Err(self.config_error(&format!(
                            "bracket {} upper bound {} is not above {}",
                            i + 1,
                            upper,
                            previous
                        )));
                    }
                    previous = upper;
                }
                None if i != last => {
                    return Err(self.config_error(&format!(
                        "bracket {} is unbounded but is not the last bracket",
                        i + 1
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Same bounds, every rate multiplied by `factor`.
    pub fn scaled(&self, name: &str, factor: Decimal) -> Self {
        Self {
            name: name.to_string(),
            brackets: self
                .brackets
                .iter()
                .map(|b| Bracket::new(b.upper_bound, b.rate * factor))
                .collect(),
        }
    }

    fn config_error(&self, reason: &str) -> PricingError {
        PricingError::InvalidBracketConfiguration {
            table: self.name.clone(),
            reason: reason.to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Calculation
    // -----------------------------------------------------------------------

    /// Progressive calculation: each bracket taxes only the part of `amount`
    /// that falls inside it. A value exactly on a boundary belongs to the
    /// lower bracket.
    pub fn compute(&self, amount: Money) -> PricingResult<TieredResult> {
        self.compute_with_tenor(amount, Decimal::ONE)
    }

    /// Progressive calculation multiplied by a tenor in years ("rate × tenor"
    /// registration pricing).
    pub fn compute_with_tenor(&self, amount: Money, tenor: Years) -> PricingResult<TieredResult> {
        if amount < Decimal::ZERO {
            return Err(PricingError::InvalidInput {
                field: "amount".into(),
                reason: "Tiered amount cannot be negative".into(),
            });
        }
        if tenor < Decimal::ZERO {
            return Err(PricingError::InvalidInput {
                field: "tenor_years".into(),
                reason: "Tenor cannot be negative".into(),
            });
        }

        let mut base = Decimal::ZERO;
        let mut remaining = amount;
        let mut lower = Decimal::ZERO;
        let mut allocations = Vec::new();

        for bracket in &self.brackets {
            if remaining <= Decimal::ZERO {
                break;
            }
            let in_bracket = match bracket.upper_bound {
                Some(upper) => remaining.min(upper - lower),
                None => remaining,
            };
            let value = checked::mul(in_bracket, bracket.rate, &self.name)?;

            allocations.push(BracketAllocation {
                lower,
                upper: bracket.upper_bound,
                rate: bracket.rate,
                amount_in_bracket: in_bracket,
                value,
            });

            base = checked::add(base, value, &self.name)?;
            remaining -= in_bracket;
            if let Some(upper) = bracket.upper_bound {
                lower = upper;
            }
        }

        Ok(TieredResult {
            base,
            tenor_multiplier: tenor,
            total: checked::mul(base, tenor, &self.name)?,
            allocations,
        })
    }
}

/// Progressive-bracket amount for an ad-hoc bracket list. The list is
/// validated first, so a misconfigured table fails loudly.
pub fn compute_tiered(amount: Money, brackets: &[Bracket]) -> PricingResult<Money> {
    let table = BracketTable::new("ad_hoc", brackets.to_vec())?;
    Ok(table.compute(amount)?.total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn deb_custody() -> BracketTable {
        BracketTable::new(
            "deb_custody",
            vec![
                Bracket::new(Some(dec!(100_000_000)), dec!(0.00000167)),
                Bracket::new(Some(dec!(500_000_000)), dec!(0.00000100)),
                Bracket::new(Some(dec!(1_000_000_000)), dec!(0.00000067)),
                Bracket::new(None, dec!(0.00000033)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_zero_amount_touches_no_brackets() {
        let result = deb_custody().compute(Decimal::ZERO).unwrap();
        assert_eq!(result.total, Decimal::ZERO);
        assert!(result.allocations.is_empty());
    }

    #[test]
    fn test_single_bracket() {
        let result = deb_custody().compute(dec!(50_000_000)).unwrap();
        assert_eq!(result.total, dec!(83.50));
        assert_eq!(result.allocations.len(), 1);
    }

    #[test]
    fn test_spans_all_brackets() {
        let result = deb_custody().compute(dec!(1_500_000_000)).unwrap();
        assert_eq!(result.total, dec!(1067));
        let values: Vec<Money> = result.allocations.iter().map(|a| a.value).collect();
        assert_eq!(values, vec![dec!(167), dec!(400), dec!(335), dec!(165)]);
        assert_eq!(result.allocations[3].lower, dec!(1_000_000_000));
        assert_eq!(result.allocations[3].upper, None);
    }

    #[test]
    fn test_boundary_belongs_to_lower_bracket() {
        let result = deb_custody().compute(dec!(100_000_000)).unwrap();
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.allocations[0].amount_in_bracket, dec!(100_000_000));
        assert_eq!(result.total, dec!(167));
    }

    #[test]
    fn test_allocations_never_double_count() {
        let amount = dec!(734_123_456.78);
        let result = deb_custody().compute(amount).unwrap();
        let allocated: Money = result.allocations.iter().map(|a| a.amount_in_bracket).sum();
        assert_eq!(allocated, amount);
    }

    #[test]
    fn test_tenor_multiplier() {
        let table = BracketTable::new(
            "deb_registration",
            vec![
                Bracket::new(Some(dec!(100_000_000)), dec!(0.00002)),
                Bracket::new(None, dec!(0.000005)),
            ],
        )
        .unwrap();
        let result = table.compute_with_tenor(dec!(50_000_000), dec!(3)).unwrap();
        assert_eq!(result.base, dec!(1000));
        assert_eq!(result.total, dec!(3000));
    }

    #[test]
    fn test_negative_inputs_rejected() {
        assert!(deb_custody().compute(dec!(-1)).is_err());
        assert!(deb_custody().compute_with_tenor(dec!(1), dec!(-1)).is_err());
    }

    #[test]
    fn test_rejects_descending_bounds() {
        let err = BracketTable::new(
            "bad",
            vec![
                Bracket::new(Some(dec!(500)), dec!(0.01)),
                Bracket::new(Some(dec!(100)), dec!(0.01)),
                Bracket::new(None, dec!(0.01)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PricingError::InvalidBracketConfiguration { .. }));
    }

    #[test]
    fn test_rejects_bounded_last_bracket() {
        let err = BracketTable::new("bad", vec![Bracket::new(Some(dec!(100)), dec!(0.01))]);
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_unbounded_middle_bracket() {
        let err = BracketTable::new(
            "bad",
            vec![Bracket::new(None, dec!(0.01)), Bracket::new(None, dec!(0.02))],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_empty_and_negative_rate() {
        assert!(BracketTable::new("empty", vec![]).is_err());
        assert!(BracketTable::new("neg", vec![Bracket::new(None, dec!(-0.01))]).is_err());
    }

    #[test]
    fn test_scaled_table() {
        let half = deb_custody().scaled("half", dec!(0.5));
        assert_eq!(half.brackets[0].rate, dec!(0.000000835));
        assert_eq!(half.brackets[0].upper_bound, Some(dec!(100_000_000)));
        assert!(half.validate().is_ok());
    }

    #[test]
    fn test_compute_tiered_free_function() {
        let brackets = vec![
            Bracket::new(Some(dec!(100)), dec!(0.10)),
            Bracket::new(None, dec!(0.05)),
        ];
        assert_eq!(compute_tiered(dec!(150), &brackets).unwrap(), dec!(12.5));
        assert!(compute_tiered(dec!(150), &brackets[..1]).is_err());
    }

    #[test]
    fn test_extreme_rate_or_tenor_overflows_instead_of_panicking() {
        let table = BracketTable::new("huge", vec![Bracket::new(None, Decimal::MAX)]).unwrap();
        assert!(matches!(
            table.compute(dec!(10)).unwrap_err(),
            PricingError::Overflow { .. }
        ));

        let err = deb_custody()
            .compute_with_tenor(dec!(1_000_000_000_000_000), Decimal::MAX)
            .unwrap_err();
        assert!(matches!(err, PricingError::Overflow { .. }));
    }
}
