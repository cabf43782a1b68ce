use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::checked;
use super::line_item::{FeeLineItem, RecurrencePeriod};
use crate::types::*;
use crate::PricingResult;

/// Totals over all line items, using gross amounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_upfront: Money,
    #[serde(rename = "total_anual")]
    pub total_annual: Money,
    #[serde(rename = "total_mensal")]
    pub total_monthly: Money,
    /// `total_annual + total_monthly`
    #[serde(rename = "total_recorrente")]
    pub total_recurring: Money,
    /// `total_upfront + total_annual + 12 × total_monthly`
    #[serde(rename = "total_primeiro_ano")]
    pub total_first_year: Money,
    /// `total_annual + 12 × total_monthly`
    #[serde(rename = "total_anos_subsequentes")]
    pub total_subsequent_years: Money,
    /// First-year cost as a percentage of volume; 0 without volume
    #[serde(rename = "percentual_volume")]
    pub percent_of_volume: Decimal,
}

/// Bucket fixed and variable line items into upfront/annual/monthly totals.
/// A recurring amount with no recurrence period counts as annual.
pub fn aggregate(
    fixed_lines: &[FeeLineItem],
    variable_lines: &[FeeLineItem],
    total_volume: Money,
) -> PricingResult<CostSummary> {
    let mut total_upfront = Decimal::ZERO;
    let mut total_annual = Decimal::ZERO;
    let mut total_monthly = Decimal::ZERO;

    for item in fixed_lines.iter().chain(variable_lines.iter()) {
        total_upfront = checked::add(total_upfront, item.upfront_gross, "upfront total")?;
        match item.recurrence {
            RecurrencePeriod::Monthly => {
                total_monthly = checked::add(total_monthly, item.recurring_gross, "monthly total")?
            }
            RecurrencePeriod::Annual | RecurrencePeriod::None => {
                total_annual = checked::add(total_annual, item.recurring_gross, "annual total")?
            }
        }
    }

    let monthly_per_year = checked::mul(total_monthly, dec!(12), "monthly total per year")?;
    let total_subsequent_years = checked::add(total_annual, monthly_per_year, "subsequent-year total")?;
    let total_first_year = checked::add(total_upfront, total_subsequent_years, "first-year total")?;
    let percent_of_volume = if total_volume > Decimal::ZERO {
        let share = checked::div(total_first_year, total_volume, "percent of volume")?;
        checked::mul(share, Decimal::ONE_HUNDRED, "percent of volume")?
    } else {
        Decimal::ZERO
    };

    Ok(CostSummary {
        total_upfront,
        total_annual,
        total_monthly,
        total_recurring: checked::add(total_annual, total_monthly, "recurring total")?,
        total_first_year,
        total_subsequent_years,
        percent_of_volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::line_item::{FeeOrigin, PricingMode};
    use pretty_assertions::assert_eq;

    fn upfront(net: Money) -> FeeLineItem {
        FeeLineItem::upfront("u", PricingMode::Flat, net, Decimal::ZERO, FeeOrigin::CatalogFixed).unwrap()
    }

    fn recurring(net: Money, period: RecurrencePeriod) -> FeeLineItem {
        FeeLineItem::recurring("r", PricingMode::Flat, net, period, Decimal::ZERO, FeeOrigin::CatalogFixed).unwrap()
    }

    #[test]
    fn test_empty_inputs() {
        let summary = aggregate(&[], &[], dec!(1_000_000)).unwrap();
        assert_eq!(summary, CostSummary::default());
    }

    #[test]
    fn test_bucketing_and_totals() {
        let fixed = vec![upfront(dec!(10000)), recurring(dec!(24000), RecurrencePeriod::Annual)];
        let variable = vec![recurring(dec!(100), RecurrencePeriod::Monthly), upfront(dec!(15000))];
        let summary = aggregate(&fixed, &variable, dec!(10_000_000)).unwrap();

        assert_eq!(summary.total_upfront, dec!(25000));
        assert_eq!(summary.total_annual, dec!(24000));
        assert_eq!(summary.total_monthly, dec!(100));
        assert_eq!(summary.total_recurring, dec!(24100));
        assert_eq!(summary.total_first_year, dec!(50200));
        assert_eq!(summary.total_subsequent_years, dec!(25200));
        assert_eq!(summary.percent_of_volume, dec!(0.502));
    }

    #[test]
    fn test_uses_gross_amounts() {
        let item = FeeLineItem::upfront("g", PricingMode::Flat, dec!(8000), dec!(0.2), FeeOrigin::CatalogFixed).unwrap();
        let summary = aggregate(&[item], &[], dec!(1_000_000)).unwrap();
        assert_eq!(summary.total_upfront, dec!(10000));
    }

    #[test]
    fn test_zero_volume_guard() {
        let summary = aggregate(&[upfront(dec!(1000))], &[], Decimal::ZERO).unwrap();
        assert_eq!(summary.percent_of_volume, Decimal::ZERO);
        assert_eq!(summary.total_first_year, dec!(1000));
    }

    #[test]
    fn test_serialises_with_source_names() {
        let summary = aggregate(&[upfront(dec!(1))], &[], dec!(100)).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("total_primeiro_ano").is_some());
        assert!(json.get("total_recorrente").is_some());
        assert!(json.get("percentual_volume").is_some());
    }

    #[test]
    fn test_totals_past_decimal_range_are_an_error() {
        let lines = vec![upfront(Decimal::MAX), upfront(Decimal::MAX)];
        assert!(matches!(
            aggregate(&lines, &[], dec!(1_000_000)).unwrap_err(),
            crate::error::PricingError::Overflow { .. }
        ));

        let monthly = vec![recurring(Decimal::MAX / dec!(2), RecurrencePeriod::Monthly)];
        assert!(aggregate(&monthly, &[], dec!(1_000_000)).is_err());
    }
}
