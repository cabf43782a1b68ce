use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::capped::CappedAmount;
use super::gross_up::gross_up_fraction;
use super::tiered::BracketAllocation;
use crate::types::*;
use crate::PricingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    #[serde(alias = "fixo", alias = "fixed")]
    Flat,
    #[serde(alias = "percentual", alias = "percentage")]
    PercentageOfVolume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePeriod {
    #[default]
    None,
    #[serde(alias = "mensal")]
    Monthly,
    #[serde(alias = "anual")]
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeOrigin {
    /// A row of a configured cost catalog
    CatalogFixed,
    /// A market-infrastructure formula (custody, registration, CVM, ANBIMA)
    FormulaicVariable,
}

/// Per-series bracket breakdown of a tiered fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheBreakdown {
    pub series: u32,
    pub face_value: Money,
    pub tenor_years: Years,
    pub value: Money,
    pub brackets: Vec<BracketAllocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeDetails {
    Flat { rate: Rate, volume: Money },
    /// Brackets applied once to the whole issuance volume
    TieredVolume {
        volume: Money,
        value: Money,
        brackets: Vec<BracketAllocation>,
    },
    /// Brackets restarted for every series
    Tiered { series: Vec<TrancheBreakdown> },
    Capped(CappedAmount),
}

/// One priced cost component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLineItem {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub pricing_mode: PricingMode,
    pub upfront_net: Money,
    pub recurring_net: Money,
    pub recurrence: RecurrencePeriod,
    /// Normalised fraction; values outside (0, 1) are not applied
    pub gross_up_rate: Rate,
    pub upfront_gross: Money,
    pub recurring_gross: Money,
    pub origin: FeeOrigin,
    pub formula: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FeeDetails>,
}

impl FeeLineItem {
    /// One-time cost charged at issuance.
    pub fn upfront(
        role: &str,
        pricing_mode: PricingMode,
        net: Money,
        gross_up_rate: Rate,
        origin: FeeOrigin,
    ) -> PricingResult<Self> {
        Ok(Self {
            role: role.to_string(),
            provider: None,
            pricing_mode,
            upfront_net: net,
            recurring_net: Decimal::ZERO,
            recurrence: RecurrencePeriod::None,
            gross_up_rate,
            upfront_gross: gross_up_fraction(net, gross_up_rate)?,
            recurring_gross: Decimal::ZERO,
            origin,
            formula: String::new(),
            details: None,
        })
    }

    /// Cost charged every `period`.
    pub fn recurring(
        role: &str,
        pricing_mode: PricingMode,
        net: Money,
        period: RecurrencePeriod,
        gross_up_rate: Rate,
        origin: FeeOrigin,
    ) -> PricingResult<Self> {
        Ok(Self {
            role: role.to_string(),
            provider: None,
            pricing_mode,
            upfront_net: Decimal::ZERO,
            recurring_net: net,
            recurrence: period,
            gross_up_rate,
            upfront_gross: Decimal::ZERO,
            recurring_gross: gross_up_fraction(net, gross_up_rate)?,
            origin,
            formula: String::new(),
            details: None,
        })
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into();
        self
    }

    pub fn with_details(mut self, details: FeeDetails) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_upfront_item_grosses_up() {
        let item = FeeLineItem::upfront(
            "Agente Fiduciário",
            PricingMode::Flat,
            dec!(8000),
            dec!(0.2),
            FeeOrigin::CatalogFixed,
        )
        .unwrap();
        assert_eq!(item.upfront_gross, dec!(10000));
        assert_eq!(item.recurring_gross, Decimal::ZERO);
        assert_eq!(item.recurrence, RecurrencePeriod::None);
    }

    #[test]
    fn test_recurring_item() {
        let item = FeeLineItem::recurring(
            "Custódia B3",
            PricingMode::PercentageOfVolume,
            dec!(83.5),
            RecurrencePeriod::Monthly,
            Decimal::ZERO,
            FeeOrigin::FormulaicVariable,
        )
        .unwrap()
        .with_formula("Tabela progressiva");
        assert_eq!(item.recurring_gross, dec!(83.5));
        assert_eq!(item.upfront_net, Decimal::ZERO);
        assert_eq!(item.formula, "Tabela progressiva");
    }

    #[test]
    fn test_mode_and_period_accept_source_names() {
        let mode: PricingMode = serde_json::from_str(r#""percentual""#).unwrap();
        assert_eq!(mode, PricingMode::PercentageOfVolume);
        let period: RecurrencePeriod = serde_json::from_str(r#""mensal""#).unwrap();
        assert_eq!(period, RecurrencePeriod::Monthly);
    }

    #[test]
    fn test_volume_level_details_serialise_without_series() {
        let details = FeeDetails::TieredVolume {
            volume: dec!(50_000_000),
            value: dec!(83.5),
            brackets: vec![],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["kind"], "tiered_volume");
        assert!(json.get("series").is_none());
    }
}
