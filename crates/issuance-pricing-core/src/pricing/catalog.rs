use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::checked;
use super::gross_up::normalize_gross_up_rate;
use super::line_item::{FeeLineItem, FeeOrigin, PricingMode, RecurrencePeriod};
use crate::types::*;
use crate::PricingResult;

/// A configured cost row: one provider/role with flat or percentage pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeCatalogRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "papel")]
    pub role: String,
    #[serde(default, alias = "prestador_nome", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default = "default_pricing_mode", alias = "tipo_preco")]
    pub pricing_mode: PricingMode,
    /// Flat amount, or percentage points of volume when pricing by percentage
    #[serde(default, alias = "preco_upfront")]
    pub upfront_price: Decimal,
    #[serde(default, alias = "preco_recorrente")]
    pub recurring_price: Decimal,
    /// "mensal"/"monthly" or "anual"/"annual"; anything else counts as annual
    #[serde(default, alias = "periodicidade", skip_serializing_if = "Option::is_none")]
    pub periodicity: Option<String>,
    /// Fraction or percentage points, normalised on use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_up: Option<Decimal>,
    #[serde(default = "default_active", alias = "ativo")]
    pub active: bool,
}

fn default_pricing_mode() -> PricingMode {
    PricingMode::Flat
}

fn default_active() -> bool {
    true
}

impl FeeCatalogRow {
    pub fn flat(role: &str, upfront: Money, recurring: Money, periodicity: Option<&str>) -> Self {
        Self {
            id: None,
            role: role.to_string(),
            provider: None,
            pricing_mode: PricingMode::Flat,
            upfront_price: upfront,
            recurring_price: recurring,
            periodicity: periodicity.map(str::to_string),
            gross_up: None,
            active: true,
        }
    }

    pub fn percentage(role: &str, upfront_pct: Rate, recurring_pct: Rate, periodicity: Option<&str>) -> Self {
        Self {
            pricing_mode: PricingMode::PercentageOfVolume,
            ..Self::flat(role, upfront_pct, recurring_pct, periodicity)
        }
    }

    pub fn with_gross_up(mut self, gross_up: Decimal) -> Self {
        self.gross_up = Some(gross_up);
        self
    }

    fn recurrence(&self) -> RecurrencePeriod {
        match self.periodicity.as_deref().map(normalize_label).as_deref() {
            Some("mensal") | Some("monthly") => RecurrencePeriod::Monthly,
            _ => RecurrencePeriod::Annual,
        }
    }

    fn display_name(&self) -> Option<String> {
        self.provider.clone().or_else(|| Some(self.role.clone()))
    }
}

/// Price catalog rows against `volume`. Each active row yields an upfront
/// item when its upfront amount is positive and a recurring item when its
/// recurring amount is positive. An empty catalog yields no items.
pub fn resolve_catalog(rows: &[FeeCatalogRow], volume: Money) -> PricingResult<Vec<FeeLineItem>> {
    let mut items = Vec::new();

    for row in rows.iter().filter(|r| r.active) {
        let (upfront, recurring, formula) = match row.pricing_mode {
            PricingMode::PercentageOfVolume if volume > Decimal::ZERO => (
                percent_of(row.upfront_price, volume, &row.role)?,
                percent_of(row.recurring_price, volume, &row.role)?,
                format!(
                    "{}% (upfront) / {}% (recorrente) × Volume",
                    row.upfront_price, row.recurring_price
                ),
            ),
            PricingMode::PercentageOfVolume => {
                (Decimal::ZERO, Decimal::ZERO, "Percentual sem volume".to_string())
            }
            PricingMode::Flat => (
                row.upfront_price,
                row.recurring_price,
                "Valor fixo".to_string(),
            ),
        };
        let gross_up_rate = row
            .gross_up
            .map(normalize_gross_up_rate)
            .unwrap_or(Decimal::ZERO);

        debug!(
            role = %row.role,
            %upfront,
            %recurring,
            %gross_up_rate,
            "catalog row priced"
        );

        if upfront > Decimal::ZERO {
            items.push(
                FeeLineItem::upfront(
                    &row.role,
                    row.pricing_mode,
                    upfront,
                    gross_up_rate,
                    FeeOrigin::CatalogFixed,
                )?
                .with_provider(row.display_name())
                .with_formula(formula.clone()),
            );
        }
        if recurring > Decimal::ZERO {
            items.push(
                FeeLineItem::recurring(
                    &row.role,
                    row.pricing_mode,
                    recurring,
                    row.recurrence(),
                    gross_up_rate,
                    FeeOrigin::CatalogFixed,
                )?
                .with_provider(row.display_name())
                .with_formula(formula),
            );
        }
    }

    Ok(items)
}

/// `points`% of `volume`, divided first so large volumes stay in range.
fn percent_of(points: Decimal, volume: Money, role: &str) -> PricingResult<Money> {
    checked::mul(points / Decimal::ONE_HUNDRED, volume, role)
}
