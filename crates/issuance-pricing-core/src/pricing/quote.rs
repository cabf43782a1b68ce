use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use super::aggregate::{aggregate, CostSummary};
use super::catalog::{resolve_catalog, FeeCatalogRow};
use super::checked;
use super::combination::{resolve, CatalogKey, Combination};
use super::line_item::{FeeDetails, FeeLineItem};
use super::registry::RateTableSnapshot;
use super::variable::{compute_variable_fee, PricedTranche};
use crate::error::PricingError;
use crate::types::*;
use crate::PricingResult;

/// Largest accepted issuance volume or series face value (R$ 1 quadrillion).
pub const MAX_VOLUME: Money = dec!(1_000_000_000_000_000);

/// Longest accepted tenor, in years.
pub const MAX_TENOR_YEARS: Years = dec!(100);

/// What one series carries of the formula fees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesCost {
    pub number: u32,
    pub face_value: Money,
    pub tenor_years: Years,
    /// Exact registration fee for this series
    pub registration: Money,
    /// Share of the monthly custody fee, by face value
    pub custody_monthly: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceCostOutput {
    pub costs: Vec<FeeLineItem>,
    pub totals: CostSummary,
    /// Primary catalog table name; `None` when the offer type was not recognised
    pub source_table: Option<String>,
    pub series_costs: Vec<SeriesCost>,
    pub combination: Combination,
}

/// Price a full issuance: fixed catalog fees for the resolved combination
/// plus the market-infrastructure formulas, aggregated into totals and
/// apportioned per series.
pub fn calculate_issuance_costs(
    request: &IssuanceRequest,
    snapshot: &RateTableSnapshot,
) -> PricingResult<ComputationOutput<IssuanceCostOutput>> {
    let mut warnings: Vec<String> = Vec::new();

    // -- Validation ----------------------------------------------------------
    validate_request(request)?;

    let series = request.effective_series();
    let series_total = checked::sum(series.iter().map(|t| t.face_value), "series face values")?;
    if !request.series.is_empty() && series_total != request.total_volume {
        warn!(
            volume = %request.total_volume,
            series_total = %series_total,
            "series face values do not add up to the issuance volume"
        );
        warnings.push(format!(
            "Series face values sum to {} but the issuance volume is {}",
            series_total, request.total_volume
        ));
    }

    // -- Combination ---------------------------------------------------------
    let combination = resolve(
        request.category,
        request.offer_type,
        request.vehicle,
        request.collateral_origin,
    );
    if combination.primary.is_none() {
        warnings.push("Offer type not recognised; no fixed-fee table applies".into());
    }

    // -- Fixed fees ----------------------------------------------------------
    let mut fixed_lines = Vec::new();
    for key in combination
        .primary
        .iter()
        .chain(combination.vehicle_surcharge.iter())
    {
        let rows = catalog_rows(snapshot, key, &mut warnings);
        fixed_lines.extend(resolve_catalog(rows, request.total_volume)?);
    }

    // -- Variable fees -------------------------------------------------------
    let priced: Vec<PricedTranche> = series
        .iter()
        .map(|t| PricedTranche {
            number: t.number,
            face_value: t.face_value,
            tenor_years: request.tenor_for(t),
        })
        .collect();

    let mut variable_lines = Vec::new();
    let mut registration_item: Option<usize> = None;
    let mut custody_monthly = Decimal::ZERO;
    for fee in combination.formula_set.fees() {
        let item = compute_variable_fee(*fee, request.total_volume, &priced, snapshot.schedule())?;
        if fee.is_registration() {
            registration_item = Some(variable_lines.len());
        }
        if fee.is_custody() {
            custody_monthly = checked::add(custody_monthly, item.recurring_gross, "custody total")?;
        }
        variable_lines.push(item);
    }

    // -- Aggregation ---------------------------------------------------------
    let totals = aggregate(&fixed_lines, &variable_lines, request.total_volume)?;

    // -- Per-series apportionment --------------------------------------------
    let registration_by_series = registration_item
        .and_then(|idx| variable_lines[idx].details.as_ref())
        .map(registration_values)
        .unwrap_or_default();
    let series_costs = apportion(&priced, &registration_by_series, custody_monthly, series_total)?;

    info!(
        category = %request.category,
        lines = fixed_lines.len() + variable_lines.len(),
        total_upfront = %totals.total_upfront,
        total_first_year = %totals.total_first_year,
        "issuance costs calculated"
    );

    let source_table = combination.primary.map(|k| k.table_name());
    let mut costs = fixed_lines;
    costs.extend(variable_lines);

    let output = IssuanceCostOutput {
        costs,
        totals,
        source_table,
        series_costs,
        combination,
    };

    Ok(with_metadata(
        "Issuance cost pricing: fixed catalog fees plus B3/CVM/ANBIMA formulas, gross-up per line",
        request,
        warnings,
        output,
    ))
}

fn validate_request(request: &IssuanceRequest) -> PricingResult<()> {
    if request.total_volume <= Decimal::ZERO {
        return Err(PricingError::InvalidInput {
            field: "total_volume".into(),
            reason: "Issuance volume must be positive".into(),
        });
    }
    if request.total_volume > MAX_VOLUME {
        return Err(PricingError::InvalidInput {
            field: "total_volume".into(),
            reason: format!("Issuance volume cannot exceed {}", MAX_VOLUME),
        });
    }
    if let Some(tenor) = request.tenor_years {
        check_tenor("tenor_years", tenor, "Tenor")?;
    }

    let mut seen = HashSet::new();
    for tranche in &request.series {
        if tranche.number == 0 {
            return Err(PricingError::InvalidInput {
                field: "series.number".into(),
                reason: "Series numbers start at 1".into(),
            });
        }
        if !seen.insert(tranche.number) {
            return Err(PricingError::InvalidInput {
                field: "series.number".into(),
                reason: format!("Series {} appears more than once", tranche.number),
            });
        }
        if tranche.face_value <= Decimal::ZERO || tranche.face_value > MAX_VOLUME {
            return Err(PricingError::InvalidInput {
                field: "series.face_value".into(),
                reason: format!(
                    "Series {} face value must be positive and at most {}",
                    tranche.number, MAX_VOLUME
                ),
            });
        }
        if let Some(tenor) = tranche.tenor_years {
            check_tenor("series.tenor_years", tenor, &format!("Series {} tenor", tranche.number))?;
        }
    }
    Ok(())
}

fn check_tenor(field: &str, tenor: Years, label: &str) -> PricingResult<()> {
    if tenor.is_sign_negative() {
        return Err(PricingError::InvalidInput {
            field: field.into(),
            reason: format!("{} cannot be negative", label),
        });
    }
    if tenor > MAX_TENOR_YEARS {
        return Err(PricingError::InvalidInput {
            field: field.into(),
            reason: format!("{} cannot exceed {} years", label, MAX_TENOR_YEARS),
        });
    }
    Ok(())
}

fn catalog_rows<'a>(
    snapshot: &'a RateTableSnapshot,
    key: &CatalogKey,
    warnings: &mut Vec<String>,
) -> &'a [FeeCatalogRow] {
    if !snapshot.has_catalog(key) {
        warnings.push(format!("Cost table '{}' not found; no fixed fees applied from it", key));
    }
    snapshot.rows(key)
}

fn registration_values(details: &FeeDetails) -> Vec<(u32, Money)> {
    match details {
        FeeDetails::Tiered { series } => series.iter().map(|s| (s.series, s.value)).collect(),
        _ => Vec::new(),
    }
}

fn apportion(
    series: &[PricedTranche],
    registration: &[(u32, Money)],
    custody_monthly: Money,
    series_total: Money,
) -> PricingResult<Vec<SeriesCost>> {
    const CONTEXT: &str = "custody apportionment by face value";

    series
        .iter()
        .map(|t| {
            let share = checked::div(t.face_value, series_total, CONTEXT)?;
            Ok(SeriesCost {
                number: t.number,
                face_value: t.face_value,
                tenor_years: t.tenor_years,
                registration: registration
                    .iter()
                    .find(|(n, _)| *n == t.number)
                    .map(|(_, v)| *v)
                    .unwrap_or(Decimal::ZERO),
                custody_monthly: checked::mul(share, custody_monthly, CONTEXT)?,
            })
        })
        .collect()
}
