use rust_decimal::Decimal;
use tracing::debug;

use super::checked;
use super::combination::VariableFee;
use super::line_item::{FeeDetails, FeeLineItem, FeeOrigin, PricingMode, RecurrencePeriod, TrancheBreakdown};
use super::registry::FeeSchedule;
use super::tiered::BracketTable;
use crate::types::*;
use crate::PricingResult;

const CUSTODY_ROLE: &str = "Custódia B3";
const REGISTRATION_ROLE: &str = "Registro B3";
const CVM_ROLE: &str = "Taxa CVM";
const ANBIMA_ROLE: &str = "Taxa ANBIMA";

/// A tranche with its tenor multiplier already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedTranche {
    pub number: u32,
    pub face_value: Money,
    pub tenor_years: Years,
}

/// Compute one market-infrastructure fee. Custody, CVM and ANBIMA fees use
/// the total volume; registration is priced series by series.
pub fn compute_variable_fee(
    fee: VariableFee,
    volume: Money,
    series: &[PricedTranche],
    schedule: &FeeSchedule,
) -> PricingResult<FeeLineItem> {
    let item = match fee {
        VariableFee::DebentureCustody => {
            let result = schedule.deb_custody.compute(volume)?;
            FeeLineItem::recurring(
                CUSTODY_ROLE,
                PricingMode::PercentageOfVolume,
                result.total,
                RecurrencePeriod::Monthly,
                Decimal::ZERO,
                FeeOrigin::FormulaicVariable,
            )?
            .with_provider(Some("Custódia B3 - Debênture".into()))
            .with_formula("Tabela progressiva por faixas de volume (mensal)")
            .with_details(FeeDetails::TieredVolume {
                volume,
                value: result.total,
                brackets: result.allocations,
            })
        }
        VariableFee::ReceivablesCustody => flat_custody(
            volume,
            schedule.cr_custody_rate,
            "Custódia B3 - CR/CRI",
        )?,
        VariableFee::AgribusinessCustody => flat_custody(
            volume,
            schedule.cra_custody_rate,
            "Custódia B3 - CRA",
        )?,
        VariableFee::ReceivablesRegistration => registration(
            series,
            &schedule.cr_registration,
            false,
            "Registro B3 - CR/CRI/CRA",
            "Tabela progressiva por série",
        )?,
        VariableFee::DebentureRegistrationPublic => registration(
            series,
            &schedule.deb_registration_public,
            true,
            "Registro B3 - Debênture",
            "Tabela progressiva × prazo (anos) por série",
        )?,
        VariableFee::DebentureRegistrationPrivate => registration(
            series,
            &schedule.deb_registration_private,
            true,
            "Registro B3 - Debênture Privada",
            "Tabela progressiva × prazo (anos) por série (50% taxas públicas)",
        )?,
        VariableFee::CvmOversight => FeeLineItem::upfront(
            CVM_ROLE,
            PricingMode::PercentageOfVolume,
            checked::mul(volume, schedule.cvm_rate, CVM_ROLE)?,
            Decimal::ZERO,
            FeeOrigin::FormulaicVariable,
        )?
        .with_provider(Some("Taxa de Fiscalização CVM".into()))
        .with_formula(format!("{}% × Volume Total da Oferta", as_percent(schedule.cvm_rate)?))
        .with_details(FeeDetails::Flat {
            rate: schedule.cvm_rate,
            volume,
        }),
        VariableFee::MarketAssociation => {
            let capped = schedule.market_association.compute(volume)?;
            FeeLineItem::upfront(
                ANBIMA_ROLE,
                PricingMode::PercentageOfVolume,
                capped.amount,
                Decimal::ZERO,
                FeeOrigin::FormulaicVariable,
            )?
            .with_provider(Some("Taxa ANBIMA".into()))
            .with_formula(format!(
                "{}% × Volume (mín R$ {}, máx R$ {})",
                as_percent(schedule.market_association.rate)?,
                schedule.market_association.min,
                schedule.market_association.max
            ))
            .with_details(FeeDetails::Capped(capped))
        }
        VariableFee::MarketAssociationRealEstate => {
            let capped = schedule.market_association_cri.compute(volume)?;
            FeeLineItem::upfront(
                ANBIMA_ROLE,
                PricingMode::PercentageOfVolume,
                capped.amount,
                Decimal::ZERO,
                FeeOrigin::FormulaicVariable,
            )?
            .with_provider(Some("Taxa ANBIMA - CRI".into()))
            .with_formula(format!(
                "{}% × Volume (mín R$ {}, máx R$ {})",
                as_percent(schedule.market_association_cri.rate)?,
                schedule.market_association_cri.min,
                schedule.market_association_cri.max
            ))
            .with_details(FeeDetails::Capped(capped))
        }
    };

    debug!(
        fee = ?fee,
        upfront = %item.upfront_net,
        recurring = %item.recurring_net,
        "variable fee computed"
    );
    Ok(item)
}

fn flat_custody(volume: Money, rate: Rate, provider: &str) -> PricingResult<FeeLineItem> {
    Ok(FeeLineItem::recurring(
        CUSTODY_ROLE,
        PricingMode::PercentageOfVolume,
        checked::mul(volume, rate, provider)?,
        RecurrencePeriod::Monthly,
        Decimal::ZERO,
        FeeOrigin::FormulaicVariable,
    )?
    .with_provider(Some(provider.to_string()))
    .with_formula(format!("{}% × Volume Emissão (mensal)", as_percent(rate)?))
    .with_details(FeeDetails::Flat { rate, volume }))
}

/// Registration priced per series; the brackets restart for every series.
fn registration(
    series: &[PricedTranche],
    table: &BracketTable,
    tenor_multiplied: bool,
    provider: &str,
    formula: &str,
) -> PricingResult<FeeLineItem> {
    let mut total = Decimal::ZERO;
    let mut breakdown = Vec::with_capacity(series.len());

    for tranche in series {
        let tenor = if tenor_multiplied {
            tranche.tenor_years
        } else {
            Decimal::ONE
        };
        let result = table.compute_with_tenor(tranche.face_value, tenor)?;
        total = checked::add(total, result.total, provider)?;
        breakdown.push(TrancheBreakdown {
            series: tranche.number,
            face_value: tranche.face_value,
            tenor_years: tenor,
            value: result.total,
            brackets: result.allocations,
        });
    }

    Ok(FeeLineItem::upfront(
        REGISTRATION_ROLE,
        PricingMode::PercentageOfVolume,
        total,
        Decimal::ZERO,
        FeeOrigin::FormulaicVariable,
    )?
    .with_provider(Some(provider.to_string()))
    .with_formula(formula)
    .with_details(FeeDetails::Tiered { series: breakdown }))
}

fn as_percent(rate: Rate) -> PricingResult<Rate> {
    Ok(checked::mul(rate, Decimal::ONE_HUNDRED, "rate display")?.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn single(face_value: Money, tenor: Years) -> Vec<PricedTranche> {
        vec![PricedTranche {
            number: 1,
            face_value,
            tenor_years: tenor,
        }]
    }

    #[test]
    fn test_deb_custody_single_tier() {
        let item = compute_variable_fee(
            VariableFee::DebentureCustody,
            dec!(50_000_000),
            &single(dec!(50_000_000), dec!(5)),
            &FeeSchedule::default(),
        )
        .unwrap();
        assert_eq!(item.recurring_net, dec!(83.50));
        assert_eq!(item.recurrence, RecurrencePeriod::Monthly);
        assert_eq!(item.upfront_net, Decimal::ZERO);
    }

    #[test]
    fn test_deb_custody_all_tiers() {
        let item = compute_variable_fee(
            VariableFee::DebentureCustody,
            dec!(1_500_000_000),
            &single(dec!(1_500_000_000), dec!(1)),
            &FeeSchedule::default(),
        )
        .unwrap();
        assert_eq!(item.recurring_net, dec!(1067));
        match item.details {
            Some(FeeDetails::TieredVolume { volume, value, brackets }) => {
                assert_eq!(volume, dec!(1_500_000_000));
                assert_eq!(value, dec!(1067));
                assert_eq!(brackets.len(), 4);
            }
            other => panic!("expected volume-level tiered details, got {:?}", other),
        }
    }

    #[test]
    fn test_flat_custody_rates() {
        let schedule = FeeSchedule::default();
        let series = single(dec!(100_000_000), dec!(1));
        let cr = compute_variable_fee(VariableFee::ReceivablesCustody, dec!(100_000_000), &series, &schedule)
            .unwrap();
        assert_eq!(cr.recurring_net, dec!(800));
        assert_eq!(cr.formula, "0.0008% × Volume Emissão (mensal)");
        let cra = compute_variable_fee(VariableFee::AgribusinessCustody, dec!(100_000_000), &series, &schedule)
            .unwrap();
        assert_eq!(cra.recurring_net, dec!(300));
    }

    #[test]
    fn test_public_registration_times_tenor() {
        let item = compute_variable_fee(
            VariableFee::DebentureRegistrationPublic,
            dec!(50_000_000),
            &single(dec!(50_000_000), dec!(3)),
            &FeeSchedule::default(),
        )
        .unwrap();
        assert_eq!(item.upfront_net, dec!(3000));
    }

    #[test]
    fn test_private_registration_half_rate() {
        let item = compute_variable_fee(
            VariableFee::DebentureRegistrationPrivate,
            dec!(50_000_000),
            &single(dec!(50_000_000), dec!(3)),
            &FeeSchedule::default(),
        )
        .unwrap();
        assert_eq!(item.upfront_net, dec!(1500));
    }

    #[test]
    fn test_cr_registration_ignores_tenor_and_restarts_per_series() {
        let series = vec![
            PricedTranche { number: 1, face_value: dec!(600_000_000), tenor_years: dec!(10) },
            PricedTranche { number: 2, face_value: dec!(400_000_000), tenor_years: dec!(10) },
        ];
        let item = compute_variable_fee(
            VariableFee::ReceivablesRegistration,
            dec!(1_000_000_000),
            &series,
            &FeeSchedule::default(),
        )
        .unwrap();
        // series 1: 500MM × 0.003% + 100MM × 0.002% = 15,000 + 2,000
        // series 2: 400MM × 0.003% = 12,000
        assert_eq!(item.upfront_net, dec!(29000));
        match item.details {
            Some(FeeDetails::Tiered { series }) => {
                assert_eq!(series.len(), 2);
                assert_eq!(series[0].value, dec!(17000));
                assert_eq!(series[1].value, dec!(12000));
                assert_eq!(series[1].tenor_years, Decimal::ONE);
            }
            other => panic!("expected tiered details, got {:?}", other),
        }
    }

    #[test]
    fn test_cvm_fee() {
        let item = compute_variable_fee(
            VariableFee::CvmOversight,
            dec!(50_000_000),
            &single(dec!(50_000_000), dec!(1)),
            &FeeSchedule::default(),
        )
        .unwrap();
        assert_eq!(item.upfront_net, dec!(15000));
        assert_eq!(item.formula, "0.03% × Volume Total da Oferta");
    }

    #[test]
    fn test_anbima_fees() {
        let schedule = FeeSchedule::default();
        let generic = compute_variable_fee(
            VariableFee::MarketAssociation,
            dec!(50_000_000),
            &single(dec!(50_000_000), dec!(1)),
            &schedule,
        )
        .unwrap();
        assert_eq!(generic.upfront_net, dec!(9919));

        let cri = compute_variable_fee(
            VariableFee::MarketAssociationRealEstate,
            dec!(200_000_000),
            &single(dec!(200_000_000), dec!(1)),
            &schedule,
        )
        .unwrap();
        assert_eq!(cri.upfront_net, dec!(2830));
        match cri.details {
            Some(FeeDetails::Capped(c)) => assert!(c.applied_max),
            other => panic!("expected capped details, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_rate_is_an_error() {
        let schedule = FeeSchedule {
            cvm_rate: Decimal::MAX,
            ..FeeSchedule::default()
        };
        let err = compute_variable_fee(
            VariableFee::CvmOversight,
            dec!(50_000_000),
            &single(dec!(50_000_000), dec!(1)),
            &schedule,
        )
        .unwrap_err();
        assert!(matches!(err, crate::error::PricingError::Overflow { .. }));
    }
}
