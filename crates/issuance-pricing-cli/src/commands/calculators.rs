use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use issuance_pricing_core::pricing::gross_up::{gross_up, normalize_gross_up_rate};
use issuance_pricing_core::pricing::{compute_capped, BracketTable, FeeSchedule};
use issuance_pricing_core::normalize_label;

use crate::commands::tables::load_snapshot;
use crate::config::PricerConfig;

/// Arguments for a progressive-bracket calculation
#[derive(Args)]
pub struct TieredArgs {
    /// Amount to price (e.g. 50000000)
    #[arg(long)]
    pub amount: Decimal,

    /// Bracket table: deb-custody, cr-registration, deb-registration-public,
    /// deb-registration-private (or the table's own name)
    #[arg(long, default_value = "deb-custody")]
    pub table: String,

    /// Tenor multiplier in years
    #[arg(long)]
    pub tenor: Option<Decimal>,
}

/// Arguments for a capped percentage-of-volume fee
#[derive(Args)]
pub struct CappedArgs {
    #[arg(long)]
    pub volume: Decimal,

    /// Rate as a fraction (e.g. 0.00002778)
    #[arg(long)]
    pub rate: Decimal,

    #[arg(long)]
    pub min: Decimal,

    #[arg(long)]
    pub max: Decimal,
}

/// Arguments for a gross-up
#[derive(Args)]
pub struct GrossUpArgs {
    #[arg(long)]
    pub net: Decimal,

    /// Deduction rate, as a fraction (0.1215) or percentage points (12.15)
    #[arg(long)]
    pub rate: Decimal,
}

fn find_table<'a>(schedule: &'a FeeSchedule, name: &str) -> Option<&'a BracketTable> {
    let wanted = normalize_label(name);
    let tables = [
        ("deb_custody", &schedule.deb_custody),
        ("cr_registration", &schedule.cr_registration),
        ("deb_registration_public", &schedule.deb_registration_public),
        ("deb_registration_private", &schedule.deb_registration_private),
    ];
    tables
        .into_iter()
        .find(|(alias, table)| *alias == wanted || table.name == wanted)
        .map(|(_, table)| table)
}

pub fn run_tiered(args: TieredArgs, config: &PricerConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(config.rate_tables.as_deref())?;
    let table = find_table(snapshot.schedule(), &args.table)
        .ok_or_else(|| format!("Unknown bracket table '{}'", args.table))?;
    let result = table.compute_with_tenor(args.amount, args.tenor.unwrap_or(Decimal::ONE))?;
    Ok(json!({
        "table": table.name,
        "amount": args.amount,
        "result": result,
    }))
}

pub fn run_capped(args: CappedArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let result = compute_capped(args.volume, args.rate, args.min, args.max)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_gross_up(args: GrossUpArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.net.is_sign_negative() {
        return Err("--net cannot be negative".into());
    }
    let gross = gross_up(args.net, args.rate)?;
    Ok(json!({
        "net": args.net,
        "rate": normalize_gross_up_rate(args.rate),
        "gross": gross,
    }))
}
