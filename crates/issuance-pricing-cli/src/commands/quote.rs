use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

use issuance_pricing_core::api::{handle_cost_request, CostRequest};
use issuance_pricing_core::pricing::calculate_issuance_costs;

use crate::commands::tables::load_snapshot;
use crate::config::PricerConfig;
use crate::input;

/// Arguments for a full issuance quote
#[derive(Args)]
pub struct QuoteArgs {
    /// Path to JSON or YAML request file (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Rate-table snapshot overriding the configured one
    #[arg(long)]
    pub rate_tables: Option<PathBuf>,

    /// Emit the `{success, data | error}` response envelope instead of the
    /// detailed computation output
    #[arg(long)]
    pub envelope: bool,
}

pub fn run_quote(args: QuoteArgs, config: &PricerConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let request = input::read_input(args.input.as_deref(), "issuance quote")?;
    let tables = args.rate_tables.or_else(|| config.rate_tables.clone());
    let snapshot = load_snapshot(tables.as_deref())?;

    if args.envelope {
        let response = handle_cost_request(&request.to_string(), &snapshot);
        return Ok(serde_json::to_value(response)?);
    }

    let wire: CostRequest = serde_json::from_value(request)?;
    let issuance = wire.into_issuance_request()?;
    let result = calculate_issuance_costs(&issuance, &snapshot)?;
    Ok(serde_json::to_value(result)?)
}
