use clap::Args;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

use issuance_pricing_core::pricing::RateTableSnapshot;

use crate::config::PricerConfig;
use crate::input;

/// Arguments for rate-table validation
#[derive(Args)]
pub struct ValidateTablesArgs {
    /// Path to a JSON or YAML rate-table snapshot (defaults to the configured one)
    #[arg(long)]
    pub rate_tables: Option<String>,
}

/// Load the snapshot named by `path`, or the built-in schedule with no
/// catalogs when there is none.
pub fn load_snapshot(path: Option<&Path>) -> Result<RateTableSnapshot, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        debug!("no rate tables configured, using built-in schedule");
        return Ok(RateTableSnapshot::default());
    };
    let path_str = path
        .to_str()
        .ok_or_else(|| format!("Rate table path is not valid UTF-8: {}", path.display()))?;
    let value = input::file::read_json_value(path_str)?;
    let snapshot = RateTableSnapshot::from_json(&value.to_string())
        .map_err(|e| format!("Invalid rate tables '{}': {}", path.display(), e))?;
    info!(path = %path.display(), "rate tables loaded");
    Ok(snapshot)
}

pub fn run_validate_tables(
    args: ValidateTablesArgs,
    config: &PricerConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let path = args
        .rate_tables
        .map(std::path::PathBuf::from)
        .or_else(|| config.rate_tables.clone())
        .ok_or("--rate-tables <file> or a configured rate_tables path required")?;

    let snapshot = load_snapshot(Some(&path))?;
    let catalogs: Vec<Value> = snapshot
        .catalog_keys()
        .map(|key| {
            json!({
                "table": key.table_name(),
                "rows": snapshot.rows(key).len(),
                "active_rows": snapshot.rows(key).iter().filter(|r| r.active).count(),
            })
        })
        .collect();
    let schedule = snapshot.schedule();

    Ok(json!({
        "valid": true,
        "path": path.display().to_string(),
        "catalogs": catalogs,
        "bracket_tables": [
            schedule.deb_custody.name,
            schedule.cr_registration.name,
            schedule.deb_registration_public.name,
            schedule.deb_registration_private.name,
        ],
    }))
}
