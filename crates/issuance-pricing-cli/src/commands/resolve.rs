use clap::Args;
use serde_json::{json, Value};

use issuance_pricing_core::pricing::resolve;
use issuance_pricing_core::{Category, CollateralOrigin, OfferType, Vehicle};

/// Arguments for combination resolution
#[derive(Args)]
pub struct ResolveArgs {
    /// DEB, CRA, CRI, CR or NC
    #[arg(long)]
    pub category: String,

    /// Offer type as free text ("Oferta Pública", "privada cetipada", ...)
    #[arg(long)]
    pub offer: Option<String>,

    /// exclusive vehicle / segregated estate
    #[arg(long)]
    pub vehicle: Option<String>,

    /// origem or destinacao (CRI/CRA)
    #[arg(long)]
    pub origin: Option<String>,
}

pub fn run_resolve(args: ResolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let category: Category = args.category.parse()?;
    let offer_type = args.offer.as_deref().and_then(OfferType::classify);
    let vehicle = match args.vehicle.as_deref() {
        Some(text) => Vehicle::classify(text)?,
        None => None,
    };
    let origin = args
        .origin
        .as_deref()
        .map(str::parse::<CollateralOrigin>)
        .transpose()?;

    let combination = resolve(category, offer_type, vehicle, origin);
    Ok(json!({
        "category": category,
        "offer_type": offer_type,
        "primary_table": combination.primary.map(|k| k.table_name()),
        "vehicle_table": combination.vehicle_surcharge.map(|k| k.table_name()),
        "formula_set": combination.formula_set,
        "variable_fees": combination.formula_set.fees(),
    }))
}
