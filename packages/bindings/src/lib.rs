use chrono::{DateTime, Utc};
use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;

use issuance_pricing_core::api::CostRequest;
use issuance_pricing_core::pricing::RateTableSnapshot;
use issuance_pricing_core::proposal::{ProposalState, ProposalStatus};
use issuance_pricing_core::{Category, CollateralOrigin, OfferType, Vehicle};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse an optional snapshot; the built-in schedule applies without one.
fn snapshot(rate_tables_json: Option<String>) -> NapiResult<RateTableSnapshot> {
    match rate_tables_json {
        Some(json) => RateTableSnapshot::from_json(&json).map_err(to_napi_error),
        None => Ok(RateTableSnapshot::default()),
    }
}

// ---------------------------------------------------------------------------
// Issuance costs
// ---------------------------------------------------------------------------

/// Full computation output; errors are thrown as JS exceptions.
#[napi]
pub fn calculate_issuance_costs(
    request_json: String,
    rate_tables_json: Option<String>,
) -> NapiResult<String> {
    let request: CostRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let request = request.into_issuance_request().map_err(to_napi_error)?;
    let snapshot = snapshot(rate_tables_json)?;
    let output = issuance_pricing_core::pricing::calculate_issuance_costs(&request, &snapshot)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// `{success, data | error}` envelope; request errors never throw.
#[napi]
pub fn handle_cost_request(
    request_json: String,
    rate_tables_json: Option<String>,
) -> NapiResult<String> {
    let snapshot = snapshot(rate_tables_json)?;
    let response = issuance_pricing_core::api::handle_cost_request(&request_json, &snapshot);
    serde_json::to_string(&response).map_err(to_napi_error)
}

#[napi]
pub fn validate_rate_tables(rate_tables_json: String) -> NapiResult<Vec<String>> {
    let snapshot = RateTableSnapshot::from_json(&rate_tables_json).map_err(to_napi_error)?;
    Ok(snapshot.catalog_keys().map(|k| k.table_name()).collect())
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CombinationBindingInput {
    category: String,
    offer_type: Option<String>,
    vehicle: Option<String>,
    collateral_origin: Option<String>,
}

#[napi]
pub fn resolve_combination(input_json: String) -> NapiResult<String> {
    let input: CombinationBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let category: Category = input.category.parse().map_err(to_napi_error)?;
    let vehicle = match input.vehicle.as_deref() {
        Some(text) => Vehicle::classify(text).map_err(to_napi_error)?,
        None => None,
    };
    let origin = input
        .collateral_origin
        .as_deref()
        .map(str::parse::<CollateralOrigin>)
        .transpose()
        .map_err(to_napi_error)?;
    let combination = issuance_pricing_core::pricing::resolve(
        category,
        input.offer_type.as_deref().and_then(OfferType::classify),
        vehicle,
        origin,
    );
    serde_json::to_string(&combination).map_err(to_napi_error)
}

#[derive(serde::Deserialize)]
struct CappedBindingInput {
    volume: Decimal,
    rate: Decimal,
    min: Decimal,
    max: Decimal,
}

#[napi]
pub fn compute_capped(input_json: String) -> NapiResult<String> {
    let input: CappedBindingInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        issuance_pricing_core::pricing::compute_capped(input.volume, input.rate, input.min, input.max)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Decimal strings in and out, so no precision is lost crossing into JS.
#[napi]
pub fn gross_up(net: String, rate: String) -> NapiResult<String> {
    let net: Decimal = net.parse().map_err(to_napi_error)?;
    let rate: Decimal = rate.parse().map_err(to_napi_error)?;
    issuance_pricing_core::pricing::gross_up(net, rate)
        .map(|gross| gross.to_string())
        .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Proposal lifecycle
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransitionBindingInput {
    status: ProposalStatus,
    version: u32,
    next_status: ProposalStatus,
    reason: Option<String>,
    changed_at: DateTime<Utc>,
}

#[napi]
pub fn transition_proposal_status(input_json: String) -> NapiResult<String> {
    let input: TransitionBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let state = ProposalState {
        status: input.status,
        version: input.version,
    };
    let outcome = issuance_pricing_core::proposal::transition(
        state,
        input.next_status,
        input.changed_at,
        input.reason.as_deref(),
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&outcome).map_err(to_napi_error)
}
