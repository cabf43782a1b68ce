//! JSON request/response boundary for the cost calculation. Requests carry
//! free-text classification fields; responses are always a structured
//! envelope, never an error escaping to the caller.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PricingError;
use crate::pricing::aggregate::CostSummary;
use crate::pricing::line_item::FeeLineItem;
use crate::pricing::quote::{calculate_issuance_costs, SeriesCost};
use crate::pricing::registry::RateTableSnapshot;
use crate::types::*;
use crate::PricingResult;

/// Cost request as received over the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct CostRequest {
    #[serde(alias = "categoria")]
    pub category: String,
    #[serde(default, rename = "offerType", alias = "offer_type", alias = "tipo_oferta", alias = "oferta")]
    pub offer_type: Option<String>,
    #[serde(default, alias = "veiculo")]
    pub vehicle: Option<String>,
    #[serde(
        default,
        rename = "collateralOrigin",
        alias = "collateral_origin",
        alias = "lastro"
    )]
    pub collateral_origin: Option<String>,
    pub volume: Money,
    #[serde(default)]
    pub series: Vec<Tranche>,
    #[serde(default, alias = "prazo")]
    pub tenor: Option<Years>,
}

impl CostRequest {
    /// Classify the free-text fields. An unknown category or vehicle is a
    /// caller error; unrecognised offer text resolves to no cost table.
    pub fn into_issuance_request(self) -> PricingResult<IssuanceRequest> {
        let category: Category = self.category.parse()?;
        let offer_type = self.offer_type.as_deref().and_then(OfferType::classify);
        let vehicle = match self.vehicle.as_deref() {
            Some(text) => Vehicle::classify(text)?,
            None => None,
        };
        let collateral_origin = match self.collateral_origin.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(text.parse::<CollateralOrigin>()?),
            _ => None,
        };

        Ok(IssuanceRequest {
            category,
            offer_type,
            vehicle,
            collateral_origin,
            total_volume: self.volume,
            series: self.series,
            tenor_years: self.tenor,
        })
    }
}

/// Payload of a successful response, in the source system's field names.
#[derive(Debug, Clone, Serialize)]
pub struct CostData {
    pub custos: Vec<FeeLineItem>,
    pub totais: CostSummary,
    pub tabela_origem: Option<String>,
    pub series: Vec<SeriesCost>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CostData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// HTTP-equivalent status, for transports that need one
    #[serde(skip)]
    pub status: u16,
}

impl ApiResponse {
    fn ok(data: CostData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: 200,
        }
    }

    fn failure(err: &PricingError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            status: err.status_code(),
        }
    }
}

/// Parse, price and wrap a JSON cost request.
pub fn handle_cost_request(json: &str, snapshot: &RateTableSnapshot) -> ApiResponse {
    match price_request(json, snapshot) {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => {
            warn!(status = e.status_code(), error = %e, "cost request failed");
            ApiResponse::failure(&e)
        }
    }
}

fn price_request(json: &str, snapshot: &RateTableSnapshot) -> PricingResult<CostData> {
    let request: CostRequest = serde_json::from_str(json)?;
    let request = request.into_issuance_request()?;
    let output = calculate_issuance_costs(&request, snapshot)?;
    let result = output.result;
    Ok(CostData {
        custos: result.costs,
        totais: result.totals,
        tabela_origem: result.source_table,
        series: result.series_costs,
    })
}
