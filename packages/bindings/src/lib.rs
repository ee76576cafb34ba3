use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use realty_waterfall_core::waterfall::engine::{self, DistributionInput};
use realty_waterfall_core::waterfall::netting::{self, RefinanceInput};
use realty_waterfall_core::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Scenario plus optional engine settings, passed as one JSON document.
#[derive(Deserialize)]
struct ComputeRequest {
    #[serde(flatten)]
    input: DistributionInput,
    #[serde(default)]
    config: EngineConfig,
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_distribution(input_json: String) -> NapiResult<String> {
    let request: ComputeRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        engine::compute_distribution(&request.input, &request.config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn net_refinance(input_json: String) -> NapiResult<String> {
    let input: RefinanceInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        netting::net_refinance(&input.terms, input.current_debt).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
