use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use capex_core::fees::{solve_circular_fee, StandardTable};
use capex_core::settings::EngineSettings;
use capex_core::MAX_MONEY;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn in_money_range(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= MAX_MONEY
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

#[napi]
pub fn estimate_investment(input_json: String) -> NapiResult<String> {
    let input: capex_core::estimate::EstimateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = capex_core::estimate::estimate_investment(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn quick_estimate(input_json: String) -> NapiResult<String> {
    let input: capex_core::estimate::EstimateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = capex_core::estimate::estimate_flat(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

#[napi]
pub fn loan_schedule(input_json: String) -> NapiResult<String> {
    let input: capex_core::financing::LoanScheduleInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = capex_core::financing::loan_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ManagementFeeInput {
    total_funding: Decimal,
    #[serde(default)]
    land_cost: Decimal,
    #[serde(default)]
    settings: EngineSettings,
}

#[napi]
pub fn management_fee(input_json: String) -> NapiResult<String> {
    let input: ManagementFeeInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    if !in_money_range(input.total_funding) || !in_money_range(input.land_cost) {
        return Err(to_napi_error(format!(
            "total_funding and land_cost must be in [0, {MAX_MONEY}]"
        )));
    }
    input.settings.validate().map_err(to_napi_error)?;
    let output = solve_circular_fee(
        input.total_funding,
        input.land_cost,
        &StandardTable::Management.schedule(),
        input.settings.circular_fee,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct FeeInput {
    table: StandardTable,
    value: Decimal,
}

#[napi]
pub fn evaluate_fee(input_json: String) -> NapiResult<String> {
    let input: FeeInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    if !in_money_range(input.value) {
        return Err(to_napi_error(format!("value must be in [0, {MAX_MONEY}]")));
    }
    let fee = input.table.schedule().evaluate(input.value);
    serde_json::to_string(&serde_json::json!({
        "table": input.table.name(),
        "value": input.value,
        "fee": fee,
    }))
    .map_err(to_napi_error)
}
