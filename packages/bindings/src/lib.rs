use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use offplan_core::quote::QuoteResult;
use offplan_core::recommendation::ComparedQuote;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn load_inputs(input_json: &str) -> NapiResult<offplan_core::InvestmentInputs> {
    let document: serde_json::Value = serde_json::from_str(input_json).map_err(to_napi_error)?;
    offplan_core::schema::load(document).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

#[napi]
pub fn quote_investment(input_json: String) -> NapiResult<String> {
    let inputs = load_inputs(&input_json)?;
    let output = offplan_core::quote::quote_investment(&inputs).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn payment_schedule(input_json: String) -> NapiResult<String> {
    let inputs = load_inputs(&input_json)?;
    let mut warnings = Vec::new();
    let quote =
        offplan_core::quote::build_quote(&inputs, &mut warnings).map_err(to_napi_error)?;
    serde_json::to_string(&quote.payment_schedule).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Mortgage
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AmortizeRequest {
    loan_amount: Decimal,
    interest_rate_pct: Decimal,
    term_years: u32,
    #[serde(default)]
    annual_insurance: Decimal,
}

#[napi]
pub fn amortize(input_json: String) -> NapiResult<String> {
    let req: AmortizeRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let schedule = offplan_core::mortgage::amortize_with_insurance(
        req.loan_amount,
        req.interest_rate_pct,
        req.term_years,
        req.annual_insurance,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CompareEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    zone_maturity: Decimal,
    inputs: serde_json::Value,
}

/// Takes `[{ id, name?, zone_maturity, inputs }]`; returns `null` for fewer
/// than two quotes.
#[napi]
pub fn recommend_quotes(input_json: String) -> NapiResult<String> {
    let entries: Vec<CompareEntry> = serde_json::from_str(&input_json).map_err(to_napi_error)?;

    let mut results: Vec<QuoteResult> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let inputs = offplan_core::schema::load(entry.inputs.clone()).map_err(to_napi_error)?;
        let mut warnings = Vec::new();
        results.push(
            offplan_core::quote::build_quote(&inputs, &mut warnings).map_err(to_napi_error)?,
        );
    }

    let compared: Vec<ComparedQuote> = entries
        .iter()
        .zip(&results)
        .map(|(e, result)| ComparedQuote {
            id: e.id.clone(),
            name: e.name.clone().unwrap_or_else(|| e.id.clone()),
            zone_maturity: e.zone_maturity,
            result,
        })
        .collect();

    let output = offplan_core::recommendation::recommend(&compared);
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[napi]
pub fn migrate_inputs(input_json: String) -> NapiResult<String> {
    let inputs = load_inputs(&input_json)?;
    let document = offplan_core::schema::stamp(&inputs).map_err(to_napi_error)?;
    serde_json::to_string(&document).map_err(to_napi_error)
}
