use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use offplan_core::quote::{build_quote, QuoteResult};
use offplan_core::recommendation::{recommend, ComparedQuote};
use offplan_core::schema;
use offplan_core::with_metadata;

use crate::input;

/// Arguments for multi-quote comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to a JSON/YAML document: { "quotes": [{ id, name, zone_maturity, inputs }] }
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct ComparisonDocument {
    quotes: Vec<QuoteEntry>,
}

#[derive(Deserialize)]
struct QuoteEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    zone_maturity: Decimal,
    inputs: Value,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let document = input::read_input(args.input.as_deref(), "a comparison")?;
    let doc: ComparisonDocument = serde_json::from_value(document)?;

    let mut warnings = Vec::new();
    let mut results: Vec<QuoteResult> = Vec::with_capacity(doc.quotes.len());
    for entry in &doc.quotes {
        let inputs = schema::load(entry.inputs.clone())
            .map_err(|e| format!("quote '{}': {}", entry.id, e))?;
        let mut quote_warnings = Vec::new();
        results.push(build_quote(&inputs, &mut quote_warnings)?);
        warnings.extend(
            quote_warnings
                .into_iter()
                .map(|w| format!("[{}] {}", entry.id, w)),
        );
    }

    let compared: Vec<ComparedQuote> = doc
        .quotes
        .iter()
        .zip(&results)
        .map(|(entry, result)| ComparedQuote {
            id: entry.id.clone(),
            name: entry.name.clone().unwrap_or_else(|| entry.id.clone()),
            zone_maturity: entry.zone_maturity,
            result,
        })
        .collect();

    let recommendation =
        recommend(&compared).ok_or("at least two quotes are required for a comparison")?;

    let output = with_metadata(
        "Multi-quote recommendation (min-max normalised ROI, safety and cashflow scores)",
        &serde_json::json!({
            "quotes": compared.len(),
            "weights": "0.4 / 0.3 / 0.3 per category",
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        recommendation,
    );
    Ok(serde_json::to_value(output)?)
}
