use std::time::Instant;

use clap::Args;
use serde_json::Value;

use offplan_core::inputs::InvestmentInputs;
use offplan_core::quote::{build_quote, quote_investment};
use offplan_core::schema;
use offplan_core::with_metadata;

use crate::input;

/// Arguments shared by every command that quotes a single unit
#[derive(Args)]
pub struct QuoteArgs {
    /// Path to a JSON/YAML input document (versioned or bare inputs)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for exit scenario analysis
#[derive(Args)]
pub struct ExitArgs {
    /// Path to a JSON/YAML input document
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated exit months after booking (e.g. "24,36,60")
    #[arg(long, value_delimiter = ',')]
    pub months: Option<Vec<u32>>,
}

fn load_inputs(path: Option<&str>, what: &str) -> Result<InvestmentInputs, Box<dyn std::error::Error>> {
    let document = input::read_input(path, what)?;
    Ok(schema::load(document)?)
}

pub fn run_quote(args: QuoteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let inputs = load_inputs(args.input.as_deref(), "a quote")?;
    let result = quote_investment(&inputs)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: QuoteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let inputs = load_inputs(args.input.as_deref(), "a payment schedule")?;
    let mut warnings = Vec::new();
    let quote = build_quote(&inputs, &mut warnings)?;
    let schedule = quote.payment_schedule;

    let output = with_metadata(
        "Payment schedule (booking, milestones, handover, post-handover)",
        &serde_json::json!({
            "base_price": inputs.base_price.to_string(),
            "total_pct": schedule.total_pct.to_string(),
            "drift_pct": schedule.drift_pct.to_string(),
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        schedule.entries,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_projection(args: QuoteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let inputs = load_inputs(args.input.as_deref(), "a yearly projection")?;
    let mut warnings = Vec::new();
    let quote = build_quote(&inputs, &mut warnings)?;

    let output = with_metadata(
        "Yearly projection (value, rent, mortgage)",
        &serde_json::json!({
            "handover_month": quote.summary.handover_month,
            "horizon_years": quote.summary.horizon_years,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        quote.projection,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_exit(args: ExitArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut inputs = load_inputs(args.input.as_deref(), "exit analysis")?;
    if let Some(months) = args.months {
        inputs.exit_months = months;
    }
    let mut warnings = Vec::new();
    let quote = build_quote(&inputs, &mut warnings)?;

    let output = with_metadata(
        "Exit scenarios (equity, net sale proceeds, rent, ROE)",
        &serde_json::json!({
            "exit_months": quote
                .exit_scenarios
                .iter()
                .map(|s| s.exit_month)
                .collect::<Vec<_>>(),
            "agent_commission_pct": inputs.exit_costs.agent_commission_pct.to_string(),
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        quote.exit_scenarios,
    );
    Ok(serde_json::to_value(output)?)
}
