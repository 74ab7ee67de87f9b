use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use offplan_core::mortgage::{amortize_with_insurance, MortgageYear};
use offplan_core::with_metadata;

/// Arguments for a standalone amortisation schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Loan amount
    #[arg(long)]
    pub loan: Decimal,

    /// Annual interest rate in percent (e.g. 4.5)
    #[arg(long)]
    pub rate: Decimal,

    /// Term in years
    #[arg(long, default_value = "25")]
    pub term: u32,

    /// Annual life insurance, percent of the loan
    #[arg(long, default_value = "0")]
    pub life_insurance_pct: Decimal,

    /// Annual property insurance premium
    #[arg(long, default_value = "0")]
    pub property_insurance: Decimal,
}

#[derive(Debug, Serialize)]
struct AmortizeOutput {
    loan_amount: Decimal,
    monthly_payment: Decimal,
    term_months: u32,
    annual_insurance: Decimal,
    total_interest: Decimal,
    total_principal: Decimal,
    years: Vec<MortgageYear>,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let annual_insurance =
        args.loan * args.life_insurance_pct / Decimal::ONE_HUNDRED + args.property_insurance;
    let schedule = amortize_with_insurance(args.loan, args.rate, args.term, annual_insurance)?;

    let output = with_metadata(
        "Fixed-rate amortisation with yearly rollup",
        &serde_json::json!({
            "loan": args.loan.to_string(),
            "rate_pct": args.rate.to_string(),
            "term_years": args.term,
        }),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        AmortizeOutput {
            loan_amount: schedule.loan_amount,
            monthly_payment: schedule.monthly_payment,
            term_months: schedule.term_months,
            annual_insurance: schedule.annual_insurance,
            total_interest: schedule.total_interest,
            total_principal: schedule.total_principal,
            years: schedule.years,
        },
    );
    Ok(serde_json::to_value(output)?)
}
