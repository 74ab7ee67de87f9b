use std::collections::BTreeSet;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::appreciation::{AppreciationCurve, AppreciationRates};
use crate::defaults;
use crate::exit::{default_exit_months, ExitAnalyzer, ExitScenario};
use crate::inputs::InvestmentInputs;
use crate::mortgage::{coverage_ratio, AmortizationSchedule, MortgageFees};
use crate::payment_schedule::{build_schedule, EntryCosts, PaymentSchedule};
use crate::projection::{
    assemble_with, check_growth_bounds, horizon_years, mortgage_schedule, YearlyProjectionPoint,
};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Years};
use crate::OffplanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Headline figures derived from the full quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub base_price: Money,
    /// Months from booking to handover
    pub handover_month: u32,
    pub construction_years: u32,
    pub horizon_years: u32,
    /// Phase rates after differentiators
    pub appreciation: AppreciationRates,
    pub pre_handover_pct: Percent,
    pub entry_costs: EntryCosts,
    pub loan_amount: Money,
    pub mortgage_fees: MortgageFees,
    pub monthly_mortgage_payment: Money,
    /// Net rent of the first full rental year
    pub stabilized_net_rent: Money,
    /// Monthly stabilized rent over the monthly mortgage payment
    pub coverage_ratio_pct: Option<Percent>,
    /// Own cash over the life of the plan: payments + entry costs - loan + mortgage fees
    pub total_cash_required: Money,
    pub rental_yield_on_equity_pct: Option<Percent>,
    /// Years from booking until cumulative net rent covers the cash required
    pub years_to_break_even: Option<Years>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResult {
    pub summary: QuoteSummary,
    pub payment_schedule: PaymentSchedule,
    pub projection: Vec<YearlyProjectionPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mortgage: Option<AmortizationSchedule>,
    pub exit_scenarios: Vec<ExitScenario>,
}

impl QuoteResult {
    pub fn scenario_at(&self, exit_month: u32) -> Option<&ExitScenario> {
        self.exit_scenarios.iter().find(|s| s.exit_month == exit_month)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every stage of the quote: schedule, curve, mortgage, projection and
/// exit scenarios.
pub fn quote_investment(
    inputs: &InvestmentInputs,
) -> OffplanResult<ComputationOutput<QuoteResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = build_quote(inputs, &mut warnings)?;

    tracing::debug!(
        base_price = %inputs.base_price,
        handover_month = result.summary.handover_month,
        horizon = result.summary.horizon_years,
        drift_pct = %result.payment_schedule.drift_pct,
        warnings = warnings.len(),
        "quote assembled"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Off-plan investment quote (phased appreciation, staged payments, rental and mortgage projection, exit analysis)",
        &serde_json::json!({
            "base_price": inputs.base_price.to_string(),
            "booking": format!("{}-{:02}", inputs.booking_year, inputs.booking_month),
            "handover": format!("Q{} {}", inputs.handover_quarter, inputs.handover_year),
            "holding_period_years": inputs.holding_period_years,
            "rental_strategy": format!("{:?}", inputs.rent.strategy),
            "mortgage_enabled": inputs.mortgage.enabled,
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Build the quote without the metadata envelope. Non-fatal anomalies are
/// appended to `warnings`.
pub fn build_quote(
    inputs: &InvestmentInputs,
    warnings: &mut Vec<String>,
) -> OffplanResult<QuoteResult> {
    inputs.validate()?;

    let handover_month = inputs.handover_month()?;
    let rates = inputs.effective_appreciation();
    let curve = AppreciationCurve::new(rates.clone(), handover_month);

    let payment_schedule = build_schedule(
        &inputs.payment_plan,
        inputs.base_price,
        inputs.booking_date()?,
        inputs.handover_date()?,
        warnings,
    );
    let entry_costs = EntryCosts::compute(&inputs.entry_costs, inputs.base_price);

    let mortgage = mortgage_schedule(inputs)?;
    let loan_amount = mortgage
        .as_ref()
        .map(|m| m.loan_amount)
        .unwrap_or(Decimal::ZERO);
    if inputs.mortgage.enabled && loan_amount.is_zero() {
        warnings.push("Mortgage enabled but nothing is left to finance at handover".into());
    }
    let mortgage_fees = inputs.mortgage.upfront_fees(loan_amount);

    let exit_months = exit_months_for(inputs, handover_month);
    let furthest_exit_year = exit_months.last().copied().unwrap_or(0).div_ceil(12);
    let horizon = horizon_years(handover_month, inputs.holding_period_years).max(furthest_exit_year);
    check_growth_bounds(inputs, &curve, horizon)?;

    let projection = assemble_with(inputs, &curve, mortgage.as_ref(), handover_month, horizon);

    let mut analyzer = ExitAnalyzer::new(
        &projection,
        &payment_schedule,
        &curve,
        inputs.base_price,
        entry_costs.total,
        &inputs.exit_costs,
    );
    if let Some(m) = mortgage.as_ref() {
        analyzer = analyzer.with_mortgage(m, mortgage_fees.total);
    }
    let exit_scenarios = analyzer.analyze_many(&exit_months);

    for s in exit_scenarios.iter().filter(|s| !s.meets_exit_threshold) {
        warnings.push(format!(
            "Exit at month {}: {}% paid, below the {}% resale threshold",
            s.exit_month, s.paid_pct, inputs.exit_costs.min_exit_threshold_pct
        ));
    }

    let stabilized_net_rent = stabilized_net_rent(&projection, handover_month);
    let monthly_mortgage_payment = mortgage
        .as_ref()
        .map(|m| m.monthly_payment)
        .unwrap_or(Decimal::ZERO);
    let coverage_ratio_pct = coverage_ratio(stabilized_net_rent / dec!(12), monthly_mortgage_payment);

    let total_cash_required =
        payment_schedule.total_amount + entry_costs.total - loan_amount + mortgage_fees.total;
    let rental_yield_on_equity_pct = if total_cash_required > Decimal::ZERO {
        Some(stabilized_net_rent / total_cash_required * dec!(100))
    } else {
        None
    };
    let years_to_break_even = years_to_break_even(&projection, total_cash_required);

    let summary = QuoteSummary {
        base_price: inputs.base_price,
        handover_month,
        construction_years: curve.construction_years(),
        horizon_years: horizon,
        appreciation: rates,
        pre_handover_pct: inputs.payment_plan.pre_handover_pct,
        entry_costs,
        loan_amount,
        mortgage_fees,
        monthly_mortgage_payment,
        stabilized_net_rent,
        coverage_ratio_pct,
        total_cash_required,
        rental_yield_on_equity_pct,
        years_to_break_even,
    };

    Ok(QuoteResult {
        summary,
        payment_schedule,
        projection,
        mortgage,
        exit_scenarios,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Requested exit months (or the defaults), always including the reference
/// points used when quotes are compared.
fn exit_months_for(inputs: &InvestmentInputs, handover_month: u32) -> Vec<u32> {
    let mut months: BTreeSet<u32> = if inputs.exit_months.is_empty() {
        default_exit_months(handover_month).into_iter().collect()
    } else {
        inputs.exit_months.iter().copied().collect()
    };
    months.insert(defaults::REFERENCE_EXIT_MONTH);
    months.insert(defaults::LONG_HORIZON_EXIT_MONTH);
    months.into_iter().collect()
}

fn stabilized_net_rent(projection: &[YearlyProjectionPoint], handover_month: u32) -> Money {
    // First year starting on or after handover
    let first_full_year = handover_month.div_ceil(12) + 1;
    projection
        .get(first_full_year as usize - 1)
        .map(|p| p.net_rent)
        .unwrap_or(Decimal::ZERO)
}

/// Fractional years until cumulative net rent reaches `cash`; `None` when it
/// never does inside the projection.
fn years_to_break_even(projection: &[YearlyProjectionPoint], cash: Money) -> Option<Years> {
    if cash <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    let mut banked = Decimal::ZERO;
    for point in projection {
        if point.cumulative_net_income >= cash && point.net_rent > Decimal::ZERO {
            let fraction = (cash - banked) / point.net_rent;
            return Some(Decimal::from(point.year - 1) + fraction);
        }
        banked = point.cumulative_net_income;
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
