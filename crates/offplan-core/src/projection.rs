use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::appreciation::AppreciationCurve;
use crate::defaults;
use crate::error::OffplanError;
use crate::inputs::InvestmentInputs;
use crate::mortgage::AmortizationSchedule;
use crate::rental::{checked_growth_multiplier, RentalProjector};
use crate::types::Money;
use crate::OffplanResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionPhase {
    Construction,
    Handover,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyProjectionPoint {
    pub year: u32,
    pub calendar_year: i32,
    pub phase: ProjectionPhase,
    pub property_value: Money,
    pub gross_rent: Money,
    pub service_charges: Money,
    pub net_rent: Money,
    pub cumulative_net_income: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_gross_rent: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_net_rent: Option<Money>,
    pub mortgage_principal: Money,
    pub mortgage_interest: Money,
    pub mortgage_insurance: Money,
    pub mortgage_balance: Money,
}

/// Horizon in years: at least [`defaults::MIN_HORIZON_YEARS`], otherwise the
/// year handover completes plus the holding period.
pub fn horizon_years(handover_month: u32, holding_period_years: u32) -> u32 {
    (handover_month.div_ceil(12) + holding_period_years).max(defaults::MIN_HORIZON_YEARS)
}

/// Assemble the yearly projection for `inputs` over the default horizon.
pub fn assemble(inputs: &InvestmentInputs) -> OffplanResult<Vec<YearlyProjectionPoint>> {
    inputs.validate()?;
    let handover_month = inputs.handover_month()?;
    let curve = AppreciationCurve::new(inputs.effective_appreciation(), handover_month);
    let mortgage = mortgage_schedule(inputs)?;
    let horizon = horizon_years(handover_month, inputs.holding_period_years);
    check_growth_bounds(inputs, &curve, horizon)?;
    Ok(assemble_with(
        inputs,
        &curve,
        mortgage.as_ref(),
        handover_month,
        horizon,
    ))
}

/// Reject assumptions that compound out of the supported range within
/// `horizon` years.
pub(crate) fn check_growth_bounds(
    inputs: &InvestmentInputs,
    curve: &AppreciationCurve,
    horizon: u32,
) -> OffplanResult<()> {
    let values_in_range = curve
        .checked_yearly_values(inputs.base_price, horizon)
        .is_some_and(|values| values.iter().all(|v| v.abs() <= defaults::MAX_PROJECTED_VALUE));
    if !values_in_range {
        return Err(OffplanError::invalid(
            "appreciation",
            format!("Projected property value leaves the supported range within {horizon} years"),
        ));
    }

    let growth_rates = [
        ("rent.rent_growth_pct", Some(inputs.rent.rent_growth_pct)),
        (
            "rent.short_term.adr_growth_pct",
            inputs.rent.short_term.as_ref().map(|st| st.adr_growth_pct),
        ),
    ];
    for (field, rate) in growth_rates {
        let Some(rate) = rate else { continue };
        let in_range = checked_growth_multiplier(rate, horizon)
            .is_some_and(|m| m.abs() <= defaults::MAX_GROWTH_MULTIPLE);
        if !in_range {
            return Err(OffplanError::invalid(
                field,
                format!("Growth compounds out of the supported range within {horizon} years"),
            ));
        }
    }
    Ok(())
}

/// The amortisation schedule for the inputs' mortgage, if financing is on.
pub fn mortgage_schedule(inputs: &InvestmentInputs) -> OffplanResult<Option<AmortizationSchedule>> {
    if !inputs.mortgage.enabled {
        return Ok(None);
    }
    let loan = inputs
        .mortgage
        .loan_amount(inputs.base_price, inputs.payment_plan.pre_handover_pct);
    inputs.mortgage.schedule(loan).map(Some)
}

/// Assemble from already-built components. `handover_month` must match the
/// curve's construction period.
///
/// Year `i` covers months `[(i-1)*12, i*12)` after booking. Cumulative net
/// income is rebuilt from zero on every call.
pub fn assemble_with(
    inputs: &InvestmentInputs,
    curve: &AppreciationCurve,
    mortgage: Option<&AmortizationSchedule>,
    handover_month: u32,
    horizon: u32,
) -> Vec<YearlyProjectionPoint> {
    let values = curve.yearly_values(inputs.base_price, horizon);
    let mut projector = RentalProjector::new(
        &inputs.rent,
        inputs.base_price,
        inputs.unit_size_sqft,
        handover_month,
    );
    if let Some(&start) = values.get(projector.first_rental_year() as usize - 1) {
        projector = projector.with_start_value(start);
    }

    let mut points = Vec::with_capacity(horizon as usize);
    let mut cumulative = Decimal::ZERO;

    for (idx, property_value) in values.into_iter().enumerate() {
        let year = idx as u32 + 1;
        let rent = projector.project_year(year, property_value);
        cumulative += rent.net_rent;

        let phase = if year * 12 <= handover_month {
            ProjectionPhase::Construction
        } else if (year - 1) * 12 <= handover_month {
            ProjectionPhase::Handover
        } else {
            ProjectionPhase::Hold
        };

        let loan = mortgage
            .map(|m| mortgage_for_year(m, year, handover_month))
            .unwrap_or_default();

        points.push(YearlyProjectionPoint {
            year,
            calendar_year: inputs.booking_year + idx as i32,
            phase,
            property_value,
            gross_rent: rent.gross_rent,
            service_charges: rent.service_charges,
            net_rent: rent.net_rent,
            cumulative_net_income: cumulative,
            alt_gross_rent: rent.alt_gross_rent,
            alt_net_rent: rent.alt_net_rent,
            mortgage_principal: loan.principal,
            mortgage_interest: loan.interest,
            mortgage_insurance: loan.insurance,
            mortgage_balance: loan.balance,
        });
    }

    points
}

#[derive(Debug, Default)]
struct YearLoan {
    principal: Money,
    interest: Money,
    insurance: Money,
    balance: Money,
}

/// Mortgage month `k` (1-based) is the k-th month after handover and falls
/// in projection year `(handover_month + k - 1) / 12 + 1`.
fn mortgage_for_year(schedule: &AmortizationSchedule, year: u32, handover_month: u32) -> YearLoan {
    let year_end = year * 12;
    if year_end <= handover_month || schedule.months.is_empty() {
        return YearLoan::default();
    }

    let year_start = (year - 1) * 12;
    let first_k = year_start.saturating_sub(handover_month) + 1;
    let last_k = (year_end - handover_month).min(schedule.term_months);

    if first_k > last_k {
        // Loan fully repaid before this year
        return YearLoan::default();
    }

    let months = &schedule.months[(first_k - 1) as usize..last_k as usize];
    let principal = months.iter().map(|m| m.principal).sum();
    let interest = months.iter().map(|m| m.interest).sum();
    let insurance =
        schedule.annual_insurance * Decimal::from(last_k - first_k + 1) / dec!(12);

    YearLoan {
        principal,
        interest,
        insurance,
        balance: schedule.balance_after(last_k),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appreciation::AppreciationRates;
    use crate::mortgage::MortgageInputs;

    fn scenario_inputs() -> InvestmentInputs {
        let mut inputs = InvestmentInputs::new(dec!(1000000), (2025, 3), (2027, 1));
        inputs.appreciation = AppreciationRates {
            construction_pct: dec!(10),
            growth_pct: dec!(6),
            mature_pct: dec!(3),
            growth_period_years: 5,
        };
        inputs.rent.rental_yield_pct = dec!(7);
        inputs.rent.service_charge_per_sqft = dec!(15);
        inputs.unit_size_sqft = dec!(1000);
        inputs
    }

    #[test]
    fn test_horizon_floor_and_extension() {
        assert_eq!(horizon_years(24, 5), 10);
        assert_eq!(horizon_years(24, 10), 12);
        assert_eq!(horizon_years(30, 10), 13);
    }

    #[test]
    fn test_phases_and_calendar_years() {
        let points = assemble(&scenario_inputs()).unwrap();
        assert_eq!(points.len(), 12);
        assert_eq!(points[0].phase, ProjectionPhase::Construction);
        assert_eq!(points[1].phase, ProjectionPhase::Construction);
        assert_eq!(points[2].phase, ProjectionPhase::Handover);
        assert_eq!(points[3].phase, ProjectionPhase::Hold);
        assert_eq!(points[0].calendar_year, 2025);
        assert_eq!(points[11].calendar_year, 2036);
    }

    #[test]
    fn test_value_and_first_rent() {
        let points = assemble(&scenario_inputs()).unwrap();
        assert_eq!(points[1].property_value, dec!(1210000));
        assert_eq!(points[2].gross_rent, dec!(70000));
        assert_eq!(points[2].net_rent, dec!(55000));
        assert_eq!(points[1].cumulative_net_income, Decimal::ZERO);
    }

    #[test]
    fn test_cumulative_reconciles_with_deltas() {
        let points = assemble(&scenario_inputs()).unwrap();
        let mut prev = Decimal::ZERO;
        for p in &points {
            assert_eq!(p.cumulative_net_income, prev + p.net_rent);
            prev = p.cumulative_net_income;
        }
    }

    #[test]
    fn test_years_strictly_increasing() {
        let points = assemble(&scenario_inputs()).unwrap();
        for pair in points.windows(2) {
            assert_eq!(pair[1].year, pair[0].year + 1);
        }
    }

    #[test]
    fn test_mortgage_starts_after_handover() {
        let mut inputs = scenario_inputs();
        inputs.mortgage = MortgageInputs {
            enabled: true,
            financing_pct: dec!(75),
            interest_rate_pct: Decimal::ZERO,
            term_years: 25,
            ..MortgageInputs::default()
        };
        let points = assemble(&inputs).unwrap();

        // 600,000 over 300 months = 2,000/mo
        assert_eq!(points[1].mortgage_principal, Decimal::ZERO);
        assert_eq!(points[1].mortgage_balance, Decimal::ZERO);
        assert_eq!(points[2].mortgage_principal, dec!(24000));
        assert_eq!(points[2].mortgage_balance, dec!(576000));
    }

    #[test]
    fn test_mid_year_handover_splits_mortgage_year() {
        let mut inputs = scenario_inputs();
        // Booking Sep 2025, handover Q1 2027 (March): 18 months
        inputs.booking_month = 9;
        inputs.mortgage = MortgageInputs {
            enabled: true,
            financing_pct: dec!(75),
            interest_rate_pct: Decimal::ZERO,
            term_years: 25,
            ..MortgageInputs::default()
        };
        let points = assemble(&inputs).unwrap();

        // Year 2 covers months 12-24: six mortgage months
        assert_eq!(points[1].mortgage_principal, dec!(12000));
        assert_eq!(points[1].mortgage_balance, dec!(588000));
        assert_eq!(points[2].mortgage_principal, dec!(24000));
    }

    #[test]
    fn test_property_value_basis_anchors_at_first_rental_year() {
        let mut inputs = scenario_inputs();
        inputs.rent.yield_basis = crate::rental::YieldBasis::PropertyValue;
        inputs.rent.rent_growth_pct = dec!(5);
        let points = assemble(&inputs).unwrap();

        // 1,282,600 * 7%, then grown by rent growth, not by appreciation
        assert_eq!(points[2].gross_rent, dec!(89782));
        assert_eq!(points[3].gross_rent, dec!(94271.1));
    }

    #[test]
    fn test_runaway_growth_rejected() {
        let mut inputs = scenario_inputs();
        inputs.appreciation.mature_pct = dec!(400);
        inputs.holding_period_years = 100;
        match assemble(&inputs) {
            Err(OffplanError::InvalidInput { field, .. }) => assert_eq!(field, "appreciation"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }

        let mut inputs = scenario_inputs();
        inputs.rent.rent_growth_pct = dec!(300);
        match assemble(&inputs) {
            Err(OffplanError::InvalidInput { field, .. }) => {
                assert_eq!(field, "rent.rent_growth_pct")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let inputs = scenario_inputs();
        assert_eq!(assemble(&inputs).unwrap(), assemble(&inputs).unwrap());
    }
}
