use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::appreciation::AppreciationCurve;
use crate::calendar;
use crate::defaults;
use crate::mortgage::AmortizationSchedule;
use crate::payment_schedule::PaymentSchedule;
use crate::projection::YearlyProjectionPoint;
use crate::types::{Money, Percent};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitCostAssumptions {
    pub agent_commission_enabled: bool,
    pub agent_commission_pct: Percent,
    /// Developer no-objection certificate fee
    pub noc_fee: Money,
    /// Share of the price most developers require paid before a resale
    pub min_exit_threshold_pct: Percent,
}

impl Default for ExitCostAssumptions {
    fn default() -> Self {
        Self {
            agent_commission_enabled: true,
            agent_commission_pct: defaults::AGENT_COMMISSION_PCT,
            noc_fee: Decimal::ZERO,
            min_exit_threshold_pct: defaults::MIN_EXIT_THRESHOLD_PCT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitScenario {
    pub exit_month: u32,
    pub exit_date: NaiveDate,
    pub equity_invested: Money,
    pub property_value: Money,
    pub exit_costs: Money,
    pub outstanding_developer_balance: Money,
    pub outstanding_mortgage: Money,
    pub net_sale_proceeds: Money,
    pub cumulative_rent: Money,
    pub financing_costs: Money,
    pub total_profit: Money,
    /// Profit over equity; `None` when no equity is at risk
    pub roe_pct: Option<Percent>,
    pub annualized_roe_pct: Option<Percent>,
    /// Percent of price paid to the developer by the exit month
    pub paid_pct: Percent,
    pub meets_exit_threshold: bool,
}

#[derive(Debug, Clone, Copy)]
struct MortgageContext<'a> {
    schedule: &'a AmortizationSchedule,
    upfront_fees: Money,
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExitAnalyzer<'a> {
    projection: &'a [YearlyProjectionPoint],
    schedule: &'a PaymentSchedule,
    curve: &'a AppreciationCurve,
    base_price: Money,
    entry_costs: Money,
    costs: &'a ExitCostAssumptions,
    mortgage: Option<MortgageContext<'a>>,
}

impl<'a> ExitAnalyzer<'a> {
    /// `entry_costs` is the total of one-off fees paid at booking.
    pub fn new(
        projection: &'a [YearlyProjectionPoint],
        schedule: &'a PaymentSchedule,
        curve: &'a AppreciationCurve,
        base_price: Money,
        entry_costs: Money,
        costs: &'a ExitCostAssumptions,
    ) -> Self {
        Self {
            projection,
            schedule,
            curve,
            base_price,
            entry_costs,
            costs,
            mortgage: None,
        }
    }

    /// Account for a mortgage disbursed at handover.
    pub fn with_mortgage(mut self, schedule: &'a AmortizationSchedule, upfront_fees: Money) -> Self {
        if !schedule.loan_amount.is_zero() {
            self.mortgage = Some(MortgageContext {
                schedule,
                upfront_fees,
            });
        }
        self
    }

    pub fn analyze(&self, exit_month: u32) -> ExitScenario {
        let handover_month = self.schedule.construction_months;

        let paid = self.schedule.paid_by_month(exit_month);
        let paid_pct = self.schedule.paid_pct_by_month(exit_month);
        let outstanding_developer_balance = self
            .schedule
            .outstanding_after_month(exit_month)
            .max(Decimal::ZERO);

        let mut equity_invested = paid + self.entry_costs;
        let mut outstanding_mortgage = Decimal::ZERO;
        let mut financing_costs = Decimal::ZERO;

        if let Some(m) = self.mortgage.filter(|_| exit_month >= handover_month) {
            // The bank pays its share of the handover payment
            let months_paid = exit_month - handover_month;
            let (principal, interest) = m.schedule.paid_through(months_paid);
            equity_invested += m.upfront_fees + principal - m.schedule.loan_amount;
            outstanding_mortgage = m.schedule.balance_after(months_paid);
            financing_costs = interest + m.schedule.insurance_through(months_paid);
        }

        let property_value = self.value_at_month(exit_month);
        let commission = if self.costs.agent_commission_enabled {
            property_value * self.costs.agent_commission_pct / dec!(100)
        } else {
            Decimal::ZERO
        };
        let exit_costs = commission + self.costs.noc_fee;
        let net_sale_proceeds =
            property_value - exit_costs - outstanding_mortgage - outstanding_developer_balance;

        let cumulative_rent = self.rent_through_month(exit_month);
        let total_profit = net_sale_proceeds + cumulative_rent - equity_invested - financing_costs;

        let (roe_pct, annualized_roe_pct) = if equity_invested > Decimal::ZERO {
            (
                Some(total_profit / equity_invested * dec!(100)),
                annualize(total_profit, equity_invested, exit_month),
            )
        } else {
            (None, None)
        };

        ExitScenario {
            exit_month,
            exit_date: calendar::add_months(self.schedule.booking_date, exit_month),
            equity_invested,
            property_value,
            exit_costs,
            outstanding_developer_balance,
            outstanding_mortgage,
            net_sale_proceeds,
            cumulative_rent,
            financing_costs,
            total_profit,
            roe_pct,
            annualized_roe_pct,
            paid_pct,
            meets_exit_threshold: paid_pct >= self.costs.min_exit_threshold_pct,
        }
    }

    pub fn analyze_many(&self, exit_months: &[u32]) -> Vec<ExitScenario> {
        exit_months.iter().map(|&m| self.analyze(m)).collect()
    }

    /// Value at whole year `year`: the projection where it reaches, the
    /// curve beyond it.
    fn value_at_year(&self, year: u32) -> Money {
        if year == 0 {
            return self.base_price;
        }
        match self.projection.get(year as usize - 1) {
            Some(point) => point.property_value,
            None => self.curve.value_at(self.base_price, year),
        }
    }

    fn value_at_month(&self, month: u32) -> Money {
        let whole = month / 12;
        let rem = month % 12;
        if whole as usize >= self.projection.len() {
            return self.curve.interpolate_months(self.base_price, month);
        }
        let lower = self.value_at_year(whole);
        if rem == 0 {
            return lower;
        }
        let upper = self.value_at_year(whole + 1);
        lower + (upper - lower) * Decimal::from(rem) / dec!(12)
    }

    /// Net rent collected by `month`, clamped at the end of the projection.
    fn rent_through_month(&self, month: u32) -> Money {
        let Some(last) = self.projection.last() else {
            return Decimal::ZERO;
        };
        let whole = (month / 12) as usize;
        if whole >= self.projection.len() {
            return last.cumulative_net_income;
        }

        let banked = match whole {
            0 => Decimal::ZERO,
            n => self.projection[n - 1].cumulative_net_income,
        };
        let rem = month % 12;
        banked + self.projection[whole].net_rent * Decimal::from(rem) / dec!(12)
    }
}

/// `((1 + profit/equity)^(12/months) - 1) * 100`.
///
/// A loss that wipes out the equity reports -100 rather than an undefined
/// power.
fn annualize(profit: Money, equity: Money, months: u32) -> Option<Percent> {
    if months == 0 || equity <= Decimal::ZERO {
        return None;
    }
    let growth = Decimal::ONE + profit / equity;
    if growth <= Decimal::ZERO {
        return Some(dec!(-100));
    }
    let exponent = dec!(12) / Decimal::from(months);
    growth
        .checked_powd(exponent)
        .map(|g| (g - Decimal::ONE) * dec!(100))
}

/// Exit months analysed when the caller asks for none: handover plus the
/// standard 3, 5 and 10 year marks.
pub fn default_exit_months(handover_month: u32) -> Vec<u32> {
    let mut months: BTreeSet<u32> = defaults::STANDARD_EXIT_MONTHS.into_iter().collect();
    months.insert(handover_month);
    months.remove(&0);
    months.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
