use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::appreciation::{apply_differentiators, AppreciationRates, ValueDifferentiator};
use crate::calendar;
use crate::defaults;
use crate::error::OffplanError;
use crate::exit::ExitCostAssumptions;
use crate::mortgage::MortgageInputs;
use crate::payment_schedule::{EntryCostInputs, PaymentPlan};
use crate::rental::RentAssumptions;
use crate::types::Money;
use crate::OffplanResult;

/// Everything needed to quote one unit. Immutable for the duration of a
/// computation; only `base_price` and the booking/handover dates are
/// structurally required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentInputs {
    pub base_price: Money,
    pub booking_month: u32,
    pub booking_year: i32,
    pub handover_quarter: u32,
    pub handover_year: i32,
    #[serde(default)]
    pub payment_plan: PaymentPlan,
    #[serde(default)]
    pub entry_costs: EntryCostInputs,
    #[serde(default)]
    pub appreciation: AppreciationRates,
    #[serde(default)]
    pub differentiators: Vec<ValueDifferentiator>,
    #[serde(default)]
    pub rent: RentAssumptions,
    #[serde(default)]
    pub exit_costs: ExitCostAssumptions,
    #[serde(default)]
    pub unit_size_sqft: Decimal,
    #[serde(default = "default_holding_period")]
    pub holding_period_years: u32,
    /// Exit months (after booking) to analyse; empty means the standard set
    #[serde(default)]
    pub exit_months: Vec<u32>,
    #[serde(default)]
    pub mortgage: MortgageInputs,
}

fn default_holding_period() -> u32 {
    defaults::HOLDING_PERIOD_YEARS
}

impl InvestmentInputs {
    /// Minimal input set; every optional block takes its documented default.
    pub fn new(
        base_price: Money,
        booking: (i32, u32),
        handover: (i32, u32),
    ) -> Self {
        Self {
            base_price,
            booking_year: booking.0,
            booking_month: booking.1,
            handover_year: handover.0,
            handover_quarter: handover.1,
            payment_plan: PaymentPlan::default(),
            entry_costs: EntryCostInputs::default(),
            appreciation: AppreciationRates::default(),
            differentiators: Vec::new(),
            rent: RentAssumptions::default(),
            exit_costs: ExitCostAssumptions::default(),
            unit_size_sqft: Decimal::ZERO,
            holding_period_years: defaults::HOLDING_PERIOD_YEARS,
            exit_months: Vec::new(),
            mortgage: MortgageInputs::default(),
        }
    }

    pub fn booking_date(&self) -> OffplanResult<NaiveDate> {
        calendar::month_start(self.booking_year, self.booking_month).map_err(|_| {
            OffplanError::invalid(
                "booking_month",
                format!("Booking month must be 1-12, got {}", self.booking_month),
            )
        })
    }

    pub fn handover_date(&self) -> OffplanResult<NaiveDate> {
        calendar::quarter_end(self.handover_year, self.handover_quarter)
    }

    /// Months from booking to handover.
    pub fn handover_month(&self) -> OffplanResult<u32> {
        let months = calendar::months_between(self.booking_date()?, self.handover_date()?);
        u32::try_from(months).map_err(|_| {
            OffplanError::invalid("handover_year", "Handover cannot precede booking")
        })
    }

    /// Phase rates after appreciation-impacting differentiators are folded in.
    pub fn effective_appreciation(&self) -> AppreciationRates {
        apply_differentiators(&self.appreciation, &self.differentiators)
    }

    pub fn validate(&self) -> OffplanResult<()> {
        if self.base_price <= Decimal::ZERO {
            return Err(OffplanError::invalid(
                "base_price",
                "Base price must be positive",
            ));
        }
        if self.base_price > defaults::MAX_PROJECTED_VALUE {
            return Err(OffplanError::invalid(
                "base_price",
                "Base price exceeds the supported range",
            ));
        }

        let max_months = defaults::MAX_HORIZON_YEARS * 12;
        if self.handover_month()? > max_months {
            return Err(OffplanError::invalid(
                "handover_year",
                format!(
                    "Handover must fall within {} years of booking",
                    defaults::MAX_HORIZON_YEARS
                ),
            ));
        }
        if self.holding_period_years > defaults::MAX_HORIZON_YEARS {
            return Err(OffplanError::invalid(
                "holding_period_years",
                format!(
                    "Holding period cannot exceed {} years",
                    defaults::MAX_HORIZON_YEARS
                ),
            ));
        }
        if let Some(month) = self.exit_months.iter().find(|&&m| m > max_months) {
            return Err(OffplanError::invalid(
                "exit_months",
                format!("Exit month {month} is beyond the {max_months}-month limit"),
            ));
        }

        if self.mortgage.enabled {
            if self.mortgage.term_years == 0 {
                return Err(OffplanError::invalid(
                    "mortgage.term_years",
                    "Mortgage term must be at least 1 year",
                ));
            }
            if self.mortgage.term_years > defaults::MAX_MORTGAGE_TERM_YEARS {
                return Err(OffplanError::invalid(
                    "mortgage.term_years",
                    format!(
                        "Mortgage term cannot exceed {} years",
                        defaults::MAX_MORTGAGE_TERM_YEARS
                    ),
                ));
            }
        }
        Ok(())
    }
}
