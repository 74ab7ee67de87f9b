use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::OffplanError;
use crate::types::{Money, Percent};
use crate::OffplanResult;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MortgageInputs {
    pub enabled: bool,
    /// Share of the handover balance that is financed
    pub financing_pct: Percent,
    pub interest_rate_pct: Percent,
    pub term_years: u32,
    /// Bank processing fee, percent of loan
    pub processing_fee_pct: Percent,
    pub valuation_fee: Money,
    /// Mortgage registration fee, percent of loan
    pub registration_fee_pct: Percent,
    /// Annual life cover, percent of the original loan
    pub life_insurance_pct: Percent,
    /// Annual property insurance premium
    pub property_insurance: Money,
}

impl Default for MortgageInputs {
    fn default() -> Self {
        Self {
            enabled: false,
            financing_pct: dec!(80),
            interest_rate_pct: dec!(4.5),
            term_years: 25,
            processing_fee_pct: dec!(1),
            valuation_fee: dec!(3000),
            registration_fee_pct: dec!(0.25),
            life_insurance_pct: Decimal::ZERO,
            property_insurance: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortgageFees {
    pub processing_fee: Money,
    pub valuation_fee: Money,
    pub registration_fee: Money,
    pub total: Money,
}

impl MortgageInputs {
    /// Loan = price × (100 − pre-handover%) × financing%. Zero when disabled.
    pub fn loan_amount(&self, base_price: Money, pre_handover_pct: Percent) -> Money {
        if !self.enabled {
            return Decimal::ZERO;
        }
        let handover_share = (dec!(100) - pre_handover_pct).max(Decimal::ZERO) / dec!(100);
        base_price * handover_share * self.financing_pct / dec!(100)
    }

    pub fn upfront_fees(&self, loan_amount: Money) -> MortgageFees {
        if !self.enabled {
            return MortgageFees {
                processing_fee: Decimal::ZERO,
                valuation_fee: Decimal::ZERO,
                registration_fee: Decimal::ZERO,
                total: Decimal::ZERO,
            };
        }
        let processing_fee = loan_amount * self.processing_fee_pct / dec!(100);
        let registration_fee = loan_amount * self.registration_fee_pct / dec!(100);
        MortgageFees {
            processing_fee,
            valuation_fee: self.valuation_fee,
            registration_fee,
            total: processing_fee + self.valuation_fee + registration_fee,
        }
    }

    /// Flat annual insurance cost.
    pub fn annual_insurance(&self, loan_amount: Money) -> Money {
        loan_amount * self.life_insurance_pct / dec!(100) + self.property_insurance
    }

    /// Full schedule for this mortgage on `loan_amount`, insurance included.
    pub fn schedule(&self, loan_amount: Money) -> OffplanResult<AmortizationSchedule> {
        amortize_with_insurance(
            loan_amount,
            self.interest_rate_pct,
            self.term_years,
            self.annual_insurance(loan_amount),
        )
    }
}

// ---------------------------------------------------------------------------
// Schedule types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyInstallment {
    /// 1-based month of the loan
    pub month: u32,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortgageYear {
    /// 1-based year of the loan
    pub year: u32,
    pub principal: Money,
    pub interest: Money,
    pub insurance: Money,
    pub total_payment: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub loan_amount: Money,
    pub monthly_rate: Decimal,
    pub monthly_payment: Money,
    pub term_months: u32,
    pub annual_insurance: Money,
    pub months: Vec<MonthlyInstallment>,
    pub years: Vec<MortgageYear>,
    pub total_interest: Money,
    pub total_principal: Money,
}

impl AmortizationSchedule {
    /// Outstanding balance after `months_paid` payments.
    pub fn balance_after(&self, months_paid: u32) -> Money {
        if months_paid == 0 || self.months.is_empty() {
            return self.loan_amount;
        }
        let idx = (months_paid as usize).min(self.months.len()) - 1;
        self.months[idx].balance
    }

    /// (principal, interest) paid over the first `months_paid` months.
    pub fn paid_through(&self, months_paid: u32) -> (Money, Money) {
        self.months
            .iter()
            .take(months_paid as usize)
            .fold((Decimal::ZERO, Decimal::ZERO), |(p, i), m| {
                (p + m.principal, i + m.interest)
            })
    }

    /// Insurance paid over the first `months_paid` months, accrued monthly.
    pub fn insurance_through(&self, months_paid: u32) -> Money {
        let months = months_paid.min(self.term_months);
        self.annual_insurance * Decimal::from(months) / dec!(12)
    }
}

// ---------------------------------------------------------------------------
// Amortisation
// ---------------------------------------------------------------------------

/// Standard fixed-rate amortisation without insurance costs.
pub fn amortize(
    loan_amount: Money,
    annual_rate_pct: Percent,
    term_years: u32,
) -> OffplanResult<AmortizationSchedule> {
    amortize_with_insurance(loan_amount, annual_rate_pct, term_years, Decimal::ZERO)
}

/// Fixed-rate amortisation with a flat annual insurance charge added to each
/// yearly rollup.
pub fn amortize_with_insurance(
    loan_amount: Money,
    annual_rate_pct: Percent,
    term_years: u32,
    annual_insurance: Money,
) -> OffplanResult<AmortizationSchedule> {
    if loan_amount < Decimal::ZERO {
        return Err(OffplanError::invalid(
            "loan_amount",
            "Loan amount cannot be negative",
        ));
    }
    if annual_rate_pct < Decimal::ZERO {
        return Err(OffplanError::invalid(
            "interest_rate_pct",
            "Interest rate cannot be negative",
        ));
    }

    let monthly_rate = annual_rate_pct / dec!(100) / dec!(12);

    if loan_amount.is_zero() {
        return Ok(AmortizationSchedule {
            loan_amount,
            monthly_rate,
            monthly_payment: Decimal::ZERO,
            term_months: 0,
            annual_insurance: Decimal::ZERO,
            months: Vec::new(),
            years: Vec::new(),
            total_interest: Decimal::ZERO,
            total_principal: Decimal::ZERO,
        });
    }

    if term_years == 0 {
        return Err(OffplanError::invalid(
            "term_years",
            "Mortgage term must be at least 1 year",
        ));
    }
    if term_years > defaults::MAX_MORTGAGE_TERM_YEARS {
        return Err(OffplanError::invalid(
            "term_years",
            format!(
                "Mortgage term cannot exceed {} years",
                defaults::MAX_MORTGAGE_TERM_YEARS
            ),
        ));
    }

    let term_months = term_years * 12;
    let monthly_payment = monthly_payment(loan_amount, monthly_rate, term_months)?;

    let mut months = Vec::with_capacity(term_months as usize);
    let mut balance = loan_amount;
    for month in 1..=term_months {
        let interest = balance * monthly_rate;
        let principal = if month == term_months {
            balance
        } else {
            (monthly_payment - interest).min(balance)
        };
        balance -= principal;
        months.push(MonthlyInstallment {
            month,
            payment: principal + interest,
            interest,
            principal,
            balance,
        });
    }

    let years: Vec<MortgageYear> = months
        .chunks(12)
        .enumerate()
        .map(|(idx, chunk)| {
            let principal: Money = chunk.iter().map(|m| m.principal).sum();
            let interest: Money = chunk.iter().map(|m| m.interest).sum();
            MortgageYear {
                year: idx as u32 + 1,
                principal,
                interest,
                insurance: annual_insurance,
                total_payment: principal + interest + annual_insurance,
                closing_balance: chunk.last().map(|m| m.balance).unwrap_or(Decimal::ZERO),
            }
        })
        .collect();

    let total_interest = months.iter().map(|m| m.interest).sum();
    let total_principal = months.iter().map(|m| m.principal).sum();

    Ok(AmortizationSchedule {
        loan_amount,
        monthly_rate,
        monthly_payment,
        term_months,
        annual_insurance,
        months,
        years,
        total_interest,
        total_principal,
    })
}

/// Standard fixed-rate mortgage payment: P * r(1+r)^n / ((1+r)^n - 1)
fn monthly_payment(principal: Money, monthly_rate: Decimal, total_months: u32) -> OffplanResult<Money> {
    if monthly_rate.is_zero() {
        // Interest-free: straight-line amortisation
        return Ok(principal / Decimal::from(total_months));
    }

    // (1 + r)^n via iterative multiplication
    let step = Decimal::ONE + monthly_rate;
    let mut compound = Decimal::ONE;
    for _ in 0..total_months {
        compound = compound.checked_mul(step).ok_or_else(|| {
            OffplanError::invalid(
                "interest_rate_pct",
                "Rate too large to amortise over the term",
            )
        })?;
    }

    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(OffplanError::invalid(
            "interest_rate_pct",
            "Rate too small to amortise over the term",
        ));
    }

    principal
        .checked_mul(monthly_rate)
        .and_then(|p| p.checked_mul(compound))
        .and_then(|p| p.checked_div(denominator))
        .ok_or_else(|| {
            OffplanError::invalid("loan_amount", "Payment exceeds the supported range")
        })
}

/// Monthly net rent as a percentage of the monthly mortgage payment.
///
/// Unclamped: a value above 100 means rent more than covers the payment.
/// `None` when there is no payment to cover.
pub fn coverage_ratio(monthly_net_rent: Money, monthly_payment: Money) -> Option<Percent> {
    if monthly_payment.is_zero() {
        return None;
    }
    Some(monthly_net_rent / monthly_payment * dec!(100))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_monthly_payment_sanity() {
        // 750k at 6.5% over 30 years, expected ~4,740/mo
        let s = amortize(dec!(750000), dec!(6.5), 30).unwrap();
        assert!(
            s.monthly_payment > dec!(4700) && s.monthly_payment < dec!(4800),
            "Monthly payment {} outside expected range",
            s.monthly_payment
        );
        assert_eq!(s.months.len(), 360);
        assert_eq!(s.years.len(), 30);
    }

    #[test]
    fn test_zero_rate_mortgage() {
        let s = amortize(dec!(360000), Decimal::ZERO, 30).unwrap();
        assert_eq!(s.monthly_payment, dec!(1000));
        assert_eq!(s.total_interest, Decimal::ZERO);
        assert_eq!(s.years[0].principal, dec!(12000));
    }

    #[test]
    fn test_principal_sums_to_loan_and_closes_at_zero() {
        let s = amortize(dec!(640000), dec!(4.25), 25).unwrap();
        let principal: Money = s.years.iter().map(|y| y.principal).sum();
        assert!((principal - dec!(640000)).abs() < dec!(0.01));
        assert_eq!(s.months.last().unwrap().balance, Decimal::ZERO);
        assert_eq!(s.years.last().unwrap().closing_balance, Decimal::ZERO);
    }

    #[test]
    fn test_balance_decreases_monotonically() {
        let s = amortize(dec!(500000), dec!(5), 20).unwrap();
        let mut prev = s.loan_amount;
        for m in &s.months {
            assert!(m.balance <= prev);
            prev = m.balance;
        }
    }

    #[test]
    fn test_final_payment_close_to_regular_payment() {
        let s = amortize(dec!(500000), dec!(5), 20).unwrap();
        let last = s.months.last().unwrap();
        assert!((last.payment - s.monthly_payment).abs() < dec!(0.01));
    }

    #[test]
    fn test_insurance_added_to_yearly_rollup() {
        let inputs = MortgageInputs {
            enabled: true,
            life_insurance_pct: dec!(0.5),
            property_insurance: dec!(1000),
            ..MortgageInputs::default()
        };
        let s = inputs.schedule(dec!(400000)).unwrap();
        assert_eq!(s.years[0].insurance, dec!(3000));
        assert_eq!(
            s.years[0].total_payment,
            s.years[0].principal + s.years[0].interest + dec!(3000)
        );
        assert_eq!(s.insurance_through(6), dec!(1500));
    }

    #[test]
    fn test_loan_amount_finances_handover_balance() {
        let inputs = MortgageInputs {
            enabled: true,
            financing_pct: dec!(80),
            ..MortgageInputs::default()
        };
        // 1M with 20% pre-handover: 800k due at handover, 80% financed
        assert_eq!(inputs.loan_amount(dec!(1000000), dec!(20)), dec!(640000));

        let disabled = MortgageInputs::default();
        assert_eq!(disabled.loan_amount(dec!(1000000), dec!(20)), Decimal::ZERO);
    }

    #[test]
    fn test_upfront_fees() {
        let inputs = MortgageInputs {
            enabled: true,
            processing_fee_pct: dec!(1),
            valuation_fee: dec!(3000),
            registration_fee_pct: dec!(0.25),
            ..MortgageInputs::default()
        };
        let fees = inputs.upfront_fees(dec!(640000));
        assert_eq!(fees.processing_fee, dec!(6400));
        assert_eq!(fees.registration_fee, dec!(1600));
        assert_eq!(fees.total, dec!(11000));
    }

    #[test]
    fn test_balance_after_and_paid_through() {
        let s = amortize(dec!(120000), Decimal::ZERO, 10).unwrap();
        assert_eq!(s.balance_after(0), dec!(120000));
        assert_eq!(s.balance_after(12), dec!(108000));
        assert_eq!(s.balance_after(500), Decimal::ZERO);
        assert_eq!(s.paid_through(24), (dec!(24000), Decimal::ZERO));
    }

    #[test]
    fn test_coverage_ratio_not_clamped() {
        assert_eq!(coverage_ratio(dec!(6000), dec!(4000)), Some(dec!(150)));
        assert_eq!(coverage_ratio(dec!(6000), Decimal::ZERO), None);
    }

    #[test]
    fn test_zero_term_error() {
        assert!(amortize(dec!(100000), dec!(4), 0).is_err());
    }

    #[test]
    fn test_term_beyond_supported_range_rejected() {
        match amortize(dec!(500000), dec!(12), 700) {
            Err(OffplanError::InvalidInput { field, .. }) => assert_eq!(field, "term_years"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        assert!(amortize(dec!(500000), dec!(12), defaults::MAX_MORTGAGE_TERM_YEARS).is_ok());
    }

    #[test]
    fn test_compounding_overflow_is_an_error() {
        match amortize(dec!(500000), dec!(1000), 50) {
            Err(OffplanError::InvalidInput { field, .. }) => {
                assert_eq!(field, "interest_rate_pct")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_loan_is_empty_schedule() {
        let s = amortize(Decimal::ZERO, dec!(4), 25).unwrap();
        assert!(s.months.is_empty());
        assert_eq!(s.balance_after(12), Decimal::ZERO);
    }
}
