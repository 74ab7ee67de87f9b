//! Payment plans do not have to sum to 100%. Drift is reported on the
//! schedule; [`PaymentSchedule::check_balance`] is the strict check.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::defaults;
use crate::error::OffplanError;
use crate::types::{Money, Percent};
use crate::OffplanResult;

const BALANCE_TOLERANCE_PCT: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Plan inputs
// ---------------------------------------------------------------------------

/// What releases a milestone payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MilestoneTrigger {
    /// Due in a fixed calendar month
    Date { year: i32, month: u32 },
    /// Due once construction reaches `percent` complete
    ConstructionProgress { percent: Percent },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestonePayment {
    #[serde(default)]
    pub label: String,
    pub trigger: MilestoneTrigger,
    pub percent: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostHandoverInstallment {
    pub months_after_handover: u32,
    pub percent: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentPlan {
    /// Everything due before handover, milestones included
    pub pre_handover_pct: Percent,
    pub milestones: Vec<MilestonePayment>,
    pub has_post_handover_plan: bool,
    /// Declared post-handover total; installments are expected to add up to it
    pub post_handover_pct: Percent,
    pub post_handover_installments: Vec<PostHandoverInstallment>,
}

impl Default for PaymentPlan {
    fn default() -> Self {
        Self {
            pre_handover_pct: dec!(20),
            milestones: Vec::new(),
            has_post_handover_plan: false,
            post_handover_pct: Decimal::ZERO,
            post_handover_installments: Vec::new(),
        }
    }
}

/// One-off costs paid at booking on top of the price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryCostInputs {
    /// Land department registration fee, percent of price
    pub registration_fee_pct: Percent,
    /// Admin / expression-of-interest fee
    pub admin_fee: Money,
    pub oqood_fee: Money,
}

impl Default for EntryCostInputs {
    fn default() -> Self {
        Self {
            registration_fee_pct: defaults::REGISTRATION_FEE_PCT,
            admin_fee: Decimal::ZERO,
            oqood_fee: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryCosts {
    pub registration_fee: Money,
    pub admin_fee: Money,
    pub oqood_fee: Money,
    pub total: Money,
}

impl EntryCosts {
    pub fn compute(inputs: &EntryCostInputs, base_price: Money) -> Self {
        let registration_fee = base_price * inputs.registration_fee_pct / dec!(100);
        Self {
            registration_fee,
            admin_fee: inputs.admin_fee,
            oqood_fee: inputs.oqood_fee,
            total: registration_fee + inputs.admin_fee + inputs.oqood_fee,
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStage {
    PreHandover,
    Handover,
    PostHandover,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub date: NaiveDate,
    /// Months after booking
    pub month_offset: u32,
    pub stage: PaymentStage,
    pub percent_of_price: Percent,
    pub amount: Money,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSchedule {
    pub booking_date: NaiveDate,
    pub handover_date: NaiveDate,
    pub construction_months: u32,
    pub entries: Vec<PaymentEntry>,
    pub pre_handover_pct: Percent,
    pub handover_pct: Percent,
    pub post_handover_pct: Percent,
    pub total_pct: Percent,
    /// `total_pct - 100`; zero for a balanced plan
    pub drift_pct: Percent,
    pub total_amount: Money,
}

impl PaymentSchedule {
    /// Cash paid on or before `month_offset` months after booking.
    pub fn paid_by_month(&self, month_offset: u32) -> Money {
        self.entries
            .iter()
            .filter(|e| e.month_offset <= month_offset)
            .map(|e| e.amount)
            .sum()
    }

    /// Percent of price paid on or before `month_offset`.
    pub fn paid_pct_by_month(&self, month_offset: u32) -> Percent {
        self.entries
            .iter()
            .filter(|e| e.month_offset <= month_offset)
            .map(|e| e.percent_of_price)
            .sum()
    }

    /// Scheduled cash still owed to the developer after `month_offset`.
    pub fn outstanding_after_month(&self, month_offset: u32) -> Money {
        self.total_amount - self.paid_by_month(month_offset)
    }

    /// Strict variant of the plan check: reject any plan that does not add
    /// up to 100% of the price.
    pub fn check_balance(&self) -> OffplanResult<()> {
        if self.drift_pct.abs() > BALANCE_TOLERANCE_PCT {
            return Err(OffplanError::ScheduleImbalance {
                total_pct: self.total_pct,
            });
        }
        Ok(())
    }
}

/// Build the monthly payment schedule for a plan.
///
/// `booking` and `handover` must already be validated (`handover >= booking`).
pub fn build_schedule(
    plan: &PaymentPlan,
    base_price: Money,
    booking: NaiveDate,
    handover: NaiveDate,
    warnings: &mut Vec<String>,
) -> PaymentSchedule {
    let construction_months = calendar::months_between(booking, handover).max(0) as u32;

    // (date, percent, label) before merging
    let mut raw: Vec<(NaiveDate, Percent, String)> = Vec::new();
    let mut pre_milestones_pct = Decimal::ZERO;
    let mut late_milestones_pct = Decimal::ZERO;

    for (idx, m) in plan.milestones.iter().enumerate() {
        let label = if m.label.is_empty() {
            format!("Milestone {}", idx + 1)
        } else {
            m.label.clone()
        };

        let date = match &m.trigger {
            MilestoneTrigger::Date { year, month } => {
                match calendar::month_start(*year, *month) {
                    Ok(d) if d < booking => {
                        warnings.push(format!(
                            "{label}: due {d} precedes booking; moved to booking month"
                        ));
                        booking
                    }
                    Ok(d) => d,
                    Err(_) => {
                        warnings.push(format!(
                            "{label}: {year}-{month} is not a valid month; milestone skipped"
                        ));
                        continue;
                    }
                }
            }
            MilestoneTrigger::ConstructionProgress { percent } => {
                let progress = (*percent).max(Decimal::ZERO).min(dec!(100));
                let offset = (progress / dec!(100) * Decimal::from(construction_months))
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .to_u32()
                    .unwrap_or(0);
                calendar::add_months(booking, offset)
            }
        };

        let counts_as_pre_handover = match m.trigger {
            MilestoneTrigger::ConstructionProgress { .. } => true,
            MilestoneTrigger::Date { .. } => date < handover,
        };
        if counts_as_pre_handover {
            pre_milestones_pct += m.percent;
        } else {
            late_milestones_pct += m.percent;
        }

        raw.push((date, m.percent, label));
    }

    // (a) booking deposit is whatever pre-handover share the milestones leave
    let mut booking_pct = plan.pre_handover_pct - pre_milestones_pct;
    if booking_pct < Decimal::ZERO {
        warnings.push(format!(
            "Pre-handover milestones total {pre_milestones_pct}% but pre-handover share is {}%; booking payment floored at 0",
            plan.pre_handover_pct
        ));
        booking_pct = Decimal::ZERO;
    }
    raw.push((booking, booking_pct, "Booking".into()));

    // (e) post-handover installments
    let mut post_total = Decimal::ZERO;
    if plan.has_post_handover_plan {
        post_total = plan.post_handover_pct;
        let mut installment_sum = Decimal::ZERO;
        for (idx, inst) in plan.post_handover_installments.iter().enumerate() {
            installment_sum += inst.percent;
            raw.push((
                calendar::add_months(handover, inst.months_after_handover),
                inst.percent,
                format!("Post-handover {}", idx + 1),
            ));
        }
        if installment_sum != post_total {
            warnings.push(format!(
                "Post-handover installments total {installment_sum}% but plan declares {post_total}%"
            ));
        }
    }

    // (d) handover payment
    let pre_total = booking_pct + pre_milestones_pct;
    let mut handover_pct = dec!(100) - pre_total - late_milestones_pct - post_total;
    if handover_pct < Decimal::ZERO {
        warnings.push(format!(
            "Plan over-allocates {}% before the handover payment; handover payment floored at 0",
            -handover_pct
        ));
        handover_pct = Decimal::ZERO;
    }
    raw.push((handover, handover_pct, "Handover".into()));

    // Merge same-month entries; BTreeMap keeps them chronological
    let mut merged: BTreeMap<NaiveDate, (Percent, Vec<String>)> = BTreeMap::new();
    for (date, pct, label) in raw {
        if pct.is_zero() {
            continue;
        }
        let slot = merged.entry(date).or_insert((Decimal::ZERO, Vec::new()));
        slot.0 += pct;
        slot.1.push(label);
    }

    let entries: Vec<PaymentEntry> = merged
        .into_iter()
        .map(|(date, (pct, labels))| PaymentEntry {
            date,
            month_offset: calendar::months_between(booking, date).max(0) as u32,
            stage: if date < handover {
                PaymentStage::PreHandover
            } else if date == handover {
                PaymentStage::Handover
            } else {
                PaymentStage::PostHandover
            },
            percent_of_price: pct,
            amount: base_price * pct / dec!(100),
            label: labels.join(" + "),
        })
        .collect();

    let sum_stage = |stage: PaymentStage| -> Percent {
        entries
            .iter()
            .filter(|e| e.stage == stage)
            .map(|e| e.percent_of_price)
            .sum()
    };
    let pre_handover_pct = sum_stage(PaymentStage::PreHandover);
    let handover_stage_pct = sum_stage(PaymentStage::Handover);
    let post_handover_pct = sum_stage(PaymentStage::PostHandover);
    let total_pct = pre_handover_pct + handover_stage_pct + post_handover_pct;
    let drift_pct = total_pct - dec!(100);

    if !drift_pct.is_zero() {
        warnings.push(format!(
            "Payment plan schedules {total_pct}% of the price (drift {drift_pct}%)"
        ));
    }

    let total_amount = entries.iter().map(|e| e.amount).sum();

    PaymentSchedule {
        booking_date: booking,
        handover_date: handover,
        construction_months,
        entries,
        pre_handover_pct,
        handover_pct: handover_stage_pct,
        post_handover_pct,
        total_pct,
        drift_pct,
        total_amount,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(year: i32, month: u32) -> NaiveDate {
        calendar::month_start(year, month).unwrap()
    }

    fn simple_plan() -> PaymentPlan {
        PaymentPlan {
            pre_handover_pct: dec!(20),
            ..PaymentPlan::default()
        }
    }

    #[test]
    fn test_simple_two_payment_plan() {
        let mut warnings = Vec::new();
        let s = build_schedule(&simple_plan(), dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);

        assert_eq!(s.entries.len(), 2);
        assert_eq!(s.entries[0].amount, dec!(200000));
        assert_eq!(s.entries[0].stage, PaymentStage::PreHandover);
        assert_eq!(s.entries[1].amount, dec!(800000));
        assert_eq!(s.entries[1].month_offset, 24);
        assert_eq!(s.total_pct, dec!(100));
        assert!(s.drift_pct.is_zero());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_milestones_carve_out_of_booking() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(40),
            milestones: vec![
                MilestonePayment {
                    label: "Frame".into(),
                    trigger: MilestoneTrigger::ConstructionProgress { percent: dec!(50) },
                    percent: dec!(10),
                },
                MilestonePayment {
                    label: String::new(),
                    trigger: MilestoneTrigger::Date { year: 2026, month: 1 },
                    percent: dec!(10),
                },
            ],
            ..PaymentPlan::default()
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);

        // Booking 20%, Jan 2026 10%, 50% progress = month 12 (Mar 2026) 10%, handover 60%
        let pcts: Vec<Percent> = s.entries.iter().map(|e| e.percent_of_price).collect();
        assert_eq!(pcts, vec![dec!(20), dec!(10), dec!(10), dec!(60)]);
        assert_eq!(s.entries[1].label, "Milestone 2");
        assert_eq!(s.entries[2].date, d(2026, 3));
        assert_eq!(s.pre_handover_pct, dec!(40));
        assert!(s.check_balance().is_ok());
    }

    #[test]
    fn test_progress_rounds_to_nearest_month() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(30),
            milestones: vec![MilestonePayment {
                label: "Piling".into(),
                // 25% of 30 months = 7.5 -> 8
                trigger: MilestoneTrigger::ConstructionProgress { percent: dec!(25) },
                percent: dec!(10),
            }],
            ..PaymentPlan::default()
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(500000), d(2025, 1), d(2027, 7), &mut warnings);
        assert_eq!(s.entries[1].month_offset, 8);
    }

    #[test]
    fn test_same_month_entries_merge() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(20),
            milestones: vec![MilestonePayment {
                label: "SPA signing".into(),
                trigger: MilestoneTrigger::Date { year: 2025, month: 3 },
                percent: dec!(5),
            }],
            ..PaymentPlan::default()
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);

        assert_eq!(s.entries.len(), 2);
        assert_eq!(s.entries[0].percent_of_price, dec!(20));
        assert_eq!(s.entries[0].label, "SPA signing + Booking");
    }

    #[test]
    fn test_post_handover_plan() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(40),
            milestones: Vec::new(),
            has_post_handover_plan: true,
            post_handover_pct: dec!(30),
            post_handover_installments: vec![
                PostHandoverInstallment { months_after_handover: 12, percent: dec!(15) },
                PostHandoverInstallment { months_after_handover: 24, percent: dec!(15) },
            ],
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(2000000), d(2025, 3), d(2027, 3), &mut warnings);

        assert_eq!(s.handover_pct, dec!(30));
        assert_eq!(s.post_handover_pct, dec!(30));
        assert_eq!(s.entries.last().unwrap().date, d(2029, 3));
        assert_eq!(s.entries.last().unwrap().stage, PaymentStage::PostHandover);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_drift_is_reported_not_rejected() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(40),
            milestones: Vec::new(),
            has_post_handover_plan: true,
            post_handover_pct: dec!(30),
            post_handover_installments: vec![PostHandoverInstallment {
                months_after_handover: 12,
                percent: dec!(20),
            }],
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);

        assert_eq!(s.total_pct, dec!(90));
        assert_eq!(s.drift_pct, dec!(-10));
        assert!(warnings.iter().any(|w| w.contains("drift")));
        assert!(matches!(
            s.check_balance(),
            Err(OffplanError::ScheduleImbalance { .. })
        ));
    }

    #[test]
    fn test_entries_strictly_sorted() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(50),
            milestones: vec![
                MilestonePayment {
                    label: "Late".into(),
                    trigger: MilestoneTrigger::Date { year: 2026, month: 11 },
                    percent: dec!(10),
                },
                MilestonePayment {
                    label: "Early".into(),
                    trigger: MilestoneTrigger::Date { year: 2025, month: 9 },
                    percent: dec!(10),
                },
            ],
            ..PaymentPlan::default()
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);
        for pair in s.entries.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }

    #[test]
    fn test_booking_floored_when_milestones_exceed_pre_handover() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(20),
            milestones: vec![
                MilestonePayment {
                    label: "Piling".into(),
                    trigger: MilestoneTrigger::ConstructionProgress { percent: dec!(25) },
                    percent: dec!(15),
                },
                MilestonePayment {
                    label: "Podium".into(),
                    trigger: MilestoneTrigger::Date { year: 2026, month: 1 },
                    percent: dec!(15),
                },
            ],
            ..PaymentPlan::default()
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);

        // No booking entry; handover takes 100 - 30
        let dates: Vec<NaiveDate> = s.entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![d(2025, 9), d(2026, 1), d(2027, 3)]);
        let pcts: Vec<Percent> = s.entries.iter().map(|e| e.percent_of_price).collect();
        assert_eq!(pcts, vec![dec!(15), dec!(15), dec!(70)]);
        assert!(s.drift_pct.is_zero());
        assert_eq!(
            warnings,
            vec!["Pre-handover milestones total 30% but pre-handover share is 20%; booking payment floored at 0".to_string()]
        );
    }

    #[test]
    fn test_milestone_before_booking_moves_to_booking_month() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(20),
            milestones: vec![MilestonePayment {
                label: "Deposit".into(),
                trigger: MilestoneTrigger::Date { year: 2024, month: 6 },
                percent: dec!(5),
            }],
            ..PaymentPlan::default()
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);

        assert_eq!(s.entries.len(), 2);
        assert_eq!(s.entries[0].date, d(2025, 3));
        assert_eq!(s.entries[0].percent_of_price, dec!(20));
        assert_eq!(s.entries[0].label, "Deposit + Booking");
        assert_eq!(s.entries[1].percent_of_price, dec!(80));
        assert_eq!(
            warnings,
            vec!["Deposit: due 2024-06-01 precedes booking; moved to booking month".to_string()]
        );
    }

    #[test]
    fn test_invalid_milestone_month_skipped() {
        let plan = PaymentPlan {
            pre_handover_pct: dec!(20),
            milestones: vec![MilestonePayment {
                label: "Typo".into(),
                trigger: MilestoneTrigger::Date { year: 2026, month: 13 },
                percent: dec!(10),
            }],
            ..PaymentPlan::default()
        };
        let mut warnings = Vec::new();
        let s = build_schedule(&plan, dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);

        let pcts: Vec<Percent> = s.entries.iter().map(|e| e.percent_of_price).collect();
        assert_eq!(pcts, vec![dec!(20), dec!(80)]);
        assert!(s.entries.iter().all(|e| !e.label.contains("Typo")));
        assert_eq!(
            warnings,
            vec!["Typo: 2026-13 is not a valid month; milestone skipped".to_string()]
        );
    }

    #[test]
    fn test_paid_by_month() {
        let mut warnings = Vec::new();
        let s = build_schedule(&simple_plan(), dec!(1000000), d(2025, 3), d(2027, 3), &mut warnings);
        assert_eq!(s.paid_by_month(0), dec!(200000));
        assert_eq!(s.paid_by_month(23), dec!(200000));
        assert_eq!(s.paid_by_month(24), dec!(1000000));
        assert_eq!(s.outstanding_after_month(12), dec!(800000));
        assert_eq!(s.paid_pct_by_month(12), dec!(20));
    }

    #[test]
    fn test_entry_costs() {
        let costs = EntryCosts::compute(
            &EntryCostInputs {
                registration_fee_pct: dec!(4),
                admin_fee: dec!(5000),
                oqood_fee: dec!(1250),
            },
            dec!(1000000),
        );
        assert_eq!(costs.registration_fee, dec!(40000));
        assert_eq!(costs.total, dec!(46250));
    }
}
