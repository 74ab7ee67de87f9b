//! Multi-quote recommendation.
//!
//! Nine metrics are pulled from each quote and grouped into three categories:
//!
//! 1. **ROI** -- annualized ROE at the reference exit, total profit at the
//!    long-horizon exit, mean appreciation rate.
//! 2. **Safety** -- zone maturity, appreciation volatility (lower is better),
//!    pre-handover commitment (lower is better).
//! 3. **Cashflow** -- rental yield on equity, stabilized net rent, years to
//!    break even (lower is better).
//!
//! Each metric is min-max normalized to 0-100 across the compared set, then
//! combined with 0.4 / 0.3 / 0.3 weights inside its category.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::quote::QuoteResult;
use crate::types::Percent;

const TIE_SCORE: Decimal = dec!(50);
const UNDEFINED_SCORE: Decimal = Decimal::ZERO;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A computed quote entering the comparison.
#[derive(Debug, Clone)]
pub struct ComparedQuote<'a> {
    pub id: String,
    pub name: String,
    /// Market maturity of the zone, 0-100
    pub zone_maturity: Percent,
    pub result: &'a QuoteResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Roi,
    Safety,
    Cashflow,
}

/// One metric across every compared quote. Exists only while scoring.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonMetric {
    pub name: &'static str,
    pub category: ScoreCategory,
    pub weight: Decimal,
    pub higher_is_better: bool,
    pub highlight: &'static str,
    /// One entry per quote; `None` where the metric is undefined
    pub raw: Vec<Option<Decimal>>,
    pub normalized: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteScore {
    pub id: String,
    pub name: String,
    pub roi: Decimal,
    pub safety: Decimal,
    pub cashflow: Decimal,
    /// Mean of the three category scores
    pub overall: Decimal,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub scores: Vec<QuoteScore>,
    /// Ids of every quote sharing the top score, per category
    pub roi_winners: Vec<String>,
    pub safety_winners: Vec<String>,
    pub cashflow_winners: Vec<String>,
    pub overall_winners: Vec<String>,
}

struct MetricDef {
    name: &'static str,
    category: ScoreCategory,
    weight: Decimal,
    higher_is_better: bool,
    highlight: &'static str,
    extract: fn(&ComparedQuote) -> Option<Decimal>,
}

const METRICS: [MetricDef; 9] = [
    MetricDef {
        name: "annualized_roe",
        category: ScoreCategory::Roi,
        weight: dec!(0.4),
        higher_is_better: true,
        highlight: "Highest ROE",
        extract: |q| {
            q.result
                .scenario_at(defaults::REFERENCE_EXIT_MONTH)
                .and_then(|s| s.annualized_roe_pct)
        },
    },
    MetricDef {
        name: "total_profit",
        category: ScoreCategory::Roi,
        weight: dec!(0.3),
        higher_is_better: true,
        highlight: "Highest Total Profit",
        extract: |q| {
            q.result
                .scenario_at(defaults::LONG_HORIZON_EXIT_MONTH)
                .map(|s| s.total_profit)
        },
    },
    MetricDef {
        name: "average_appreciation",
        category: ScoreCategory::Roi,
        weight: dec!(0.3),
        higher_is_better: true,
        highlight: "Strongest Appreciation",
        extract: |q| Some(q.result.summary.appreciation.average_pct()),
    },
    MetricDef {
        name: "zone_maturity",
        category: ScoreCategory::Safety,
        weight: dec!(0.4),
        higher_is_better: true,
        highlight: "Most Mature Zone",
        extract: |q| Some(q.zone_maturity),
    },
    MetricDef {
        name: "volatility",
        category: ScoreCategory::Safety,
        weight: dec!(0.3),
        higher_is_better: false,
        highlight: "Lowest Risk",
        extract: |q| Some(q.result.summary.appreciation.volatility_pct()),
    },
    MetricDef {
        name: "pre_handover_pct",
        category: ScoreCategory::Safety,
        weight: dec!(0.3),
        higher_is_better: false,
        highlight: "Lowest Upfront Commitment",
        extract: |q| Some(q.result.payment_schedule.pre_handover_pct),
    },
    MetricDef {
        name: "rental_yield_on_equity",
        category: ScoreCategory::Cashflow,
        weight: dec!(0.4),
        higher_is_better: true,
        highlight: "Best Rental Yield",
        extract: |q| q.result.summary.rental_yield_on_equity_pct,
    },
    MetricDef {
        name: "net_annual_rent",
        category: ScoreCategory::Cashflow,
        weight: dec!(0.3),
        higher_is_better: true,
        highlight: "Highest Net Rent",
        extract: |q| Some(q.result.summary.stabilized_net_rent),
    },
    MetricDef {
        name: "years_to_break_even",
        category: ScoreCategory::Cashflow,
        weight: dec!(0.3),
        higher_is_better: false,
        highlight: "Fastest Break-Even",
        extract: |q| q.result.summary.years_to_break_even,
    },
];

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Min-max scale to 0-100. All-equal input maps to 50 everywhere.
pub fn min_max_normalize(values: &[Decimal]) -> Vec<Decimal> {
    let (Some(min), Some(max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    let range = *max - *min;
    if range.is_zero() {
        return vec![TIE_SCORE; values.len()];
    }
    values
        .iter()
        .map(|v| dec!(100) * (*v - *min) / range)
        .collect()
}

/// Normalize a series with gaps. Undefined entries score 0; defined ones are
/// scaled among themselves and inverted when lower is better.
fn normalize_series(raw: &[Option<Decimal>], higher_is_better: bool) -> Vec<Decimal> {
    let defined: Vec<Decimal> = raw.iter().flatten().copied().collect();
    let mut scaled = min_max_normalize(&defined).into_iter();
    raw.iter()
        .map(|v| match v {
            Some(_) => {
                let n = scaled.next().unwrap_or(UNDEFINED_SCORE);
                if higher_is_better {
                    n
                } else {
                    dec!(100) - n
                }
            }
            None => UNDEFINED_SCORE,
        })
        .collect()
}

/// Index of the single best raw value, if exactly one quote holds it.
fn unique_best(raw: &[Option<Decimal>], higher_is_better: bool) -> Option<usize> {
    let defined = raw.iter().flatten();
    let best = if higher_is_better {
        defined.max()
    } else {
        defined.min()
    }?;
    let mut holders = raw
        .iter()
        .enumerate()
        .filter(|(_, v)| v.as_ref() == Some(best))
        .map(|(i, _)| i);
    match (holders.next(), holders.next()) {
        (Some(i), None) => Some(i),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract and normalize every comparison metric for `quotes`.
pub fn comparison_metrics(quotes: &[ComparedQuote]) -> Vec<ComparisonMetric> {
    METRICS
        .iter()
        .map(|def| {
            let raw: Vec<Option<Decimal>> = quotes.iter().map(def.extract).collect();
            let normalized = normalize_series(&raw, def.higher_is_better);
            ComparisonMetric {
                name: def.name,
                category: def.category,
                weight: def.weight,
                higher_is_better: def.higher_is_better,
                highlight: def.highlight,
                raw,
                normalized,
            }
        })
        .collect()
}

/// Score and rank two or more quotes. Returns `None` for fewer than two.
pub fn recommend(quotes: &[ComparedQuote]) -> Option<RecommendationResult> {
    if quotes.len() < 2 {
        return None;
    }

    let metrics = comparison_metrics(quotes);

    let mut scores: Vec<QuoteScore> = quotes
        .iter()
        .map(|q| QuoteScore {
            id: q.id.clone(),
            name: q.name.clone(),
            roi: Decimal::ZERO,
            safety: Decimal::ZERO,
            cashflow: Decimal::ZERO,
            overall: Decimal::ZERO,
            highlights: Vec::new(),
        })
        .collect();

    for metric in &metrics {
        for (score, n) in scores.iter_mut().zip(&metric.normalized) {
            let weighted = metric.weight * *n;
            match metric.category {
                ScoreCategory::Roi => score.roi += weighted,
                ScoreCategory::Safety => score.safety += weighted,
                ScoreCategory::Cashflow => score.cashflow += weighted,
            }
        }
        if let Some(idx) = unique_best(&metric.raw, metric.higher_is_better) {
            scores[idx].highlights.push(metric.highlight.to_string());
        }
    }

    for s in &mut scores {
        s.overall = (s.roi + s.safety + s.cashflow) / dec!(3);
    }

    let result = RecommendationResult {
        roi_winners: winners(&scores, |s| s.roi),
        safety_winners: winners(&scores, |s| s.safety),
        cashflow_winners: winners(&scores, |s| s.cashflow),
        overall_winners: winners(&scores, |s| s.overall),
        scores,
    };

    tracing::debug!(
        quotes = quotes.len(),
        overall_winners = ?result.overall_winners,
        "recommendation scored"
    );

    Some(result)
}

/// Every quote sharing the maximum score; no tiebreak.
fn winners(scores: &[QuoteScore], key: impl Fn(&QuoteScore) -> Decimal) -> Vec<String> {
    let Some(best) = scores.iter().map(&key).max() else {
        return Vec::new();
    };
    scores
        .iter()
        .filter(|s| key(*s) == best)
        .map(|s| s.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
