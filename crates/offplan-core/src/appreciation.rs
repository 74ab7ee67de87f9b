use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::types::{Money, Percent};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppreciationPhase {
    Construction,
    Growth,
    Mature,
}

/// Annual appreciation rate per phase, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppreciationRates {
    pub construction_pct: Percent,
    pub growth_pct: Percent,
    pub mature_pct: Percent,
    /// Years after construction during which the growth rate applies
    pub growth_period_years: u32,
}

impl Default for AppreciationRates {
    fn default() -> Self {
        Self {
            construction_pct: defaults::CONSTRUCTION_APPRECIATION_PCT,
            growth_pct: defaults::GROWTH_APPRECIATION_PCT,
            mature_pct: defaults::MATURE_APPRECIATION_PCT,
            growth_period_years: defaults::GROWTH_PERIOD_YEARS,
        }
    }
}

impl AppreciationRates {
    pub fn rate_for(&self, phase: AppreciationPhase) -> Percent {
        match phase {
            AppreciationPhase::Construction => self.construction_pct,
            AppreciationPhase::Growth => self.growth_pct,
            AppreciationPhase::Mature => self.mature_pct,
        }
    }

    /// Simple mean of the three phase rates.
    pub fn average_pct(&self) -> Percent {
        (self.construction_pct + self.growth_pct + self.mature_pct) / dec!(3)
    }

    /// Spread between the construction and mature rates.
    pub fn volatility_pct(&self) -> Percent {
        (self.construction_pct - self.mature_pct).abs()
    }
}

/// A qualitative feature of the project (branded residence, waterfront, metro
/// access...) that may lift one phase's appreciation rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueDifferentiator {
    pub name: String,
    #[serde(default)]
    pub impacts_appreciation: bool,
    #[serde(default = "default_differentiator_phase")]
    pub phase: AppreciationPhase,
    /// Additive bonus to the phase rate, in percentage points
    #[serde(default)]
    pub bonus_pct: Percent,
}

fn default_differentiator_phase() -> AppreciationPhase {
    AppreciationPhase::Growth
}

/// Fold appreciation-impacting differentiators into the phase rates.
///
/// This runs before the curve is built; the curve itself knows nothing about
/// differentiators.
pub fn apply_differentiators(
    rates: &AppreciationRates,
    differentiators: &[ValueDifferentiator],
) -> AppreciationRates {
    let mut adjusted = rates.clone();
    for d in differentiators.iter().filter(|d| d.impacts_appreciation) {
        match d.phase {
            AppreciationPhase::Construction => adjusted.construction_pct += d.bonus_pct,
            AppreciationPhase::Growth => adjusted.growth_pct += d.bonus_pct,
            AppreciationPhase::Mature => adjusted.mature_pct += d.bonus_pct,
        }
    }
    adjusted
}

// ---------------------------------------------------------------------------
// Curve
// ---------------------------------------------------------------------------

/// Appreciation curve anchored at booking.
#[derive(Debug, Clone)]
pub struct AppreciationCurve {
    rates: AppreciationRates,
    construction_years: u32,
}

impl AppreciationCurve {
    /// `construction_months` is the booking-to-handover distance. Only whole
    /// years that end on or before handover count as construction years.
    pub fn new(rates: AppreciationRates, construction_months: u32) -> Self {
        Self {
            rates,
            construction_years: construction_months / 12,
        }
    }

    pub fn rates(&self) -> &AppreciationRates {
        &self.rates
    }

    pub fn construction_years(&self) -> u32 {
        self.construction_years
    }

    /// Phase governing the appreciation of year `year` (1-based).
    pub fn phase_for_year(&self, year: u32) -> AppreciationPhase {
        if year <= self.construction_years {
            AppreciationPhase::Construction
        } else if year <= self.construction_years + self.rates.growth_period_years {
            AppreciationPhase::Growth
        } else {
            AppreciationPhase::Mature
        }
    }

    /// Property value after `elapsed_years` whole years of compounding.
    /// Saturates at `Decimal::MAX`.
    pub fn value_at(&self, base_price: Money, elapsed_years: u32) -> Money {
        let mut value = base_price;
        for year in 1..=elapsed_years {
            value = value.saturating_mul(self.growth_factor(year));
        }
        value
    }

    /// Values at the end of years 1..=years. Element `i` equals
    /// `value_at(base_price, i + 1)`.
    pub fn yearly_values(&self, base_price: Money, years: u32) -> Vec<Money> {
        let mut values = Vec::with_capacity(years as usize);
        let mut value = base_price;
        for year in 1..=years {
            value = value.saturating_mul(self.growth_factor(year));
            values.push(value);
        }
        values
    }

    /// Like [`yearly_values`](Self::yearly_values), but `None` as soon as a
    /// year overflows.
    pub fn checked_yearly_values(&self, base_price: Money, years: u32) -> Option<Vec<Money>> {
        let mut values = Vec::with_capacity(years as usize);
        let mut value = base_price;
        for year in 1..=years {
            value = value.checked_mul(self.growth_factor(year))?;
            values.push(value);
        }
        Some(values)
    }

    /// Value at an arbitrary month, linearly blended between the two
    /// bounding whole-year values.
    pub fn interpolate_months(&self, base_price: Money, months: u32) -> Money {
        let whole = months / 12;
        let rem = months % 12;
        let lower = self.value_at(base_price, whole);
        if rem == 0 {
            return lower;
        }
        let upper = lower.saturating_mul(self.growth_factor(whole + 1));
        lower + (upper - lower) * Decimal::from(rem) / dec!(12)
    }

    fn growth_factor(&self, year: u32) -> Decimal {
        Decimal::ONE + self.rates.rate_for(self.phase_for_year(year)) / dec!(100)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn scenario_rates() -> AppreciationRates {
        AppreciationRates {
            construction_pct: dec!(10),
            growth_pct: dec!(6),
            mature_pct: dec!(3),
            growth_period_years: 5,
        }
    }

    #[test]
    fn test_zero_years_returns_base_price() {
        let curve = AppreciationCurve::new(scenario_rates(), 24);
        assert_eq!(curve.value_at(dec!(1000000), 0), dec!(1000000));
    }

    #[test]
    fn test_construction_compounding() {
        let curve = AppreciationCurve::new(scenario_rates(), 24);
        // 1,000,000 * 1.10^2
        assert_eq!(curve.value_at(dec!(1000000), 2), dec!(1210000));
    }

    #[test]
    fn test_phase_boundaries() {
        let curve = AppreciationCurve::new(scenario_rates(), 24);
        assert_eq!(curve.phase_for_year(1), AppreciationPhase::Construction);
        assert_eq!(curve.phase_for_year(2), AppreciationPhase::Construction);
        assert_eq!(curve.phase_for_year(3), AppreciationPhase::Growth);
        assert_eq!(curve.phase_for_year(7), AppreciationPhase::Growth);
        assert_eq!(curve.phase_for_year(8), AppreciationPhase::Mature);
    }

    #[test]
    fn test_partial_construction_year_counts_as_growth() {
        // 30 months: years 1-2 end before handover, year 3 straddles it
        let curve = AppreciationCurve::new(scenario_rates(), 30);
        assert_eq!(curve.construction_years(), 2);
        assert_eq!(curve.phase_for_year(3), AppreciationPhase::Growth);
    }

    #[test]
    fn test_compounding_is_continuous_across_phases() {
        let curve = AppreciationCurve::new(scenario_rates(), 24);
        // 1.1^2 * 1.06
        assert_eq!(curve.value_at(dec!(1000000), 3), dec!(1282600));
    }

    #[test]
    fn test_yearly_values_match_value_at() {
        let curve = AppreciationCurve::new(scenario_rates(), 36);
        let values = curve.yearly_values(dec!(850000), 15);
        for (i, v) in values.iter().enumerate() {
            assert_eq!(*v, curve.value_at(dec!(850000), i as u32 + 1));
        }
    }

    #[test]
    fn test_interpolate_months() {
        let curve = AppreciationCurve::new(scenario_rates(), 24);
        // Halfway through year 3: 1,210,000 + (1,282,600 - 1,210,000) / 2
        assert_eq!(curve.interpolate_months(dec!(1000000), 30), dec!(1246300));
        assert_eq!(curve.interpolate_months(dec!(1000000), 24), dec!(1210000));
    }

    #[test]
    fn test_runaway_growth_saturates_instead_of_overflowing() {
        let rates = AppreciationRates {
            construction_pct: dec!(100),
            growth_pct: dec!(100),
            mature_pct: dec!(100),
            growth_period_years: 5,
        };
        let curve = AppreciationCurve::new(rates, 24);
        assert_eq!(curve.value_at(dec!(1000000), 200), Decimal::MAX);
        assert_eq!(curve.yearly_values(dec!(1000000), 200).last(), Some(&Decimal::MAX));
        assert!(curve.checked_yearly_values(dec!(1000000), 200).is_none());
        assert_eq!(curve.checked_yearly_values(dec!(1000000), 3).unwrap().len(), 3);
    }

    #[test]
    fn test_differentiator_adds_to_named_phase() {
        let diffs = vec![
            ValueDifferentiator {
                name: "Waterfront".into(),
                impacts_appreciation: true,
                phase: AppreciationPhase::Growth,
                bonus_pct: dec!(1.5),
            },
            ValueDifferentiator {
                name: "Gym".into(),
                impacts_appreciation: false,
                phase: AppreciationPhase::Growth,
                bonus_pct: dec!(5),
            },
        ];
        let adjusted = apply_differentiators(&scenario_rates(), &diffs);
        assert_eq!(adjusted.growth_pct, dec!(7.5));
        assert_eq!(adjusted.construction_pct, dec!(10));
        assert_eq!(adjusted.mature_pct, dec!(3));
    }

    #[test]
    fn test_average_and_volatility() {
        let r = scenario_rates();
        assert_eq!(r.volatility_pct(), dec!(7));
        assert!((r.average_pct() - dec!(6.333333)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_default_rates() {
        let r = AppreciationRates::default();
        assert_eq!(r.construction_pct, dec!(12));
        assert_eq!(r.growth_pct, dec!(8));
        assert_eq!(r.mature_pct, dec!(4));
    }
}
