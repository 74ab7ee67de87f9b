use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::types::{Money, Percent};

const DEFAULT_OCCUPANCY_PCT: Decimal = dec!(70);
const DEFAULT_STR_EXPENSE_PCT: Decimal = dec!(20);
const DEFAULT_STR_MANAGEMENT_PCT: Decimal = dec!(15);
const NIGHTS_PER_YEAR: Decimal = dec!(365);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStrategy {
    #[default]
    LongTerm,
    ShortTerm,
}

/// What the long-term yield is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldBasis {
    /// Yield on the purchase price, then grown by the rent growth rate
    #[default]
    PurchasePrice,
    /// Yield on the value at the first rental year, then grown by the rent
    /// growth rate
    PropertyValue,
}

/// Holiday-home style income assumptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortTermRentalInputs {
    /// Average daily rate
    pub adr: Money,
    pub occupancy_pct: Percent,
    /// Utilities, cleaning, platform fees as a share of gross
    pub expense_pct: Percent,
    pub management_pct: Percent,
    pub adr_growth_pct: Percent,
}

impl Default for ShortTermRentalInputs {
    fn default() -> Self {
        Self {
            adr: Decimal::ZERO,
            occupancy_pct: DEFAULT_OCCUPANCY_PCT,
            expense_pct: DEFAULT_STR_EXPENSE_PCT,
            management_pct: DEFAULT_STR_MANAGEMENT_PCT,
            adr_growth_pct: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RentAssumptions {
    pub strategy: RentalStrategy,
    pub rental_yield_pct: Percent,
    pub yield_basis: YieldBasis,
    pub rent_growth_pct: Percent,
    pub service_charge_per_sqft: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_term: Option<ShortTermRentalInputs>,
}

impl Default for RentAssumptions {
    fn default() -> Self {
        Self {
            strategy: RentalStrategy::LongTerm,
            rental_yield_pct: defaults::RENTAL_YIELD_PCT,
            yield_basis: YieldBasis::PurchasePrice,
            rent_growth_pct: Decimal::ZERO,
            service_charge_per_sqft: Decimal::ZERO,
            short_term: None,
        }
    }
}

/// Rental figures for one projection year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalYear {
    pub occupied_months: u32,
    pub gross_rent: Money,
    pub service_charges: Money,
    pub net_rent: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_gross_rent: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_net_rent: Option<Money>,
}

impl RentalYear {
    fn vacant(with_alt: bool) -> Self {
        let alt = with_alt.then_some(Decimal::ZERO);
        Self {
            occupied_months: 0,
            gross_rent: Decimal::ZERO,
            service_charges: Decimal::ZERO,
            net_rent: Decimal::ZERO,
            alt_gross_rent: alt,
            alt_net_rent: alt,
        }
    }
}

// ---------------------------------------------------------------------------
// Projector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RentalProjector<'a> {
    assumptions: &'a RentAssumptions,
    base_price: Money,
    unit_size_sqft: Decimal,
    handover_month: u32,
    start_value: Option<Money>,
}

impl<'a> RentalProjector<'a> {
    /// `handover_month` is the booking-to-handover distance in months.
    pub fn new(
        assumptions: &'a RentAssumptions,
        base_price: Money,
        unit_size_sqft: Decimal,
        handover_month: u32,
    ) -> Self {
        Self {
            assumptions,
            base_price,
            unit_size_sqft,
            handover_month,
            start_value: None,
        }
    }

    /// Property value in the first rental year, the anchor for
    /// [`YieldBasis::PropertyValue`]. Without it the value passed to
    /// [`project_year`](Self::project_year) is taken as the anchor.
    pub fn with_start_value(mut self, value: Money) -> Self {
        self.start_value = Some(value);
        self
    }

    /// Whether the short-term stream is the primary one.
    pub fn short_term_primary(&self) -> bool {
        self.assumptions.strategy == RentalStrategy::ShortTerm
            && self.assumptions.short_term.is_some()
    }

    /// First projection year (1-based) with any rental income.
    pub fn first_rental_year(&self) -> u32 {
        self.handover_month / 12 + 1
    }

    /// Months of year `year` (1-based) during which the unit is deliverable.
    pub fn occupied_months(&self, year: u32) -> u32 {
        let year_start = (year.saturating_sub(1)) * 12;
        let year_end = year * 12;
        if self.handover_month >= year_end {
            0
        } else {
            year_end - self.handover_month.max(year_start)
        }
    }

    /// Rental income for year `year`, given the property value at that year.
    pub fn project_year(&self, year: u32, property_value: Money) -> RentalYear {
        let has_alt = self.assumptions.short_term.is_some();
        let occupied = self.occupied_months(year);
        if occupied == 0 {
            return RentalYear::vacant(has_alt);
        }

        let elapsed = year - self.first_rental_year();
        let proration = Decimal::from(occupied) / dec!(12);

        let service_charges = self.unit_size_sqft
            * self.assumptions.service_charge_per_sqft
            * growth_multiplier(defaults::SERVICE_CHARGE_INFLATION_PCT, elapsed)
            * proration;

        let long_term_gross = self.long_term_annual_gross(property_value, elapsed) * proration;
        let short_term = self
            .assumptions
            .short_term
            .as_ref()
            .map(|st| short_term_annual(st, elapsed));

        let (gross_rent, primary_operating, alt_gross, alt_operating) = match short_term {
            Some((st_gross, st_net)) if self.short_term_primary() => (
                st_gross * proration,
                st_net * proration,
                Some(long_term_gross),
                Some(long_term_gross),
            ),
            Some((st_gross, st_net)) => (
                long_term_gross,
                long_term_gross,
                Some(st_gross * proration),
                Some(st_net * proration),
            ),
            None => (long_term_gross, long_term_gross, None, None),
        };

        RentalYear {
            occupied_months: occupied,
            gross_rent,
            service_charges,
            net_rent: primary_operating - service_charges,
            alt_gross_rent: alt_gross,
            alt_net_rent: alt_operating.map(|op| op - service_charges),
        }
    }

    fn long_term_annual_gross(&self, property_value: Money, elapsed: u32) -> Money {
        let yield_frac = self.assumptions.rental_yield_pct / dec!(100);
        match self.assumptions.yield_basis {
            YieldBasis::PurchasePrice => {
                self.base_price
                    * yield_frac
                    * growth_multiplier(self.assumptions.rent_growth_pct, elapsed)
            }
            YieldBasis::PropertyValue => {
                self.start_value.unwrap_or(property_value)
                    * yield_frac
                    * growth_multiplier(self.assumptions.rent_growth_pct, elapsed)
            }
        }
    }
}

/// Annual (gross, net-of-operating-costs) short-term income.
fn short_term_annual(st: &ShortTermRentalInputs, elapsed: u32) -> (Money, Money) {
    let gross = st.adr
        * NIGHTS_PER_YEAR
        * st.occupancy_pct
        / dec!(100)
        * growth_multiplier(st.adr_growth_pct, elapsed);
    let costs = gross * (st.expense_pct + st.management_pct) / dec!(100);
    (gross, gross - costs)
}

/// (1 + rate/100)^periods by repeated multiplication, saturating at
/// `Decimal::MAX`.
fn growth_multiplier(rate_pct: Percent, periods: u32) -> Decimal {
    let step = Decimal::ONE + rate_pct / dec!(100);
    let mut m = Decimal::ONE;
    for _ in 0..periods {
        m = m.saturating_mul(step);
    }
    m
}

/// (1 + rate/100)^periods, `None` on overflow.
pub(crate) fn checked_growth_multiplier(rate_pct: Percent, periods: u32) -> Option<Decimal> {
    let step = Decimal::ONE + rate_pct / dec!(100);
    (0..periods).try_fold(Decimal::ONE, |m, _| m.checked_mul(step))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
