use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Appreciation phases (percent per year)
pub const CONSTRUCTION_APPRECIATION_PCT: Decimal = dec!(12);
pub const GROWTH_APPRECIATION_PCT: Decimal = dec!(8);
pub const MATURE_APPRECIATION_PCT: Decimal = dec!(4);
pub const GROWTH_PERIOD_YEARS: u32 = 5;

// Horizon
pub const HOLDING_PERIOD_YEARS: u32 = 10;
pub const MIN_HORIZON_YEARS: u32 = 10;

// Entry and exit costs
pub const REGISTRATION_FEE_PCT: Decimal = dec!(4);
pub const AGENT_COMMISSION_PCT: Decimal = dec!(2);
pub const MIN_EXIT_THRESHOLD_PCT: Decimal = dec!(30);

// Rent
pub const RENTAL_YIELD_PCT: Decimal = dec!(6);

/// Fixed annual escalation of service charges. Not user-configurable.
pub const SERVICE_CHARGE_INFLATION_PCT: Decimal = dec!(2);

// Recommendation reference points (months after booking)
pub const REFERENCE_EXIT_MONTH: u32 = 60;
pub const LONG_HORIZON_EXIT_MONTH: u32 = 120;

/// Standard exit points analysed when the caller requests none, in addition
/// to the handover month itself.
pub const STANDARD_EXIT_MONTHS: [u32; 3] = [36, 60, 120];

// Supported ranges. Inputs outside them are rejected rather than computed.
pub const MAX_HORIZON_YEARS: u32 = 100;
pub const MAX_MORTGAGE_TERM_YEARS: u32 = 50;
pub const MAX_PROJECTED_VALUE: Decimal = dec!(1000000000000000);
/// Ceiling on a compounded rent or ADR growth factor over the horizon
pub const MAX_GROWTH_MULTIPLE: Decimal = dec!(1000000);
