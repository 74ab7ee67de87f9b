pub mod error;
pub mod types;

pub mod appreciation;
pub mod calendar;
pub mod defaults;
pub mod exit;
pub mod inputs;
pub mod mortgage;
pub mod payment_schedule;
pub mod projection;
pub mod quote;
pub mod rental;

#[cfg(feature = "recommendation")]
pub mod recommendation;

#[cfg(feature = "schema")]
pub mod schema;

pub use error::OffplanError;
pub use inputs::InvestmentInputs;
pub use quote::{quote_investment, QuoteResult};
pub use types::*;

/// Standard result type for all quote engine operations
pub type OffplanResult<T> = Result<T, OffplanError>;
