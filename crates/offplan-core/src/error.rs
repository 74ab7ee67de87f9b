use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OffplanError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Payment plan imbalance: scheduled {total_pct}% of price (expected 100%)")]
    ScheduleImbalance { total_pct: Decimal },

    #[error("Unsupported schema version: {0}")]
    UnsupportedSchema(u32),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl OffplanError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        OffplanError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for OffplanError {
    fn from(e: serde_json::Error) -> Self {
        OffplanError::SerializationError(e.to_string())
    }
}
