use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid bracket configuration in {table}: {reason}")]
    InvalidBracketConfiguration { table: String, reason: String },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Arithmetic overflow in {context}")]
    Overflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PricingError {
    /// HTTP-equivalent status for the JSON boundary: caller mistakes are 400,
    /// everything else is unexpected.
    pub fn status_code(&self) -> u16 {
        match self {
            PricingError::InvalidInput { .. } | PricingError::SerializationError(_) => 400,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::SerializationError(e.to_string())
    }
}
