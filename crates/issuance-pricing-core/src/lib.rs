pub mod api;
pub mod error;
pub mod pricing;
pub mod types;

#[cfg(feature = "proposal")]
pub mod proposal;

pub use error::PricingError;
pub use types::*;

/// Standard result type for all pricing operations
pub type PricingResult<T> = Result<T, PricingError>;
