pub mod aggregate;
pub mod capped;
mod checked;
pub mod catalog;
pub mod combination;
pub mod gross_up;
pub mod line_item;
pub mod quote;
pub mod registry;
pub mod tiered;
pub mod variable;

pub use aggregate::{aggregate, CostSummary};
pub use capped::{compute_capped, CappedAmount, CappedRate};
pub use catalog::{resolve_catalog, FeeCatalogRow};
pub use combination::{resolve, CatalogKey, Combination, VariableFee, VariableFormulaSet};
pub use gross_up::{gross_up, normalize_gross_up_rate};
pub use line_item::{FeeDetails, FeeLineItem, FeeOrigin, PricingMode, RecurrencePeriod};
pub use quote::{calculate_issuance_costs, IssuanceCostOutput, SeriesCost};
pub use registry::{FeeSchedule, RateTableSnapshot};
pub use tiered::{compute_tiered, Bracket, BracketTable, TieredResult};
