pub mod calculators;
pub mod quote;
pub mod resolve;
pub mod tables;
pub mod transition;
