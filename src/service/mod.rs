//! Validation shared by the record types.

mod validation;
pub use validation::ValidationRule;
