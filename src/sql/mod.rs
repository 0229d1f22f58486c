//! SQL for the record tables: identifiers from static layouts only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::PgBindValue;
