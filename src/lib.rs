//! Stratified audit sampling over tabular financial data.
//!
//! Load a dataset ([`data::loader`]), narrow it with dimensional filters
//! ([`data::filter`]), draw one sample per rule ([`sampling`]) and write the
//! result out ([`export`]). [`session::Session`] bundles these steps for
//! interactive front ends; [`config::SamplingConfig`] is the saved form of
//! a filter and rule set.

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod format;
pub mod sampling;
pub mod session;

pub use config::SamplingConfig;
pub use data::filter::{Condition, DimensionalFilter};
pub use data::loader::{load_file, LoadOptions};
pub use data::model::{CellValue, ColumnKind, ColumnType, Dataset, Record};
pub use error::{EmptyDatasetError, InvalidFilterError, InvalidRuleError, SamplingError};
pub use sampling::{SampleResult, SampleSize, SamplingRule, SelectionMethod, Stratum};
pub use session::Session;
