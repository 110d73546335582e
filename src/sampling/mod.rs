//! Stratified sampling: rules, the engine that runs them, and its result.
//!
//! ```text
//!   filtered rows ──► rule 1 ──► stratum sample 1 ┐
//!                 ├─► rule 2 ──► stratum sample 2 ├─► SampleResult + Summary
//!                 └─► rule n ──► stratum sample n ┘
//! ```
//!
//! Every rule sees the same filtered rows; rules do not consume rows from
//! each other.

pub mod engine;
pub mod result;
pub mod rule;

pub use engine::{run, validate};
pub use result::{NumericStats, RuleCount, SampleResult, SampledRow, StratumSample, Summary};
pub use rule::{draw, SampleSize, SamplingRule, SelectionMethod, Stratum};
