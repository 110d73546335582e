use std::fmt;

use thiserror::Error;

use crate::data::model::ColumnType;

/// Why a dimensional filter cannot be applied to a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterProblem {
    UnknownColumn,
    OperatorMismatch {
        operator: &'static str,
        column_type: ColumnType,
    },
}

impl fmt::Display for FilterProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterProblem::UnknownColumn => write!(f, "column does not exist"),
            FilterProblem::OperatorMismatch {
                operator,
                column_type,
            } => write!(f, "operator `{operator}` is not valid for a {column_type} column"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid filter #{filter_index} on `{column}`: {problem}")]
pub struct InvalidFilterError {
    pub filter_index: usize,
    pub column: String,
    pub problem: FilterProblem,
}

/// One thing wrong with a sampling rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleProblem {
    #[error("rule has no name")]
    MissingName,
    #[error("no dimension column given")]
    MissingDimension,
    #[error("dimension column `{0}` does not exist")]
    UnknownColumn(String),
    #[error("criterion on `{column}`: {problem}")]
    InvalidCriterion {
        column: String,
        problem: FilterProblem,
    },
    #[error("sample count must be positive")]
    NonPositiveCount,
    #[error("sample percentage {0} is outside (0, 100]")]
    PercentageOutOfRange(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("rule #{rule_index} `{rule_name}`: {problem}")]
pub struct RuleViolation {
    pub rule_index: usize,
    pub rule_name: String,
    pub problem: RuleProblem,
}

/// Every violation found in a rule set, reported together.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct InvalidRuleError {
    pub violations: Vec<RuleViolation>,
}

impl fmt::Display for InvalidRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid rule setting(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

/// The filtered dataset is empty but some rules are sized by percentage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("filters leave no rows, cannot size percentage rule(s): {}", .rules.join(", "))]
pub struct EmptyDatasetError {
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilterError),
    #[error(transparent)]
    InvalidRules(#[from] InvalidRuleError),
    #[error(transparent)]
    EmptyDataset(#[from] EmptyDatasetError),
}
