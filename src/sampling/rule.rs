use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::filter::DimensionalFilter;
use crate::data::model::{Dataset, Record};
use crate::error::{FilterProblem, RuleProblem};

// ---------------------------------------------------------------------------
// Stratum: which rows a rule draws from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stratum {
    /// Every filtered row.
    All,
    /// Rows whose `column` equals `value`.
    Value { column: String, value: String },
    /// Rows passing an extra single-column criterion.
    Filter(DimensionalFilter),
}

impl Stratum {
    pub fn value(column: impl Into<String>, value: impl Into<String>) -> Self {
        Stratum::Value {
            column: column.into(),
            value: value.into(),
        }
    }

    /// The dimension column, if the stratum has one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Stratum::All => None,
            Stratum::Value { column, .. } => Some(column),
            Stratum::Filter(filter) => Some(&filter.column),
        }
    }

    /// Whether `record` (a row of `dataset`) falls into the stratum. A
    /// `Value` literal is read in the notation of the dataset's column.
    pub fn matches(&self, dataset: &Dataset, record: &Record) -> bool {
        match self {
            Stratum::All => true,
            Stratum::Value { column, value } => {
                let Some(schema) = dataset.column(column) else {
                    return false;
                };
                record
                    .get(column)
                    .is_some_and(|cell| cell.matches_literal(value, &schema.kind))
            }
            Stratum::Filter(filter) => filter.matches(record),
        }
    }

    fn problem(&self, dataset: &Dataset) -> Option<RuleProblem> {
        let column = self.column()?;
        if column.trim().is_empty() {
            return Some(RuleProblem::MissingDimension);
        }
        match self {
            Stratum::Filter(filter) => match filter.check(dataset) {
                Ok(()) => None,
                Err(FilterProblem::UnknownColumn) => {
                    Some(RuleProblem::UnknownColumn(column.to_string()))
                }
                Err(problem) => Some(RuleProblem::InvalidCriterion {
                    column: column.to_string(),
                    problem,
                }),
            },
            _ if dataset.column(column).is_none() => {
                Some(RuleProblem::UnknownColumn(column.to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stratum::All => write!(f, "all rows"),
            Stratum::Value { column, value } => write!(f, "{column} = {value}"),
            Stratum::Filter(filter) => write!(f, "{filter}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sample size and selection method
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSize {
    /// A fixed number of rows.
    Count(usize),
    /// A share of the stratum, in percent, rounded up.
    Percentage(f64),
}

impl SampleSize {
    /// Number of rows wanted from a stratum of `candidates` rows.
    pub fn target(&self, candidates: usize) -> usize {
        match *self {
            SampleSize::Count(n) => n,
            SampleSize::Percentage(p) => {
                // Subtract a hair so 10% of 30 stays 3 despite float error.
                let wanted = ((p * candidates as f64) / 100.0 - 1e-9).ceil().max(0.0) as usize;
                if p > 0.0 && candidates > 0 {
                    wanted.max(1)
                } else {
                    wanted
                }
            }
        }
    }

    fn problem(&self) -> Option<RuleProblem> {
        match *self {
            SampleSize::Count(0) => Some(RuleProblem::NonPositiveCount),
            SampleSize::Count(_) => None,
            SampleSize::Percentage(p) if !p.is_finite() || p <= 0.0 || p > 100.0 => {
                Some(RuleProblem::PercentageOutOfRange(p))
            }
            SampleSize::Percentage(_) => None,
        }
    }
}

impl fmt::Display for SampleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleSize::Count(n) => write!(f, "{n} rows"),
            SampleSize::Percentage(p) => write!(f, "{p}%"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Uniform without replacement, seeded.
    #[default]
    Random,
    /// The first rows in dataset order.
    FirstN,
    /// Systematic sampling: every k-th row from `offset`, with
    /// `k = ceil(candidates / target)`.
    EveryNth {
        #[serde(default)]
        offset: usize,
    },
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMethod::Random => write!(f, "random"),
            SelectionMethod::FirstN => write!(f, "first N"),
            SelectionMethod::EveryNth { offset: 0 } => write!(f, "every Nth"),
            SelectionMethod::EveryNth { offset } => write!(f, "every Nth from {offset}"),
        }
    }
}

/// Pick `target` items out of `candidates` with `method`.
///
/// Asking for at least as many items as there are returns all of them. The
/// result keeps the candidates' order, and for [`SelectionMethod::Random`]
/// the same seed and candidates always give the same items.
pub fn draw<T: Copy>(method: SelectionMethod, candidates: &[T], target: usize, seed: u64) -> Vec<T> {
    if target >= candidates.len() {
        return candidates.to_vec();
    }
    if target == 0 {
        return Vec::new();
    }
    match method {
        SelectionMethod::Random => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut picked = rand::seq::index::sample(&mut rng, candidates.len(), target).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|i| candidates[i]).collect()
        }
        SelectionMethod::FirstN => candidates[..target].to_vec(),
        SelectionMethod::EveryNth { offset } => {
            let step = candidates.len().div_ceil(target);
            candidates
                .iter()
                .skip(offset % step)
                .step_by(step)
                .take(target)
                .copied()
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// SamplingRule
// ---------------------------------------------------------------------------

/// One stratum of the sample: where to draw from, how many, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingRule {
    pub name: String,
    pub stratum: Stratum,
    pub size: SampleSize,
    #[serde(default)]
    pub method: SelectionMethod,
}

impl SamplingRule {
    pub fn new(name: impl Into<String>, stratum: Stratum, size: SampleSize) -> Self {
        Self {
            name: name.into(),
            stratum,
            size,
            method: SelectionMethod::default(),
        }
    }

    pub fn with_method(mut self, method: SelectionMethod) -> Self {
        self.method = method;
        self
    }

    /// Indices out of `rows` that fall into this rule's stratum, in order.
    pub fn candidates(&self, dataset: &Dataset, rows: &[usize]) -> Vec<usize> {
        rows.iter()
            .copied()
            .filter(|&i| {
                dataset
                    .records
                    .get(i)
                    .is_some_and(|record| self.stratum.matches(dataset, record))
            })
            .collect()
    }

    pub fn target(&self, candidates: usize) -> usize {
        self.size.target(candidates)
    }

    /// Draw this rule's sample from `rows` (usually the filtered rows).
    pub fn apply(&self, dataset: &Dataset, rows: &[usize], seed: u64) -> Vec<usize> {
        let candidates = self.candidates(dataset, rows);
        draw(self.method, &candidates, self.target(candidates.len()), seed)
    }

    /// Everything wrong with this rule against `dataset`; empty when valid.
    pub fn problems(&self, dataset: &Dataset) -> Vec<RuleProblem> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push(RuleProblem::MissingName);
        }
        problems.extend(self.stratum.problem(dataset));
        problems.extend(self.size.problem());
        problems
    }
}

impl fmt::Display for SamplingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}, {})",
            self.name, self.stratum, self.size, self.method
        )
    }
}
