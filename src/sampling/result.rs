use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::data::model::{ColumnSchema, ColumnType, Record};

/// A sampled record and its position in the source dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledRow {
    pub row_index: usize,
    pub record: Record,
}

/// Count, sum and mean of the non-empty values of one NUMBER column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
}

/// Totals for every NUMBER column that has at least one value in `rows`.
pub fn numeric_totals<'a>(
    columns: &[ColumnSchema],
    rows: impl IntoIterator<Item = &'a SampledRow> + Clone,
) -> BTreeMap<String, NumericStats> {
    columns
        .iter()
        .filter(|c| c.column_type() == ColumnType::Number)
        .filter_map(|column| {
            let (count, sum) = rows
                .clone()
                .into_iter()
                .filter_map(|row| row.record.get(&column.name).and_then(|v| v.as_f64()))
                .fold((0usize, 0.0f64), |(n, s), v| (n + 1, s + v));
            (count > 0).then(|| {
                let stats = NumericStats {
                    count,
                    sum,
                    mean: sum / count as f64,
                };
                (column.name.clone(), stats)
            })
        })
        .collect()
}

/// The sample drawn by one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratumSample {
    pub rule_name: String,
    /// Human-readable rule description at the time of the run.
    pub description: String,
    /// Rows of the filtered dataset that fell into the stratum.
    pub candidates: usize,
    /// Rows the rule asked for.
    pub target: usize,
    /// Sampled rows, in dataset order.
    pub rows: Vec<SampledRow>,
    pub numeric: BTreeMap<String, NumericStats>,
}

impl StratumSample {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCount {
    pub rule_name: String,
    pub candidates: usize,
    pub sampled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Sampled rows over all rules. A row drawn by two rules counts twice.
    pub total_sampled: usize,
    /// Distinct dataset rows among the sampled rows.
    pub distinct_rows: usize,
    pub per_rule: Vec<RuleCount>,
    /// Totals over every sampled row, duplicates included.
    pub numeric: BTreeMap<String, NumericStats>,
}

/// Outcome of one sampling run. Strata are in rule order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    /// Seed the random rules were drawn with; rerun with it to reproduce.
    pub seed: u64,
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub columns: Vec<ColumnSchema>,
    pub strata: Vec<StratumSample>,
    pub summary: Summary,
}

impl SampleResult {
    pub(crate) fn assemble(
        seed: u64,
        total_rows: usize,
        filtered_rows: usize,
        columns: Vec<ColumnSchema>,
        strata: Vec<StratumSample>,
    ) -> Self {
        let all_rows = strata.iter().flat_map(|s| &s.rows);
        let summary = Summary {
            total_sampled: strata.iter().map(StratumSample::len).sum(),
            distinct_rows: all_rows
                .clone()
                .map(|r| r.row_index)
                .collect::<BTreeSet<_>>()
                .len(),
            per_rule: strata
                .iter()
                .map(|s| RuleCount {
                    rule_name: s.rule_name.clone(),
                    candidates: s.candidates,
                    sampled: s.len(),
                })
                .collect(),
            numeric: numeric_totals(&columns, all_rows),
        };

        Self {
            seed,
            total_rows,
            filtered_rows,
            columns,
            strata,
            summary,
        }
    }

    /// Every sampled row with the name of the rule that drew it, rules in
    /// configured order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &SampledRow)> {
        self.strata
            .iter()
            .flat_map(|s| s.rows.iter().map(move |row| (s.rule_name.as_str(), row)))
    }

    pub fn stratum(&self, rule_name: &str) -> Option<&StratumSample> {
        self.strata.iter().find(|s| s.rule_name == rule_name)
    }

    pub fn is_empty(&self) -> bool {
        self.summary.total_sampled == 0
    }
}
