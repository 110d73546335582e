use rand::Rng;

use super::result::{numeric_totals, SampleResult, SampledRow, StratumSample};
use super::rule::{draw, SampleSize, SamplingRule};
use crate::data::filter::{filtered_indices, validate_filters, DimensionalFilter};
use crate::data::model::Dataset;
use crate::error::{EmptyDatasetError, InvalidRuleError, RuleViolation, SamplingError};

/// Check filters and rules against the dataset without sampling anything.
///
/// The first bad filter fails the check; rule problems are collected over
/// the whole rule set and reported together.
pub fn validate(
    dataset: &Dataset,
    filters: &[DimensionalFilter],
    rules: &[SamplingRule],
) -> Result<(), SamplingError> {
    validate_filters(dataset, filters)?;

    let violations: Vec<RuleViolation> = rules
        .iter()
        .enumerate()
        .flat_map(|(rule_index, rule)| {
            rule.problems(dataset)
                .into_iter()
                .map(move |problem| RuleViolation {
                    rule_index,
                    rule_name: rule.name.clone(),
                    problem,
                })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(InvalidRuleError { violations }.into())
    }
}

/// Draw a stratified sample.
///
/// Filters are AND-combined, then every rule is applied to the filtered
/// rows independently and in order, so a row can be drawn by several
/// rules. Without a `seed` a fresh one is drawn; the seed used is stored in
/// the result.
pub fn run(
    dataset: &Dataset,
    filters: &[DimensionalFilter],
    rules: &[SamplingRule],
    seed: Option<u64>,
) -> Result<SampleResult, SamplingError> {
    validate(dataset, filters, rules)?;

    let filtered = filtered_indices(dataset, filters);
    log::info!(
        "{} of {} rows pass {} filter(s)",
        filtered.len(),
        dataset.len(),
        filters.len()
    );

    if filtered.is_empty() {
        let percentage_rules: Vec<String> = rules
            .iter()
            .filter(|r| matches!(r.size, SampleSize::Percentage(_)))
            .map(|r| r.name.clone())
            .collect();
        if !percentage_rules.is_empty() {
            return Err(EmptyDatasetError {
                rules: percentage_rules,
            }
            .into());
        }
    }

    let seed = seed.unwrap_or_else(|| rand::rng().random());

    let strata = rules
        .iter()
        .map(|rule| {
            let candidates = rule.candidates(dataset, &filtered);
            let target = rule.target(candidates.len());
            let rows: Vec<SampledRow> = draw(rule.method, &candidates, target, seed)
                .into_iter()
                .map(|row_index| SampledRow {
                    row_index,
                    record: dataset.records[row_index].clone(),
                })
                .collect();
            log::debug!(
                "rule '{}': {} candidates, target {}, sampled {}",
                rule.name,
                candidates.len(),
                target,
                rows.len()
            );

            StratumSample {
                rule_name: rule.name.clone(),
                description: rule.to_string(),
                candidates: candidates.len(),
                target,
                numeric: numeric_totals(&dataset.columns, &rows),
                rows,
            }
        })
        .collect();

    let result = SampleResult::assemble(
        seed,
        dataset.len(),
        filtered.len(),
        dataset.columns.clone(),
        strata,
    );
    log::info!(
        "sampled {} row(s) ({} distinct) over {} rule(s), seed {}",
        result.summary.total_sampled,
        result.summary.distinct_rows,
        rules.len(),
        seed
    );
    Ok(result)
}
