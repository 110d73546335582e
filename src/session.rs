use std::collections::BTreeSet;

use anyhow::{bail, Result};

use crate::config::{Pruned, SamplingConfig};
use crate::data::filter::{filtered_indices, DimensionalFilter};
use crate::data::model::{CellValue, Dataset};
use crate::error::{InvalidFilterError, InvalidRuleError, RuleViolation, SamplingError};
use crate::sampling::{self, SampleResult, SamplingRule};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One auditor's working state: a dataset, the filters and rules being
/// edited for it, and the last sample drawn. Front ends hold one of these
/// instead of reaching for global state.
#[derive(Debug, Default)]
pub struct Session {
    /// Loaded dataset (None until one is set).
    dataset: Option<Dataset>,

    /// Global filters, AND-combined.
    filters: Vec<DimensionalFilter>,

    /// Sampling rules in the order they run.
    rules: Vec<SamplingRule>,

    /// Indices of rows passing the current filters (cached).
    filtered: Vec<usize>,

    /// Result of the last run, cleared when filters, rules or data change.
    result: Option<SampleResult>,
}

impl Session {
    pub fn new(dataset: Dataset) -> Self {
        let mut session = Self::default();
        session.set_dataset(dataset);
        session
    }

    /// Swap in a new dataset. Filters and rules are cleared.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.filtered = (0..dataset.len()).collect();
        self.filters.clear();
        self.rules.clear();
        self.result = None;
        self.dataset = Some(dataset);
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    fn require_dataset(&self) -> Result<&Dataset> {
        match &self.dataset {
            Some(ds) => Ok(ds),
            None => bail!("No dataset loaded"),
        }
    }

    // -- filters --

    pub fn filters(&self) -> &[DimensionalFilter] {
        &self.filters
    }

    /// Add a filter after checking it against the dataset.
    pub fn add_filter(&mut self, filter: DimensionalFilter) -> Result<()> {
        self.check_filter(self.filters.len(), &filter)?;
        self.filters.push(filter);
        self.refilter();
        Ok(())
    }

    pub fn update_filter(&mut self, index: usize, filter: DimensionalFilter) -> Result<()> {
        if index >= self.filters.len() {
            bail!("No filter at position {index}");
        }
        self.check_filter(index, &filter)?;
        self.filters[index] = filter;
        self.refilter();
        Ok(())
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<DimensionalFilter> {
        if index >= self.filters.len() {
            return None;
        }
        let removed = self.filters.remove(index);
        self.refilter();
        Some(removed)
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.refilter();
    }

    fn check_filter(&self, index: usize, filter: &DimensionalFilter) -> Result<(), InvalidFilterError> {
        match &self.dataset {
            Some(ds) => filter.validate(index, ds),
            None => Ok(()),
        }
    }

    /// Recompute the filtered rows after a filter change.
    fn refilter(&mut self) {
        if let Some(ds) = &self.dataset {
            self.filtered = filtered_indices(ds, &self.filters);
        }
        self.result = None;
    }

    /// Rows passing the current filters.
    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// Columns that do not have a filter yet, in dataset order. The filter at
    /// `editing` (if any) does not count, so its own column stays available.
    pub fn available_filter_columns(&self, editing: Option<usize>) -> Vec<String> {
        let taken: BTreeSet<&str> = self
            .filters
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != editing)
            .map(|(_, f)| f.column.as_str())
            .collect();
        self.dataset
            .iter()
            .flat_map(|ds| ds.column_names())
            .filter(|name| !taken.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Distinct values of a TEXT column, for offering equals-filter choices.
    pub fn distinct_values(&self, column: &str) -> Option<&BTreeSet<CellValue>> {
        self.dataset.as_ref()?.unique_values.get(column)
    }

    // -- rules --

    pub fn rules(&self) -> &[SamplingRule] {
        &self.rules
    }

    /// Add a rule after checking it against the dataset.
    pub fn add_rule(&mut self, rule: SamplingRule) -> Result<()> {
        self.check_rule(self.rules.len(), &rule)?;
        self.rules.push(rule);
        self.result = None;
        Ok(())
    }

    pub fn update_rule(&mut self, index: usize, rule: SamplingRule) -> Result<()> {
        if index >= self.rules.len() {
            bail!("No rule at position {index}");
        }
        self.check_rule(index, &rule)?;
        self.rules[index] = rule;
        self.result = None;
        Ok(())
    }

    pub fn remove_rule(&mut self, index: usize) -> Option<SamplingRule> {
        if index >= self.rules.len() {
            return None;
        }
        self.result = None;
        Some(self.rules.remove(index))
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
        self.result = None;
    }

    fn check_rule(&self, rule_index: usize, rule: &SamplingRule) -> Result<(), InvalidRuleError> {
        let Some(ds) = &self.dataset else {
            return Ok(());
        };
        let violations: Vec<RuleViolation> = rule
            .problems(ds)
            .into_iter()
            .map(|problem| RuleViolation {
                rule_index,
                rule_name: rule.name.clone(),
                problem,
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(InvalidRuleError { violations })
        }
    }

    /// How many filtered rows fall into `rule`'s stratum.
    pub fn count_available_for_rule(&self, rule: &SamplingRule) -> usize {
        match &self.dataset {
            Some(ds) => rule.candidates(ds, &self.filtered).len(),
            None => 0,
        }
    }

    // -- sampling --

    /// Run the current filters and rules and keep the result.
    pub fn run(&mut self, seed: Option<u64>) -> Result<&SampleResult> {
        let ds = self.require_dataset()?;
        let result: Result<SampleResult, SamplingError> =
            sampling::run(ds, &self.filters, &self.rules, seed);
        Ok(self.result.insert(result?))
    }

    pub fn last_result(&self) -> Option<&SampleResult> {
        self.result.as_ref()
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    // -- configuration --

    /// Snapshot the current filters and rules.
    pub fn to_config(&self, name: impl Into<String>) -> SamplingConfig {
        let mut config = match &self.dataset {
            Some(ds) => SamplingConfig::for_dataset(name, ds),
            None => SamplingConfig::new(name),
        };
        config.filters = self.filters.clone();
        config.rules = self.rules.clone();
        config
    }

    /// Replace filters and rules with those of `config`. Entries on columns
    /// the dataset lacks are dropped; the rest are validated as a whole.
    pub fn apply_config(&mut self, mut config: SamplingConfig) -> Result<Pruned> {
        let ds = self.require_dataset()?;
        let pruned = config.prune_for(ds);
        sampling::validate(ds, &config.filters, &config.rules)?;

        self.filters = config.filters;
        self.rules = config.rules;
        self.refilter();
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{SampleSize, Stratum};

    fn session() -> Session {
        let rows = (0..12)
            .map(|i| {
                vec![
                    format!("B-{i}"),
                    ["DT", "KR", "AB"][i % 3].to_string(),
                    format!("{}", (i + 1) * 250),
                ]
            })
            .collect();
        Session::new(Dataset::from_raw(
            vec!["id".into(), "category".into(), "amount".into()],
            rows,
        ))
    }

    #[test]
    fn filters_update_the_filtered_count() {
        let mut s = session();
        assert_eq!(s.filtered_len(), 12);

        s.add_filter(DimensionalFilter::range("amount", Some(1000.0), None)).unwrap();
        assert_eq!(s.filtered_len(), 9);

        s.update_filter(0, DimensionalFilter::range("amount", None, Some(500.0))).unwrap();
        assert_eq!(s.filtered_len(), 2);

        assert!(s.remove_filter(0).is_some());
        assert_eq!(s.filtered_len(), 12);
        assert!(s.remove_filter(0).is_none());
    }

    #[test]
    fn invalid_filters_and_rules_are_refused() {
        let mut s = session();
        assert!(s.add_filter(DimensionalFilter::contains("amount", "1")).is_err());
        assert!(s.filters().is_empty());

        let bad = SamplingRule::new("", Stratum::value("missing", "x"), SampleSize::Count(0));
        let err = s.add_rule(bad).unwrap_err();
        let err = err.downcast::<InvalidRuleError>().unwrap();
        assert_eq!(err.violations.len(), 3);
        assert!(s.rules().is_empty());
    }

    #[test]
    fn available_columns_skip_filtered_ones() {
        let mut s = session();
        s.add_filter(DimensionalFilter::equals("category", ["DT"])).unwrap();
        assert_eq!(s.available_filter_columns(None), ["id", "amount"]);
        assert_eq!(s.available_filter_columns(Some(0)), ["id", "category", "amount"]);
        assert_eq!(s.distinct_values("category").map(|v| v.len()), Some(3));
    }

    #[test]
    fn counts_and_runs() {
        let mut s = session();
        s.add_filter(DimensionalFilter::range("amount", Some(1000.0), None)).unwrap();
        let dt = SamplingRule::new("DT", Stratum::value("category", "DT"), SampleSize::Count(2));
        assert_eq!(s.count_available_for_rule(&dt), 3);
        s.add_rule(dt).unwrap();

        let seed = s.run(Some(5)).unwrap().seed;
        assert_eq!(seed, 5);
        assert_eq!(s.last_result().unwrap().summary.total_sampled, 2);

        s.clear_rules();
        assert!(s.last_result().is_none());
    }

    #[test]
    fn config_round_trip_through_session() {
        let mut s = session();
        s.add_filter(DimensionalFilter::equals("category", ["DT", "KR"])).unwrap();
        s.add_rule(SamplingRule::new("all", Stratum::All, SampleSize::Percentage(50.0)))
            .unwrap();
        let config = s.to_config("saved");
        assert_eq!(config.column_types.len(), 3);

        let mut fresh = session();
        let pruned = fresh.apply_config(config).unwrap();
        assert_eq!(pruned, Pruned::default());
        assert_eq!(fresh.filtered_len(), 8);
        assert_eq!(fresh.rules().len(), 1);
    }

    #[test]
    fn running_without_data_fails() {
        let mut s = Session::default();
        assert!(s.run(Some(1)).is_err());
        assert!(s.available_filter_columns(None).is_empty());
    }
}
