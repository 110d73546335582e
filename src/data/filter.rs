use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{CellValue, ColumnType, Dataset, Record};
use crate::error::{FilterProblem, InvalidFilterError};

// ---------------------------------------------------------------------------
// Condition: the predicate applied to a single cell
// ---------------------------------------------------------------------------

/// A predicate over one cell. Which variants are allowed depends on the
/// column's detected type, see [`Condition::column_type`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum Condition {
    /// TEXT: case-insensitive exact match against any of `values`.
    Equals {
        #[serde(default)]
        values: Vec<String>,
    },
    /// TEXT: case-insensitive substring match.
    Contains {
        #[serde(default)]
        pattern: String,
    },
    /// NUMBER: inclusive range, a missing bound is unbounded.
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// DATE: inclusive range, a missing bound is unbounded.
    DateRange {
        #[serde(default)]
        from: Option<NaiveDate>,
        #[serde(default)]
        to: Option<NaiveDate>,
    },
}

impl Condition {
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Equals { .. } => "equals",
            Condition::Contains { .. } => "contains",
            Condition::Range { .. } => "range",
            Condition::DateRange { .. } => "date_range",
        }
    }

    /// The only column type this condition can be applied to.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Condition::Equals { .. } | Condition::Contains { .. } => ColumnType::Text,
            Condition::Range { .. } => ColumnType::Number,
            Condition::DateRange { .. } => ColumnType::Date,
        }
    }

    /// Whether the condition constrains anything at all. An inactive
    /// condition matches every row, including empty cells.
    pub fn is_active(&self) -> bool {
        match self {
            Condition::Equals { values } => !values.is_empty(),
            Condition::Contains { pattern } => !pattern.is_empty(),
            Condition::Range { min, max } => min.is_some() || max.is_some(),
            Condition::DateRange { from, to } => from.is_some() || to.is_some(),
        }
    }

    pub fn matches(&self, value: Option<&CellValue>) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        match self {
            Condition::Equals { values } => value.as_text().is_some_and(|text| {
                let text = text.to_lowercase();
                values.iter().any(|v| v.to_lowercase() == text)
            }),
            Condition::Contains { pattern } => value
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(&pattern.to_lowercase())),
            Condition::Range { min, max } => value.as_f64().is_some_and(|v| {
                min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi)
            }),
            Condition::DateRange { from, to } => value.as_date().is_some_and(|d| {
                from.map_or(true, |lo| d >= lo) && to.map_or(true, |hi| d <= hi)
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// DimensionalFilter: a condition bound to a column
// ---------------------------------------------------------------------------

/// A global filter on one column (dimension) of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionalFilter {
    pub column: String,
    pub condition: Condition,
}

impl DimensionalFilter {
    pub fn new(column: impl Into<String>, condition: Condition) -> Self {
        Self {
            column: column.into(),
            condition,
        }
    }

    pub fn equals<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            column,
            Condition::Equals {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn contains(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            column,
            Condition::Contains {
                pattern: pattern.into(),
            },
        )
    }

    pub fn range(column: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self::new(column, Condition::Range { min, max })
    }

    pub fn date_range(
        column: impl Into<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Self {
        Self::new(column, Condition::DateRange { from, to })
    }

    pub fn column_type(&self) -> ColumnType {
        self.condition.column_type()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.condition.matches(record.get(&self.column))
    }

    /// Check the column exists and the operator suits its detected type.
    pub fn check(&self, dataset: &Dataset) -> Result<(), FilterProblem> {
        let column = dataset
            .column(&self.column)
            .ok_or(FilterProblem::UnknownColumn)?;
        if column.column_type() != self.condition.column_type() {
            return Err(FilterProblem::OperatorMismatch {
                operator: self.condition.operator(),
                column_type: column.column_type(),
            });
        }
        Ok(())
    }

    /// [`check`](Self::check), reported as the filter at `filter_index`.
    pub fn validate(&self, filter_index: usize, dataset: &Dataset) -> Result<(), InvalidFilterError> {
        self.check(dataset).map_err(|problem| InvalidFilterError {
            filter_index,
            column: self.column.clone(),
            problem,
        })
    }
}

impl fmt::Display for DimensionalFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = &self.column;
        if !self.condition.is_active() {
            return write!(f, "{column}: no filter");
        }
        match &self.condition {
            Condition::Equals { values } => {
                let shown: Vec<&str> = values.iter().take(3).map(String::as_str).collect();
                let more = if values.len() > 3 { "..." } else { "" };
                write!(f, "{column} = {}{more}", shown.join(", "))
            }
            Condition::Contains { pattern } => write!(f, "{column} contains '{pattern}'"),
            Condition::Range { min, max } => {
                let mut parts = Vec::new();
                if let Some(lo) = min {
                    parts.push(format!(">= {}", crate::format::number_grouped(*lo, 2)));
                }
                if let Some(hi) = max {
                    parts.push(format!("<= {}", crate::format::number_grouped(*hi, 2)));
                }
                write!(f, "{column} {}", parts.join(" and "))
            }
            Condition::DateRange { from, to } => {
                let mut parts = Vec::new();
                if let Some(lo) = from {
                    parts.push(format!("from {}", crate::format::date(*lo)));
                }
                if let Some(hi) = to {
                    parts.push(format!("to {}", crate::format::date(*hi)));
                }
                write!(f, "{column} {}", parts.join(" "))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filter sets
// ---------------------------------------------------------------------------

/// Validate a filter set, reporting the first offending filter.
pub fn validate_filters(
    dataset: &Dataset,
    filters: &[DimensionalFilter],
) -> Result<(), InvalidFilterError> {
    filters
        .iter()
        .enumerate()
        .try_for_each(|(idx, filter)| filter.validate(idx, dataset))
}

/// A record passes a filter set when it passes every filter (AND).
/// The empty set passes everything.
pub fn matches_all(filters: &[DimensionalFilter], record: &Record) -> bool {
    filters.iter().all(|f| f.matches(record))
}

/// Return indices of records that pass all filters, in dataset order.
pub fn filtered_indices(dataset: &Dataset, filters: &[DimensionalFilter]) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches_all(filters, record))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ColumnType;

    fn dataset() -> Dataset {
        let rows = [
            ["B-1", "DT", "1.500,00", "15.01.2024", "Office supplies"],
            ["B-2", "KR", "250,00", "20.02.2024", "Travel"],
            ["B-3", "dt", "", "10.03.2024", "office rent"],
            ["B-4", "AB", "9.999,99", "", "Consulting"],
        ];
        Dataset::from_raw(
            ["id", "category", "amount", "date", "text"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn equals_is_case_insensitive() {
        let ds = dataset();
        let f = DimensionalFilter::equals("category", ["DT"]);
        assert_eq!(filtered_indices(&ds, &[f]), vec![0, 2]);

        let f = DimensionalFilter::equals("category", ["kr", "ab"]);
        assert_eq!(filtered_indices(&ds, &[f]), vec![1, 3]);
    }

    #[test]
    fn contains_is_case_insensitive_substring() {
        let ds = dataset();
        let f = DimensionalFilter::contains("text", "OFFICE");
        assert_eq!(filtered_indices(&ds, &[f]), vec![0, 2]);
    }

    #[test]
    fn numeric_range_is_inclusive_and_skips_nulls() {
        let ds = dataset();
        let f = DimensionalFilter::range("amount", Some(250.0), Some(1500.0));
        assert_eq!(filtered_indices(&ds, &[f]), vec![0, 1]);

        let f = DimensionalFilter::range("amount", Some(1000.0), None);
        assert_eq!(filtered_indices(&ds, &[f]), vec![0, 3]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let ds = dataset();
        let f = DimensionalFilter::date_range("date", Some(ymd(2024, 2, 20)), None);
        assert_eq!(filtered_indices(&ds, &[f]), vec![1, 2]);

        let f = DimensionalFilter::date_range("date", None, Some(ymd(2024, 1, 15)));
        assert_eq!(filtered_indices(&ds, &[f]), vec![0]);
    }

    #[test]
    fn inactive_conditions_match_everything() {
        let ds = dataset();
        let f = DimensionalFilter::range("amount", None, None);
        assert_eq!(filtered_indices(&ds, &[f]).len(), ds.len());
        let f = DimensionalFilter::equals("category", Vec::<String>::new());
        assert_eq!(filtered_indices(&ds, &[f]).len(), ds.len());
    }

    #[test]
    fn filters_combine_with_and() {
        let ds = dataset();
        let filters = vec![
            DimensionalFilter::equals("category", ["DT"]),
            DimensionalFilter::range("amount", Some(1000.0), None),
        ];
        assert_eq!(filtered_indices(&ds, &filters), vec![0]);
        assert_eq!(filtered_indices(&ds, &[]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn operator_type_mismatch_is_rejected() {
        let ds = dataset();
        let err = validate_filters(
            &ds,
            &[
                DimensionalFilter::equals("category", ["DT"]),
                DimensionalFilter::range("category", Some(1.0), None),
            ],
        )
        .unwrap_err();
        assert_eq!(err.filter_index, 1);
        assert_eq!(err.column, "category");
        assert_eq!(
            err.problem,
            FilterProblem::OperatorMismatch {
                operator: "range",
                column_type: ColumnType::Text
            }
        );

        let err = DimensionalFilter::contains("missing", "x")
            .validate(0, &ds)
            .unwrap_err();
        assert_eq!(err.problem, FilterProblem::UnknownColumn);
    }

    #[test]
    fn descriptions() {
        assert_eq!(
            DimensionalFilter::range("amount", Some(1000.0), Some(5000.5)).to_string(),
            "amount >= 1.000,00 and <= 5.000,50"
        );
        assert_eq!(
            DimensionalFilter::equals("category", ["A", "B", "C", "D"]).to_string(),
            "category = A, B, C..."
        );
        assert_eq!(
            DimensionalFilter::date_range("date", Some(ymd(2024, 1, 1)), None).to_string(),
            "date from 01.01.2024"
        );
        assert_eq!(
            DimensionalFilter::contains("text", "").to_string(),
            "text: no filter"
        );
    }

    #[test]
    fn serde_shape() {
        let f = DimensionalFilter::range("amount", Some(1000.0), None);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "column": "amount",
                "condition": { "operator": "range", "min": 1000.0, "max": null }
            })
        );
        let back: DimensionalFilter = serde_json::from_value(json).unwrap();
        assert_eq!(back, f);
    }
}
