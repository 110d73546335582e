use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::detect::{DateFormat, NumberFormat};

// ---------------------------------------------------------------------------
// Column types
// ---------------------------------------------------------------------------

/// The coarse type of a column, as stored in configuration records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Date,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::Number => write!(f, "NUMBER"),
            ColumnType::Date => write!(f, "DATE"),
        }
    }
}

/// The detected type of a column together with the format its cells were
/// parsed with. Resolved once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "format", rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Number(NumberFormat),
    Date(DateFormat),
}

impl ColumnKind {
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnKind::Text => ColumnType::Text,
            ColumnKind::Number(_) => ColumnType::Number,
            ColumnKind::Date(_) => ColumnType::Date,
        }
    }

    /// Parse a raw cell according to this kind. Empty or unparseable input
    /// becomes [`CellValue::Null`].
    pub fn parse_cell(&self, raw: &str) -> CellValue {
        let raw = raw.trim();
        if raw.is_empty() {
            return CellValue::Null;
        }
        match self {
            ColumnKind::Text => CellValue::Text(raw.to_string()),
            ColumnKind::Number(format) => format
                .parse(raw)
                .map(CellValue::Number)
                .unwrap_or(CellValue::Null),
            ColumnKind::Date(format) => format
                .parse(raw)
                .map(CellValue::Date)
                .unwrap_or(CellValue::Null),
        }
    }
}

impl ColumnKind {
    /// Like [`parse_cell`](Self::parse_cell), but a date literal that does
    /// not fit the column's format may use any supported date format.
    pub fn parse_literal(&self, raw: &str) -> CellValue {
        match (self, self.parse_cell(raw)) {
            (ColumnKind::Date(_), CellValue::Null) => DateFormat::parse_any(raw)
                .map(CellValue::Date)
                .unwrap_or(CellValue::Null),
            (_, value) => value,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Text => write!(f, "TEXT"),
            ColumnKind::Number(format) => write!(f, "NUMBER ({format})"),
            ColumnKind::Date(format) => write!(f, "DATE ({format})"),
        }
    }
}

/// Name and detected kind of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.kind.column_type()
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single typed cell
// ---------------------------------------------------------------------------

/// A typed cell value.
/// Kept in `BTreeSet`s downstream, so `CellValue` must be `Ord`.
/// Serialized with its type (`{"type": "date", "value": "2024-12-31"}`) so a
/// text cell that looks like a date or number reads back as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Number(_) => 1,
                Date(_) => 2,
                Text(_) => 3,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Number(v) => v.to_bits().hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{}", crate::format::number_grouped(*v, 2)),
            CellValue::Date(d) => write!(f, "{}", crate::format::date(*d)),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Compare against a literal typed by a user, e.g. a rule's match value.
    ///
    /// The literal is parsed as a cell of `kind`, so `1.500` in a European
    /// column means 1500. Text compares exactly. A literal that does not
    /// parse matches nothing; an empty one matches only empty cells.
    pub fn matches_literal(&self, literal: &str, kind: &ColumnKind) -> bool {
        match kind.parse_literal(literal) {
            CellValue::Null => literal.trim().is_empty() && self.is_null(),
            expected => expected == *self,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the dataset
// ---------------------------------------------------------------------------

/// A single row: column name → typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub values: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }
}

impl FromIterator<(String, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Columns in source order.
    pub columns: Vec<ColumnSchema>,
    /// All rows, in source order.
    pub records: Vec<Record>,
    /// For each TEXT column the sorted set of distinct values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl Dataset {
    /// Build column indices from already typed records.
    pub fn new(columns: Vec<ColumnSchema>, records: Vec<Record>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();

        for column in columns.iter().filter(|c| c.column_type() == ColumnType::Text) {
            let distinct = records
                .iter()
                .filter_map(|r| r.get(&column.name))
                .filter(|v| !v.is_null())
                .cloned()
                .collect();
            unique_values.insert(column.name.clone(), distinct);
        }

        Dataset {
            columns,
            records,
            unique_values,
        }
    }

    /// Type raw text rows: detect every column's kind, then parse each cell
    /// with it. Missing trailing cells are treated as empty.
    pub fn from_raw(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns: Vec<ColumnSchema> = headers
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<&str> = rows
                    .iter()
                    .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                    .collect();
                let kind = super::detect::detect_column(&values);
                log::debug!("column '{name}' detected as {kind}");
                ColumnSchema { name, kind }
            })
            .collect();

        let mut unparsed = vec![0usize; columns.len()];
        let records = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| {
                        let raw = row.get(idx).map(String::as_str).unwrap_or("");
                        let value = column.kind.parse_cell(raw);
                        if value.is_null() && !raw.trim().is_empty() {
                            unparsed[idx] += 1;
                        }
                        (column.name.clone(), value)
                    })
                    .collect()
            })
            .collect();

        for (column, count) in columns.iter().zip(&unparsed) {
            if *count > 0 {
                log::warn!(
                    "{count} value(s) in column '{}' did not parse as {} and were left empty",
                    column.name,
                    column.column_type()
                );
            }
        }

        Self::new(columns, records)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
