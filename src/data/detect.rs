use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::model::ColumnKind;

/// How many non-empty values of a column are inspected when detecting its kind.
pub const SAMPLE_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Decimal notation of a NUMBER column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// `1.234,56`: dot groups thousands, comma separates decimals.
    European,
    /// `1234.56`
    Plain,
}

impl NumberFormat {
    /// Parse a number, preferring this notation and falling back to the other.
    ///
    /// The preference only matters for values like `2.000`, which read as
    /// 2000 in a European column and as 2.0 in a plain one.
    pub fn parse(self, raw: &str) -> Option<f64> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| *c != ' ' && *c != '\u{a0}')
            .collect();
        match self {
            NumberFormat::European => parse_european(&cleaned).or_else(|| parse_plain(&cleaned)),
            NumberFormat::Plain => parse_plain(&cleaned).or_else(|| parse_european(&cleaned)),
        }
    }

    /// European when any value uses a decimal comma or more than one dot.
    fn infer(sample: &[&str]) -> Self {
        let european = sample
            .iter()
            .any(|v| v.contains(',') || v.matches('.').count() > 1);
        if european {
            NumberFormat::European
        } else {
            NumberFormat::Plain
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberFormat::European => write!(f, "1.234,56"),
            NumberFormat::Plain => write!(f, "1234.56"),
        }
    }
}

/// Parse a single number in either notation, reading a lone dot as a
/// decimal point.
pub fn parse_number(raw: &str) -> Option<f64> {
    NumberFormat::Plain.parse(raw)
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s.strip_prefix('+').unwrap_or(s))
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn signed(negative: bool, body: &str) -> Option<f64> {
    let value: f64 = body.parse().ok()?;
    Some(if negative { -value } else { value })
}

fn parse_plain(s: &str) -> Option<f64> {
    let (negative, body) = split_sign(s);
    let valid = match body.split_once('.') {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => all_digits(body),
    };
    if !valid {
        return None;
    }
    signed(negative, body)
}

fn parse_european(s: &str) -> Option<f64> {
    let (negative, body) = split_sign(s);
    let (int, frac) = match body.split_once(',') {
        Some((int, frac)) => (int, Some(frac)),
        None => (body, None),
    };
    if frac.is_some_and(|f| !all_digits(f)) {
        return None;
    }

    let mut groups = int.split('.');
    let first = groups.next().unwrap_or("");
    if !all_digits(first) {
        return None;
    }
    let mut digits = first.to_string();
    if int.contains('.') {
        if first.len() > 3 {
            return None;
        }
        for group in groups {
            if group.len() != 3 || !all_digits(group) {
                return None;
            }
            digits.push_str(group);
        }
    }

    if let Some(frac) = frac {
        digits.push('.');
        digits.push_str(frac);
    }
    signed(negative, &digits)
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Supported date notations, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `31.12.2024`
    DayMonthYearDot,
    /// `2024-12-31`
    Iso,
    /// `31/12/2024`
    DayMonthYearSlash,
    /// `31-12-2024`
    DayMonthYearDash,
}

impl DateFormat {
    pub const PRIORITY: [DateFormat; 4] = [
        DateFormat::DayMonthYearDot,
        DateFormat::Iso,
        DateFormat::DayMonthYearSlash,
        DateFormat::DayMonthYearDash,
    ];

    /// The `chrono` format string.
    pub fn pattern(self) -> &'static str {
        match self {
            DateFormat::DayMonthYearDot => "%d.%m.%Y",
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::DayMonthYearSlash => "%d/%m/%Y",
            DateFormat::DayMonthYearDash => "%d-%m-%Y",
        }
    }

    /// Parse with this format. Years must have four digits, so `31.12.24`
    /// is not read as the year 24.
    pub fn parse(self, raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), self.pattern())
            .ok()
            .filter(|d| (1000..=9999).contains(&d.year()))
    }

    /// Parse with the first format that accepts the value.
    pub fn parse_any(raw: &str) -> Option<NaiveDate> {
        Self::PRIORITY.iter().find_map(|f| f.parse(raw))
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DateFormat::DayMonthYearDot => "DD.MM.YYYY",
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::DayMonthYearSlash => "DD/MM/YYYY",
            DateFormat::DayMonthYearDash => "DD-MM-YYYY",
        };
        write!(f, "{label}")
    }
}

// ---------------------------------------------------------------------------
// Column detection
// ---------------------------------------------------------------------------

/// Classify a column from its raw values.
///
/// Only the first [`SAMPLE_LIMIT`] non-empty values are looked at. A column
/// is DATE when most values are dates and a single format (the first in
/// [`DateFormat::PRIORITY`] that fits) accepts all of them; date columns that
/// need more than one format are TEXT. Otherwise a column is NUMBER when most
/// values are numbers, and TEXT in every other case.
pub fn detect_column(values: &[&str]) -> ColumnKind {
    let sample: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .take(SAMPLE_LIMIT)
        .collect();
    if sample.is_empty() {
        return ColumnKind::Text;
    }
    let majority = |count: usize| count * 2 > sample.len();

    let mut date_like = 0;
    let mut hits = [0usize; DateFormat::PRIORITY.len()];
    for value in &sample {
        let mut any = false;
        for (slot, format) in DateFormat::PRIORITY.iter().enumerate() {
            if format.parse(value).is_some() {
                hits[slot] += 1;
                any = true;
            }
        }
        if any {
            date_like += 1;
        }
    }

    if majority(date_like) {
        return match DateFormat::PRIORITY
            .iter()
            .zip(hits)
            .find(|(_, count)| *count == date_like)
        {
            Some((format, _)) => ColumnKind::Date(*format),
            None => {
                log::debug!("dates in mixed formats, falling back to TEXT");
                ColumnKind::Text
            }
        };
    }

    let numeric = sample.iter().filter(|v| parse_number(v).is_some()).count();
    if majority(numeric) {
        return ColumnKind::Number(NumberFormat::infer(&sample));
    }

    ColumnKind::Text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ColumnType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn european_numbers() {
        let values = ["1.234,56", "2.000,00"];
        let kind = detect_column(&values);
        assert_eq!(kind, ColumnKind::Number(NumberFormat::European));

        let parsed: Vec<f64> = values
            .iter()
            .map(|v| NumberFormat::European.parse(v).unwrap())
            .collect();
        assert_eq!(parsed, vec![1234.56, 2000.00]);
    }

    #[test]
    fn plain_numbers() {
        let kind = detect_column(&["12", "-3.5", "+7", "1 000"]);
        assert_eq!(kind, ColumnKind::Number(NumberFormat::Plain));
        assert_eq!(NumberFormat::Plain.parse("1 000"), Some(1000.0));
        assert_eq!(NumberFormat::Plain.parse("-3.5"), Some(-3.5));
    }

    #[test]
    fn single_dot_depends_on_column_notation() {
        assert_eq!(NumberFormat::European.parse("2.000"), Some(2000.0));
        assert_eq!(NumberFormat::Plain.parse("2.000"), Some(2.0));
        assert_eq!(NumberFormat::European.parse("1.5"), Some(1.5));
        assert_eq!(parse_number("1.234.567,8"), Some(1234567.8));
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in ["1.23.4", "1,2,3", "abc", "12a", "", "-", "1.", ",5", "inf", "NaN"] {
            assert_eq!(parse_number(bad), None, "{bad:?} should not parse");
        }
    }

    #[test]
    fn date_formats_in_priority_order() {
        assert_eq!(DateFormat::DayMonthYearDot.parse("31.12.2024"), Some(date(2024, 12, 31)));
        assert_eq!(DateFormat::Iso.parse("2024-12-31"), Some(date(2024, 12, 31)));
        assert_eq!(DateFormat::DayMonthYearSlash.parse("31/12/2024"), Some(date(2024, 12, 31)));
        assert_eq!(DateFormat::DayMonthYearDash.parse("31-12-2024"), Some(date(2024, 12, 31)));
        assert_eq!(DateFormat::DayMonthYearDot.parse("2024-12-31"), None);
        assert_eq!(DateFormat::DayMonthYearDot.parse("31.12.24"), None);

        assert_eq!(
            detect_column(&["31.12.2024", "01.01.2025"]),
            ColumnKind::Date(DateFormat::DayMonthYearDot)
        );
        assert_eq!(
            detect_column(&["2024-12-31", "2025-01-01"]),
            ColumnKind::Date(DateFormat::Iso)
        );
        assert_eq!(
            detect_column(&["31/12/2024", "01/01/2025"]),
            ColumnKind::Date(DateFormat::DayMonthYearSlash)
        );
    }

    #[test]
    fn mixed_date_formats_are_text() {
        let kind = detect_column(&["31.12.2024", "2024-12-31"]);
        assert_eq!(kind.column_type(), ColumnType::Text);
    }

    #[test]
    fn minority_patterns_fall_back_to_text() {
        let kind = detect_column(&["12", "foo", "bar", "baz"]);
        assert_eq!(kind, ColumnKind::Text);
        let kind = detect_column(&["31.12.2024", "foo", "bar"]);
        assert_eq!(kind, ColumnKind::Text);
    }

    #[test]
    fn majority_with_stragglers_still_typed() {
        let kind = detect_column(&["1,5", "2,5", "n/a"]);
        assert_eq!(kind, ColumnKind::Number(NumberFormat::European));
        assert_eq!(kind.parse_cell("n/a").as_f64(), None);
    }

    #[test]
    fn empty_values_are_ignored() {
        assert_eq!(detect_column(&[]), ColumnKind::Text);
        assert_eq!(detect_column(&["", "  "]), ColumnKind::Text);
        assert_eq!(
            detect_column(&["", "10", "", "20"]),
            ColumnKind::Number(NumberFormat::Plain)
        );
    }

    #[test]
    fn only_leading_sample_is_inspected() {
        let mut values = vec!["7"; SAMPLE_LIMIT];
        values.extend(std::iter::repeat("text").take(SAMPLE_LIMIT * 2));
        assert_eq!(detect_column(&values), ColumnKind::Number(NumberFormat::Plain));
    }
}
