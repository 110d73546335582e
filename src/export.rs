//! Writing sample results to files and rendering them for the terminal.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data::model::{CellValue, ColumnSchema};
use crate::format;
use crate::sampling::{SampleResult, SampledRow};

/// Cell text as written to export files: numbers with a decimal comma and
/// no grouping, dates as `DD.MM.YYYY`, empty cells blank.
pub fn export_cell(value: Option<&CellValue>) -> String {
    match value {
        None | Some(CellValue::Null) => String::new(),
        Some(CellValue::Number(v)) => format::number_plain(*v),
        Some(CellValue::Date(d)) => format::date(*d),
        Some(CellValue::Text(s)) => s.clone(),
    }
}

fn record_fields<'a>(columns: &'a [ColumnSchema], row: &'a SampledRow) -> impl Iterator<Item = String> + 'a {
    columns.iter().map(|c| export_cell(row.record.get(&c.name)))
}

/// Write every sampled row, preceded by a `rule` column naming the rule
/// that drew it. Rows follow rule order.
pub fn write_csv_to<W: Write>(result: &SampleResult, writer: W, delimiter: u8) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let header = std::iter::once("rule").chain(result.columns.iter().map(|c| c.name.as_str()));
    csv.write_record(header).context("writing CSV header")?;

    for (rule_name, row) in result.rows() {
        let fields = std::iter::once(rule_name.to_string()).chain(record_fields(&result.columns, row));
        csv.write_record(fields)
            .with_context(|| format!("writing row {}", row.row_index))?;
    }
    csv.flush().context("flushing CSV")?;
    Ok(())
}

pub fn write_csv(result: &SampleResult, path: &Path, delimiter: u8) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv_to(result, file, delimiter)?;
    log::info!(
        "exported {} row(s) to {}",
        result.summary.total_sampled,
        path.display()
    );
    Ok(())
}

/// File stem for a rule: alphanumerics, space, `-` and `_` only.
pub fn safe_file_stem(rule_name: &str) -> String {
    let stem: String = rule_name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem = stem.trim_end();
    if stem.is_empty() {
        "rule".to_string()
    } else {
        stem.to_string()
    }
}

/// Write one CSV per rule that sampled at least one row into `dir`.
/// Returns the files written, in rule order.
pub fn write_csv_by_rule(result: &SampleResult, dir: &Path, delimiter: u8) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut used = BTreeSet::new();
    let mut written = Vec::new();
    for stratum in result.strata.iter().filter(|s| !s.is_empty()) {
        let base = safe_file_stem(&stratum.rule_name);
        let mut stem = base.clone();
        let mut n = 2;
        while !used.insert(stem.to_lowercase()) {
            stem = format!("{base}_{n}");
            n += 1;
        }
        let path = dir.join(format!("{stem}.csv"));

        let file = std::fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut csv = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(file);
        csv.write_record(result.columns.iter().map(|c| c.name.as_str()))
            .context("writing CSV header")?;
        for row in &stratum.rows {
            csv.write_record(record_fields(&result.columns, row))
                .with_context(|| format!("writing row {}", row.row_index))?;
        }
        csv.flush().context("flushing CSV")?;
        written.push(path);
    }

    log::info!("exported {} rule file(s) to {}", written.len(), dir.display());
    Ok(written)
}

/// The whole result as pretty JSON.
pub fn write_json(result: &SampleResult, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), result)
        .with_context(|| format!("writing {}", path.display()))
}

/// Multi-line overview of a result: per-rule counts, then numeric totals.
pub fn render_summary(result: &SampleResult) -> String {
    SummaryTable(result).to_string()
}

/// Display adapter behind [`render_summary`].
pub struct SummaryTable<'a>(pub &'a SampleResult);

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let summary = &result.summary;

        writeln!(
            f,
            "{} of {} rows after filters, seed {}",
            result.filtered_rows, result.total_rows, result.seed
        )?;

        let width = result
            .strata
            .iter()
            .map(|s| s.rule_name.chars().count())
            .max()
            .unwrap_or(0)
            .max("Rule".len());
        writeln!(f, "{:<width$}  {:>10}  {:>8}", "Rule", "Candidates", "Sampled")?;
        for stratum in &result.strata {
            write!(
                f,
                "{:<width$}  {:>10}  {:>8}",
                stratum.rule_name,
                stratum.candidates,
                stratum.len()
            )?;
            if stratum.candidates == 0 {
                write!(f, "  (no matches)")?;
            } else if stratum.len() < stratum.target {
                write!(f, "  (wanted {})", stratum.target)?;
            }
            writeln!(f)?;
        }
        writeln!(
            f,
            "Total sampled: {} ({} distinct rows)",
            summary.total_sampled, summary.distinct_rows
        )?;

        for (column, stats) in &summary.numeric {
            writeln!(
                f,
                "{column}: sum {}, mean {} over {} value(s)",
                format::number_grouped(stats.sum, 2),
                format::number_grouped(stats.mean, 2),
                stats.count
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::DimensionalFilter;
    use crate::data::model::Dataset;
    use crate::sampling::{run, SampleSize, SamplingRule, SelectionMethod, Stratum};

    fn result() -> SampleResult {
        let ds = Dataset::from_raw(
            vec!["id".into(), "date".into(), "amount".into(), "category".into()],
            vec![
                vec!["B-1".into(), "31.12.2024".into(), "1.234,56".into(), "DT".into()],
                vec!["B-2".into(), "01.01.2024".into(), "2.000,00".into(), "KR".into()],
                vec!["B-3".into(), "15.06.2024".into(), "".into(), "DT".into()],
            ],
        );
        let rules = vec![
            SamplingRule::new("Debit / DT", Stratum::value("category", "DT"), SampleSize::Count(5))
                .with_method(SelectionMethod::FirstN),
            SamplingRule::new("Credit", Stratum::value("category", "KR"), SampleSize::Count(5)),
            SamplingRule::new("Nothing", Stratum::value("category", "XX"), SampleSize::Count(5)),
        ];
        let filters = vec![DimensionalFilter::equals("category", ["DT", "KR"])];
        run(&ds, &filters, &rules, Some(1)).unwrap()
    }

    #[test]
    fn csv_has_rule_column_and_european_values() {
        let mut buf = Vec::new();
        write_csv_to(&result(), &mut buf, b';').unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "rule;id;date;amount;category",
                "Debit / DT;B-1;31.12.2024;1234,56;DT",
                "Debit / DT;B-3;15.06.2024;;DT",
                "Credit;B-2;01.01.2024;2000;KR",
            ]
        );
    }

    #[test]
    fn exported_csv_loads_back_with_same_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        let original = result();
        write_csv(&original, &path, b';').unwrap();

        let reloaded = crate::data::loader::load_file(&path, &Default::default()).unwrap();
        assert_eq!(reloaded.len(), 3);
        for column in &original.columns {
            assert_eq!(
                reloaded.column(&column.name).unwrap().column_type(),
                column.column_type()
            );
        }
    }

    #[test]
    fn one_file_per_nonempty_rule() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_csv_by_rule(&result(), dir.path(), b';').unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["Debit  DT.csv", "Credit.csv"]);

        let credit = std::fs::read_to_string(&files[1]).unwrap();
        assert_eq!(credit, "id;date;amount;category\nB-2;01.01.2024;2000;KR\n");
    }

    #[test]
    fn file_stems() {
        assert_eq!(safe_file_stem("Q4: big/small "), "Q4 bigsmall");
        assert_eq!(safe_file_stem("///"), "rule");
    }

    #[test]
    fn summary_mentions_every_rule() {
        let text = render_summary(&result());
        assert!(text.contains("3 of 3 rows after filters, seed 1"));
        assert!(text.contains("Debit / DT"));
        assert!(text.contains("(no matches)"));
        assert!(text.contains("Total sampled: 3 (3 distinct rows)"));
        assert!(text.contains("amount: sum 3.234,56, mean 1.617,28 over 2 value(s)"));
        assert!(text.ends_with('\n'));
        assert_eq!(text, SummaryTable(&result()).to_string());
    }
}
