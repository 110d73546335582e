use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::Array;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Dataset;

/// How to read a source file.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter for CSV files.
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – header row plus records, delimiter from `options`
/// * `.json`         – `[{ "column": value, ... }, ...]`
/// * `.parquet`      – any flat schema
///
/// Every source is read as text first and then typed column by column.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (headers, rows) = match ext.as_str() {
        "csv" | "txt" => read_csv(path, options.delimiter)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    check_headers(&headers)?;
    if rows.is_empty() {
        bail!("No data found in {}", path.display());
    }

    let dataset = Dataset::from_raw(headers, rows);
    log::info!(
        "loaded {} rows, {} columns from {}",
        dataset.len(),
        dataset.columns.len(),
        path.display()
    );
    Ok(dataset)
}

fn check_headers(headers: &[String]) -> Result<()> {
    if headers.is_empty() {
        bail!("File has no columns");
    }
    let mut seen = BTreeSet::new();
    for (idx, header) in headers.iter().enumerate() {
        if header.trim().is_empty() {
            bail!("Column {idx} has an empty header");
        }
        if !seen.insert(header.as_str()) {
            bail!("Duplicate column header '{header}'");
        }
    }
    Ok(())
}

type RawTable = (Vec<String>, Vec<Vec<String>>);

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line.
/// Records may be shorter than the header; missing cells are empty.
fn read_csv(path: &Path, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    read_csv_records(&mut reader)
}

fn read_csv_records<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<RawTable> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but only {} headers",
                record.len(),
                headers.len()
            );
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "booking_id": "B-1", "amount": 1234.56, "category": "DT" },
///   ...
/// ]
/// ```
///
/// Columns are the union of all keys in order of first appearance; keys
/// missing from a record are empty cells.
fn read_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_text).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok((headers, rows))
}

fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file. Every column is rendered with Arrow's display
/// formatter (dates come out as ISO `YYYY-MM-DD`, floats in plain notation)
/// so typed and string columns go through the same detection.
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let options = FormatOptions::default();
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<Result<Vec<_>, _>>()
            .context("preparing column formatters")?;

        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .zip(&formatters)
                .map(|(col, fmt)| {
                    if col.is_null(row) {
                        String::new()
                    } else {
                        fmt.value(row).to_string()
                    }
                })
                .collect();
            rows.push(cells);
        }
    }

    Ok((headers, rows))
}
