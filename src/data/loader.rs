use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, LargeStringArray, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::NaiveDateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{Column, Table, Value};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a table could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The backing file is gone. Its own condition so the shell can show an
    /// actionable message instead of a stack trace.
    #[error("data source not found: {}", path.display())]
    SourceUnavailable { path: PathBuf },
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – delimited text with a header row; `;` or `,` delimited
/// * `.json`    – records-oriented: `[{ "col": value, ... }, ...]`
/// * `.parquet` – columnar; dictionary columns keep their categorical tag
///
/// The produced table is row-aligned by construction; downstream code does
/// not re-validate shape.
pub fn load_file(path: &Path) -> Result<Table, LoadError> {
    if !path.exists() {
        return Err(LoadError::SourceUnavailable {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path).map_err(LoadError::from),
        "json" => load_json(path).map_err(LoadError::from),
        "parquet" | "pq" => load_parquet(path).map_err(LoadError::from),
        other => Err(LoadError::UnsupportedExtension(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Registry exports are `;`-delimited; plain `,` files work too. The
/// delimiter is sniffed from the header row.
fn load_csv(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading CSV file")?;
    parse_csv(&text)
}

fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons >= commas && semicolons > 0 {
        b';'
    } else {
        b','
    }
}

pub(crate) fn parse_csv(text: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, field) in record.iter().enumerate() {
            columns[col_idx].push(guess_cell_type(field));
        }
    }

    Ok(Table::new(
        headers
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect(),
    ))
}

/// Per-cell dtype guess for delimited text. Dates stay text here: the
/// classifier reinterprets whole columns, never single cells.
fn guess_cell_type(s: &str) -> Value {
    let s = s.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "institution": "UFPR", "score": 4.0, "since": "2001-05-20" },
///   ...
/// ]
/// ```
///
/// Keys missing from a record become nulls in that row.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    // First pass: the union of keys, in first-seen order.
    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    // Second pass: fill the columns row by row.
    let mut columns: Vec<Column> = names
        .iter()
        .map(|n| Column::new(n.clone(), Vec::with_capacity(records.len())))
        .collect();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for col in &mut columns {
            col.values
                .push(obj.get(&col.name).map_or(Value::Null, json_to_value));
        }
    }

    Ok(Table::new(columns))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet registry export.
///
/// String, integer, float, boolean, date and timestamp columns map to their
/// `Value` counterparts; dictionary-encoded columns carry the upstream
/// categorical tag. Anything else falls back to its textual rendering.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Column> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        if columns.is_empty() {
            columns = schema
                .fields()
                .iter()
                .map(|f| {
                    let col = Column::new(f.name().clone(), Vec::new());
                    if matches!(f.data_type(), DataType::Dictionary(_, _)) {
                        col.with_categorical_tag()
                    } else {
                        col
                    }
                })
                .collect();
        }

        for (col, array) in columns.iter_mut().zip(batch.columns()) {
            append_column_values(&mut col.values, array)
                .with_context(|| format!("reading parquet column '{}'", col.name))?;
        }
    }

    Ok(Table::new(columns))
}

// -- Parquet / Arrow helpers --

/// Append every cell of an Arrow array onto `out`.
fn append_column_values(out: &mut Vec<Value>, array: &ArrayRef) -> Result<()> {
    // Dictionary columns: decode to their value type first.
    if let DataType::Dictionary(_, _) = array.data_type() {
        let decoded = arrow::compute::cast(array, &DataType::Utf8)
            .context("decoding dictionary column")?;
        return append_column_values(out, &decoded);
    }

    let n = array.len();
    for row in 0..n {
        if array.is_null(row) {
            out.push(Value::Null);
            continue;
        }
        out.push(extract_value(array, row)?);
    }
    Ok(())
}

/// Extract a single non-null cell from an Arrow array.
fn extract_value(array: &ArrayRef, row: usize) -> Result<Value> {
    let value = match array.data_type() {
        DataType::Utf8 => {
            let arr: &StringArray = array
                .as_any()
                .downcast_ref()
                .context("expected StringArray")?;
            Value::Text(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => {
            let arr: &LargeStringArray = array
                .as_any()
                .downcast_ref()
                .context("expected LargeStringArray")?;
            Value::Text(arr.value(row).to_string())
        }
        DataType::Int32 => {
            let arr: &Int32Array = array
                .as_any()
                .downcast_ref()
                .context("expected Int32Array")?;
            Value::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr: &Int64Array = array
                .as_any()
                .downcast_ref()
                .context("expected Int64Array")?;
            Value::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr: &Float32Array = array
                .as_any()
                .downcast_ref()
                .context("expected Float32Array")?;
            Value::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr: &Float64Array = array
                .as_any()
                .downcast_ref()
                .context("expected Float64Array")?;
            Value::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr: &BooleanArray = array
                .as_any()
                .downcast_ref()
                .context("expected BooleanArray")?;
            Value::Bool(arr.value(row))
        }
        DataType::Date32 => {
            let arr: &Date32Array = array
                .as_any()
                .downcast_ref()
                .context("expected Date32Array")?;
            let days = arr.value(row);
            let date = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
                .context("date out of range")?;
            Value::DateTime(date.and_time(chrono::NaiveTime::MIN))
        }
        DataType::Timestamp(unit, _tz) => {
            // Offsets in the source metadata are discarded: the stored
            // instant is kept as a naive wall-clock reading.
            let raw = match unit {
                TimeUnit::Second => {
                    let arr: &TimestampSecondArray = array
                        .as_any()
                        .downcast_ref()
                        .context("expected TimestampSecondArray")?;
                    timestamp_to_naive(arr.value(row), 1)
                }
                TimeUnit::Millisecond => {
                    let arr: &TimestampMillisecondArray = array
                        .as_any()
                        .downcast_ref()
                        .context("expected TimestampMillisecondArray")?;
                    timestamp_to_naive(arr.value(row), 1_000)
                }
                TimeUnit::Microsecond => {
                    let arr: &TimestampMicrosecondArray = array
                        .as_any()
                        .downcast_ref()
                        .context("expected TimestampMicrosecondArray")?;
                    timestamp_to_naive(arr.value(row), 1_000_000)
                }
                TimeUnit::Nanosecond => {
                    let arr: &TimestampNanosecondArray = array
                        .as_any()
                        .downcast_ref()
                        .context("expected TimestampNanosecondArray")?;
                    timestamp_to_naive(arr.value(row), 1_000_000_000)
                }
            };
            raw.map(Value::DateTime).unwrap_or(Value::Null)
        }
        // Anything else keeps its textual rendering.
        _ => {
            let text = arrow::util::display::array_value_to_string(array, row)
                .context("rendering unsupported parquet cell")?;
            Value::Text(text)
        }
    };
    Ok(value)
}

/// Epoch ticks at `ticks_per_second` resolution → naive instant.
fn timestamp_to_naive(ticks: i64, ticks_per_second: i64) -> Option<NaiveDateTime> {
    let secs = ticks.div_euclid(ticks_per_second);
    let frac = ticks.rem_euclid(ticks_per_second);
    let nanos = (frac * (1_000_000_000 / ticks_per_second)) as u32;
    chrono::DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolon_and_comma_delimiters() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), b',');
        // Registry exports with commas inside quoted names still win on ';'.
        assert_eq!(sniff_delimiter("name;city, state;code"), b';');
    }

    #[test]
    fn parses_a_semicolon_registry_export() {
        let text = "\
Institution;Code;Score;Since
Federal University;1001;4.5;2001-05-20
State College;1002;3.8;2010-11-02
;1003;;2015-01-30
";
        let table = parse_csv(text).unwrap();
        assert_eq!(table.row_count(), 3);
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["Institution", "Code", "Score", "Since"]);

        let inst = table.column("Institution").unwrap();
        assert_eq!(inst.values[2], Value::Null);
        assert_eq!(table.column("Code").unwrap().values[0], Value::Integer(1001));
        assert_eq!(table.column("Score").unwrap().values[0], Value::Float(4.5));
        // Dates are loaded as text; the classifier reinterprets them later.
        assert_eq!(
            table.column("Since").unwrap().values[0],
            Value::Text("2001-05-20".into())
        );
    }

    #[test]
    fn cell_type_guessing() {
        assert_eq!(guess_cell_type(""), Value::Null);
        assert_eq!(guess_cell_type("  42 "), Value::Integer(42));
        assert_eq!(guess_cell_type("4.25"), Value::Float(4.25));
        assert_eq!(guess_cell_type("true"), Value::Bool(true));
        assert_eq!(guess_cell_type("UFPR"), Value::Text("UFPR".into()));
    }

    #[test]
    fn missing_source_is_its_own_condition() {
        let err = load_file(Path::new("/no/such/registry.csv")).unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("registry.csv"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        // The file must exist for the extension check to be reached.
        let path = std::env::temp_dir().join("peneira_loader_test.xyz");
        std::fs::write(&path, b"whatever").unwrap();
        let err = load_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, LoadError::UnsupportedExtension(ext) if ext == "xyz"));
    }

    #[test]
    fn json_records_with_missing_keys_become_nulls() {
        let path = std::env::temp_dir().join("peneira_loader_test.json");
        std::fs::write(
            &path,
            r#"[
                {"institution": "UFPR", "score": 4.0},
                {"institution": "UNICAMP", "score": 4.5, "city": "Campinas"}
            ]"#,
        )
        .unwrap();
        let table = load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.row_count(), 2);
        let city = table.column("city").unwrap();
        assert_eq!(city.values[0], Value::Null);
        assert_eq!(city.values[1], Value::Text("Campinas".into()));
    }
}
