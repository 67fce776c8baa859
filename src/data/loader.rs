use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::LoadError;
use super::model::{Table, Value};
use super::schema::classify;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a survey table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – comma-separated, first row is the header
/// * `.json`    – `[{ "CARRERA": "...", "AE_Total": 31, ... }, ...]`
/// * `.parquet` – flat scalar columns
///
/// A file without data rows is an error.
pub fn load(path: &Path) -> Result<Table, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    if table.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    Ok(table)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Dataset handle
// ---------------------------------------------------------------------------

/// The two surveys the dashboards were built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    LaborEfficacy,
    AcademicAnxiety,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 2] = [DatasetKind::LaborEfficacy, DatasetKind::AcademicAnxiety];

    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::LaborEfficacy => "Autoeficacia laboral",
            DatasetKind::AcademicAnxiety => "Ansiedad académica",
        }
    }
}

/// A loaded table behind a shared, read-only handle.
///
/// Created once per opened file and handed to every pipeline call; clones
/// share the same rows.
#[derive(Debug, Clone)]
pub struct Dataset {
    label: String,
    source: Option<PathBuf>,
    table: Arc<Table>,
}

impl Dataset {
    /// Load `path` and wrap the result.
    pub fn open(path: &Path, label: impl Into<String>) -> Result<Self, LoadError> {
        let table = load(path)?;
        let label = label.into();
        log::info!(
            "Loaded '{label}' from {}: {} rows, {} columns",
            path.display(),
            table.len(),
            table.schema().len()
        );
        let classes = classify(&table);
        log::debug!(
            "continuous: {:?}; categorical: {:?}",
            classes.continuous,
            classes.categorical
        );
        Ok(Dataset {
            label,
            source: Some(path.to_path_buf()),
            table: Arc::new(table),
        })
    }

    /// Wrap a table built in memory.
    pub fn from_table(label: impl Into<String>, table: Table) -> Self {
        Dataset {
            label: label.into(),
            source: None,
            table: Arc::new(table),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one survey response per row.
/// Every record must have as many fields as the header.
fn load_csv(path: &Path) -> Result<Table, LoadError> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(Value::parse_cell).collect());
    }

    Table::new(headers, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "CARRERA": "Psicología", "AE_Total": 31, "Z_COE": 0.42 },
///   ...
/// ]
/// ```
///
/// Columns are taken from the first record, in the order its keys appear in
/// the file. A later record may omit a
/// column (read as missing) but may not introduce a new one.
fn load_json(path: &Path) -> Result<Table, LoadError> {
    let root: JsonValue = serde_json::from_reader(std::io::BufReader::new(open(path)?))?;

    let records = root.as_array().ok_or_else(|| LoadError::Malformed {
        row: 0,
        reason: "expected a top-level JSON array".to_string(),
    })?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| LoadError::Malformed {
            row: i,
            reason: "record is not a JSON object".to_string(),
        })?;

        if i == 0 {
            columns = obj.keys().cloned().collect();
        }
        if let Some(extra) = obj.keys().find(|k| !columns.contains(*k)) {
            return Err(LoadError::Malformed {
                row: i,
                reason: format!("unexpected column '{extra}'"),
            });
        }

        let row = columns
            .iter()
            .map(|col| obj.get(col).map(json_to_value).unwrap_or(Value::Null))
            .collect();
        rows.push(row);
    }

    Table::new(columns, rows)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::parse_cell(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::from_float(f)
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

/// Load a Parquet file whose columns are all scalars.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Nested columns are rendered as text.
fn load_parquet(path: &Path) -> Result<Table, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .map(|col| extract_value(col, row))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(values);
        }
    }

    Table::new(columns, rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<Value, LoadError> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        DataType::Int8 => Value::Integer(col.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => Value::Integer(col.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Integer(col.as_primitive::<UInt8Type>().value(row) as i64),
        DataType::UInt16 => Value::Integer(col.as_primitive::<UInt16Type>().value(row) as i64),
        DataType::UInt32 => Value::Integer(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(Value::Float(v as f64), Value::Integer)
        }
        DataType::Float32 => Value::from_float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::from_float(col.as_primitive::<Float64Type>().value(row)),
        _ => Value::Text(arrow::util::display::array_value_to_string(col, row)?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_rows_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "survey.csv",
            "CARRERA,AE_Total,Z_COE\nPsic,30,0.5\nIng,,-1.2\nPsic,25,NA\n",
        );
        let table = load(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1, "CARRERA"), Some(&Value::from("Ing")));
        assert_eq!(table.get(1, "AE_Total"), Some(&Value::Null));
        assert_eq!(table.get(2, "Z_COE"), Some(&Value::Null));
        assert_eq!(load(&path).unwrap(), table);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn header_only_csv_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.csv", "CARRERA,AE_Total\n");
        assert!(matches!(load(&path), Err(LoadError::Empty(_))));
    }

    #[test]
    fn ragged_csv_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.csv", "a,b\n1,2\n3\n");
        assert!(matches!(load(&path), Err(LoadError::Csv(_))));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load(Path::new("survey.xlsx")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn json_records_fill_missing_keys_with_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "survey.json",
            r#"[{"CARRERA": "Psic", "AE_Total": 30}, {"CARRERA": "Ing"}]"#,
        );
        let table = load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "AE_Total"), Some(&Value::Null));
    }

    #[test]
    fn json_columns_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "survey.json",
            r#"[{"Z_COE": 0.4, "CARRERA": "Psic", "AE_Total": 30}]"#,
        );
        let table = load(&path).unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["Z_COE", "CARRERA", "AE_Total"]);
    }

    #[test]
    fn pandas_missing_markers_do_not_leak_into_means() {
        use crate::data::aggregate::mean_by_group;
        use crate::data::schema::ColumnKind;

        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "survey.csv",
            "CARRERA,AE_Total,Z_COE\nX,10,N/A\nX,20,0.5\nX,-NaN,NAN\n",
        );
        let table = load(&path).unwrap();
        assert_eq!(table.get(2, "AE_Total"), Some(&Value::Null));
        assert_eq!(table.schema().kind_of("Z_COE"), Some(ColumnKind::Continuous));
        let means = mean_by_group(&table, "CARRERA", "AE_Total").unwrap();
        assert_eq!(means[0].mean, Some(15.0));
        assert_eq!(means[0].count, 2);
    }

    #[test]
    fn json_new_key_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.json", r#"[{"a": 1}, {"a": 2, "b": 3}]"#);
        assert!(matches!(load(&path), Err(LoadError::Malformed { row: 1, .. })));
    }

    #[test]
    fn parquet_scalars_and_nan_as_missing() {
        use arrow::array::{Float64Array, Int32Array, StringArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.parquet");
        let schema = Arc::new(Schema::new(vec![
            Field::new("CARRERA", DataType::Utf8, true),
            Field::new("Z_TE", DataType::Float64, true),
            Field::new("CF1", DataType::Int32, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("Psic"), None])) as ArrayRef,
                Arc::new(Float64Array::from(vec![Some(f64::NAN), Some(0.25)])),
                Arc::new(Int32Array::from(vec![1, 2])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Z_TE"), Some(&Value::Null));
        assert_eq!(table.get(1, "Z_TE"), Some(&Value::Float(0.25)));
        assert_eq!(table.get(1, "CARRERA"), Some(&Value::Null));
        assert_eq!(table.get(1, "CF1"), Some(&Value::Integer(2)));
    }

    #[test]
    fn dataset_handle_shares_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "survey.csv", "CARRERA\nPsic\n");
        let ds = Dataset::open(&path, DatasetKind::LaborEfficacy.label()).unwrap();
        let clone = ds.clone();
        assert!(std::ptr::eq(ds.table(), clone.table()));
        assert_eq!(ds.source(), Some(path.as_path()));
        assert_eq!(ds.label(), "Autoeficacia laboral");
    }
}
