use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::LoadError;
use super::schema::Schema;

// ---------------------------------------------------------------------------
// Value – a single cell of a survey table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// Used as a key in `BTreeSet` / `HashMap` downstream, so `Value` must be
/// `Ord` and `Hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

/// Equality follows `Ord`, so two NaN floats compare equal and hash alike.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.4}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::from_float(v)
    }
}

/// Missing-value markers recognised by `pandas.read_csv` by default.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl Value {
    /// Interpret the value as an `f64`. Text that parses as a real number
    /// counts as numeric, matching how the CSV columns are classified.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
            _ => None,
        }
    }

    /// A float cell; NaN is how pandas spells missing, so it becomes `Null`.
    pub fn from_float(v: f64) -> Value {
        if v.is_nan() {
            Value::Null
        } else {
            Value::Float(v)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type a raw text cell the way the CSV reader does.
    pub fn parse_cell(raw: &str) -> Value {
        let s = raw.trim();
        if s.is_empty() || NA_MARKERS.contains(&s) {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::from_float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Table – an immutable, ordered collection of rows
// ---------------------------------------------------------------------------

/// Rows of cells aligned to a shared column list.
///
/// The schema (column names and kinds) is inferred once when the table is
/// built from raw rows, and every table derived from it by filtering shares
/// the same `Arc<Schema>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Arc<Schema>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from a header and rows, inferring column kinds.
    ///
    /// Fails when a header name repeats or a row's width differs from the
    /// header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, LoadError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(LoadError::DuplicateColumn(col.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(LoadError::Malformed {
                    row: i,
                    reason: format!("expected {} fields, found {}", columns.len(), row.len()),
                });
            }
        }
        let schema = Schema::infer(columns, &rows);
        Ok(Table {
            schema: Arc::new(schema),
            rows,
        })
    }

    /// A table sharing `self`'s schema with a different set of rows.
    pub(crate) fn derive(&self, rows: Vec<Vec<Value>>) -> Self {
        Table {
            schema: Arc::clone(&self.schema),
            rows,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.columns().iter().map(|c| c.name.as_str())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Cell at `row` for `column`, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Iterate one column's cells in row order.
    pub fn column(&self, column: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.schema.index_of(column)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Distinct non-missing values of a column, in first-appearance order.
    pub fn unique_values(&self, column: &str) -> Option<Vec<Value>> {
        let mut seen = HashSet::new();
        let values = self
            .column(column)?
            .filter(|v| !v.is_null())
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect();
        Some(values)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
