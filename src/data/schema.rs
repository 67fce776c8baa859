use serde::Serialize;

use super::model::{Table, Value};

/// How a column is treated by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnKind {
    /// Every non-missing value is a real number.
    Continuous,
    /// Text, enumerated codes, or a column with no values at all.
    Categorical,
}

/// Name and inferred kind of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered column descriptors of a table.
///
/// Inferred once from the loaded rows; filtered tables keep the schema of
/// the table they came from, so a column's kind never flips because a
/// filter happened to leave only missing values behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

/// Column names split by kind, each list in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub continuous: Vec<String>,
    pub categorical: Vec<String>,
}

impl Schema {
    /// Classify each column of `rows`.
    ///
    /// A column is continuous iff it has at least one value and every
    /// non-missing value is numeric.
    pub fn infer(columns: Vec<String>, rows: &[Vec<Value>]) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let mut observed = false;
                let mut numeric = true;
                for v in rows.iter().map(|r| &r[idx]).filter(|v| !v.is_null()) {
                    observed = true;
                    if v.as_f64().is_none() {
                        numeric = false;
                        break;
                    }
                }
                let kind = if observed && numeric {
                    ColumnKind::Continuous
                } else {
                    ColumnKind::Categorical
                };
                ColumnDescriptor { name, kind }
            })
            .collect();
        Schema { columns }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Partition a table's columns into continuous and categorical names.
pub fn classify(table: &Table) -> Classification {
    let mut out = Classification::default();
    for col in table.schema().columns() {
        match col.kind {
            ColumnKind::Continuous => out.continuous.push(col.name.clone()),
            ColumnKind::Categorical => out.categorical.push(col.name.clone()),
        }
    }
    out
}
