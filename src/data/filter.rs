use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::error::FilterError;
use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Filter spec: which values are allowed per column
// ---------------------------------------------------------------------------

/// Per-column allow-lists: column_name → set of allowed values.
///
/// * A column absent from the spec is unconstrained.
/// * A column present with an empty set allows nothing, so the filtered
///   table is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    allowed: BTreeMap<String, BTreeSet<Value>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spec allowing every observed value of each named column, i.e. the
    /// "everything selected" starting state of a multiselect.
    pub fn select_all<'a>(
        table: &Table,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, FilterError> {
        let mut spec = FilterSpec::new();
        for col in columns {
            let values = table
                .unique_values(col)
                .ok_or_else(|| FilterError::UnknownColumn(col.to_string()))?;
            spec.allowed.insert(col.to_string(), values.into_iter().collect());
        }
        Ok(spec)
    }

    /// Builder-style: constrain `column` to `values`.
    pub fn with(mut self, column: &str, values: impl IntoIterator<Item = Value>) -> Self {
        self.allowed
            .insert(column.to_string(), values.into_iter().collect());
        self
    }

    /// Add one allowed value to a column's set, creating the constraint.
    pub fn allow(&mut self, column: &str, value: Value) {
        self.allowed.entry(column.to_string()).or_default().insert(value);
    }

    /// Flip one value in a column's allow-list.
    pub fn toggle(&mut self, column: &str, value: &Value) {
        let selected = self.allowed.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
    }

    /// Constrain `column` to nothing.
    pub fn clear(&mut self, column: &str) {
        self.allowed.insert(column.to_string(), BTreeSet::new());
    }

    /// Drop the constraint on `column` altogether.
    pub fn remove(&mut self, column: &str) {
        self.allowed.remove(column);
    }

    pub fn allowed(&self, column: &str) -> Option<&BTreeSet<Value>> {
        self.allowed.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.allowed.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Check the spec against what the table actually contains: every
    /// column must exist and every allowed value must occur in it.
    pub fn validate(&self, table: &Table) -> Result<(), FilterError> {
        for (col, selected) in &self.allowed {
            let observed: BTreeSet<Value> = table
                .column(col)
                .ok_or_else(|| FilterError::UnknownColumn(col.clone()))?
                .cloned()
                .collect();
            if let Some(value) = selected.iter().find(|v| !observed.contains(*v)) {
                return Err(FilterError::UnknownValue {
                    column: col.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row filter
// ---------------------------------------------------------------------------

/// Return the rows of `table` that satisfy every constraint in `spec`,
/// in their original order and with all columns.
///
/// Values allowed by the spec but absent from the table simply match
/// nothing, so applying the same spec twice gives the same table.
pub fn filter(table: &Table, spec: &FilterSpec) -> Result<Table, FilterError> {
    let constraints = spec
        .allowed
        .iter()
        .map(|(col, selected)| {
            table
                .schema()
                .index_of(col)
                .map(|idx| (idx, selected))
                .ok_or_else(|| FilterError::UnknownColumn(col.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if constraints.is_empty() {
        return Ok(table.clone());
    }

    let rows: Vec<Vec<Value>> = table
        .rows()
        .iter()
        .filter(|row| {
            constraints
                .iter()
                .all(|(idx, selected)| selected.contains(&row[*idx]))
        })
        .cloned()
        .collect();

    log::debug!("filter kept {} of {} rows", rows.len(), table.len());
    Ok(table.derive(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> Table {
        Table::new(
            vec!["CARRERA".into(), "NIVEL".into(), "AE_Total".into()],
            vec![
                vec!["Psic".into(), "Alto".into(), Value::Integer(30)],
                vec!["Psic".into(), "Bajo".into(), Value::Integer(12)],
                vec!["Ing".into(), "Alto".into(), Value::Integer(27)],
                vec!["Der".into(), Value::Null, Value::Integer(20)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn empty_spec_is_identity() {
        let t = survey();
        assert_eq!(filter(&t, &FilterSpec::new()).unwrap(), t);
    }

    #[test]
    fn and_across_columns_or_within_column() {
        let t = survey();
        let spec = FilterSpec::new()
            .with("CARRERA", [Value::from("Psic"), Value::from("Ing")])
            .with("NIVEL", [Value::from("Alto")]);
        let out = filter(&t, &spec).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(0, "CARRERA"), Some(&Value::from("Psic")));
        assert_eq!(out.get(1, "CARRERA"), Some(&Value::from("Ing")));
        assert_eq!(out.schema(), t.schema());
    }

    #[test]
    fn empty_allow_list_yields_empty_table() {
        let t = survey();
        let mut spec = FilterSpec::new();
        spec.clear("CARRERA");
        let out = filter(&t, &spec).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.schema().len(), 3);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let spec = FilterSpec::new().with("ZZZ", [Value::from("x")]);
        assert_eq!(
            filter(&survey(), &spec),
            Err(FilterError::UnknownColumn("ZZZ".into()))
        );
    }

    #[test]
    fn null_matches_only_when_allowed() {
        let t = survey();
        let spec = FilterSpec::new().with("NIVEL", [Value::Null]);
        let out = filter(&t, &spec).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(0, "CARRERA"), Some(&Value::from("Der")));
    }

    #[test]
    fn filtering_is_idempotent() {
        let t = survey();
        let spec = FilterSpec::new().with("CARRERA", [Value::from("Ing"), Value::from("Der")]);
        let once = filter(&t, &spec).unwrap();
        let twice = filter(&once, &spec).unwrap();
        assert_eq!(once, twice);
        for row in once.rows() {
            assert!(spec.allowed("CARRERA").unwrap().contains(&row[0]));
        }
    }

    #[test]
    fn select_all_keeps_every_non_missing_row() {
        let t = survey();
        let spec = FilterSpec::select_all(&t, ["CARRERA"]).unwrap();
        assert_eq!(filter(&t, &spec).unwrap().len(), 4);
        assert!(FilterSpec::select_all(&t, ["nope"]).is_err());
    }

    #[test]
    fn toggle_flips_membership() {
        let mut spec = FilterSpec::new();
        spec.toggle("CARRERA", &"Psic".into());
        assert_eq!(spec.allowed("CARRERA").map(|s| s.len()), Some(1));
        spec.toggle("CARRERA", &"Psic".into());
        assert_eq!(spec.allowed("CARRERA").map(|s| s.len()), Some(0));
        spec.remove("CARRERA");
        assert!(spec.is_empty());
    }

    #[test]
    fn validate_reports_unknown_values() {
        let t = survey();
        let spec = FilterSpec::new().with("NIVEL", [Value::from("Medio")]);
        assert_eq!(
            spec.validate(&t),
            Err(FilterError::UnknownValue {
                column: "NIVEL".into(),
                value: "Medio".into(),
            })
        );
        assert!(FilterSpec::new().with("NIVEL", [Value::from("Alto")]).validate(&t).is_ok());
    }
}
