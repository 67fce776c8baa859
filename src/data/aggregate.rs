use std::collections::HashMap;

use serde::Serialize;

use super::error::AggregationError;
use super::model::{Table, Value};
use super::schema::ColumnKind;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Mean of a continuous column within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: Value,
    /// `None` when every value in the group is missing.
    pub mean: Option<f64>,
    /// Number of non-missing values that went into `mean`.
    pub count: usize,
}

/// Number of rows for one observed (group, category) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: Value,
    pub category: Value,
    pub count: u64,
}

/// Dense contingency table. `counts[r][c]` is the number of rows with
/// `row_keys[r]` and `col_keys[c]`; unobserved pairs hold 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTab {
    pub row_column: String,
    pub col_column: String,
    pub row_keys: Vec<Value>,
    pub col_keys: Vec<Value>,
    pub counts: Vec<Vec<u64>>,
}

impl CrossTab {
    pub fn get(&self, row: &Value, col: &Value) -> Option<u64> {
        let r = self.row_keys.iter().position(|k| k == row)?;
        let c = self.col_keys.iter().position(|k| k == col)?;
        Some(self.counts[r][c])
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    pub fn column_totals(&self) -> Vec<u64> {
        (0..self.col_keys.len())
            .map(|c| self.counts.iter().map(|r| r[c]).sum())
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty()
    }
}

/// One equal-width bin. Every bin is half-open `[lower, upper)` except the
/// last, which also holds `upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Means of several columns for one group: a radar chart's polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupProfile {
    pub group: Value,
    /// One entry per requested column, in request order.
    pub means: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn column_index(table: &Table, column: &str) -> Result<usize, AggregationError> {
    table
        .schema()
        .index_of(column)
        .ok_or_else(|| AggregationError::UnknownColumn(column.to_string()))
}

fn continuous_index(table: &Table, column: &str) -> Result<usize, AggregationError> {
    let idx = column_index(table, column)?;
    match table.schema().kind_of(column) {
        Some(ColumnKind::Continuous) => Ok(idx),
        _ => Err(AggregationError::NotContinuous(column.to_string())),
    }
}

/// Assigns dense ids to keys in first-appearance order.
#[derive(Default)]
struct KeyOrder<'a> {
    ids: HashMap<&'a Value, usize>,
    keys: Vec<&'a Value>,
}

impl<'a> KeyOrder<'a> {
    fn id(&mut self, key: &'a Value) -> usize {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = self.keys.len();
        self.ids.insert(key, id);
        self.keys.push(key);
        id
    }

    fn into_keys(self) -> Vec<Value> {
        self.keys.into_iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

/// Mean of `value_col` per distinct `group_col`, groups in first-appearance
/// order. Missing values do not count toward a group's denominator; rows
/// with a missing group key are skipped.
pub fn mean_by_group(
    table: &Table,
    group_col: &str,
    value_col: &str,
) -> Result<Vec<GroupMean>, AggregationError> {
    let g = column_index(table, group_col)?;
    let v = continuous_index(table, value_col)?;

    let mut order = KeyOrder::default();
    let mut sums: Vec<(f64, usize)> = Vec::new();
    for row in table.rows().iter().filter(|r| !r[g].is_null()) {
        let id = order.id(&row[g]);
        if id == sums.len() {
            sums.push((0.0, 0));
        }
        if let Some(x) = row[v].as_f64() {
            sums[id].0 += x;
            sums[id].1 += 1;
        }
    }

    Ok(order
        .into_keys()
        .into_iter()
        .zip(sums)
        .map(|(group, (sum, count))| GroupMean {
            group,
            mean: (count > 0).then(|| sum / count as f64),
            count,
        })
        .collect())
}

/// Sparse counts of each observed (group, category) pair: groups in
/// first-appearance order, then categories in first-appearance order.
/// Rows missing either key are skipped.
pub fn count_by_group_and_category(
    table: &Table,
    group_col: &str,
    cat_col: &str,
) -> Result<Vec<GroupCount>, AggregationError> {
    let tab = cross_tab(table, group_col, cat_col)?;
    let mut out = Vec::new();
    for (r, group) in tab.row_keys.iter().enumerate() {
        for (c, category) in tab.col_keys.iter().enumerate() {
            let count = tab.counts[r][c];
            if count > 0 {
                out.push(GroupCount {
                    group: group.clone(),
                    category: category.clone(),
                    count,
                });
            }
        }
    }
    Ok(out)
}

/// Dense contingency table between two columns. Row and column keys are in
/// first-appearance order; rows missing either key are skipped.
pub fn cross_tab(
    table: &Table,
    row_col: &str,
    col_col: &str,
) -> Result<CrossTab, AggregationError> {
    let r = column_index(table, row_col)?;
    let c = column_index(table, col_col)?;

    let mut row_order = KeyOrder::default();
    let mut col_order = KeyOrder::default();
    let mut cells: HashMap<(usize, usize), u64> = HashMap::new();
    for row in table.rows() {
        if row[r].is_null() || row[c].is_null() {
            continue;
        }
        let key = (row_order.id(&row[r]), col_order.id(&row[c]));
        *cells.entry(key).or_insert(0) += 1;
    }

    let row_keys = row_order.into_keys();
    let col_keys = col_order.into_keys();
    let mut counts = vec![vec![0u64; col_keys.len()]; row_keys.len()];
    for ((ri, ci), n) in cells {
        counts[ri][ci] = n;
    }

    Ok(CrossTab {
        row_column: row_col.to_string(),
        col_column: col_col.to_string(),
        row_keys,
        col_keys,
        counts,
    })
}

/// Frequency of each non-missing value, most frequent first; ties keep
/// first-appearance order.
pub fn value_counts(table: &Table, column: &str) -> Result<Vec<(Value, u64)>, AggregationError> {
    let idx = column_index(table, column)?;
    let mut order = KeyOrder::default();
    let mut counts: Vec<u64> = Vec::new();
    for row in table.rows().iter().filter(|r| !r[idx].is_null()) {
        let id = order.id(&row[idx]);
        if id == counts.len() {
            counts.push(0);
        }
        counts[id] += 1;
    }
    let mut out: Vec<(Value, u64)> = order.into_keys().into_iter().zip(counts).collect();
    // stable sort keeps first-appearance order among ties
    out.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(out)
}

/// Equal-width histogram of a continuous column's finite values. Infinite
/// cells are left out along with missing ones.
pub fn histogram(
    table: &Table,
    column: &str,
    bins: usize,
) -> Result<Vec<HistogramBin>, AggregationError> {
    let idx = continuous_index(table, column)?;
    if bins == 0 {
        return Err(AggregationError::InvalidBins);
    }
    let values: Vec<f64> = table
        .rows()
        .iter()
        .filter_map(|r| r[idx].as_f64())
        .filter(|x| x.is_finite())
        .collect();
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return Ok(vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len() as u64,
        }]);
    }

    let width = range / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for x in values {
        let i = (((x - min) / width) as usize).min(bins - 1);
        out[i].count += 1;
    }
    Ok(out)
}

/// Mean of each of `value_cols` per group, for radar charts. Groups follow
/// first-appearance order of `group_col`.
pub fn profile_by_group(
    table: &Table,
    group_col: &str,
    value_cols: &[String],
) -> Result<Vec<GroupProfile>, AggregationError> {
    let groups = match value_cols.first() {
        Some(first) => mean_by_group(table, group_col, first)?,
        None => {
            column_index(table, group_col)?;
            return Ok(Vec::new());
        }
    };
    let mut profiles: Vec<GroupProfile> = groups
        .into_iter()
        .map(|gm| GroupProfile {
            group: gm.group,
            means: vec![gm.mean],
        })
        .collect();

    for col in &value_cols[1..] {
        let means = mean_by_group(table, group_col, col)?;
        // same table and group column, so the group order matches
        for (profile, gm) in profiles.iter_mut().zip(means) {
            profile.means.push(gm.mean);
        }
    }
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Table {
        Table::new(
            vec!["CARRERA".into(), "NIVEL".into()],
            vec![
                vec!["Psic".into(), "Alto".into()],
                vec!["Psic".into(), "Bajo".into()],
                vec!["Ing".into(), "Alto".into()],
            ],
        )
        .unwrap()
    }

    fn scores() -> Table {
        Table::new(
            vec!["CARRERA".into(), "AE_Total".into(), "Z_COE".into()],
            vec![
                vec!["X".into(), Value::Integer(10), Value::Float(1.0)],
                vec!["X".into(), Value::Integer(20), Value::Float(-1.0)],
                vec!["X".into(), Value::Null, Value::Float(3.0)],
                vec!["Y".into(), Value::Null, Value::Float(0.5)],
                vec![Value::Null, Value::Integer(99), Value::Float(9.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn count_by_group_is_sparse_in_appearance_order() {
        let counts = count_by_group_and_category(&levels(), "CARRERA", "NIVEL").unwrap();
        let flat: Vec<(String, String, u64)> = counts
            .iter()
            .map(|c| (c.group.to_string(), c.category.to_string(), c.count))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("Psic".to_string(), "Alto".to_string(), 1),
                ("Psic".to_string(), "Bajo".to_string(), 1),
                ("Ing".to_string(), "Alto".to_string(), 1),
            ]
        );
    }

    #[test]
    fn cross_tab_is_dense() {
        let tab = cross_tab(&levels(), "CARRERA", "NIVEL").unwrap();
        assert_eq!(tab.row_keys, vec![Value::from("Psic"), Value::from("Ing")]);
        assert_eq!(tab.col_keys, vec![Value::from("Alto"), Value::from("Bajo")]);
        assert_eq!(tab.counts, vec![vec![1, 1], vec![1, 0]]);
        assert_eq!(tab.get(&"Ing".into(), &"Bajo".into()), Some(0));
        assert_eq!(tab.column_totals(), vec![2, 1]);
        assert_eq!(tab.total(), 3);
    }

    #[test]
    fn cross_tab_row_sums_match_group_counts() {
        let t = levels();
        let tab = cross_tab(&t, "CARRERA", "NIVEL").unwrap();
        let counts = count_by_group_and_category(&t, "CARRERA", "NIVEL").unwrap();
        for (key, total) in tab.row_keys.iter().zip(tab.row_totals()) {
            let sparse: u64 = counts.iter().filter(|c| &c.group == key).map(|c| c.count).sum();
            assert_eq!(sparse, total);
        }
    }

    #[test]
    fn mean_skips_missing_values() {
        let means = mean_by_group(&scores(), "CARRERA", "AE_Total").unwrap();
        assert_eq!(means.len(), 2);
        assert_eq!(means[0].group, Value::from("X"));
        assert_eq!(means[0].mean, Some(15.0));
        assert_eq!(means[0].count, 2);
    }

    #[test]
    fn all_missing_group_has_undefined_mean() {
        let means = mean_by_group(&scores(), "CARRERA", "AE_Total").unwrap();
        assert_eq!(means[1].group, Value::from("Y"));
        assert_eq!(means[1].mean, None);
        assert_eq!(means[1].count, 0);
    }

    #[test]
    fn mean_rejects_bad_columns() {
        assert_eq!(
            mean_by_group(&scores(), "CARRERA", "CARRERA"),
            Err(AggregationError::NotContinuous("CARRERA".into()))
        );
        assert_eq!(
            mean_by_group(&scores(), "ZZZ", "AE_Total"),
            Err(AggregationError::UnknownColumn("ZZZ".into()))
        );
        assert_eq!(
            mean_by_group(&scores(), "CARRERA", "ZZZ"),
            Err(AggregationError::UnknownColumn("ZZZ".into()))
        );
    }

    #[test]
    fn value_counts_sorted_by_frequency() {
        let counts = value_counts(&levels(), "NIVEL").unwrap();
        assert_eq!(counts, vec![(Value::from("Alto"), 2), (Value::from("Bajo"), 1)]);
    }

    #[test]
    fn histogram_bins_cover_the_range() {
        let bins = histogram(&scores(), "Z_COE", 4).unwrap();
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].lower, -1.0);
        assert_eq!(bins[3].upper, 9.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 5);
        // 9.0 sits on the closed upper edge
        assert_eq!(bins[3].count, 1);
    }

    #[test]
    fn histogram_edge_cases() {
        assert_eq!(histogram(&scores(), "Z_COE", 0), Err(AggregationError::InvalidBins));
        assert!(matches!(
            histogram(&scores(), "CARRERA", 3),
            Err(AggregationError::NotContinuous(_))
        ));
        let constant = Table::new(
            vec!["v".into()],
            vec![vec![Value::Integer(3)], vec![Value::Integer(3)]],
        )
        .unwrap();
        let bins = histogram(&constant, "v", 5).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);
    }

    #[test]
    fn histogram_skips_infinite_values() {
        let t = Table::new(
            vec!["v".into()],
            vec![
                vec![Value::Float(1.0)],
                vec![Value::Float(f64::INFINITY)],
                vec![Value::Float(3.0)],
                vec![Value::Float(f64::NEG_INFINITY)],
            ],
        )
        .unwrap();
        let bins = histogram(&t, "v", 2).unwrap();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].lower, 1.0);
        assert_eq!(bins[1].upper, 3.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 2);
    }

    #[test]
    fn histogram_bins_a_tiny_range() {
        let t = Table::new(
            vec!["v".into()],
            vec![vec![Value::Float(0.0)], vec![Value::Float(1e-300)]],
        )
        .unwrap();
        let bins = histogram(&t, "v", 2).unwrap();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[1].upper, 1e-300);
    }

    #[test]
    fn equal_float_keys_form_one_group() {
        let t = Table::new(
            vec!["k".into(), "v".into()],
            vec![
                vec![Value::Float(1.5), Value::Integer(2)],
                vec![Value::Float(1.5), Value::Integer(4)],
                vec![Value::Float(f64::NAN), Value::Integer(1)],
                vec![Value::Float(f64::NAN), Value::Integer(1)],
            ],
        )
        .unwrap();
        let means = mean_by_group(&t, "k", "v").unwrap();
        assert_eq!(means.len(), 2);
        assert_eq!(means[0].group, Value::Float(1.5));
        assert_eq!(means[0].mean, Some(3.0));
        assert_eq!(means[0].count, 2);
        let tab = cross_tab(&t, "k", "k").unwrap();
        assert_eq!(tab.row_keys.len(), 2);
        assert_eq!(tab.counts, vec![vec![2, 0], vec![0, 2]]);
    }

    #[test]
    fn profile_collects_means_per_column() {
        let cols = vec!["AE_Total".to_string(), "Z_COE".to_string()];
        let profiles = profile_by_group(&scores(), "CARRERA", &cols).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].means, vec![Some(15.0), Some(1.0)]);
        assert_eq!(profiles[1].means, vec![None, Some(0.5)]);
    }
}
