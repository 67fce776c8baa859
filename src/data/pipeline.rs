//! One request in, one response out: filter the dataset, then aggregate.

use serde::Serialize;

use super::aggregate::{
    self, CrossTab, GroupCount, GroupMean, GroupProfile, HistogramBin,
};
use super::error::PipelineError;
use super::filter::{filter, FilterSpec};
use super::loader::Dataset;
use super::model::Value;

/// Which summary to compute over the filtered rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ViewKind {
    MeanByGroup { group: String, value: String },
    CountByGroup { group: String, category: String },
    CrossTab { rows: String, columns: String },
    Histogram { column: String, bins: usize },
    ValueCounts { column: String },
    Profile { group: String, values: Vec<String> },
}

impl ViewKind {
    /// How the renderer should draw this view's result.
    pub fn chart(&self) -> ChartKind {
        match self {
            ViewKind::MeanByGroup { .. } | ViewKind::ValueCounts { .. } => ChartKind::Bar,
            ViewKind::CountByGroup { .. } => ChartKind::GroupedBar,
            ViewKind::CrossTab { .. } => ChartKind::Table,
            ViewKind::Histogram { .. } => ChartKind::Histogram,
            ViewKind::Profile { .. } => ChartKind::Radar,
        }
    }
}

/// Chart tag handed to the renderer along with the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Bar,
    GroupedBar,
    Histogram,
    Radar,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRequest {
    pub filters: FilterSpec,
    pub view: ViewKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data")]
pub enum ViewResult {
    Means(Vec<GroupMean>),
    Counts(Vec<GroupCount>),
    CrossTab(CrossTab),
    Histogram(Vec<HistogramBin>),
    ValueCounts(Vec<(Value, u64)>),
    Profiles(Vec<GroupProfile>),
}

impl ViewResult {
    /// True when there is nothing to draw; the renderer shows "no data".
    pub fn is_empty(&self) -> bool {
        match self {
            ViewResult::Means(v) => v.is_empty(),
            ViewResult::Counts(v) => v.is_empty(),
            ViewResult::CrossTab(t) => t.is_empty(),
            ViewResult::Histogram(v) => v.is_empty(),
            ViewResult::ValueCounts(v) => v.is_empty(),
            ViewResult::Profiles(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResponse {
    /// Rows left after filtering.
    pub rows_matched: usize,
    pub chart: ChartKind,
    pub result: ViewResult,
}

/// Answer one view request against an immutable dataset.
pub fn run(dataset: &Dataset, request: &ViewRequest) -> Result<ViewResponse, PipelineError> {
    let table = filter(dataset.table(), &request.filters)?;

    let result = match &request.view {
        ViewKind::MeanByGroup { group, value } => {
            ViewResult::Means(aggregate::mean_by_group(&table, group, value)?)
        }
        ViewKind::CountByGroup { group, category } => {
            ViewResult::Counts(aggregate::count_by_group_and_category(&table, group, category)?)
        }
        ViewKind::CrossTab { rows, columns } => {
            ViewResult::CrossTab(aggregate::cross_tab(&table, rows, columns)?)
        }
        ViewKind::Histogram { column, bins } => {
            ViewResult::Histogram(aggregate::histogram(&table, column, *bins)?)
        }
        ViewKind::ValueCounts { column } => {
            ViewResult::ValueCounts(aggregate::value_counts(&table, column)?)
        }
        ViewKind::Profile { group, values } => {
            ViewResult::Profiles(aggregate::profile_by_group(&table, group, values)?)
        }
    };

    Ok(ViewResponse {
        rows_matched: table.len(),
        chart: request.view.chart(),
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::{AggregationError, FilterError};
    use crate::data::model::Table;

    fn dataset() -> Dataset {
        let table = Table::new(
            vec!["CARRERA".into(), "NIVEL".into(), "AE_Total".into()],
            vec![
                vec!["Psic".into(), "Alto".into(), Value::Integer(30)],
                vec!["Psic".into(), "Bajo".into(), Value::Integer(12)],
                vec!["Ing".into(), "Alto".into(), Value::Integer(27)],
            ],
        )
        .unwrap();
        Dataset::from_table("test", table)
    }

    #[test]
    fn filtered_mean_request() {
        let request = ViewRequest {
            filters: FilterSpec::new().with("CARRERA", [Value::from("Psic")]),
            view: ViewKind::MeanByGroup {
                group: "CARRERA".into(),
                value: "AE_Total".into(),
            },
        };
        let response = run(&dataset(), &request).unwrap();
        assert_eq!(response.rows_matched, 2);
        assert_eq!(response.chart, ChartKind::Bar);
        match response.result {
            ViewResult::Means(m) => assert_eq!(m[0].mean, Some(21.0)),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn empty_selection_is_not_an_error() {
        let mut filters = FilterSpec::new();
        filters.clear("CARRERA");
        let request = ViewRequest {
            filters,
            view: ViewKind::CrossTab {
                rows: "CARRERA".into(),
                columns: "NIVEL".into(),
            },
        };
        let response = run(&dataset(), &request).unwrap();
        assert_eq!(response.rows_matched, 0);
        assert!(response.result.is_empty());
    }

    #[test]
    fn errors_are_surfaced_by_stage() {
        let bad_filter = ViewRequest {
            filters: FilterSpec::new().with("ZZZ", [Value::from("x")]),
            view: ViewKind::ValueCounts { column: "NIVEL".into() },
        };
        assert_eq!(
            run(&dataset(), &bad_filter),
            Err(PipelineError::Filter(FilterError::UnknownColumn("ZZZ".into())))
        );

        let bad_view = ViewRequest {
            filters: FilterSpec::new(),
            view: ViewKind::Histogram { column: "NIVEL".into(), bins: 5 },
        };
        assert_eq!(
            run(&dataset(), &bad_view),
            Err(PipelineError::Aggregation(AggregationError::NotContinuous("NIVEL".into())))
        );
    }

    #[test]
    fn response_serializes_for_export() {
        let request = ViewRequest {
            filters: FilterSpec::new(),
            view: ViewKind::ValueCounts { column: "NIVEL".into() },
        };
        let response = run(&dataset(), &request).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["rows_matched"], 3);
        assert_eq!(json["result"]["kind"], "ValueCounts");
        assert_eq!(json["result"]["data"][0][0], "Alto");
        assert_eq!(json["result"]["data"][0][1], 2);
    }
}
