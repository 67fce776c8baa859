//! Survey tables: load, classify columns, filter rows, and aggregate for
//! charting.

pub mod config;
pub mod data;

pub use data::error::{AggregationError, FilterError, LoadError, PipelineError};
pub use data::filter::{filter, FilterSpec};
pub use data::loader::{load, Dataset, DatasetKind};
pub use data::model::{Table, Value};
pub use data::schema::{classify, Classification, ColumnKind};
