//! Chart configuration: which columns fit which chart, whether a selection is
//! valid, and the aggregated values to plot.

pub mod dataset;
pub mod spec;
pub mod validate;
pub mod aggregate;
pub mod export;

pub use aggregate::{aggregate, AggregatedSeries, AxisValue, CategoryPoint, ScatterGroup, SeriesData};
pub use dataset::{Cell, Column, ColumnKind, RawCell, TabularDataset};
pub use export::write_chart_workbook;
pub use spec::{Aggregation, ChartField, ChartSpec, ChartType, ValidationError};
pub use validate::{aggregation_recommended, eligible_columns, validate, EligibleColumns};
