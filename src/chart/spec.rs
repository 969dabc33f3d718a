use std::fmt::{self, Display, Formatter};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Column,
    Pie,
    Line,
    Scatter,
}

impl Display for ChartType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Column => "column",
            Self::Pie => "pie",
            Self::Line => "line",
            Self::Scatter => "scatter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    None,
    Sum,
    Mean,
    Count,
    Median,
}

impl Aggregation {
    pub const ALL: [Aggregation; 5] = [Self::None, Self::Sum, Self::Mean, Self::Count, Self::Median];
}

impl Display for Aggregation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Count => "count",
            Self::Median => "median",
        };
        f.write_str(name)
    }
}

/// The user's chart choice: type, axis columns, colour column and reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub x: String,
    pub y: Option<String>,
    pub color: Option<String>,
    pub aggregation: Aggregation,
}

impl ChartSpec {
    pub fn new(chart_type: ChartType, x: impl Into<String>) -> Self {
        Self {
            chart_type,
            x: x.into(),
            y: None,
            color: None,
            aggregation: Aggregation::None,
        }
    }

    pub fn y(mut self, y: impl Into<String>) -> Self {
        self.y = Some(y.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// The reduction actually applied. A pie without a value column counts
    /// rows per category; a pie with one always aggregates (sum by default).
    pub fn effective_aggregation(&self) -> Aggregation {
        match (self.chart_type, &self.y, self.aggregation) {
            (ChartType::Pie, None, _) => Aggregation::Count,
            (ChartType::Pie, Some(_), Aggregation::None) => Aggregation::Sum,
            (_, _, aggregation) => aggregation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartField {
    X,
    Y,
    Color,
    Aggregation,
}

impl Display for ChartField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Color => "color",
            Self::Aggregation => "aggregation",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: ChartField,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: ChartField, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}
