use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use super::dataset::{format_number, Cell, Column, TabularDataset};
use super::spec::{Aggregation, ChartField, ChartSpec, ChartType, ValidationError};
use super::validate::validate;
use crate::error::DocError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Number(f64),
    Text(String),
}

impl AxisValue {
    fn from_cell(cell: &Cell) -> Self {
        match cell {
            Cell::Number(n) => Self::Number(*n),
            other => Self::Text(other.to_string()),
        }
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

impl Display for AxisValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPoint {
    pub x: AxisValue,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterGroup {
    pub name: Option<String>,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SeriesData {
    Categories(Vec<CategoryPoint>),
    Scatter(Vec<ScatterGroup>),
}

/// Plot-ready values for one validated chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    pub chart_type: ChartType,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: SeriesData,
}

impl AggregatedSeries {
    /// A short plain-text listing, at most `max_rows` lines of values.
    pub fn summary(&self, max_rows: usize) -> String {
        let mut lines = vec![format!("{} ({} / {})", self.title, self.x_label, self.y_label)];
        match &self.data {
            SeriesData::Categories(points) => {
                lines.extend(
                    points.iter().take(max_rows).map(|p| format!("  {}: {}", p.x, format_number(p.y))),
                );
                if points.len() > max_rows {
                    lines.push(format!("  ... {} more", points.len() - max_rows));
                }
            }
            SeriesData::Scatter(groups) => {
                lines.extend(groups.iter().take(max_rows).map(|g| {
                    format!("  {}: {} point(s)", g.name.as_deref().unwrap_or("all"), g.points.len())
                }));
            }
        }
        lines.join("\n")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn title(spec: &ChartSpec, aggregation: Aggregation) -> String {
    let y = spec.y.as_deref().unwrap_or("count");
    match spec.chart_type {
        ChartType::Pie if spec.y.is_none() => format!("Distribution of {}", spec.x),
        ChartType::Scatter => match &spec.color {
            Some(color) => format!("{} vs {} colored by {}", y, spec.x, color),
            None => format!("{} vs {}", y, spec.x),
        },
        chart_type => {
            let joiner = if chart_type == ChartType::Line { "over" } else { "by" };
            match aggregation {
                Aggregation::None => format!("{} {} {}", y, joiner, spec.x),
                agg => format!("{} of {} {} {}", capitalize(&agg.to_string()), y, joiner, spec.x),
            }
        }
    }
}

fn column<'a>(dataset: &'a TabularDataset, field: ChartField, name: &str) -> Result<&'a Column, DocError> {
    dataset.column(name).ok_or_else(|| {
        DocError::Validation(vec![ValidationError::new(field, format!("unknown column '{}'", name))])
    })
}

/// Computes the plotted values for `spec`. The spec is validated first and
/// nothing is computed when it is invalid.
pub fn aggregate(dataset: &TabularDataset, spec: &ChartSpec) -> Result<AggregatedSeries, DocError> {
    let errors = validate(dataset, spec);
    if !errors.is_empty() {
        return Err(DocError::Validation(errors));
    }

    let x = column(dataset, ChartField::X, &spec.x)?;
    let y = spec.y.as_deref().map(|name| column(dataset, ChartField::Y, name)).transpose()?;
    let aggregation = spec.effective_aggregation();

    let data = match spec.chart_type {
        ChartType::Scatter => {
            let y = y.ok_or_else(|| {
                DocError::Validation(vec![ValidationError::new(ChartField::Y, "y column is required")])
            })?;
            let color = spec.color.as_deref().map(|name| column(dataset, ChartField::Color, name)).transpose()?;
            SeriesData::Scatter(scatter(x, y, color))
        }
        chart_type => {
            let mut points = match aggregation {
                Aggregation::None => rows(x, y),
                agg => grouped(x, y, agg),
            };
            if chart_type == ChartType::Pie {
                points.sort_by(|a, b| b.y.total_cmp(&a.y));
            }
            SeriesData::Categories(points)
        }
    };

    log::debug!("aggregated {} chart for '{}' with {}", spec.chart_type, spec.x, aggregation);
    Ok(AggregatedSeries {
        chart_type: spec.chart_type,
        title: title(spec, aggregation),
        x_label: spec.x.clone(),
        y_label: spec.y.clone().unwrap_or_else(|| "count".to_string()),
        data,
    })
}

fn rows(x: &Column, y: Option<&Column>) -> Vec<CategoryPoint> {
    let Some(y) = y else {
        return Vec::new();
    };
    x.cells()
        .iter()
        .zip(y.cells())
        .filter_map(|(xc, yc)| {
            yc.as_f64().map(|value| CategoryPoint {
                x: AxisValue::from_cell(xc),
                y: value,
            })
        })
        .collect()
}

fn grouped(x: &Column, y: Option<&Column>, aggregation: Aggregation) -> Vec<CategoryPoint> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(AxisValue, Vec<f64>, usize)> = Vec::new();

    for (row, cell) in x.cells().iter().enumerate() {
        let slot = *index.entry(cell.to_string()).or_insert_with(|| {
            groups.push((AxisValue::from_cell(cell), Vec::new(), 0));
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.2 += 1;
        if let Some(value) = y.and_then(|y| y.cells()[row].as_f64()) {
            group.1.push(value);
        }
    }

    groups.sort_by(|a, b| a.0.key_cmp(&b.0));
    groups
        .into_iter()
        .map(|(key, values, count)| CategoryPoint {
            x: key,
            y: reduce(aggregation, &values, count),
        })
        .collect()
}

fn reduce(aggregation: Aggregation, values: &[f64], count: usize) -> f64 {
    match aggregation {
        Aggregation::Count => count as f64,
        Aggregation::Sum | Aggregation::None => values.iter().sum(),
        Aggregation::Mean => {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        }
        Aggregation::Median => median(values),
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn scatter(x: &Column, y: &Column, color: Option<&Column>) -> Vec<ScatterGroup> {
    let points = x.cells().iter().zip(y.cells()).enumerate().filter_map(|(row, (xc, yc))| {
        Some((row, (xc.as_f64()?, yc.as_f64()?)))
    });

    let Some(color) = color else {
        return vec![ScatterGroup {
            name: None,
            points: points.map(|(_, p)| p).collect(),
        }];
    };

    let mut groups: Vec<ScatterGroup> = Vec::new();
    for (row, point) in points {
        let name = color.cells()[row].to_string();
        match groups.iter_mut().find(|g| g.name.as_deref() == Some(name.as_str())) {
            Some(group) => group.points.push(point),
            None => groups.push(ScatterGroup {
                name: Some(name),
                points: vec![point],
            }),
        }
    }
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::dataset::sample;

    fn categories(series: &AggregatedSeries) -> &[CategoryPoint] {
        match &series.data {
            SeriesData::Categories(points) => points,
            SeriesData::Scatter(_) => &[],
        }
    }

    fn values(series: &AggregatedSeries) -> Vec<(String, f64)> {
        categories(series).iter().map(|p| (p.x.to_string(), p.y)).collect()
    }

    #[test]
    fn test_column_sum_by_category() -> anyhow::Result<()> {
        let data = sample(&[("category", &["A", "A", "B"]), ("value", &["10", "20", "30"])]);
        let spec = ChartSpec::new(ChartType::Column, "category").y("value").aggregation(Aggregation::Sum);
        let series = aggregate(&data, &spec)?;
        assert_eq!(values(&series), vec![("A".to_string(), 30.0), ("B".to_string(), 30.0)]);
        assert_eq!(series.title, "Sum of value by category");
        Ok(())
    }

    #[test]
    fn test_pie_count_sorted_descending() -> anyhow::Result<()> {
        let data = sample(&[("fruit", &["pear", "apple", "fig", "apple", "fig", "apple", "kiwi"])]);
        let series = aggregate(&data, &ChartSpec::new(ChartType::Pie, "fruit"))?;
        let counts: Vec<f64> = categories(&series).iter().map(|p| p.y).collect();
        assert_eq!(counts, vec![3.0, 2.0, 1.0, 1.0]);
        assert_eq!(categories(&series)[0].x, AxisValue::Text("apple".into()));
        // ties keep key order
        assert_eq!(categories(&series)[2].x, AxisValue::Text("kiwi".into()));
        assert_eq!(series.title, "Distribution of fruit");
        Ok(())
    }

    #[test]
    fn test_pie_with_values_sorted_by_aggregate() -> anyhow::Result<()> {
        let data = sample(&[("region", &["n", "s", "e", "s"]), ("sales", &["5", "1", "9", "2"])]);
        let series = aggregate(&data, &ChartSpec::new(ChartType::Pie, "region").y("sales"))?;
        assert_eq!(
            values(&series),
            vec![("e".to_string(), 9.0), ("n".to_string(), 5.0), ("s".to_string(), 3.0)]
        );
        Ok(())
    }

    #[test]
    fn test_column_keeps_key_order_not_value_order() -> anyhow::Result<()> {
        let data = sample(&[("k", &["b", "a", "c"]), ("v", &["1", "5", "3"])]);
        let spec = ChartSpec::new(ChartType::Column, "k").y("v").aggregation(Aggregation::Mean);
        let series = aggregate(&data, &spec)?;
        assert_eq!(
            values(&series),
            vec![("a".to_string(), 5.0), ("b".to_string(), 1.0), ("c".to_string(), 3.0)]
        );
        Ok(())
    }

    #[test]
    fn test_reductions() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(reduce(Aggregation::Sum, &values, 4), 10.0);
        assert_eq!(reduce(Aggregation::Mean, &values, 4), 2.5);
        assert_eq!(reduce(Aggregation::Median, &values, 4), 2.5);
        assert_eq!(reduce(Aggregation::Median, &values[..3], 3), 3.0);
        assert_eq!(reduce(Aggregation::Count, &[], 7), 7.0);
    }

    #[test]
    fn test_line_numeric_x_grouped_numerically() -> anyhow::Result<()> {
        let data = sample(&[("year", &["2010", "9", "2010", "100"]), ("v", &["1", "2", "3", "4"])]);
        let spec = ChartSpec::new(ChartType::Line, "year").y("v").aggregation(Aggregation::Sum);
        let series = aggregate(&data, &spec)?;
        assert_eq!(
            values(&series),
            vec![("9".to_string(), 2.0), ("100".to_string(), 4.0), ("2010".to_string(), 4.0)]
        );
        assert_eq!(series.title, "Sum of v over year");
        Ok(())
    }

    #[test]
    fn test_no_aggregation_keeps_rows() -> anyhow::Result<()> {
        let data = sample(&[("k", &["b", "a", "b"]), ("v", &["1", "2", "3"])]);
        let series = aggregate(&data, &ChartSpec::new(ChartType::Column, "k").y("v"))?;
        assert_eq!(categories(&series).len(), 3);
        assert_eq!(categories(&series)[0].x, AxisValue::Text("b".into()));
        Ok(())
    }

    #[test]
    fn test_scatter_groups_by_stringified_color() -> anyhow::Result<()> {
        let data = sample(&[
            ("x", &["1", "2", "3", "4"]),
            ("y", &["2", "4", "6", "8"]),
            ("tier", &["2", "1", "2", "1"]),
        ]);
        let spec = ChartSpec::new(ChartType::Scatter, "x").y("y").color("tier");
        let series = aggregate(&data, &spec)?;
        let SeriesData::Scatter(groups) = &series.data else {
            panic!("expected scatter data");
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name.as_deref(), Some("1"));
        assert_eq!(groups[0].points, vec![(2.0, 4.0), (4.0, 8.0)]);
        assert_eq!(series.title, "y vs x colored by tier");
        Ok(())
    }

    #[test]
    fn test_invalid_spec_is_never_aggregated() {
        let data = sample(&[("x", &["1", "2"]), ("y", &["3", "4"])]);
        let spec = ChartSpec::new(ChartType::Scatter, "x").y("x");
        match aggregate(&data, &spec) {
            Err(DocError::Validation(errors)) => assert!(!errors.is_empty()),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_summary_truncates() -> anyhow::Result<()> {
        let data = sample(&[("k", &["a", "b", "c"])]);
        let series = aggregate(&data, &ChartSpec::new(ChartType::Pie, "k"))?;
        let summary = series.summary(2);
        assert!(summary.contains("... 1 more"));
        Ok(())
    }
}
