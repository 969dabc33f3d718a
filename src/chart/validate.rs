use serde::Serialize;

use super::dataset::{Column, ColumnKind, TabularDataset};
use super::spec::{Aggregation, ChartField, ChartSpec, ChartType, ValidationError};

/// Column slots a chart type accepts, as offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibleColumns {
    pub x_candidates: Vec<String>,
    pub y_candidates: Vec<String>,
    pub color_candidates: Vec<String>,
    pub y_optional: bool,
    pub aggregations: Vec<Aggregation>,
}

/// Kinds allowed in the x slot.
fn x_kinds(chart_type: ChartType) -> &'static [ColumnKind] {
    match chart_type {
        ChartType::Column | ChartType::Pie => &[ColumnKind::Categorical],
        ChartType::Line => &[ColumnKind::Categorical, ColumnKind::Numeric],
        ChartType::Scatter => &[ColumnKind::Numeric],
    }
}

fn y_optional(chart_type: ChartType) -> bool {
    chart_type == ChartType::Pie
}

fn supports_color(chart_type: ChartType) -> bool {
    chart_type == ChartType::Scatter
}

pub fn allowed_aggregations(chart_type: ChartType) -> Vec<Aggregation> {
    match chart_type {
        ChartType::Scatter => vec![Aggregation::None],
        _ => Aggregation::ALL.to_vec(),
    }
}

fn names_where(dataset: &TabularDataset, keep: impl Fn(&Column) -> bool) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .filter(|c| keep(c))
        .map(|c| c.name().to_string())
        .collect()
}

pub fn eligible_columns(dataset: &TabularDataset, chart_type: ChartType) -> EligibleColumns {
    let allowed_x = x_kinds(chart_type);
    EligibleColumns {
        x_candidates: names_where(dataset, |c| allowed_x.contains(&c.kind())),
        y_candidates: names_where(dataset, Column::is_numeric),
        color_candidates: if supports_color(chart_type) {
            names_where(dataset, |_| true)
        } else {
            Vec::new()
        },
        y_optional: y_optional(chart_type),
        aggregations: allowed_aggregations(chart_type),
    }
}

/// Large datasets should be aggregated before plotting.
pub fn aggregation_recommended(dataset: &TabularDataset, threshold: usize) -> bool {
    dataset.row_count() > threshold
}

fn kind_name(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Numeric => "numeric",
        ColumnKind::Categorical => "categorical",
    }
}

/// Checks `spec` against the dataset. An empty list means the chart may be
/// drawn.
pub fn validate(dataset: &TabularDataset, spec: &ChartSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut selected: Vec<&Column> = Vec::new();

    let lookup = move |field: ChartField, name: &str, errors: &mut Vec<ValidationError>| {
        let column = dataset.column(name);
        if column.is_none() {
            errors.push(ValidationError::new(field, format!("unknown column '{}'", name)));
        }
        column
    };

    if let Some(x) = lookup(ChartField::X, &spec.x, &mut errors) {
        let allowed = x_kinds(spec.chart_type);
        if !allowed.contains(&x.kind()) {
            errors.push(ValidationError::new(
                ChartField::X,
                format!(
                    "{} charts need a {} x column, '{}' is {}",
                    spec.chart_type,
                    kind_name(allowed[0]),
                    x.name(),
                    kind_name(x.kind())
                ),
            ));
        }
        selected.push(x);
    }

    match &spec.y {
        None if !y_optional(spec.chart_type) => {
            errors.push(ValidationError::new(
                ChartField::Y,
                format!("{} charts need a numeric y column", spec.chart_type),
            ));
        }
        None => {}
        Some(y_name) => {
            if let Some(y) = lookup(ChartField::Y, y_name, &mut errors) {
                if !y.is_numeric() {
                    errors.push(ValidationError::new(
                        ChartField::Y,
                        format!("y column '{}' is categorical, a numeric column is required", y.name()),
                    ));
                }
                selected.push(y);
            }
        }
    }

    if spec.chart_type == ChartType::Scatter && spec.y.as_deref() == Some(spec.x.as_str()) {
        errors.push(ValidationError::new(ChartField::Y, "scatter plots need different x and y columns"));
    }

    if let Some(color_name) = &spec.color {
        if !supports_color(spec.chart_type) {
            errors.push(ValidationError::new(
                ChartField::Color,
                format!("{} charts do not take a color column", spec.chart_type),
            ));
        } else if let Some(color) = lookup(ChartField::Color, color_name, &mut errors) {
            selected.push(color);
        }
    }

    if !allowed_aggregations(spec.chart_type).contains(&spec.aggregation) {
        errors.push(ValidationError::new(
            ChartField::Aggregation,
            format!("{} charts cannot be aggregated by {}", spec.chart_type, spec.aggregation),
        ));
    }

    let mut reported: Vec<&str> = Vec::new();
    for column in selected {
        if reported.contains(&column.name()) {
            continue;
        }
        reported.push(column.name());
        let missing = column.missing_count();
        if missing > 0 {
            errors.push(ValidationError::new(
                field_of(spec, column.name()),
                format!("column '{}' has {} missing value(s)", column.name(), missing),
            ));
        }
    }

    errors
}

fn field_of(spec: &ChartSpec, name: &str) -> ChartField {
    if spec.x == name {
        ChartField::X
    } else if spec.y.as_deref() == Some(name) {
        ChartField::Y
    } else {
        ChartField::Color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::dataset::sample;

    fn sales() -> TabularDataset {
        sample(&[
            ("region", &["north", "south", "north", "east"]),
            ("units", &["3", "5", "2", "7"]),
            ("price", &["1.5", "2.0", "1.0", "3.25"]),
            ("note", &["a", "", "c", "d"]),
        ])
    }

    #[test]
    fn test_eligibility_table() {
        let data = sales();

        let column = eligible_columns(&data, ChartType::Column);
        assert_eq!(column.x_candidates, vec!["region", "note"]);
        assert_eq!(column.y_candidates, vec!["units", "price"]);
        assert!(column.color_candidates.is_empty());
        assert!(!column.y_optional);

        let pie = eligible_columns(&data, ChartType::Pie);
        assert_eq!(pie.x_candidates, vec!["region", "note"]);
        assert!(pie.y_optional);

        let line = eligible_columns(&data, ChartType::Line);
        assert_eq!(line.x_candidates, vec!["region", "units", "price", "note"]);

        let scatter = eligible_columns(&data, ChartType::Scatter);
        assert_eq!(scatter.x_candidates, vec!["units", "price"]);
        assert_eq!(scatter.color_candidates.len(), 4);
        assert_eq!(scatter.aggregations, vec![Aggregation::None]);
    }

    #[test]
    fn test_valid_specs_pass() {
        let data = sales();
        let specs = [
            ChartSpec::new(ChartType::Column, "region").y("units").aggregation(Aggregation::Sum),
            ChartSpec::new(ChartType::Pie, "region"),
            ChartSpec::new(ChartType::Line, "units").y("price"),
            ChartSpec::new(ChartType::Scatter, "units").y("price").color("region"),
            ChartSpec::new(ChartType::Scatter, "units").y("price").color("units"),
        ];
        for spec in specs {
            assert_eq!(validate(&data, &spec), vec![], "{:?}", spec);
        }
    }

    #[test]
    fn test_scatter_same_axis_always_rejected() {
        let data = sales();
        for name in ["units", "region", "does-not-exist"] {
            let spec = ChartSpec::new(ChartType::Scatter, name).y(name);
            let errors = validate(&data, &spec);
            assert!(
                errors.iter().any(|e| e.reason.contains("different x and y")),
                "{:?}",
                errors
            );
        }
    }

    #[test]
    fn test_kind_mismatches() {
        let data = sales();
        let errors = validate(&data, &ChartSpec::new(ChartType::Column, "units").y("region"));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, ChartField::X);
        assert_eq!(errors[1].field, ChartField::Y);

        let errors = validate(&data, &ChartSpec::new(ChartType::Line, "region"));
        assert_eq!(errors, vec![ValidationError::new(ChartField::Y, "line charts need a numeric y column")]);
    }

    #[test]
    fn test_missing_values_reported() {
        let data = sales();
        let errors = validate(&data, &ChartSpec::new(ChartType::Pie, "note"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].reason.contains("1 missing value"));
    }

    #[test]
    fn test_color_and_aggregation_slots() {
        let data = sales();
        let errors = validate(&data, &ChartSpec::new(ChartType::Column, "region").y("units").color("note"));
        assert!(errors.iter().any(|e| e.field == ChartField::Color));

        let errors = validate(
            &data,
            &ChartSpec::new(ChartType::Scatter, "units").y("price").aggregation(Aggregation::Mean),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, ChartField::Aggregation);
    }

    #[test]
    fn test_unknown_columns() {
        let errors = validate(&sales(), &ChartSpec::new(ChartType::Column, "nope").y("missing"));
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.reason.starts_with("unknown column")));
    }

    #[test]
    fn test_aggregation_threshold() {
        let data = sales();
        assert!(aggregation_recommended(&data, 3));
        assert!(!aggregation_recommended(&data, 4));
    }
}
