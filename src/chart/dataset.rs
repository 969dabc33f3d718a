use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::error::DocError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// A cell as a parser produced it, before the column is classified.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Null,
    Number(f64),
    Text(String),
}

impl RawCell {
    /// Infers a cell from untyped text, the way CSV values arrive.
    pub fn infer(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Text(s) => write!(f, "{}", s),
            Self::Missing => Ok(()),
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    cells: Vec<Cell>,
}

impl Column {
    /// Classifies the whole column at once: numeric only when at least one
    /// value is present and every present value is a number.
    pub fn from_raw(name: impl Into<String>, raw: Vec<RawCell>) -> Self {
        let present = raw.iter().filter(|c| !matches!(c, RawCell::Null)).count();
        let numeric = present > 0 && raw.iter().all(|c| !matches!(c, RawCell::Text(_)));

        let (kind, cells) = if numeric {
            let cells = raw
                .into_iter()
                .map(|c| match c {
                    RawCell::Number(n) => Cell::Number(n),
                    _ => Cell::Missing,
                })
                .collect();
            (ColumnKind::Numeric, cells)
        } else {
            let cells = raw
                .into_iter()
                .map(|c| match c {
                    RawCell::Null => Cell::Missing,
                    RawCell::Number(n) => Cell::Text(format_number(n)),
                    RawCell::Text(s) => Cell::Text(s),
                })
                .collect();
            (ColumnKind::Categorical, cells)
        };

        Self { name: name.into(), kind, cells }
    }

    /// Builds a column from untyped text cells, keeping the original text when
    /// the column turns out categorical.
    pub fn infer(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        let raw: Vec<RawCell> = values
            .iter()
            .map(|v| v.as_deref().map_or(RawCell::Null, RawCell::infer))
            .collect();
        let column = Self::from_raw(name, raw);
        if column.kind == ColumnKind::Numeric {
            return column;
        }
        let cells = values
            .into_iter()
            .map(|v| match v {
                Some(s) if !s.trim().is_empty() => Cell::Text(s),
                _ => Cell::Missing,
            })
            .collect();
        Self { cells, ..column }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }
}

/// A loaded table whose columns each have a single kind.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    columns: Vec<Column>,
    rows: usize,
}

impl TabularDataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, DocError> {
        let rows = columns.first().map_or(0, |c| c.cells.len());
        if let Some(bad) = columns.iter().find(|c| c.cells.len() != rows) {
            return Err(DocError::parse(
                "tabular",
                format!("column '{}' has {} rows, expected {}", bad.name, bad.cells.len(), rows),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(DocError::parse("tabular", format!("duplicate column name '{}'", dup.name)));
        }
        Ok(Self { columns, rows })
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns.iter().filter(|c| c.is_numeric()).map(|c| c.name.as_str()).collect()
    }

    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns.iter().filter(|c| !c.is_numeric()).map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// The dataset as a grid of display strings, header row first.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows + 1);
        grid.push(self.columns.iter().map(|c| c.name.clone()).collect());
        for row in 0..self.rows {
            grid.push(self.columns.iter().map(|c| c.cells[row].to_string()).collect());
        }
        grid
    }

    /// Renders the first `n` rows as an aligned text table.
    pub fn head(&self, n: usize) -> String {
        let grid: Vec<Vec<String>> = self.to_grid().into_iter().take(n + 1).collect();
        render_grid(&grid)
    }

    pub fn render(&self) -> String {
        render_grid(&self.to_grid())
    }
}

pub fn render_grid(grid: &[Vec<String>]) -> String {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; width];
    for row in grid {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    grid.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{:>w$}", cell, w = widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) fn sample(columns: &[(&str, &[&str])]) -> TabularDataset {
    let columns = columns
        .iter()
        .map(|(name, values)| {
            Column::infer(
                *name,
                values.iter().map(|v| if v.is_empty() { None } else { Some(v.to_string()) }).collect(),
            )
        })
        .collect();
    TabularDataset::new(columns).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_classification() {
        let data = sample(&[
            ("category", &["A", "A", "B"]),
            ("value", &["10", "20", "30.5"]),
            ("mixed", &["1", "two", "3"]),
            ("sparse", &["", "4", ""]),
            ("empty", &["", "", ""]),
        ]);
        assert_eq!(data.numeric_columns(), vec!["value", "sparse"]);
        assert_eq!(data.categorical_columns(), vec!["category", "mixed", "empty"]);
        assert_eq!(data.column("sparse").map(Column::missing_count), Some(2));
    }

    #[test]
    fn test_categorical_keeps_original_text() {
        let data = sample(&[("code", &["007", "A1"])]);
        let column = data.column("code").unwrap();
        assert_eq!(column.cells()[0], Cell::Text("007".into()));
    }

    #[test]
    fn test_from_raw_stringifies_numbers_in_text_columns() {
        let column = Column::from_raw("c", vec![RawCell::Number(2.0), RawCell::Text("x".into()), RawCell::Null]);
        assert_eq!(column.kind(), ColumnKind::Categorical);
        assert_eq!(column.cells(), &[Cell::Text("2".into()), Cell::Text("x".into()), Cell::Missing]);
    }

    #[test]
    fn test_dataset_rejects_ragged_and_duplicate_columns() {
        let a = Column::infer("a", vec![Some("1".into())]);
        let b = Column::infer("b", vec![]);
        assert!(TabularDataset::new(vec![a.clone(), b]).is_err());
        assert!(TabularDataset::new(vec![a.clone(), a]).is_err());
    }

    #[test]
    fn test_head_renders_header_and_rows() {
        let data = sample(&[("name", &["x", "yy", "zzz"]), ("n", &["1", "2", "3"])]);
        let head = data.head(2);
        assert_eq!(head.lines().count(), 3);
        assert!(head.lines().next().unwrap().contains("name"));
        assert!(!head.contains("zzz"));
    }
}
