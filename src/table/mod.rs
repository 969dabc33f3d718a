use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::DocError;

pub mod detect;

pub use detect::detect_tables;

/// Rows of optional cells as an extractor returned them; `None` is a null cell.
pub type RawTable = Vec<Vec<Option<String>>>;

/// How many raw rows to show when a table cannot be sanitized.
pub const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SanitizedTable {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn render(&self) -> String {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.headers.clone());
        grid.extend(self.rows.iter().cloned());
        crate::chart::dataset::render_grid(&grid)
    }
}

/// Makes header labels unique and non-empty.
///
/// Blank cells become `Column_<n>` (1-based position); repeats get `_1`, `_2`,
/// ... in order of appearance. First occurrences keep their text.
pub fn unique_headers(raw: &[Option<String>]) -> Vec<String> {
    let mut repeats: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (i, cell) in raw.iter().enumerate() {
        let label = cell.as_deref().filter(|s| !s.trim().is_empty());
        let base = match label {
            Some(label) => label.to_string(),
            None => format!("Column_{}", i + 1),
        };

        let mut candidate = base.clone();
        while used.contains(&candidate) {
            let n = repeats.entry(base.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{}_{}", base, n);
        }
        used.insert(candidate.clone());
        headers.push(candidate);
    }
    headers
}

/// Splits `raw` into a unique header row and a rectangular body.
pub fn sanitize(raw: &RawTable) -> Result<SanitizedTable, DocError> {
    if raw.len() < 2 {
        return Err(DocError::InsufficientRows { rows: raw.len() });
    }

    let width = raw.iter().map(Vec::len).max().unwrap_or(0);
    let mut header_cells = raw[0].clone();
    header_cells.resize(width, None);
    let headers = unique_headers(&header_cells);

    let rows = raw[1..]
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = row
                .iter()
                .map(|cell| cell.as_deref().map(str::trim).unwrap_or_default().to_string())
                .collect();
            cells.resize(width, String::new());
            cells
        })
        .collect();

    Ok(SanitizedTable { headers, rows })
}

/// The first few rows of an unprocessed table, for diagnostics.
pub fn raw_preview(raw: &RawTable) -> String {
    raw.iter()
        .take(PREVIEW_ROWS)
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_deref().unwrap_or("null"))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn from_strings(rows: Vec<Vec<String>>) -> RawTable {
    rows.into_iter()
        .map(|row| row.into_iter().map(Some).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let headers = unique_headers(&cells(&[
            Some("Name"),
            Some("Amount"),
            None,
            Some("Amount"),
            Some(""),
            Some("Amount"),
            Some("name"),
        ]));
        assert_eq!(
            headers,
            vec!["Name", "Amount", "Column_3", "Amount_1", "Column_5", "Amount_2", "name"]
        );
    }

    #[test]
    fn test_labels_keep_surrounding_spaces() {
        let headers = unique_headers(&cells(&[Some(" Region "), Some(" Region "), Some("  ")]));
        assert_eq!(headers, vec![" Region ", " Region _1", "Column_3"]);
    }

    #[test]
    fn test_generated_labels_never_collide() {
        let headers = unique_headers(&cells(&[Some("a"), Some("a"), Some("a_1"), Some("Column_4"), None]));
        let unique: HashSet<&String> = headers.iter().collect();
        assert_eq!(unique.len(), headers.len());
        assert_eq!(headers[0], "a");
        assert_eq!(headers[1], "a_1");
        assert!(headers.iter().all(|h| !h.is_empty()));
    }

    #[test]
    fn test_headers_always_distinct_and_non_empty() {
        let inputs: Vec<Vec<Option<&str>>> = vec![
            vec![None, None, None],
            vec![Some(" "), Some("x"), Some("x"), Some("x_1"), Some("x_2")],
            vec![Some("Column_2"), None, Some("Column_2")],
        ];
        for input in inputs {
            let headers = unique_headers(&cells(&input));
            let unique: HashSet<&String> = headers.iter().collect();
            assert_eq!(unique.len(), input.len(), "{:?}", headers);
            assert!(headers.iter().all(|h| !h.trim().is_empty()));
        }
    }

    #[test]
    fn test_sanitize_pads_and_fills_nulls() -> anyhow::Result<()> {
        let raw = vec![
            cells(&[Some("Item"), Some("Qty")]),
            cells(&[Some("bolt"), None]),
            cells(&[Some("nut")]),
            cells(&[Some("washer"), Some("4"), Some("extra")]),
        ];
        let table = sanitize(&raw)?;
        assert_eq!(table.headers, vec!["Item", "Qty", "Column_3"]);
        assert_eq!(table.rows[0], vec!["bolt", "", ""]);
        assert_eq!(table.rows[1], vec!["nut", "", ""]);
        assert_eq!(table.rows[2], vec!["washer", "4", "extra"]);
        assert!(table.rows.iter().all(|r| r.len() == table.width()));
        Ok(())
    }

    #[test]
    fn test_sanitize_rejects_short_tables() {
        let raw = vec![cells(&[Some("only header")])];
        assert!(matches!(sanitize(&raw), Err(DocError::InsufficientRows { rows: 1 })));
        assert!(matches!(sanitize(&Vec::new()), Err(DocError::InsufficientRows { rows: 0 })));
    }

    #[test]
    fn test_raw_preview_caps_rows() {
        let raw: RawTable = (0..8).map(|i| cells(&[Some(i.to_string().as_str()), None])).collect();
        let preview = raw_preview(&raw);
        assert_eq!(preview.lines().count(), PREVIEW_ROWS);
        assert_eq!(preview.lines().next(), Some("0 | null"));
    }
}
