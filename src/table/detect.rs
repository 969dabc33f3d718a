use once_cell::sync::Lazy;
use regex::Regex;

use super::RawTable;

static CELL_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t+|[ ]{2,}").unwrap());

const MIN_COLUMNS: usize = 2;
const MIN_ROWS: usize = 2;

fn split_cells(line: &str) -> Vec<String> {
    CELL_GAP
        .split(line.trim())
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Finds column-aligned blocks in a page of extracted text.
///
/// A block is a run of at least two consecutive lines that split into the same
/// number of cells (two or more) on tabs or wide gaps.
pub fn detect_tables(page: &str) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    let mut flush = |current: &mut Vec<Vec<String>>| {
        if current.len() >= MIN_ROWS {
            tables.push(super::from_strings(std::mem::take(current)));
        } else {
            current.clear();
        }
    };

    for line in page.lines() {
        if line.trim().is_empty() {
            flush(&mut current);
            continue;
        }
        let cells = split_cells(line);
        if cells.len() < MIN_COLUMNS {
            flush(&mut current);
            continue;
        }
        if current.first().is_some_and(|first| first.len() != cells.len()) {
            flush(&mut current);
        }
        current.push(cells);
    }
    flush(&mut current);

    tables
}
