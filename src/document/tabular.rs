use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use serde_json::Value;

use crate::chart::{Column, RawCell, TabularDataset};
use crate::error::DocError;
use crate::table::unique_headers;

const DELIMITERS: [u8; 5] = [b',', b';', b'\t', b'|', b':'];

/// Picks the candidate delimiter that occurs most often on the first line.
fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");
    let mut best = b',';
    let mut best_count = 0;
    for &delim in &DELIMITERS {
        let count = first_line.bytes().filter(|&b| b == delim).count();
        if count > best_count {
            best = delim;
            best_count = count;
        }
    }
    best
}

/// Pads the header and every body row to the widest row, then builds one
/// column per header label with `build`.
fn assemble<T: Clone>(
    header: Vec<Option<String>>,
    body: Vec<Vec<T>>,
    blank: T,
    build: impl Fn(String, Vec<T>) -> Column,
) -> Result<TabularDataset, DocError> {
    let width = body
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let mut header = header;
    header.resize(width, None);
    let names = unique_headers(&header);

    let mut values: Vec<Vec<T>> = vec![Vec::with_capacity(body.len()); width];
    for mut row in body {
        row.resize(width, blank.clone());
        for (i, cell) in row.into_iter().enumerate() {
            values[i].push(cell);
        }
    }

    let columns = names.into_iter().zip(values).map(|(name, cells)| build(name, cells)).collect();
    TabularDataset::new(columns)
}

/// Parses delimited text whose first record is the header row.
pub fn parse_csv(bytes: &[u8]) -> Result<TabularDataset, DocError> {
    let content = String::from_utf8_lossy(bytes);
    let delimiter = detect_delimiter(&content);
    log::debug!("parsing CSV with delimiter {:?}", delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DocError::parse("csv", e))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row: Vec<Option<String>> = record
            .iter()
            .map(|field| Some(field.to_string()).filter(|f| !f.trim().is_empty()))
            .collect();
        records.push(row);
    }

    if records.is_empty() {
        return Err(DocError::parse("csv", "file has no header row"));
    }
    let header = records.remove(0);
    assemble(header, records, None, Column::infer)
}

fn raw_cell(data: &Data) -> RawCell {
    match data {
        Data::Empty => RawCell::Null,
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::String(s) if s.trim().is_empty() => RawCell::Null,
        Data::String(s) => RawCell::Text(s.clone()),
        other => RawCell::Text(other.to_string()),
    }
}

fn header_label(data: &Data) -> Option<String> {
    match data {
        Data::Empty => None,
        other => Some(other.to_string()),
    }
}

/// Every worksheet of an `.xlsx` workbook, in workbook order.
pub fn parse_xlsx_sheets(bytes: &[u8]) -> Result<Vec<(String, TabularDataset)>, DocError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes)).map_err(|e| DocError::parse("xlsx", e))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| DocError::parse("xlsx", format!("sheet '{}': {}", name, e)))?;

        let mut rows = range.rows();
        let header = match rows.next() {
            Some(row) => row.iter().map(header_label).collect(),
            None => {
                log::warn!("sheet '{}' is empty, skipping", name);
                continue;
            }
        };
        let body: Vec<Vec<RawCell>> = rows
            .map(|row| row.iter().map(raw_cell).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| *c != RawCell::Null))
            .collect();

        let dataset = assemble(header, body, RawCell::Null, Column::from_raw)?;
        sheets.push((name, dataset));
    }
    Ok(sheets)
}

/// The first non-empty worksheet.
pub fn parse_xlsx(bytes: &[u8]) -> Result<TabularDataset, DocError> {
    parse_xlsx_sheets(bytes)?
        .into_iter()
        .next()
        .map(|(_, dataset)| dataset)
        .ok_or_else(|| DocError::parse("xlsx", "workbook has no data"))
}

fn json_cell(value: &Value) -> RawCell {
    match value {
        Value::Null => RawCell::Null,
        Value::Number(n) => n.as_f64().map_or(RawCell::Null, RawCell::Number),
        Value::String(s) if s.trim().is_empty() => RawCell::Null,
        Value::String(s) => RawCell::Text(s.clone()),
        other => RawCell::Text(other.to_string()),
    }
}

/// Accepts an array of records, an object of column arrays, or an object of
/// column maps keyed by row index.
pub fn parse_json(bytes: &[u8]) -> Result<TabularDataset, DocError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| DocError::parse("json", e))?;

    match value {
        Value::Array(records) => from_records(&records),
        Value::Object(columns) => from_columns(&columns),
        _ => Err(DocError::parse("json", "expected an array of records or an object of columns")),
    }
}

fn from_records(records: &[Value]) -> Result<TabularDataset, DocError> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        let object = record
            .as_object()
            .ok_or_else(|| DocError::parse("json", "every record must be an object"))?;
        for key in object.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .iter()
        .map(|name| {
            let cells = records.iter().map(|r| r.get(name).map_or(RawCell::Null, json_cell)).collect();
            Column::from_raw(name.as_str(), cells)
        })
        .collect();
    TabularDataset::new(columns)
}

fn from_columns(columns: &serde_json::Map<String, Value>) -> Result<TabularDataset, DocError> {
    if columns.values().all(Value::is_array) {
        let built = columns
            .iter()
            .map(|(name, values)| {
                let cells = values.as_array().map_or_else(Vec::new, |a| a.iter().map(json_cell).collect());
                Column::from_raw(name.as_str(), cells)
            })
            .collect();
        return TabularDataset::new(built);
    }

    if columns.values().all(Value::is_object) {
        let mut index: Vec<&String> = Vec::new();
        for column in columns.values().filter_map(Value::as_object) {
            for key in column.keys() {
                if !index.contains(&key) {
                    index.push(key);
                }
            }
        }
        let built = columns
            .iter()
            .map(|(name, values)| {
                let cells = index
                    .iter()
                    .map(|row| values.get(row.as_str()).map_or(RawCell::Null, json_cell))
                    .collect();
                Column::from_raw(name.as_str(), cells)
            })
            .collect();
        return TabularDataset::new(built);
    }

    Err(DocError::parse("json", "column values must all be arrays or all be objects"))
}
