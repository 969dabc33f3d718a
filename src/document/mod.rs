pub mod pdf;
pub mod docx;
pub mod ocr;
pub mod tabular;

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use crate::chart::TabularDataset;
use crate::error::DocError;
use crate::table::RawTable;

pub use ocr::OcrEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Text,
    Csv,
    Xlsx,
    Json,
    Image,
}

impl FileKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "md" => Some(Self::Text),
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "json" => Some(Self::Json),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, DocError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| DocError::UnsupportedFileType(path.display().to_string()))
    }

    /// Kinds that load into a `TabularDataset` for charting.
    pub fn is_tabular(self) -> bool {
        matches!(self, Self::Csv | Self::Xlsx | Self::Json)
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Text => "TXT",
            Self::Csv => "CSV",
            Self::Xlsx => "XLSX",
            Self::Json => "JSON",
            Self::Image => "image",
        };
        f.write_str(label)
    }
}

/// What one upload produced. Replaced wholesale by the next upload.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub name: String,
    pub kind: FileKind,
    pub text: String,
    pub tables: Vec<RawTable>,
    pub dataset: Option<TabularDataset>,
}

impl ExtractedDocument {
    fn text_only(name: &str, kind: FileKind, text: String) -> Self {
        Self {
            name: name.to_string(),
            kind,
            text,
            tables: Vec::new(),
            dataset: None,
        }
    }
}

/// Drops control characters other than newlines and tabs.
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn table_of(dataset: &TabularDataset) -> RawTable {
    crate::table::from_strings(dataset.to_grid())
}

pub async fn extract(
    name: &str,
    kind: FileKind,
    bytes: &[u8],
    ocr: &OcrEngine,
) -> Result<ExtractedDocument, DocError> {
    log::info!("extracting {} as {}", name, kind);

    let document = match kind {
        FileKind::Pdf => {
            let extraction = pdf::extract(bytes)?;
            ExtractedDocument {
                tables: extraction.tables,
                ..ExtractedDocument::text_only(name, kind, extraction.text)
            }
        }
        FileKind::Docx => {
            let extraction = docx::extract(bytes)?;
            ExtractedDocument {
                tables: extraction.tables,
                ..ExtractedDocument::text_only(name, kind, extraction.text)
            }
        }
        FileKind::Text => ExtractedDocument::text_only(name, kind, String::from_utf8_lossy(bytes).to_string()),
        FileKind::Csv => {
            let dataset = tabular::parse_csv(bytes)?;
            ExtractedDocument {
                text: format!("CSV File Contents:\n\n{}", dataset.render()),
                tables: vec![table_of(&dataset)],
                dataset: Some(dataset),
                ..ExtractedDocument::text_only(name, kind, String::new())
            }
        }
        FileKind::Json => {
            let dataset = tabular::parse_json(bytes)?;
            ExtractedDocument {
                text: format!("JSON File Contents:\n\n{}", dataset.render()),
                tables: vec![table_of(&dataset)],
                dataset: Some(dataset),
                ..ExtractedDocument::text_only(name, kind, String::new())
            }
        }
        FileKind::Xlsx => {
            let sheets = tabular::parse_xlsx_sheets(bytes)?;
            let text = sheets
                .iter()
                .map(|(sheet, dataset)| format!("Sheet: {}\n\n{}", sheet, dataset.render()))
                .collect::<Vec<_>>()
                .join("\n\n");
            let tables = sheets.iter().map(|(_, dataset)| table_of(dataset)).collect();
            ExtractedDocument {
                tables,
                dataset: sheets.into_iter().next().map(|(_, dataset)| dataset),
                ..ExtractedDocument::text_only(name, kind, text)
            }
        }
        FileKind::Image => ExtractedDocument::text_only(name, kind, ocr.recognize(bytes).await?),
    };

    let text = strip_control(&document.text);
    if text.trim().is_empty() {
        log::warn!("no text extracted from {}", name);
    }
    Ok(ExtractedDocument { text, ..document })
}

pub async fn process_document(path: &Path, ocr: &OcrEngine) -> Result<ExtractedDocument, DocError> {
    let kind = FileKind::from_path(path)?;
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    extract(name, kind, &bytes, ocr).await
}

/// Loads a CSV, XLSX or JSON file for charting.
pub async fn load_dataset(path: &Path) -> Result<TabularDataset, DocError> {
    let kind = FileKind::from_path(path)?;
    let bytes = tokio::fs::read(path).await?;
    match kind {
        FileKind::Csv => tabular::parse_csv(&bytes),
        FileKind::Xlsx => tabular::parse_xlsx(&bytes),
        FileKind::Json => tabular::parse_json(&bytes),
        _ => Err(DocError::UnsupportedFileType(format!(
            "{} (charts need CSV, XLSX or JSON)",
            path.display()
        ))),
    }
}
