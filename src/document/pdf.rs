use std::panic::{self, AssertUnwindSafe};

use lopdf::Document;
use pdf_extract::PlainTextOutput;

use crate::error::DocError;
use crate::table::{detect_tables, RawTable};

pub struct PdfExtraction {
    pub text: String,
    pub tables: Vec<RawTable>,
}

fn load(bytes: &[u8]) -> Result<Document, DocError> {
    let loaded = panic::catch_unwind(AssertUnwindSafe(|| Document::load_mem(bytes)))
        .map_err(|_| DocError::ExtractionFailure("PDF parser panicked (malformed document)".to_string()))?;
    let mut doc = loaded.map_err(|e| DocError::ExtractionFailure(format!("cannot read PDF: {}", e)))?;
    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|e| DocError::ExtractionFailure(format!("encrypted PDF: {}", e)))?;
    }
    Ok(doc)
}

/// Text of one page. `pdf-extract` can panic on malformed pages, so the call
/// runs behind `catch_unwind`.
fn page_text(doc: &Document, page: u32) -> Result<String, String> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut text = String::new();
        {
            let mut output = PlainTextOutput::new(&mut text);
            pdf_extract::output_doc_page(doc, &mut output, page)?;
        }
        Ok::<_, pdf_extract::OutputError>(text)
    }));
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("extractor panicked".to_string()),
    }
}

/// Extracts every page it can. Failed pages are logged and skipped; the
/// document fails only when it has pages and none of them could be read.
fn extract_pages(bytes: &[u8]) -> Result<Vec<(u32, String)>, DocError> {
    let doc = load(bytes)?;
    let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

    let mut pages = Vec::with_capacity(numbers.len());
    for &number in &numbers {
        match page_text(&doc, number) {
            Ok(text) => pages.push((number, text)),
            Err(reason) => log::warn!("skipping page {}: {}", number, reason),
        }
    }

    if pages.is_empty() && !numbers.is_empty() {
        return Err(DocError::ExtractionFailure(format!(
            "none of the {} page(s) could be read",
            numbers.len()
        )));
    }
    Ok(pages)
}

pub fn extract(bytes: &[u8]) -> Result<PdfExtraction, DocError> {
    let pages = extract_pages(bytes)?;
    Ok(from_pages(&pages))
}

fn from_pages(pages: &[(u32, String)]) -> PdfExtraction {
    let mut text = Vec::new();
    let mut tables = Vec::new();

    for (number, page) in pages {
        let page = super::strip_control(page);
        if page.trim().is_empty() {
            log::warn!("page {} has no extractable text", number);
            continue;
        }
        let found = detect_tables(&page);
        if !found.is_empty() {
            log::debug!("page {}: {} table(s)", number, found.len());
        }
        tables.extend(found);
        text.push(page.trim().to_string());
    }

    PdfExtraction {
        text: text.join("\n"),
        tables,
    }
}
