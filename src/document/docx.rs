use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild, Table, TableCellContent, TableChild, TableRowChild};

use crate::error::DocError;
use crate::table::RawTable;

/// Body text of a `.docx` in reading order, plus its Word tables as grids.
pub struct DocxExtraction {
    pub text: String,
    pub tables: Vec<RawTable>,
}

fn inline_text(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for item in &run.children {
                    match item {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) | RunChild::CarriageReturn(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => inline_text(&link.children, out),
            _ => {}
        }
    }
}

fn cell_text(children: &[TableCellContent]) -> String {
    let mut parts = Vec::new();
    for child in children {
        let mut part = String::new();
        match child {
            TableCellContent::Paragraph(p) => inline_text(&p.children, &mut part),
            TableCellContent::Table(nested) => part = grid_lines(&table_grid(nested)),
            _ => {}
        }
        let part = part.trim();
        if !part.is_empty() {
            parts.push(part.to_string());
        }
    }
    parts.join(" ")
}

fn table_grid(table: &Table) -> RawTable {
    table
        .rows
        .iter()
        .map(|TableChild::TableRow(row)| {
            row.cells
                .iter()
                .map(|TableRowChild::TableCell(cell)| Some(cell_text(&cell.children)).filter(|t| !t.is_empty()))
                .collect()
        })
        .collect()
}

/// Tab-separated rows, so the text view still lines up like a table.
fn grid_lines(grid: &RawTable) -> String {
    grid.iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn extract(bytes: &[u8]) -> Result<DocxExtraction, DocError> {
    let docx = read_docx(bytes)
        .map_err(|e| DocError::ExtractionFailure(format!("DOCX extraction failed: {}", e)))?;

    let mut lines = Vec::new();
    let mut tables = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                let mut line = String::new();
                inline_text(&p.children, &mut line);
                lines.push(line);
            }
            DocumentChild::Table(table) => {
                let grid = table_grid(table);
                if grid.is_empty() {
                    continue;
                }
                lines.push(grid_lines(&grid));
                tables.push(grid);
            }
            _ => {}
        }
    }
    log::debug!("docx: {} block(s), {} table(s)", lines.len(), tables.len());

    Ok(DocxExtraction {
        text: lines.join("\n"),
        tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
    }

    fn pack(docx: Docx) -> anyhow::Result<Vec<u8>> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    #[test]
    fn test_paragraphs_become_lines() -> anyhow::Result<()> {
        let bytes = pack(
            Docx::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("MEETING NOTES")))
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Budget approved"))),
        )?;
        let extraction = extract(&bytes)?;
        assert_eq!(extraction.text, "MEETING NOTES\nBudget approved");
        assert!(extraction.tables.is_empty());
        Ok(())
    }

    #[test]
    fn test_word_tables_kept_as_grids() -> anyhow::Result<()> {
        let bytes = pack(
            Docx::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Inventory")))
                .add_table(Table::new(vec![
                    TableRow::new(vec![cell("Item"), cell("Qty")]),
                    TableRow::new(vec![cell("bolt"), TableCell::new()]),
                ])),
        )?;
        let extraction = extract(&bytes)?;
        assert_eq!(extraction.tables.len(), 1);
        assert_eq!(
            extraction.tables[0],
            vec![
                vec![Some("Item".to_string()), Some("Qty".to_string())],
                vec![Some("bolt".to_string()), None],
            ]
        );
        assert!(extraction.text.starts_with("Inventory\nItem\tQty\nbolt\t"));
        Ok(())
    }

    #[test]
    fn test_invalid_docx() {
        assert!(matches!(extract(b"PK nope"), Err(DocError::ExtractionFailure(_))));
    }
}
