use std::path::{Path, PathBuf};

use walkdir::DirEntry;

use super::{Context, DocArgs};
use crate::chat::prompts::{self, DocumentAnalysis, Query};
use crate::chat::{CompletionOptions, Role, Talk};
use crate::document::{process_document, FileKind};
use crate::session::{Analysis, Session};
use crate::table::{raw_preview, sanitize, SanitizedTable, PREVIEW_ROWS};
use crate::text::clean;

/// Sections and tables shown after processing.
const SHOWN_SECTIONS: usize = 5;
const SHOWN_TABLES: usize = 3;

pub async fn handle(ctx: &Context, session: &mut Session, args: DocArgs) -> anyhow::Result<()> {
    if args.path.is_dir() {
        for entry in get_entries(&args.path, args.recursive) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if FileKind::from_path(path).is_err() {
                println!("Skipping unsupported file: {}", path.display());
                continue;
            }
            if let Err(err) = process_single_file(ctx, session, path, &args).await {
                println!("Error processing {}: {:#}", path.display(), err);
            }
        }
        Ok(())
    } else {
        process_single_file(ctx, session, &args.path, &args).await
    }
}

async fn process_single_file(ctx: &Context, session: &mut Session, path: &Path, args: &DocArgs) -> anyhow::Result<()> {
    load(ctx, session, path).await?;
    if args.text {
        show_text(session);
    }
    structure(ctx, session, args.ai).await;
    show_tables(session);

    let query = match (&args.analyze, &args.query) {
        (Some(preset), _) => Some(Query::Preset(*preset)),
        (None, Some(custom)) => Some(Query::Custom(custom.clone())),
        (None, None) => None,
    };
    if let Some(query) = query {
        analyze(ctx, session, &query).await?;
    }
    Ok(())
}

fn get_entries(path: &PathBuf, recursive: bool) -> Box<dyn Iterator<Item = DirEntry>> {
    let iter = if recursive {
        walkdir::WalkDir::new(path)
    } else {
        walkdir::WalkDir::new(path).max_depth(1)
    };
    Box::new(iter.into_iter().filter_map(|e| e.ok()))
}

/// Extracts `path` into the session, replacing whatever was loaded before.
pub async fn load(ctx: &Context, session: &mut Session, path: &Path) -> anyhow::Result<()> {
    let document = process_document(path, &ctx.ocr).await?;
    println!(
        "Loaded {} file {}: {} characters, {} table(s)",
        document.kind,
        document.name,
        document.text.chars().count(),
        document.tables.len()
    );
    if document.text.trim().is_empty() {
        println!("No text found in {}", document.name);
    }
    if let Some(dataset) = document.dataset.as_ref().filter(|_| document.kind.is_tabular()) {
        println!(
            "Dataset ready for charting: {} rows, numeric columns: {}",
            dataset.row_count(),
            dataset.numeric_columns().join(", ")
        );
    }
    session.load_document(document);
    Ok(())
}

pub fn show_text(session: &Session) {
    match &session.document {
        Some(document) => println!("\n{}\n", clean(&document.text)),
        None => println!("No document loaded"),
    }
}

/// Structures the loaded text. Never fails: the language-model path falls
/// back to the heading rules.
pub async fn structure(ctx: &Context, session: &mut Session, use_ai: bool) {
    let Some(document) = &session.document else {
        println!("No document loaded");
        return;
    };
    let text = clean(&document.text);
    let llm = if use_ai { ctx.llm() } else { None };
    if use_ai && llm.is_none() {
        println!("No language model configured, using heading rules");
    }
    session.sections = ctx.structurer.structure(&text, llm).await;

    println!("\nStructured content: {} section(s)", session.sections.len());
    for (i, section) in session.sections.iter().take(SHOWN_SECTIONS).enumerate() {
        let heading = section.heading.as_deref().unwrap_or("");
        println!("\n--- Section {} [{:?}] {} ({} chars)", i + 1, section.kind, heading, section.length);
        println!("{}", section.content);
    }
}

/// Sanitizes the raw tables of the loaded document into the session.
pub fn show_tables(session: &mut Session) {
    let Some(document) = &session.document else {
        println!("No document loaded");
        return;
    };
    session.tables.clear();
    for (i, raw) in document.tables.iter().enumerate() {
        match sanitize(raw) {
            Ok(table) => session.tables.push(table),
            Err(err) => {
                println!("\nTable {} could not be processed: {}", i + 1, err);
                println!("Raw preview:\n{}", raw_preview(raw));
            }
        }
    }

    for (i, table) in session.tables.iter().take(SHOWN_TABLES).enumerate() {
        let preview = SanitizedTable {
            headers: table.headers.clone(),
            rows: table.rows.iter().take(PREVIEW_ROWS).cloned().collect(),
        };
        println!("\nTable {} ({} rows x {} columns)", i + 1, table.rows.len(), table.width());
        println!("{}", preview.render());
    }
}

fn excerpt(ctx: &Context, text: &str) -> String {
    text.chars().take(ctx.config.analysis_max_chars).collect()
}

pub async fn analyze(ctx: &Context, session: &mut Session, query: &Query<DocumentAnalysis>) -> anyhow::Result<()> {
    let llm = ctx.require_llm()?;
    let document = session
        .document
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no document loaded"))?;

    let prompt = prompts::document_analysis(query, &excerpt(ctx, &document.text));
    let answer = llm.complete(&prompt, CompletionOptions::text(0.3)).await?;
    println!("\n{}\n", answer);

    let query = match query {
        Query::Preset(preset) => format!("{:?}", preset),
        Query::Custom(custom) => custom.clone(),
    };
    session.analyses.push(Analysis { query, answer });
    Ok(())
}

/// Earlier analyses of the current upload, oldest first.
fn history(session: &Session) -> String {
    session
        .analyses
        .iter()
        .enumerate()
        .map(|(i, analysis)| format!("[{}] {}\n{}", i + 1, analysis.query, analysis.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn show_history(session: &Session) {
    if session.analyses.is_empty() {
        println!("No analyses yet");
    } else {
        println!("\n{}\n", history(session));
    }
}

/// Follow-up question about the loaded document, keeping the conversation.
pub async fn ask(ctx: &Context, session: &mut Session, question: &str) -> anyhow::Result<()> {
    let llm = ctx.require_llm()?;
    let document = session
        .document
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no document loaded"))?;

    if session.conversation.is_empty() {
        let context = prompts::conversation_context(&document.name, &excerpt(ctx, &document.text));
        session.conversation.push(Talk::new(Role::System, context));
    }
    session.conversation.push(Talk::new(Role::User, question.to_string()));

    match llm.chat(&session.conversation, CompletionOptions::text(0.3)).await {
        Ok(answer) => {
            println!("\n{}\n", answer);
            session.conversation.push(Talk::new(Role::Assistant, answer));
            Ok(())
        }
        Err(err) => {
            session.conversation.pop();
            Err(err.into())
        }
    }
}
