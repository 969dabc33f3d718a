use anyhow::bail;

use super::{Context, ImageArgs};
use crate::chat::prompts::{self, ImageAnalysis, Query};
use crate::chat::CompletionOptions;
use crate::document::{process_document, FileKind};
use crate::session::{Analysis, Session};

pub async fn handle(ctx: &Context, session: &mut Session, args: ImageArgs) -> anyhow::Result<()> {
    if FileKind::from_path(&args.path)? != FileKind::Image {
        bail!("{} is not a PNG or JPEG image", args.path.display());
    }
    let document = process_document(&args.path, &ctx.ocr).await?;
    if document.text.is_empty() {
        println!("No text found in {}", document.name);
    } else {
        println!("\nExtracted text:\n\n{}\n", document.text);
    }
    session.load_document(document);

    let query = match (args.analyze, args.query) {
        (Some(preset), _) => Query::Preset(preset),
        (None, Some(custom)) => Query::Custom(custom),
        (None, None) => return Ok(()),
    };
    analyze(ctx, session, &query).await
}

pub async fn analyze(ctx: &Context, session: &mut Session, query: &Query<ImageAnalysis>) -> anyhow::Result<()> {
    let llm = ctx.require_llm()?;
    let text = match &session.document {
        Some(document) if !document.text.is_empty() => document.text.clone(),
        Some(_) => bail!("no text was found in the image to analyze"),
        None => bail!("no image loaded"),
    };

    let prompt = prompts::image_analysis(query, &text);
    let answer = llm.complete(&prompt, CompletionOptions::text(0.3)).await?;
    println!("\n{}\n", answer);

    let query = match query {
        Query::Preset(preset) => format!("{:?}", preset),
        Query::Custom(custom) => custom.clone(),
    };
    session.analyses.push(Analysis { query, answer });
    Ok(())
}
