use std::path::Path;

use anyhow::anyhow;

use super::{ChartSelection, Context};
use crate::chart::{
    aggregate, aggregation_recommended, eligible_columns, write_chart_workbook, Aggregation, ChartType,
    TabularDataset,
};
use crate::chat::{prompts, CompletionOptions};
use crate::document::load_dataset;
use crate::session::Session;

/// Values listed when a chart is printed to the terminal.
const SHOWN_VALUES: usize = 50;

pub async fn load(session: &mut Session, path: &Path) -> anyhow::Result<()> {
    let dataset = load_dataset(path).await?;
    println!(
        "Loaded {}: {} rows, {} columns",
        path.display(),
        dataset.row_count(),
        dataset.columns().len()
    );
    println!("Numeric columns: {}", dataset.numeric_columns().join(", "));
    println!("Categorical columns: {}", dataset.categorical_columns().join(", "));
    println!("\n{}\n", dataset.head(5));
    session.load_dataset(dataset);
    Ok(())
}

fn dataset(session: &Session) -> anyhow::Result<&TabularDataset> {
    session
        .dataset
        .as_ref()
        .ok_or_else(|| anyhow!("no dataset loaded (load a CSV, XLSX or JSON file first)"))
}

fn show_eligible(dataset: &TabularDataset, chart_type: ChartType, threshold: usize) {
    let eligible = eligible_columns(dataset, chart_type);
    println!("Chart type: {}", chart_type);
    println!("  x: {}", or_none(&eligible.x_candidates));
    let y_note = if eligible.y_optional { " (optional)" } else { "" };
    println!("  y{}: {}", y_note, or_none(&eligible.y_candidates));
    if !eligible.color_candidates.is_empty() {
        println!("  color (optional): {}", eligible.color_candidates.join(", "));
    }
    let aggregations: Vec<String> = eligible.aggregations.iter().map(ToString::to_string).collect();
    println!("  aggregation: {}", aggregations.join(", "));
    if chart_type != ChartType::Scatter && aggregation_recommended(dataset, threshold) {
        println!("Large dataset ({} rows): an aggregation is recommended", dataset.row_count());
    }
}

fn or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(no eligible columns)".to_string()
    } else {
        names.join(", ")
    }
}

/// Lists eligible columns when no x column is chosen, otherwise validates,
/// aggregates and prints the chart.
pub async fn chart(ctx: &Context, session: &mut Session, selection: &ChartSelection) -> anyhow::Result<()> {
    let dataset = dataset(session)?;
    let threshold = ctx.config.large_dataset_rows;

    let Some(spec) = selection.spec() else {
        show_eligible(dataset, selection.chart_type, threshold);
        return Ok(());
    };

    let series = aggregate(dataset, &spec)?;
    if spec.aggregation == Aggregation::None
        && spec.chart_type != ChartType::Scatter
        && aggregation_recommended(dataset, threshold)
    {
        println!(
            "Note: {} rows are plotted without aggregation; consider --aggregation sum or mean",
            dataset.row_count()
        );
    }
    println!("\n{}\n", series.summary(SHOWN_VALUES));

    if let Some(out) = &selection.out {
        write_chart_workbook(&series, out)?;
        println!("Chart written to {}", out.display());
    }

    if selection.insights {
        match ctx.require_llm() {
            Ok(llm) => {
                let prompt = prompts::chart_insights(&spec, &series, dataset);
                match llm.complete(&prompt, CompletionOptions::text(0.7)).await {
                    Ok(insights) => println!("Insights:\n\n{}\n", insights),
                    Err(err) => println!("Could not generate insights: {}", err),
                }
            }
            Err(err) => println!("Could not generate insights: {}", err),
        }
    }
    Ok(())
}

pub async fn suggest(ctx: &Context, session: &mut Session) -> anyhow::Result<()> {
    let llm = ctx.require_llm()?;
    let prompt = prompts::aggregation_suggestions(dataset(session)?);
    let suggestions = llm.complete(&prompt, CompletionOptions::text(0.5)).await?;
    println!("\n{}\n", suggestions);
    session.suggestions = Some(suggestions);
    Ok(())
}
