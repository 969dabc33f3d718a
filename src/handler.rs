use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::chart::{Aggregation, ChartSpec, ChartType};
use crate::chat::prompts::{DocumentAnalysis, ImageAnalysis};
use crate::chat::{ChatClient, Completion};
use crate::db::Category;
use crate::db::Status;
use crate::document::OcrEngine;
use crate::error::DocError;
use crate::session::{Session, SessionStore};
use crate::text::ai::AiStructuring;
use crate::text::DocumentStructurer;
use crate::Config;

mod document;
mod feedback;
mod image;
mod shell;
mod visualize;

#[derive(Parser)]
#[command(name = "docsight")]
#[command(about = "Extract, structure and chart the contents of documents", version = "1.0")]
pub enum Cli {
    /// Extract and structure a document, or every document in a directory
    Doc(DocArgs),

    /// Read the text in an image and optionally analyze it
    Image(ImageArgs),

    /// List eligible columns for a chart type, or validate and plot a chart
    Chart {
        #[arg(help = "CSV, XLSX or JSON data file")]
        path: PathBuf,

        #[command(flatten)]
        selection: ChartSelection,
    },

    /// Ask the language model for aggregation ideas
    Suggest {
        #[arg(help = "CSV, XLSX or JSON data file")]
        path: PathBuf,
    },

    /// Start an interactive session
    Shell,

    /// Submit and manage feedback
    #[command(subcommand)]
    Feedback(FeedbackCommand),
}

#[derive(Args)]
pub struct DocArgs {
    #[arg(help = "File or directory path")]
    pub path: PathBuf,

    #[arg(short, long, help = "Recurse into subdirectories")]
    pub recursive: bool,

    #[arg(long, help = "Structure with the language model when the text is long enough")]
    pub ai: bool,

    #[arg(long, help = "Print the cleaned text")]
    pub text: bool,

    #[arg(long, value_enum, help = "Run a preset analysis")]
    pub analyze: Option<DocumentAnalysis>,

    #[arg(long, help = "Run a custom analysis query", conflicts_with = "analyze")]
    pub query: Option<String>,
}

#[derive(Args)]
pub struct ImageArgs {
    #[arg(help = "PNG or JPEG image")]
    pub path: PathBuf,

    #[arg(long, value_enum, help = "Run a preset analysis")]
    pub analyze: Option<ImageAnalysis>,

    #[arg(long, help = "Run a custom analysis query", conflicts_with = "analyze")]
    pub query: Option<String>,
}

#[derive(Args, Clone)]
pub struct ChartSelection {
    #[arg(long = "type", value_enum, help = "Chart type")]
    pub chart_type: ChartType,

    #[arg(long, help = "X axis column; omit to list eligible columns")]
    pub x: Option<String>,

    #[arg(long, help = "Y axis column")]
    pub y: Option<String>,

    #[arg(long, help = "Color column (scatter only)")]
    pub color: Option<String>,

    #[arg(long, value_enum, default_value_t = Aggregation::None)]
    pub aggregation: Aggregation,

    #[arg(long, help = "Write the chart to an .xlsx workbook")]
    pub out: Option<PathBuf>,

    #[arg(long, help = "Ask the language model for insights on the chart")]
    pub insights: bool,
}

impl ChartSelection {
    /// The chart spec, or `None` when no x column was chosen yet.
    pub fn spec(&self) -> Option<ChartSpec> {
        let x = self.x.as_ref()?;
        let mut spec = ChartSpec::new(self.chart_type, x.clone()).aggregation(self.aggregation);
        if let Some(y) = &self.y {
            spec = spec.y(y.clone());
        }
        if let Some(color) = &self.color {
            spec = spec.color(color.clone());
        }
        Some(spec)
    }
}

#[derive(Subcommand)]
pub enum FeedbackCommand {
    /// Submit feedback
    Add {
        #[arg(long, value_enum, default_value_t = Category::General)]
        category: Category,

        #[arg(help = "Your feedback")]
        comment: String,
    },

    /// Show your feedback history
    List {
        #[arg(long, help = "Show everyone's feedback (admin)")]
        all: bool,
    },

    /// Respond to a feedback entry (admin)
    Respond {
        id: i32,

        #[arg(long, value_enum)]
        status: Status,

        #[arg(long, default_value = "")]
        response: String,
    },

    /// Delete a feedback entry (admin)
    Remove { id: i32 },

    /// Export feedback to an .xlsx workbook (admin)
    Export {
        #[arg(help = "Output file path")]
        path: PathBuf,
    },
}

/// Collaborators shared by every command.
pub struct Context {
    pub config: Config,
    pub llm: Option<Box<dyn Completion>>,
    pub ocr: OcrEngine,
    pub structurer: DocumentStructurer,
}

impl Context {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let llm = ChatClient::from_config(&config)?.map(|c| Box::new(c) as Box<dyn Completion>);
        if llm.is_none() {
            log::info!("no llm_api_key configured, language model features are off");
        }
        let ocr = OcrEngine::from_config(&config);
        let structurer = DocumentStructurer::new(AiStructuring {
            min_chars: config.ai_min_chars,
            max_chars: config.ai_max_chars,
        });
        Ok(Self { config, llm, ocr, structurer })
    }

    pub fn llm(&self) -> Option<&dyn Completion> {
        self.llm.as_deref()
    }

    pub fn require_llm(&self) -> Result<&dyn Completion, DocError> {
        self.llm().ok_or_else(|| {
            DocError::ExternalService("no language model configured (set llm_api_key)".to_string())
        })
    }
}

pub async fn handler(args: Cli, config: Config, pool: deadpool_postgres::Pool) -> anyhow::Result<()> {
    let ctx = Context::from_config(config)?;
    let mut sessions = SessionStore::new(ctx.config.session_ttl_secs);

    match args {
        Cli::Doc(args) => document::handle(&ctx, one_shot(&mut sessions)?, args).await,
        Cli::Image(args) => image::handle(&ctx, one_shot(&mut sessions)?, args).await,
        Cli::Chart { path, selection } => {
            let session = one_shot(&mut sessions)?;
            visualize::load(session, &path).await?;
            visualize::chart(&ctx, session, &selection).await
        }
        Cli::Suggest { path } => {
            let session = one_shot(&mut sessions)?;
            visualize::load(session, &path).await?;
            visualize::suggest(&ctx, session).await
        }
        Cli::Shell => shell::run(&ctx, &mut sessions).await,
        Cli::Feedback(cmd) => feedback::handle(&ctx, &pool, cmd).await,
    }
}

/// A fresh session for a single command.
fn one_shot(sessions: &mut SessionStore) -> anyhow::Result<&mut Session> {
    let id = sessions.create();
    sessions
        .get_mut(&id)
        .ok_or_else(|| anyhow::anyhow!("session {} vanished", id))
}

#[cfg(test)]
impl Context {
    pub fn for_tests(llm: Option<Box<dyn Completion>>) -> Self {
        Self {
            config: Config::default(),
            llm,
            ocr: OcrEngine::new("false", Vec::new(), 1),
            structurer: DocumentStructurer::default(),
        }
    }
}
