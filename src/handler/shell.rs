use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use uuid::Uuid;

use super::{document, image, visualize, ChartSelection, Context};
use crate::chat::prompts::{DocumentAnalysis, ImageAnalysis, Query};
use crate::session::{Session, SessionStore};

#[derive(Parser)]
#[command(multicall = true)]
enum ShellCommand {
    /// Load a document, image or data file, replacing the current one
    Load { path: PathBuf },

    /// Print the cleaned text
    Text,

    /// Split the text into sections
    Structure {
        #[arg(long, help = "Ask the language model first")]
        ai: bool,
    },

    /// Show the tables found in the document
    Tables,

    /// Analyze the document
    Analyze {
        #[arg(value_enum)]
        preset: Option<DocumentAnalysis>,

        #[arg(long, conflicts_with = "preset")]
        query: Option<String>,
    },

    /// Analyze the text read from an image
    Inspect {
        #[arg(value_enum)]
        preset: Option<ImageAnalysis>,

        #[arg(long, conflicts_with = "preset")]
        query: Option<String>,
    },

    /// Ask a follow-up question about the document
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// List earlier analyses of the loaded document
    History,

    /// List eligible columns, or chart the loaded dataset
    Chart(ChartSelection),

    /// Ask for aggregation ideas for the loaded dataset
    Suggest,

    /// Discard everything loaded in this session
    Clear,

    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

/// Splits a command line into words. Single or double quotes group words;
/// a backslash escapes the next character.
fn split_line(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                let escaped = chars.next().ok_or("trailing backslash")?;
                current.push(escaped);
                in_word = true;
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Interactive loop over a single session. Command failures are printed and
/// the loop continues.
pub async fn run(ctx: &Context, sessions: &mut SessionStore) -> anyhow::Result<()> {
    let mut id = sessions.create();
    let mut input = String::new();
    println!("docsight shell. Type 'help' for commands, 'exit' to leave.");

    loop {
        print!("docsight> ");
        io::stdout().flush()?;
        input.clear();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let words = match split_line(input.trim()) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(err) => {
                println!("Error: {}", err);
                continue;
            }
        };

        let command = match ShellCommand::try_parse_from(words) {
            Ok(command) => command,
            Err(err) => {
                println!("{}", err.render());
                continue;
            }
        };

        if matches!(command, ShellCommand::Exit) {
            break;
        }

        sessions.expire_idle();
        let session = current_session(sessions, &mut id)?;
        if let Err(err) = execute(ctx, session, command).await {
            println!("Error: {:#}", err);
        }
    }

    sessions.clear(&id);
    Ok(())
}

fn current_session<'a>(sessions: &'a mut SessionStore, id: &mut Uuid) -> anyhow::Result<&'a mut Session> {
    if sessions.get(id).is_none() {
        println!("Session expired, starting a new one");
        *id = sessions.create();
    }
    sessions
        .get_mut(id)
        .ok_or_else(|| anyhow::anyhow!("session {} vanished", id))
}

async fn execute(ctx: &Context, session: &mut Session, command: ShellCommand) -> anyhow::Result<()> {
    match command {
        ShellCommand::Load { path } => document::load(ctx, session, &path).await?,
        ShellCommand::Text => document::show_text(session),
        ShellCommand::Structure { ai } => document::structure(ctx, session, ai).await,
        ShellCommand::Tables => document::show_tables(session),
        ShellCommand::Analyze { preset, query } => {
            let query = preset_or_custom(preset, query, DocumentAnalysis::Summarize);
            document::analyze(ctx, session, &query).await?
        }
        ShellCommand::Inspect { preset, query } => {
            let query = preset_or_custom(preset, query, ImageAnalysis::Summarize);
            image::analyze(ctx, session, &query).await?
        }
        ShellCommand::Ask { question } => document::ask(ctx, session, &question.join(" ")).await?,
        ShellCommand::History => document::show_history(session),
        ShellCommand::Chart(selection) => visualize::chart(ctx, session, &selection).await?,
        ShellCommand::Suggest => visualize::suggest(ctx, session).await?,
        ShellCommand::Clear => {
            session.clear();
            println!("Session cleared");
        }
        ShellCommand::Exit => {}
    }
    Ok(())
}

fn preset_or_custom<P>(preset: Option<P>, query: Option<String>, default: P) -> Query<P> {
    match (preset, query) {
        (Some(preset), _) => Query::Preset(preset),
        (None, Some(custom)) => Query::Custom(custom),
        (None, None) => Query::Preset(default),
    }
}
