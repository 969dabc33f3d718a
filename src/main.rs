use clap::Parser;
use dotenv::dotenv;
use handler::Cli;
use serde::{Deserialize, Serialize};
use db::create_pool;

mod handler;
mod document;
mod chat;
mod chart;
mod db;
mod error;
mod session;
mod table;
mod text;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let config = read_config()?;
    let args = Cli::parse();
    let pool = create_pool(&config)?;
    handler::handler(args, config, pool).await?;
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    // Database
    db_host: String,
    db_user: String,
    db_password: String,
    db_name: String,

    // LLM
    llm_url: String,
    llm_model: String,
    llm_api_key: String,
    llm_timeout_secs: u64,

    // Structuring
    ai_min_chars: usize,
    ai_max_chars: usize,

    // Analysis
    analysis_max_chars: usize,

    // OCR
    ocr_command: String,
    ocr_args: Vec<String>,
    ocr_timeout_secs: u64,

    // Session
    session_ttl_secs: u64,

    // Charts
    large_dataset_rows: usize,

    // Identity
    user_id: String,
    username: String,
    user_email: String,
    admin_email: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_host: "localhost".to_string(),
            db_user: "postgres".to_string(),
            db_password: "postgres".to_string(),
            db_name: "docsight".to_string(),
            llm_url: "https://api.openai.com/v1/chat/completions".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_api_key: String::new(),
            llm_timeout_secs: 60,
            ai_min_chars: 500,
            ai_max_chars: 15_000,
            analysis_max_chars: 10_000,
            ocr_command: "tesseract".to_string(),
            ocr_args: vec!["{input}".to_string(), "stdout".to_string()],
            ocr_timeout_secs: 60,
            session_ttl_secs: 3600,
            large_dataset_rows: 100,
            user_id: String::new(),
            username: String::new(),
            user_email: String::new(),
            admin_email: String::new(),
        }
    }
}

/// The signed-in user, if the configuration names one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub email: String,
}

impl Config {
    pub fn identity(&self) -> Option<Identity> {
        if self.user_id.trim().is_empty() {
            return None;
        }
        Some(Identity {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            email: self.user_email.clone(),
        })
    }
}

fn read_config() -> anyhow::Result<Config> {
    Ok(config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("DOCSIGHT"))
        .build()?
        .try_deserialize::<Config>()?)
}
