use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DocError;

pub mod client;
pub mod prompts;

pub use client::{ChatClient, FormatType};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Talk {
    pub role: Role,
    pub content: String,
}

impl Talk {
    pub fn new(role: Role, content: String) -> Self {
        Self { role, content }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub format: FormatType,
    pub temperature: f32,
}

impl CompletionOptions {
    pub fn text(temperature: f32) -> Self {
        Self { format: FormatType::Text, temperature }
    }

    pub fn json(temperature: f32) -> Self {
        Self { format: FormatType::JsonObject, temperature }
    }
}

/// A hosted chat-completion endpoint.
///
/// Every call site must be ready for an `Err`: the service is rate limited and
/// may time out.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn chat(&self, messages: &[Talk], options: CompletionOptions) -> Result<String, DocError>;

    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String, DocError> {
        let messages = [Talk::new(Role::User, prompt.to_string())];
        self.chat(&messages, options).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CannedLlm;
    use super::*;

    #[tokio::test]
    async fn test_complete_wraps_prompt_as_user_message() -> anyhow::Result<()> {
        let llm = CannedLlm::new("ok");
        let reply = llm.complete("hello", CompletionOptions::text(0.3)).await?;
        assert_eq!(reply, "ok");
        assert_eq!(llm.last_prompt().as_deref(), Some("hello"));
        Ok(())
    }

    #[test]
    fn test_role_serialization() -> anyhow::Result<()> {
        let talk = Talk::new(Role::Assistant, "hi".to_string());
        assert_eq!(serde_json::to_string(&talk)?, r#"{"role":"assistant","content":"hi"}"#);
        Ok(())
    }
}
