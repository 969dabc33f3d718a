use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionOptions, Talk};
use crate::error::DocError;
use crate::Config;

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
    timeout_secs: u64,
}

impl ChatClient {
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, DocError> {
        if config.llm_api_key.trim().is_empty() {
            return Ok(None);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| DocError::ExternalService(format!("cannot build HTTP client: {}", e)))?;
        Ok(Some(Self {
            client,
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
            url: config.llm_url.clone(),
            timeout_secs: config.llm_timeout_secs,
        }))
    }

    fn transport_error(&self, err: reqwest::Error) -> DocError {
        if err.is_timeout() {
            DocError::ExternalServiceTimeout { seconds: self.timeout_secs }
        } else {
            DocError::ExternalService(format!("request to {} failed: {}", self.url, err))
        }
    }
}

#[async_trait]
impl Completion for ChatClient {
    async fn chat(&self, messages: &[Talk], options: CompletionOptions) -> Result<String, DocError> {
        let request = ChatRequest {
            messages: messages.to_vec(),
            model: self.model.clone(),
            temperature: options.temperature,
            response_format: match options.format {
                FormatType::Text => None,
                format => Some(Format { format_type: format }),
            },
        };
        log::debug!("sending {} message(s) to {}", messages.len(), self.url);

        let response = self.client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocError::ExternalService(format!(
                "request failed with status {}: {}",
                status, body
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| DocError::ExternalService("response contained no choices".to_string()))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    Text,
    JsonObject,
}

#[derive(Deserialize, Serialize, Debug)]
struct Format {
    #[serde(rename = "type")]
    format_type: FormatType,
}

#[derive(Deserialize, Serialize, Debug)]
struct Choice {
    message: Talk,
}

#[derive(Serialize, Debug)]
struct ChatRequest {
    messages: Vec<Talk>,
    model: String,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Format>,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn test_missing_key_means_no_client() -> anyhow::Result<()> {
        let config = Config::default();
        assert!(ChatClient::from_config(&config)?.is_none());
        Ok(())
    }

    #[test]
    fn test_json_request_shape() -> anyhow::Result<()> {
        let request = ChatRequest {
            messages: vec![Talk::new(Role::User, "hi".to_string())],
            model: "gpt-4o-mini".to_string(),
            temperature: 0.5,
            response_format: Some(Format { format_type: FormatType::JsonObject }),
        };
        let value = serde_json::to_value(&request)?;
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "user");

        let plain = ChatRequest { response_format: None, ..request };
        assert!(serde_json::to_value(&plain)?.get("response_format").is_none());
        Ok(())
    }

    #[test]
    fn test_response_parsing() -> anyhow::Result<()> {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"done"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body)?;
        assert_eq!(parsed.choices[0].message.content, "done");
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_external_error() -> anyhow::Result<()> {
        let config = Config {
            llm_api_key: "test-key".to_string(),
            llm_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            llm_timeout_secs: 2,
            ..Config::default()
        };
        let client = ChatClient::from_config(&config)?.expect("client");
        let err = client.complete("hello", CompletionOptions::text(0.3)).await.unwrap_err();
        assert!(matches!(
            err,
            DocError::ExternalService(_) | DocError::ExternalServiceTimeout { .. }
        ));
        Ok(())
    }
}
