use serde::Deserialize;

use crate::chat::{prompts, Completion, CompletionOptions};
use crate::error::DocError;
use super::structure::{SectionType, StructuredSection};

pub const DEFAULT_MIN_CHARS: usize = 500;
pub const DEFAULT_MAX_CHARS: usize = 15_000;

/// Limits for the language-model structuring path.
#[derive(Debug, Clone, Copy)]
pub struct AiStructuring {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for AiStructuring {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StructureResponse {
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl AiStructuring {
    /// Only texts longer than `min_chars` are sent to the model.
    pub fn applies_to(&self, text: &str) -> bool {
        text.chars().count() > self.min_chars
    }

    pub async fn request(&self, llm: &dyn Completion, text: &str) -> Result<Vec<StructuredSection>, DocError> {
        let excerpt: String = text.chars().take(self.max_chars).collect();
        let prompt = prompts::structure(&excerpt);
        let reply = llm.complete(&prompt, CompletionOptions::json(0.2)).await?;
        parse_sections(&reply)
    }
}

/// Parses the `{"sections": [...]}` reply, keeping only meaningful entries.
pub fn parse_sections(reply: &str) -> Result<Vec<StructuredSection>, DocError> {
    let body = strip_code_fence(reply);
    let response: StructureResponse = serde_json::from_str(body)
        .map_err(|e| DocError::ExternalService(format!("malformed structuring reply: {}", e)))?;

    Ok(response
        .sections
        .into_iter()
        .filter_map(|raw| {
            let kind = raw
                .kind
                .as_deref()
                .map_or(SectionType::Section, SectionType::from_label);
            StructuredSection::new(raw.content.trim(), kind, raw.heading)
        })
        .collect())
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::{CannedLlm, FailingLlm};
    use crate::text::{clean, DocumentStructurer};

    fn long_document() -> String {
        let para = "Quarterly revenue rose steadily across every region we operate in.";
        let mut raw = String::from("OVERVIEW\n\n");
        for _ in 0..8 {
            raw.push_str(para);
            raw.push('\n');
        }
        raw.push_str("\nOUTLOOK\n\n");
        for _ in 0..4 {
            raw.push_str(para);
            raw.push('\n');
        }
        clean(&raw)
    }

    #[test]
    fn test_parse_sections_filters_short_entries() -> anyhow::Result<()> {
        let reply = r#"{"sections": [
            {"heading": "Intro", "content": "This introduction is long enough to keep around.", "type": "heading"},
            {"heading": "", "content": "too short", "type": "paragraph"},
            {"content": "No heading here but still plenty of words inside.", "type": "mystery"}
        ]}"#;
        let sections = parse_sections(reply)?;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading.as_deref(), Some("Intro"));
        assert_eq!(sections[0].kind, SectionType::Heading);
        assert_eq!(sections[1].heading, None);
        assert_eq!(sections[1].kind, SectionType::Section);
        Ok(())
    }

    #[test]
    fn test_parse_sections_accepts_fenced_json() -> anyhow::Result<()> {
        let reply = "```json\n{\"sections\": [{\"heading\": \"A\", \"content\": \"one two three four five six\", \"type\": \"list\"}]}\n```";
        let sections = parse_sections(reply)?;
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, SectionType::List);
        Ok(())
    }

    #[test]
    fn test_parse_sections_rejects_missing_key() {
        assert!(matches!(parse_sections(r#"{"parts": []}"#), Err(DocError::ExternalService(_))));
        assert!(matches!(parse_sections("not json"), Err(DocError::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_ai_sections_used_when_available() {
        let llm = CannedLlm::new(
            r#"{"sections": [{"heading": "Whole", "content": "one two three four five six seven", "type": "section"}]}"#,
        );
        let text = long_document();
        let sections = DocumentStructurer::default().structure(&text, Some(&llm)).await;
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading.as_deref(), Some("Whole"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_network_error_falls_back_to_heuristics() {
        let text = long_document();
        let structurer = DocumentStructurer::default();
        let sections = structurer.structure(&text, Some(&FailingLlm::network())).await;
        assert_eq!(sections, structurer.heuristic(&text));
        assert_eq!(sections.len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_and_malformed_replies_fall_back() {
        let text = long_document();
        let structurer = DocumentStructurer::default();
        let expected = structurer.heuristic(&text);

        let timeout = FailingLlm::timeout();
        assert_eq!(structurer.structure(&text, Some(&timeout)).await, expected);

        let malformed = CannedLlm::new("{\"sections\": \"nope\"}");
        assert_eq!(structurer.structure(&text, Some(&malformed)).await, expected);

        let empty = CannedLlm::new("{\"sections\": []}");
        assert_eq!(structurer.structure(&text, Some(&empty)).await, expected);
    }

    #[tokio::test]
    async fn test_short_text_skips_llm() {
        let llm = CannedLlm::new("{}");
        let text = clean("SHORT\n\nonly a handful of words live here today\n\nNOTE\n\nanother handful of words lives here");
        let sections = DocumentStructurer::default().structure(&text, Some(&llm)).await;
        assert_eq!(llm.calls(), 0);
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn test_min_chars_must_be_exceeded() {
        let ai = AiStructuring { min_chars: 10, max_chars: 40 };
        assert!(!ai.applies_to(&"x".repeat(9)));
        assert!(!ai.applies_to(&"x".repeat(10)));
        assert!(ai.applies_to(&"x".repeat(11)));
    }

    #[tokio::test]
    async fn test_excerpt_is_capped() -> anyhow::Result<()> {
        let llm = CannedLlm::new(r#"{"sections": []}"#);
        let ai = AiStructuring { min_chars: 10, max_chars: 40 };
        let text = "x".repeat(1_000);
        ai.request(&llm, &text).await?;
        let prompt = llm.last_prompt().unwrap_or_default();
        assert!(prompt.contains(&"x".repeat(40)));
        assert!(!prompt.contains(&"x".repeat(41)));
        Ok(())
    }
}
