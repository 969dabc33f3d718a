use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::chat::Completion;
use super::ai::AiStructuring;
use super::is_meaningful;

const MAX_TITLE_WORDS: usize = 10;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

static DEFAULT_RULES: Lazy<Vec<HeadingRule>> = Lazy::new(|| {
    vec![
        HeadingRule::new(
            "all-caps",
            r"^\s*[A-Z][A-Z0-9 \t&/,'()\-]{2,}$",
            HeadingPlacement::Line,
        ),
        HeadingRule::new(
            "numbered",
            r"^\s*\d+(?:(?:\.\d+)+\.?|\.)[ \t]+[A-Z][^.!?]{0,80}$",
            HeadingPlacement::Line,
        ),
        HeadingRule::new("underlined", r"^\s*(?:={3,}|-{3,})\s*$", HeadingPlacement::Underline),
        HeadingRule::new(
            "colon-terminated",
            r"^\s*[A-Z][^.!?:]{0,78}:\s*$",
            HeadingPlacement::Line,
        ),
        HeadingRule::new(
            "bulleted",
            r"^\s*[•▪◦*\-][ \t]+[A-Z][^.!?:]{0,60}$",
            HeadingPlacement::Line,
        ),
        HeadingRule::new(
            "blank-line-delimited",
            r"^[ \t]*[A-Z][^\s.!?:;]*(?:[ \t]+[^\s.!?:;]+){0,7}[ \t]*$",
            HeadingPlacement::Isolated,
        ),
    ]
    .into_iter()
    .map(|rule| rule.unwrap())
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Paragraph,
    Section,
    Title,
    Heading,
    List,
}

impl SectionType {
    /// Lenient parse; anything unrecognised is a plain section.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "paragraph" => Self::Paragraph,
            "title" => Self::Title,
            "heading" => Self::Heading,
            "list" => Self::List,
            _ => Self::Section,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSection {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: SectionType,
    pub heading: Option<String>,
    pub length: usize,
}

impl StructuredSection {
    /// Returns `None` for fragments too short to count as a section.
    pub fn new(content: impl Into<String>, kind: SectionType, heading: Option<String>) -> Option<Self> {
        let content = content.into();
        if !is_meaningful(&content) {
            return None;
        }
        let heading = heading
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());
        Some(Self {
            length: content.chars().count(),
            content,
            kind,
            heading,
        })
    }
}

/// Where a heading sits relative to the line the rule's pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingPlacement {
    /// The matching line is the heading.
    Line,
    /// The matching line underlines the nearest non-blank line above it, when
    /// that line is short enough to be a title.
    Underline,
    /// The matching line is a heading only when it stands between blank lines.
    Isolated,
}

#[derive(Debug, Clone)]
pub struct HeadingRule {
    pub name: &'static str,
    pattern: Regex,
    placement: HeadingPlacement,
}

impl HeadingRule {
    pub fn new(name: &'static str, pattern: &str, placement: HeadingPlacement) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            placement,
        })
    }

    fn heading_mask(&self, lines: &[&str]) -> Vec<bool> {
        let mut mask = vec![false; lines.len()];
        let blank = |i: Option<usize>| i.and_then(|i| lines.get(i)).map_or(true, |l| l.trim().is_empty());

        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() || !self.pattern.is_match(line) {
                continue;
            }
            match self.placement {
                HeadingPlacement::Line => mask[i] = true,
                HeadingPlacement::Underline => {
                    let above = (0..i).rev().find(|&j| !lines[j].trim().is_empty());
                    if let Some(j) = above.filter(|&j| !mask[j] && is_title(lines[j])) {
                        mask[j] = true;
                        mask[i] = true;
                    }
                }
                HeadingPlacement::Isolated => {
                    if blank(i.checked_sub(1)) && blank(Some(i + 1)) {
                        mask[i] = true;
                    }
                }
            }
        }
        mask
    }

    /// Splits `text` at heading lines, returning the non-empty bodies in order.
    pub fn split(&self, text: &str) -> Vec<String> {
        let lines: Vec<&str> = text.lines().collect();
        let mask = self.heading_mask(&lines);

        let mut segments = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for (line, is_heading) in lines.iter().zip(mask) {
            if is_heading {
                push_segment(&mut segments, &current);
                current.clear();
            } else {
                current.push(line);
            }
        }
        push_segment(&mut segments, &current);
        segments
    }
}

fn is_title(line: &str) -> bool {
    let line = line.trim();
    line.split_whitespace().count() <= MAX_TITLE_WORDS && !line.ends_with(['.', '!', '?'])
}

fn push_segment(segments: &mut Vec<String>, lines: &[&str]) {
    let body = lines.join("\n");
    let body = body.trim();
    if !body.is_empty() {
        segments.push(body.to_string());
    }
}

/// Turns cleaned document text into an ordered list of sections.
#[derive(Debug, Clone)]
pub struct DocumentStructurer {
    rules: Vec<HeadingRule>,
    ai: AiStructuring,
}

impl Default for DocumentStructurer {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
            ai: AiStructuring::default(),
        }
    }
}

impl DocumentStructurer {
    pub fn new(ai: AiStructuring) -> Self {
        Self { ai, ..Default::default() }
    }

    /// Structures `text`, asking `llm` first when one is given and the text is
    /// long enough. Any failure on that path falls back to the heuristics.
    pub async fn structure(&self, text: &str, llm: Option<&dyn Completion>) -> Vec<StructuredSection> {
        if let Some(llm) = llm.filter(|_| self.ai.applies_to(text)) {
            match self.ai.request(llm, text).await {
                Ok(sections) if !sections.is_empty() => {
                    log::info!("AI structuring returned {} sections", sections.len());
                    return sections;
                }
                Ok(_) => log::warn!("AI structuring returned no usable sections, using heuristics"),
                Err(err) => log::warn!("AI structuring failed, using heuristics: {}", err),
            }
        }
        self.heuristic(text)
    }

    pub fn heuristic(&self, text: &str) -> Vec<StructuredSection> {
        for rule in &self.rules {
            let segments = rule.split(text);
            if segments.len() > 1 {
                log::debug!("heading rule '{}' split text into {} segments", rule.name, segments.len());
                return to_sections(segments, SectionType::Section);
            }
        }

        let paragraphs = PARAGRAPH_BREAK
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        to_sections(paragraphs, SectionType::Paragraph)
    }
}

fn to_sections(segments: Vec<String>, kind: SectionType) -> Vec<StructuredSection> {
    segments
        .into_iter()
        .filter_map(|s| StructuredSection::new(s, kind, None))
        .collect()
}
