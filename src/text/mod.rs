pub mod clean;
pub mod structure;
pub mod ai;

pub use clean::{clean, clean_ocr_text};
pub use structure::{DocumentStructurer, SectionType, StructuredSection};

/// Sections must carry more than this many whitespace-separated tokens.
pub const MIN_SECTION_TOKENS: usize = 5;

pub fn is_meaningful(text: &str) -> bool {
    text.split_whitespace().count() > MIN_SECTION_TOKENS
}
