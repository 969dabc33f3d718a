use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static NEWLINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static OCR_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-.,$€£¥%]").unwrap());

/// Normalizes whitespace in extracted text.
///
/// A whitespace run holding two or more newlines becomes a paragraph break
/// (`"\n\n"`); every other run becomes a single space.
pub fn clean(text: &str) -> String {
    let limited = NEWLINE_RUN.replace_all(text, "\n\n");
    let collapsed = WHITESPACE_RUN.replace_all(&limited, |caps: &Captures| {
        if caps[0].matches('\n').count() >= 2 {
            "\n\n"
        } else {
            " "
        }
    });
    collapsed.trim().to_string()
}

/// Strips OCR noise characters and flattens the result onto one line.
pub fn clean_ocr_text(text: &str) -> String {
    let stripped = OCR_NOISE.replace_all(text, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean(""), "");
        assert_eq!(clean(" \n\t "), "");
    }

    #[test]
    fn test_clean_keeps_paragraph_breaks() {
        let text = "First   line\nsame paragraph\n\n\n\n\nSecond\t\tparagraph  ";
        assert_eq!(clean(text), "First line same paragraph\n\nSecond paragraph");
    }

    #[test]
    fn test_clean_blank_line_with_spaces() {
        assert_eq!(clean("a \n   \n b"), "a\n\nb");
        assert_eq!(clean("a\r\n\r\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            "",
            "plain",
            "  lead and trail  ",
            "AAA\n\n\n\nSECTION ONE\n\nbody text\n\nhi",
            "x\n \n \n y\tz\r\n",
            "one\ntwo\n\nthree\n\n\n\n\nfour",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_clean_leading_newline_run() {
        let text = "AAA\n\n\n\nSECTION ONE\n\nThis is a real paragraph with enough words to pass the filter.\n\nhi";
        assert_eq!(
            clean(text),
            "AAA\n\nSECTION ONE\n\nThis is a real paragraph with enough words to pass the filter.\n\nhi"
        );
    }

    #[test]
    fn test_clean_ocr_text() {
        assert_eq!(clean_ocr_text("Total:  $45.00 @ 10%!!\n"), "Total $45.00 10%");
        assert_eq!(clean_ocr_text("  ~~~  "), "");
        assert_eq!(clean_ocr_text("Café  €3,50"), "Café €3,50");
    }
}
