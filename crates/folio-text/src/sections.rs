//! Segmentation of a document body into navigable sections.
//!
//! A section is a block separated from its neighbours by at least one blank
//! line. Its title is the heading text when the block opens with a Markdown
//! heading, otherwise its first line (truncated when long).

use once_cell::sync::Lazy;
use regex::Regex;

use folio_core::defaults::{
    ACTIVE_SECTION_LOOKAHEAD, SCROLL_TARGET_OFFSET, SECTION_TITLE_KEEP_CHARS,
    SECTION_TITLE_MAX_CHARS,
};
use folio_core::TextSection;

static BLOCK_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("block break pattern is valid"));

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}\s+(.*)").expect("heading pattern is valid"));

/// Split `text` into sections `sec-1`, `sec-2`, ... in document order.
///
/// ```
/// use folio_text::sections::split_sections;
///
/// let sections = split_sections("Title\n\nPara one.\n\nPara two.");
/// assert_eq!(sections.len(), 3);
/// assert_eq!(sections[2].id, "sec-3");
/// assert_eq!(sections[2].title, "Para two.");
/// ```
pub fn split_sections(text: &str) -> Vec<TextSection> {
    BLOCK_BREAK
        .split(text)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .enumerate()
        .map(|(i, block)| TextSection {
            id: format!("sec-{}", i + 1),
            title: section_title(block),
            content: block.to_string(),
        })
        .collect()
}

fn section_title(block: &str) -> String {
    let first_line = block.split('\n').next().unwrap_or_default();

    if let Some(caps) = HEADING.captures(first_line) {
        return caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
    }

    if first_line.chars().count() > SECTION_TITLE_MAX_CHARS {
        let kept: String = first_line.chars().take(SECTION_TITLE_KEEP_CHARS).collect();
        format!("{}…", kept)
    } else {
        first_line.to_string()
    }
}

/// Rendered position of a section, relative to the top of the scroll
/// container.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionMarker {
    pub id: String,
    pub top: f64,
}

impl SectionMarker {
    pub fn new(id: impl Into<String>, top: f64) -> Self {
        Self {
            id: id.into(),
            top,
        }
    }
}

/// The section at the top of the viewport: the last marker (in document
/// order) whose top is within the lookahead of `scroll_top`. Defaults to the
/// first marker; `None` when there are no markers.
pub fn active_section(markers: &[SectionMarker], scroll_top: f64) -> Option<&str> {
    let mut current = markers.first()?;
    for marker in markers {
        if marker.top - scroll_top <= ACTIVE_SECTION_LOOKAHEAD {
            current = marker;
        } else {
            break;
        }
    }
    Some(current.id.as_str())
}

/// Scroll offset that brings section `id` into view with a small margin.
pub fn scroll_target(markers: &[SectionMarker], id: &str) -> Option<f64> {
    markers
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.top - SCROLL_TARGET_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_paragraphs() {
        let sections = split_sections("Title\n\nPara one.\n\nPara two.");
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Title", "Para one.", "Para two."]);
        let ids: Vec<&str> = sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["sec-1", "sec-2", "sec-3"]);
    }

    #[test]
    fn test_heading_title() {
        let sections = split_sections("## Heading\nBody text");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Heading");
        assert_eq!(sections[0].content, "## Heading\nBody text");
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert!(split_sections("").is_empty());
        assert!(split_sections("  \n \n\t\n").is_empty());
    }

    #[test]
    fn test_blank_lines_with_whitespace_split_blocks() {
        let sections = split_sections("first\n   \t\nsecond\n\n\n\nthird");
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[1].content, "second");
    }

    #[test]
    fn test_single_newline_stays_in_block() {
        let sections = split_sections("line one\nline two");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "line one");
    }

    #[test]
    fn test_long_first_line_truncated() {
        let line = "x".repeat(81);
        let sections = split_sections(&line);
        assert_eq!(sections[0].title.chars().count(), 78);
        assert!(sections[0].title.ends_with('…'));
        assert_eq!(&sections[0].title[..77], &line[..77]);
    }

    #[test]
    fn test_eighty_char_line_kept() {
        let line = "y".repeat(80);
        assert_eq!(split_sections(&line)[0].title, line);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let line = "é".repeat(90);
        let title = &split_sections(&line)[0].title;
        assert_eq!(title.chars().count(), 78);
    }

    #[test]
    fn test_seven_hashes_is_not_a_heading() {
        let sections = split_sections("####### Not a heading");
        assert_eq!(sections[0].title, "####### Not a heading");
    }

    #[test]
    fn test_active_section_tracking() {
        let markers = vec![
            SectionMarker::new("sec-1", 0.0),
            SectionMarker::new("sec-2", 300.0),
            SectionMarker::new("sec-3", 700.0),
        ];
        assert_eq!(active_section(&markers, 0.0), Some("sec-1"));
        assert_eq!(active_section(&markers, 259.0), Some("sec-1"));
        assert_eq!(active_section(&markers, 260.0), Some("sec-2"));
        assert_eq!(active_section(&markers, 5000.0), Some("sec-3"));
        assert_eq!(active_section(&[], 0.0), None);
    }

    #[test]
    fn test_active_section_defaults_to_first() {
        let markers = vec![SectionMarker::new("sec-1", 500.0)];
        assert_eq!(active_section(&markers, 0.0), Some("sec-1"));
    }

    #[test]
    fn test_scroll_target() {
        let markers = vec![SectionMarker::new("sec-2", 300.0)];
        assert_eq!(scroll_target(&markers, "sec-2"), Some(292.0));
        assert_eq!(scroll_target(&markers, "sec-9"), None);
    }
}
