//! Span rendering for search hits and keyword highlighting.
//!
//! An active search always wins: only search hits are marked. Without a
//! search, keyword highlighting (when enabled) marks every occurrence of an
//! analysis keyword, preferring the longest keyword at each position.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use folio_core::defaults::KEYWORD_MIN_CHARS;
use folio_core::logging::SUBSYSTEM_TEXT;

use crate::search::match_ranges;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Plain,
    SearchMatch,
    Keyword,
}

/// A run of text with one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub kind: SpanKind,
    pub text: &'a str,
}

impl<'a> Span<'a> {
    fn new(kind: SpanKind, text: &'a str) -> Self {
        Self { kind, text }
    }
}

/// Compiled keyword matcher.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    regex: Option<Regex>,
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Build a matcher from analysis keywords. Keywords of one character or
    /// less are ignored.
    pub fn new(keywords: &[String]) -> Self {
        let mut words: Vec<&str> = keywords
            .iter()
            .map(String::as_str)
            .filter(|k| k.chars().count() > KEYWORD_MIN_CHARS)
            .collect();
        if words.is_empty() {
            return Self::default();
        }
        // Longest first so alternation prefers the longest keyword.
        words.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));

        let pattern = words
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");

        let regex = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(subsystem = SUBSYSTEM_TEXT, error = %e, "Keyword pattern rejected");
                None
            }
        };

        Self {
            regex,
            keywords: words.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    fn is_keyword(&self, segment: &str) -> bool {
        let lower = segment.to_lowercase();
        self.keywords.iter().any(|k| *k == lower)
    }

    /// Split `content` into plain and keyword spans.
    pub fn spans<'a>(&self, content: &'a str) -> Vec<Span<'a>> {
        let Some(regex) = &self.regex else {
            return vec![Span::new(SpanKind::Plain, content)];
        };

        let mut spans = Vec::new();
        let mut cursor = 0;
        for m in regex.find_iter(content) {
            if m.start() > cursor {
                spans.push(Span::new(SpanKind::Plain, &content[cursor..m.start()]));
            }
            let kind = if self.is_keyword(m.as_str()) {
                SpanKind::Keyword
            } else {
                SpanKind::Plain
            };
            spans.push(Span::new(kind, m.as_str()));
            cursor = m.end();
        }
        if cursor < content.len() {
            spans.push(Span::new(SpanKind::Plain, &content[cursor..]));
        }
        spans
    }
}

/// Split `content` into plain and search-hit spans.
pub fn search_spans<'a>(content: &'a str, query: &str) -> Vec<Span<'a>> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    for range in match_ranges(content, query) {
        if range.start > cursor {
            spans.push(Span::new(SpanKind::Plain, &content[cursor..range.start]));
        }
        cursor = range.end;
        spans.push(Span::new(SpanKind::SearchMatch, &content[range]));
    }
    if cursor < content.len() {
        spans.push(Span::new(SpanKind::Plain, &content[cursor..]));
    }
    spans
}

/// Render `content` for display.
///
/// ```
/// use folio_text::highlight::{render, KeywordMatcher, SpanKind};
///
/// let matcher = KeywordMatcher::new(&["cat".to_string()]);
/// let spans = render("the cat", "", &matcher, true);
/// assert_eq!(spans[1].kind, SpanKind::Keyword);
/// ```
pub fn render<'a>(
    content: &'a str,
    query: &str,
    keywords: &KeywordMatcher,
    keyword_highlight: bool,
) -> Vec<Span<'a>> {
    if content.is_empty() {
        return Vec::new();
    }
    if !query.is_empty() {
        return search_spans(content, query);
    }
    if keyword_highlight && !keywords.is_empty() {
        return keywords.spans(content);
    }
    vec![Span::new(SpanKind::Plain, content)]
}
