//! Case-insensitive literal search over a document body.
//!
//! Offsets reported to callers are character offsets. Rendering needs byte
//! ranges into the same string, so both are derived from one scan.

use std::ops::Range;
use tracing::trace;

use folio_core::logging::SUBSYSTEM_TEXT;

/// Lowercase a character when it lowercases to exactly one character, so
/// folded text stays aligned with the input.
fn fold(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Non-overlapping matches as `(char_offset, byte_range)`, ascending.
fn scan(text: &str, query: &str) -> Vec<(usize, Range<usize>)> {
    let needle: Vec<char> = query.chars().map(fold).collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let hay: Vec<(usize, char)> = text.char_indices().map(|(b, c)| (b, fold(c))).collect();
    let mut found = Vec::new();
    let mut i = 0;
    while i + needle.len() <= hay.len() {
        let hit = hay[i..i + needle.len()]
            .iter()
            .zip(&needle)
            .all(|((_, h), n)| h == n);
        if hit {
            let start = hay[i].0;
            let end = hay
                .get(i + needle.len())
                .map(|(b, _)| *b)
                .unwrap_or(text.len());
            found.push((i, start..end));
            i += needle.len();
        } else {
            i += 1;
        }
    }

    trace!(subsystem = SUBSYSTEM_TEXT, result_count = found.len(), "Search scan");
    found
}

/// Character offsets of every case-insensitive occurrence of `query`.
///
/// ```
/// use folio_text::search::find_matches;
///
/// assert_eq!(find_matches("the cat sat on the mat", "the"), vec![0, 15]);
/// assert!(find_matches("anything", "").is_empty());
/// ```
pub fn find_matches(text: &str, query: &str) -> Vec<usize> {
    scan(text, query).into_iter().map(|(offset, _)| offset).collect()
}

/// Byte ranges of every case-insensitive occurrence of `query`.
pub fn match_ranges(text: &str, query: &str) -> Vec<Range<usize>> {
    scan(text, query).into_iter().map(|(_, range)| range).collect()
}

/// Query, match index and match pointer for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    query: String,
    matches: Vec<usize>,
    current: usize,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the query and recompute matches against `text`.
    pub fn set_query(&mut self, query: impl Into<String>, text: &str) {
        self.query = query.into();
        self.recompute(text);
    }

    /// Recompute matches after the text changed. Resets the pointer.
    pub fn recompute(&mut self, text: &str) {
        self.matches = find_matches(text, &self.query);
        self.current = 0;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    /// Index of the current match.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Character offset of the current match.
    pub fn current_offset(&self) -> Option<usize> {
        self.matches.get(self.current).copied()
    }

    /// Advance, wrapping to the first match.
    pub fn next_match(&mut self) -> usize {
        self.current = if self.current + 1 < self.matches.len() {
            self.current + 1
        } else {
            0
        };
        self.current
    }

    /// Step back, wrapping to the last match.
    pub fn prev_match(&mut self) -> usize {
        self.current = if self.current > 0 {
            self.current - 1
        } else {
            self.matches.len().saturating_sub(1)
        };
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_matches_case_insensitive() {
        assert_eq!(find_matches("The cat. THE end.", "the"), vec![0, 9]);
    }

    #[test]
    fn test_matches_do_not_overlap() {
        assert_eq!(find_matches("aaaa", "aa"), vec![0, 2]);
        assert_eq!(find_matches("aaa", "aa"), vec![0]);
    }

    #[test]
    fn test_offsets_are_characters() {
        let text = "café au lait, café noir";
        assert_eq!(find_matches(text, "CAFÉ"), vec![0, 14]);

        let ranges = match_ranges(text, "café");
        assert_eq!(&text[ranges[1].clone()], "café");
    }

    #[test]
    fn test_query_longer_than_text() {
        assert!(find_matches("ab", "abc").is_empty());
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let mut state = SearchState::new();
        state.set_query("a", "a b a b a");
        assert_eq!(state.matches(), &[0, 4, 8]);

        assert_eq!(state.next_match(), 1);
        assert_eq!(state.next_match(), 2);
        assert_eq!(state.next_match(), 0);
        assert_eq!(state.prev_match(), 2);
        assert_eq!(state.current_offset(), Some(8));
    }

    #[test]
    fn test_zero_matches_pointer_stays_zero() {
        let mut state = SearchState::new();
        state.set_query("zzz", "abc");
        assert_eq!(state.next_match(), 0);
        assert_eq!(state.prev_match(), 0);
        assert_eq!(state.current_offset(), None);
    }

    #[test]
    fn test_recompute_resets_pointer() {
        let mut state = SearchState::new();
        state.set_query("x", "x x x");
        state.next_match();
        state.recompute("x x x x");
        assert_eq!(state.current(), 0);
        assert_eq!(state.matches().len(), 4);
    }

    #[test]
    fn test_empty_query_clears_matches() {
        let mut state = SearchState::new();
        state.set_query("x", "x");
        state.set_query("", "x");
        assert!(state.matches().is_empty());
        assert!(!state.is_active());
    }
}
