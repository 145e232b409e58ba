//! Derived state of an open document.
//!
//! Every setter recomputes sections and matches and publishes a fresh
//! [`ViewState`] to subscribers.

use tokio::sync::watch;
use tracing::debug;

use folio_core::logging::SUBSYSTEM_TEXT;
use folio_core::TextSection;

use crate::highlight::{render, KeywordMatcher, Span};
use crate::search::SearchState;
use crate::sections::split_sections;

/// Snapshot published to view subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub sections: Vec<TextSection>,
    pub query: String,
    /// Character offsets of the search matches in the full text.
    pub matches: Vec<usize>,
    pub current_match: usize,
    pub keyword_highlight: bool,
    pub keywords: Vec<String>,
}

pub struct DocumentView {
    text: String,
    sections: Vec<TextSection>,
    search: SearchState,
    keywords: Vec<String>,
    matcher: KeywordMatcher,
    keyword_highlight: bool,
    state: watch::Sender<ViewState>,
}

impl DocumentView {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let (state, _) = watch::channel(ViewState::default());
        let view = Self {
            sections: split_sections(&text),
            text,
            search: SearchState::new(),
            keywords: Vec::new(),
            matcher: KeywordMatcher::default(),
            keyword_highlight: false,
            state,
        };
        view.publish();
        view
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sections(&self) -> &[TextSection] {
        &self.sections
    }

    /// Replace the text. Sections and matches are recomputed.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.sections = split_sections(&self.text);
        self.search.recompute(&self.text);
        debug!(
            subsystem = SUBSYSTEM_TEXT,
            section_count = self.sections.len(),
            "Document text replaced"
        );
        self.publish();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.search.set_query(query, &self.text);
        self.publish();
    }

    pub fn set_keywords(&mut self, keywords: Vec<String>) {
        self.matcher = KeywordMatcher::new(&keywords);
        self.keywords = keywords;
        self.publish();
    }

    pub fn set_keyword_highlight(&mut self, enabled: bool) {
        self.keyword_highlight = enabled;
        self.publish();
    }

    pub fn next_match(&mut self) -> usize {
        let current = self.search.next_match();
        self.publish();
        current
    }

    pub fn prev_match(&mut self) -> usize {
        let current = self.search.prev_match();
        self.publish();
        current
    }

    /// Styled spans of one section's content, or `None` for an unknown ID.
    pub fn render_section(&self, id: &str) -> Option<Vec<Span<'_>>> {
        self.sections.iter().find(|s| s.id == id).map(|section| {
            render(
                &section.content,
                self.search.query(),
                &self.matcher,
                self.keyword_highlight,
            )
        })
    }

    fn publish(&self) {
        let next = ViewState {
            sections: self.sections.clone(),
            query: self.search.query().to_string(),
            matches: self.search.matches().to_vec(),
            current_match: self.search.current(),
            keyword_highlight: self.keyword_highlight,
            keywords: self.keywords.clone(),
        };
        self.state.send_replace(next);
    }
}
