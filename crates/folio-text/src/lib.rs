//! # folio-text
//!
//! Text-side engines for an analyzed document: section segmentation,
//! case-insensitive search, keyword and search highlighting, per-document
//! notes, user preferences and Markdown export.
//!
//! Everything except [`notes`] and [`preferences`] is pure and synchronous.
//! Those two persist through a [`folio_core::KeyValueStore`].

pub mod export;
pub mod highlight;
pub mod notes;
pub mod preferences;
pub mod search;
pub mod sections;
pub mod view;

pub use export::{export_notes, export_summary, ExportFile};
pub use highlight::{render, KeywordMatcher, Span, SpanKind};
pub use notes::{note_bucket_key, NoteBook};
pub use preferences::{normalize_locale, Onboarding, Preferences};
pub use search::{find_matches, SearchState};
pub use sections::{active_section, scroll_target, split_sections, SectionMarker};
pub use view::{DocumentView, ViewState};
