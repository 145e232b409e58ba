//! Centralized default constants for folio.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// API CLIENT
// =============================================================================

/// Default backend base URL.
pub const API_URL: &str = "http://localhost:8080";

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Default HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// ENTITY CACHE
// =============================================================================

/// Maximum age at which cached data is served without any fetch.
pub const CACHE_HARD_TTL_SECS: u64 = 30;

/// Age past which served data triggers a background refresh.
pub const CACHE_SOFT_TTL_SECS: u64 = 10;

/// Period of the passive revalidation timer.
pub const REVALIDATE_INTERVAL_SECS: u64 = 60;

/// Page size used when caching the documents list.
pub const DOCUMENTS_PAGE_LIMIT: i64 = 100;

/// Broadcast capacity for cache events.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// STORAGE KEYS
// =============================================================================

/// Session-scoped snapshot of the collections list.
pub const SESSION_KEY_COLLECTIONS: &str = "cache.collections.v1";

/// Session-scoped snapshot of the documents list.
pub const SESSION_KEY_DOCUMENTS: &str = "cache.documents.v1";

/// Durable: last selected analysis tab.
pub const KEY_ACTIVE_TAB: &str = "analysis.activeTab.v1";

/// Durable: onboarding completed flag.
pub const KEY_ONBOARDING: &str = "analysis.onboarded.v1";

/// Durable: keyword highlight toggle (`"1"` / `"0"`).
pub const KEY_KEYWORD_HIGHLIGHT: &str = "analysis.keywordsHighlight.v1";

/// Durable: prefix of per-document note buckets.
pub const KEY_NOTES_PREFIX: &str = "analysis.notes.v1::";

/// Durable: index of the last viewed analysis.
pub const KEY_CURRENT_INDEX: &str = "analysis.currentIndex.v1";

/// Durable: user language preference.
pub const KEY_LANGUAGE: &str = "app.lang.v1";

// =============================================================================
// TEXT
// =============================================================================

/// Section titles longer than this are truncated.
pub const SECTION_TITLE_MAX_CHARS: usize = 80;

/// Number of characters kept when a section title is truncated.
pub const SECTION_TITLE_KEEP_CHARS: usize = 77;

/// Lookahead (px) when deciding which section sits at the viewport top.
pub const ACTIVE_SECTION_LOOKAHEAD: f64 = 40.0;

/// Space (px) left above a section when scrolling to it.
pub const SCROLL_TARGET_OFFSET: f64 = 8.0;

/// UTF-16 units of the document hashed into the note bucket key.
pub const NOTE_FINGERPRINT_UNITS: usize = 512;

/// Keywords of this many characters or fewer are never highlighted.
pub const KEYWORD_MIN_CHARS: usize = 1;

// =============================================================================
// PREFERENCES
// =============================================================================

/// Tab shown when nothing was persisted.
pub const DEFAULT_TAB: &str = "summary";

/// Fallback locale.
pub const DEFAULT_LOCALE: &str = "en";

/// Locales with bundled messages.
pub const AVAILABLE_LOCALES: &[&str] = &["en", "pt"];

/// Steps of the first-run onboarding walkthrough.
pub const ONBOARDING_STEPS: i32 = 3;

// =============================================================================
// EXPORT
// =============================================================================

/// Maximum length of the sanitized base of an export file name.
pub const EXPORT_BASE_MAX_CHARS: usize = 60;
