//! Durable user preferences.

use std::sync::Arc;
use tracing::warn;

use folio_core::defaults::{
    AVAILABLE_LOCALES, DEFAULT_LOCALE, DEFAULT_TAB, KEY_ACTIVE_TAB, KEY_CURRENT_INDEX,
    KEY_KEYWORD_HIGHLIGHT, KEY_LANGUAGE, KEY_ONBOARDING,
};
use folio_core::logging::SUBSYSTEM_STORAGE;
use folio_core::{KeyValueStore, Result};

/// Map a language tag onto a bundled locale.
///
/// ```
/// use folio_text::preferences::normalize_locale;
///
/// assert_eq!(normalize_locale("PT-BR"), "pt");
/// assert_eq!(normalize_locale("fr"), "en");
/// ```
pub fn normalize_locale(input: &str) -> String {
    if input.is_empty() {
        return DEFAULT_LOCALE.to_string();
    }
    let lower = input.to_lowercase();
    if AVAILABLE_LOCALES.contains(&lower.as_str()) {
        return lower;
    }
    let prefix = lower.split('-').next().unwrap_or_default();
    if AVAILABLE_LOCALES.contains(&prefix) {
        return prefix.to_string();
    }
    DEFAULT_LOCALE.to_string()
}

/// Typed access to the preference keys.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read a key; storage failures read as unset.
    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(subsystem = SUBSYSTEM_STORAGE, key, error = %e, "Preference read failed");
                None
            }
        }
    }

    /// Last selected analysis tab.
    pub async fn active_tab(&self) -> String {
        self.read(KEY_ACTIVE_TAB)
            .await
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TAB.to_string())
    }

    pub async fn set_active_tab(&self, tab: &str) -> Result<()> {
        self.store.set(KEY_ACTIVE_TAB, tab).await
    }

    /// Keyword highlight toggle. Off unless stored as `"1"`.
    pub async fn keyword_highlight(&self) -> bool {
        self.read(KEY_KEYWORD_HIGHLIGHT).await.as_deref() == Some("1")
    }

    pub async fn set_keyword_highlight(&self, enabled: bool) -> Result<()> {
        self.store
            .set(KEY_KEYWORD_HIGHLIGHT, if enabled { "1" } else { "0" })
            .await
    }

    /// Index of the last viewed analysis.
    pub async fn current_index(&self) -> Option<usize> {
        self.read(KEY_CURRENT_INDEX)
            .await
            .and_then(|v| v.trim().parse().ok())
    }

    pub async fn set_current_index(&self, index: usize) -> Result<()> {
        self.store
            .set(KEY_CURRENT_INDEX, &index.to_string())
            .await
    }

    /// Preferred locale, normalized.
    pub async fn language(&self) -> String {
        normalize_locale(&self.read(KEY_LANGUAGE).await.unwrap_or_default())
    }

    /// Store the normalized form of `lang` and return it.
    pub async fn set_language(&self, lang: &str) -> Result<String> {
        let locale = normalize_locale(lang);
        self.store.set(KEY_LANGUAGE, &locale).await?;
        Ok(locale)
    }

    /// First-run walkthrough state.
    pub async fn onboarding(&self, total_steps: i32) -> Onboarding {
        let finished = self.read(KEY_ONBOARDING).await.is_some_and(|v| !v.is_empty());
        Onboarding {
            store: self.store.clone(),
            step: if finished { -1 } else { 0 },
            total_steps,
        }
    }
}

/// Onboarding stepper. `step` is `-1` once finished.
pub struct Onboarding {
    store: Arc<dyn KeyValueStore>,
    step: i32,
    total_steps: i32,
}

impl Onboarding {
    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn is_active(&self) -> bool {
        self.step >= 0
    }

    /// Advance one step; stepping past the last step finishes.
    pub async fn next(&mut self) -> Result<i32> {
        if self.step >= self.total_steps - 1 {
            self.finish().await?;
        } else if self.step >= 0 {
            self.step += 1;
        }
        Ok(self.step)
    }

    pub async fn skip(&mut self) -> Result<()> {
        self.finish().await
    }

    pub async fn finish(&mut self) -> Result<()> {
        self.store.set(KEY_ONBOARDING, "1").await?;
        self.step = -1;
        Ok(())
    }
}
