//! Per-document notes anchored to text sections.
//!
//! Notes live in one bucket per document in durable storage. The bucket key
//! is derived from the file name and the text itself, so reopening the same
//! document finds its notes again:
//!
//! ```text
//! analysis.notes.v1::{file name or "doc"}::{UTF-16 length}::{hash}
//! ```
//!
//! The hash is the 32-bit wrapping `h = h * 31 + unit` over the first 512
//! UTF-16 code units of the text.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use folio_core::defaults::{KEY_NOTES_PREFIX, NOTE_FINGERPRINT_UNITS};
use folio_core::logging::SUBSYSTEM_TEXT;
use folio_core::storage::{load_json, save_json};
use folio_core::{Clock, KeyValueStore, Note, Result};

/// Storage key of the note bucket for a document.
pub fn note_bucket_key(file_name: Option<&str>, text: &str) -> String {
    let base = file_name.filter(|f| !f.is_empty()).unwrap_or("doc");
    let length = text.encode_utf16().count();
    let hash = text
        .encode_utf16()
        .take(NOTE_FINGERPRINT_UNITS)
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    format!("{}{}::{}::{}", KEY_NOTES_PREFIX, base, length, hash)
}

/// Notes of one document plus its editing state.
pub struct NoteBook {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
    notes: Vec<Note>,
    drafts: HashMap<String, String>,
    /// Note being edited and its draft text.
    editing: Option<(String, String)>,
}

impl NoteBook {
    /// Load the bucket for a document. Missing or malformed buckets start
    /// empty.
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        file_name: Option<&str>,
        text: &str,
    ) -> Self {
        let key = note_bucket_key(file_name, text);
        let notes: Vec<Note> = load_json(store.as_ref(), &key).await.unwrap_or_default();
        debug!(subsystem = SUBSYSTEM_TEXT, key = %key, result_count = notes.len(), "Notes loaded");

        Self {
            store,
            clock,
            key,
            notes,
            drafts: HashMap::new(),
            editing: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// All notes, newest first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Notes anchored to `section_id`, newest first.
    pub fn section_notes(&self, section_id: &str) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.section_id == section_id)
            .collect()
    }

    pub fn draft(&self, section_id: &str) -> &str {
        self.drafts.get(section_id).map(String::as_str).unwrap_or("")
    }

    pub fn set_draft(&mut self, section_id: &str, text: impl Into<String>) {
        self.drafts.insert(section_id.to_string(), text.into());
    }

    /// Turn the section's draft into a note. Blank drafts are ignored.
    pub async fn add_note(&mut self, section_id: &str) -> Result<Option<Note>> {
        let text = self.draft(section_id).trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }

        let now = self.clock.now().timestamp_millis();
        let note = Note {
            id: self.unique_id(now),
            section_id: section_id.to_string(),
            text,
            created_at: now,
            updated_at: now,
        };
        self.notes.insert(0, note.clone());
        self.drafts.insert(section_id.to_string(), String::new());
        self.persist().await?;

        info!(subsystem = SUBSYSTEM_TEXT, note_id = %note.id, section_id, "Note added");
        Ok(Some(note))
    }

    /// Creation timestamps double as IDs; bump on collision.
    fn unique_id(&self, now: i64) -> String {
        let mut candidate = now;
        while self.notes.iter().any(|n| n.id == candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    /// Begin editing a note. Returns `false` if no such note exists.
    pub fn start_edit(&mut self, note_id: &str) -> bool {
        match self.notes.iter().find(|n| n.id == note_id) {
            Some(note) => {
                self.editing = Some((note.id.clone(), note.text.clone()));
                true
            }
            None => false,
        }
    }

    /// The note being edited and its draft.
    pub fn editing(&self) -> Option<(&str, &str)> {
        self.editing
            .as_ref()
            .map(|(id, draft)| (id.as_str(), draft.as_str()))
    }

    pub fn set_edit_draft(&mut self, text: impl Into<String>) {
        if let Some((_, draft)) = self.editing.as_mut() {
            *draft = text.into();
        }
    }

    /// Commit the edit draft (trimmed) to the note being edited.
    pub async fn save_edit(&mut self) -> Result<Option<Note>> {
        let Some((id, draft)) = self.editing.take() else {
            return Ok(None);
        };

        let now = self.clock.now().timestamp_millis();
        let updated = self.notes.iter_mut().find(|n| n.id == id).map(|note| {
            note.text = draft.trim().to_string();
            note.updated_at = now;
            note.clone()
        });
        self.persist().await?;
        Ok(updated)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Remove a note. Returns whether it existed.
    pub async fn delete_note(&mut self, note_id: &str) -> Result<bool> {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != note_id);
        if self.notes.len() == before {
            return Ok(false);
        }
        if matches!(&self.editing, Some((id, _)) if id == note_id) {
            self.editing = None;
        }
        self.persist().await?;
        Ok(true)
    }

    async fn persist(&self) -> Result<()> {
        save_json(self.store.as_ref(), &self.key, &self.notes).await
    }
}
