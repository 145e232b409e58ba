//! Note persistence through the filesystem store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use folio_core::{FileStore, KeyValueStore, ManualClock, MemoryStore};
use folio_text::export::export_notes;
use folio_text::notes::{note_bucket_key, NoteBook};
use folio_text::sections::split_sections;

const DOC: &str = "# Intro\nOpening words.\n\n# Method\nHow it was done.";

fn clock_at(ms: i64) -> Arc<ManualClock> {
    let start = DateTime::<Utc>::from_timestamp_millis(ms).unwrap();
    Arc::new(ManualClock::new(start))
}

#[tokio::test]
async fn test_notes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()));
    let clock = clock_at(1_700_000_000_000);

    let mut book = NoteBook::open(store.clone(), clock.clone(), Some("paper.pdf"), DOC).await;
    assert!(book.notes().is_empty());

    book.set_draft("sec-1", "  first thought  ");
    let first = book.add_note("sec-1").await.unwrap().unwrap();
    assert_eq!(first.text, "first thought");
    assert_eq!(first.id, "1700000000000");
    assert_eq!(book.draft("sec-1"), "");

    clock.advance(Duration::seconds(1));
    book.set_draft("sec-2", "method note");
    book.add_note("sec-2").await.unwrap();

    let reopened = NoteBook::open(store, clock, Some("paper.pdf"), DOC).await;
    let texts: Vec<&str> = reopened.notes().iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, vec!["method note", "first thought"]);
    assert_eq!(reopened.section_notes("sec-1").len(), 1);
}

#[tokio::test]
async fn test_blank_draft_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let mut book = NoteBook::open(store.clone(), clock_at(0), None, DOC).await;

    book.set_draft("sec-1", "   \n ");
    assert!(book.add_note("sec-1").await.unwrap().is_none());
    assert!(store.get(book.key()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_same_millisecond_gets_distinct_ids() {
    let store = Arc::new(MemoryStore::new());
    let mut book = NoteBook::open(store, clock_at(5_000), None, DOC).await;

    book.set_draft("sec-1", "a");
    let a = book.add_note("sec-1").await.unwrap().unwrap();
    book.set_draft("sec-1", "b");
    let b = book.add_note("sec-1").await.unwrap().unwrap();

    assert_eq!(a.id, "5000");
    assert_eq!(b.id, "5001");
}

#[tokio::test]
async fn test_edit_and_delete_persist() {
    let store = Arc::new(MemoryStore::new());
    let clock = clock_at(10_000);
    let mut book = NoteBook::open(store.clone(), clock.clone(), Some("a.txt"), DOC).await;

    book.set_draft("sec-2", "draft");
    let note = book.add_note("sec-2").await.unwrap().unwrap();

    assert!(book.start_edit(&note.id));
    assert_eq!(book.editing(), Some((note.id.as_str(), "draft")));
    clock.advance(Duration::milliseconds(250));
    book.set_edit_draft(" revised ");
    let saved = book.save_edit().await.unwrap().unwrap();
    assert_eq!(saved.text, "revised");
    assert_eq!(saved.updated_at, 10_250);
    assert_eq!(saved.created_at, 10_000);
    assert!(book.editing().is_none());

    let reopened = NoteBook::open(store.clone(), clock.clone(), Some("a.txt"), DOC).await;
    assert_eq!(reopened.notes()[0].text, "revised");

    assert!(book.start_edit(&note.id));
    assert!(book.delete_note(&note.id).await.unwrap());
    assert!(book.editing().is_none());
    assert!(!book.delete_note(&note.id).await.unwrap());

    let reopened = NoteBook::open(store, clock, Some("a.txt"), DOC).await;
    assert!(reopened.notes().is_empty());
}

#[tokio::test]
async fn test_cancel_edit_keeps_text() {
    let store = Arc::new(MemoryStore::new());
    let mut book = NoteBook::open(store, clock_at(0), None, DOC).await;
    book.set_draft("sec-1", "keep me");
    let note = book.add_note("sec-1").await.unwrap().unwrap();

    book.start_edit(&note.id);
    book.set_edit_draft("changed");
    book.cancel_edit();

    assert_eq!(book.notes()[0].text, "keep me");
    assert!(book.save_edit().await.unwrap().is_none());
    assert!(!book.start_edit("missing"));
}

#[tokio::test]
async fn test_malformed_bucket_opens_empty() {
    let store = Arc::new(MemoryStore::new());
    let key = note_bucket_key(Some("x.pdf"), DOC);
    store.set(&key, "{not json").await.unwrap();

    let book = NoteBook::open(store, clock_at(0), Some("x.pdf"), DOC).await;
    assert!(book.notes().is_empty());
}

#[tokio::test]
async fn test_notes_export_groups_by_section() {
    let store = Arc::new(MemoryStore::new());
    let mut book = NoteBook::open(store, clock_at(0), None, DOC).await;
    book.set_draft("sec-2", "on method");
    book.add_note("sec-2").await.unwrap();

    let at = DateTime::<Utc>::from_timestamp(0, 0).unwrap().naive_utc();
    let file = export_notes(book.notes(), &split_sections(DOC), at);
    assert_eq!(file.file_name, "notes_19700101-0000_notes.md");
    assert_eq!(file.contents, "# Notes\n\n## Method\n\non method\n\n");
}
