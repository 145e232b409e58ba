//! Markdown export of notes and summaries.

use chrono::NaiveDateTime;

use folio_core::defaults::EXPORT_BASE_MAX_CHARS;
use folio_core::{Note, TextSection};

/// A rendered export ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

/// `{base}_{YYYYMMDD-HHMM}_{kind}.{ext}` with the base sanitized to
/// `[A-Za-z0-9_-]` and capped in length.
///
/// ```
/// use chrono::NaiveDate;
/// use folio_text::export::export_file_name;
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap().and_hms_opt(9, 5, 0).unwrap();
/// assert_eq!(
///     export_file_name("my report", "summary", "md", at),
///     "my_report_20240307-0905_summary.md"
/// );
/// ```
pub fn export_file_name(base: &str, kind: &str, ext: &str, at: NaiveDateTime) -> String {
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(EXPORT_BASE_MAX_CHARS)
        .collect();
    let safe = if safe.is_empty() { "export".to_string() } else { safe };
    format!("{}_{}_{}.{}", safe, at.format("%Y%m%d-%H%M"), kind, ext)
}

/// Notes grouped under their section titles, in section order. Sections
/// without notes are skipped.
pub fn notes_markdown(notes: &[Note], sections: &[TextSection]) -> String {
    let mut out = String::from("# Notes\n\n");
    if notes.is_empty() {
        out.push_str("No notes yet.\n");
        return out;
    }

    for section in sections {
        let section_notes: Vec<&Note> = notes
            .iter()
            .filter(|n| n.section_id == section.id)
            .collect();
        if section_notes.is_empty() {
            continue;
        }
        out.push_str(&format!("## {}\n\n", section.title));
        for note in section_notes {
            out.push_str(note.text.trim_end());
            out.push_str("\n\n");
        }
    }
    out
}

/// Summary document: title, summary body and optional sentiment line.
/// Summaries written as `• ` bullet lines become a Markdown list.
pub fn summary_markdown(title: &str, summary: &str, sentiment: Option<&str>) -> String {
    let mut out = format!("# {}\n\n## Summary\n\n", title);

    if summary.starts_with("• ") {
        for line in summary.split('\n') {
            let item = line.strip_prefix('•').unwrap_or(line);
            let item = item
                .strip_prefix(|c: char| c.is_whitespace())
                .unwrap_or(item);
            out.push_str(&format!("- {}\n", item));
        }
    } else {
        let paragraphs: Vec<&str> = summary.split('\n').filter(|p| !p.is_empty()).collect();
        out.push_str(&paragraphs.join("\n\n"));
        out.push('\n');
    }

    if let Some(sentiment) = sentiment.filter(|s| !s.is_empty()) {
        out.push_str(&format!("\nSentiment: {}\n", sentiment));
    }
    out
}

/// Export the notes of a document.
pub fn export_notes(notes: &[Note], sections: &[TextSection], at: NaiveDateTime) -> ExportFile {
    ExportFile {
        file_name: export_file_name("notes", "notes", "md", at),
        contents: notes_markdown(notes, sections),
    }
}

/// Export the summary of an analyzed file. The export is named after the
/// file without its extension.
pub fn export_summary(
    file_name: &str,
    summary: &str,
    sentiment: Option<&str>,
    at: NaiveDateTime,
) -> ExportFile {
    let base = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ if file_name.is_empty() => "summary",
        _ => file_name,
    };
    ExportFile {
        file_name: export_file_name(base, "summary", "md", at),
        contents: summary_markdown(file_name, summary, sentiment),
    }
}
