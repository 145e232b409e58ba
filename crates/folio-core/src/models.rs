//! Data models for folio.
//!
//! Wire names follow the backend's camelCase JSON contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// CREDENTIALS / REQUESTS
// =============================================================================

/// Per-call authentication and locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token (omitted from requests when `None`).
    pub token: Option<String>,
    /// Preferred language sent as `Accept-Language`.
    pub lang: Option<String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// Limit/offset pagination for list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageRequest {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Query-string pairs, skipping unset values.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

/// A file submitted for analysis.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

// =============================================================================
// COLLECTIONS / DOCUMENTS
// =============================================================================

/// A user-defined group of documents. `id` is server-assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub name: String,
    #[serde(rename = "documents", default)]
    pub document_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// An analyzed document as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub id: i64,
    pub file_name: String,
    #[serde(rename = "analysesCount", default)]
    pub analysis_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
}

/// One page of documents plus the unpaginated total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    #[serde(default)]
    pub items: Vec<DocumentItem>,
    #[serde(default)]
    pub total: i64,
}

// =============================================================================
// ANALYSIS
// =============================================================================

/// Analysis body returned for a single uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub sentiment: String,
    #[serde(default)]
    pub full_text: String,
}

/// Per-file outcome of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
}

/// Most recent analysis stored for a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetail {
    pub analysis_id: i64,
    pub document_id: i64,
    pub file_name: String,
    pub summary: String,
    pub sentiment: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub full_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizResponse {
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
}

// =============================================================================
// ENVELOPE PAYLOADS
// =============================================================================

/// `GET /collections`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionsPayload {
    #[serde(default)]
    pub collections: Vec<Collection>,
}

/// `POST /collections`
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionCreatedPayload {
    pub collection: Collection,
    #[serde(default)]
    pub message: String,
}

/// Mutations answering with a bare message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub message: String,
}

/// `GET /documents/{id}/latest-analysis`
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisPayload {
    pub analysis: AnalysisDetail,
}

/// `POST /analyze`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzePayload {
    #[serde(default)]
    pub results: Vec<AnalysisResult>,
}

// =============================================================================
// TEXT / NOTES
// =============================================================================

/// A navigable block of a document body. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSection {
    /// Positional identifier, `sec-1`, `sec-2`, ...
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A user annotation anchored to a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Creation timestamp in milliseconds, as a string.
    pub id: String,
    pub section_id: String,
    pub text: String,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}
