//! Mock backend for deterministic testing.
//!
//! Keeps collections and documents in memory, simulates the server-side
//! effects of mutations, records call counts per operation, and can inject
//! latency or failures.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_core::mock::{MockDocumentApi, MockOp};
//!
//! let api = MockDocumentApi::new()
//!     .with_collection(1, "Papers")
//!     .with_latency(std::time::Duration::from_millis(50));
//!
//! api.fail_next(MockOp::ListCollections, 503);
//! assert_eq!(api.calls(MockOp::ListCollections), 0);
//! ```

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::traits::DocumentApi;

/// Operations of the backend contract, for call counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    ListCollections,
    CreateCollection,
    DeleteCollection,
    ListDocuments,
    ListCollectionDocuments,
    LatestAnalysis,
    SaveDocument,
    Analyze,
    GenerateQuiz,
}

#[derive(Debug, Default)]
struct MockState {
    collections: Vec<Collection>,
    documents: Vec<DocumentItem>,
    analyses: HashMap<i64, AnalysisDetail>,
    next_id: i64,
    calls: HashMap<MockOp, usize>,
    failures: HashMap<MockOp, Vec<u16>>,
    latency: Duration,
}

/// In-memory implementation of [`DocumentApi`].
#[derive(Clone, Default)]
pub struct MockDocumentApi {
    state: Arc<Mutex<MockState>>,
}

impl MockDocumentApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.lock().next_id = 1000;
        api
    }

    /// Seed a collection.
    pub fn with_collection(self, id: i64, name: &str) -> Self {
        self.lock().collections.push(Collection {
            id,
            name: name.to_string(),
            document_count: 0,
            created_at: None,
        });
        self
    }

    /// Seed a document, optionally inside a collection.
    pub fn with_document(self, id: i64, file_name: &str, collection_id: Option<i64>) -> Self {
        self.lock().documents.push(DocumentItem {
            id,
            file_name: file_name.to_string(),
            analysis_count: 1,
            last_analysis_at: None,
            collection_id,
        });
        self
    }

    /// Seed the latest analysis of a document.
    pub fn with_analysis(self, analysis: AnalysisDetail) -> Self {
        self.lock().analyses.insert(analysis.document_id, analysis);
        self
    }

    /// Delay every call by `latency` (uses tokio time, so paused-clock tests
    /// auto-advance).
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Make the next call of `op` fail with `status`. Repeated calls queue
    /// further failures.
    pub fn fail_next(&self, op: MockOp, status: u16) {
        self.lock().failures.entry(op).or_default().push(status);
    }

    /// Number of calls received for `op`.
    pub fn calls(&self, op: MockOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// ID handed to the next created collection or uploaded document.
    pub fn set_next_id(&self, id: i64) {
        self.lock().next_id = id - 1;
    }

    /// Rename a collection server-side without going through the API.
    pub fn rename_collection(&self, id: i64, name: &str) {
        if let Some(c) = self.lock().collections.iter_mut().find(|c| c.id == id) {
            c.name = name.to_string();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call, wait out the latency, then apply any queued failure.
    async fn enter(&self, op: MockOp) -> Result<()> {
        let latency = {
            let mut state = self.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failure = {
            let mut state = self.lock();
            state.failures.get_mut(&op).and_then(|queue| {
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            })
        };

        match failure {
            Some(status) => Err(ApiError::new(status, format!("HTTP {}", status))
                .with_correlation_id("mock-correlation")
                .into()),
            None => Ok(()),
        }
    }

    fn page(items: Vec<DocumentItem>, page: PageRequest) -> DocumentPage {
        let total = items.len() as i64;
        let offset = page.offset.unwrap_or(0).clamp(0, total) as usize;
        let limit = page.limit.unwrap_or(total).max(0) as usize;
        DocumentPage {
            items: items.into_iter().skip(offset).take(limit).collect(),
            total,
        }
    }
}

#[async_trait]
impl DocumentApi for MockDocumentApi {
    async fn list_collections(&self, _creds: &Credentials) -> Result<Vec<Collection>> {
        self.enter(MockOp::ListCollections).await?;
        let state = self.lock();
        Ok(state
            .collections
            .iter()
            .map(|c| Collection {
                document_count: state
                    .documents
                    .iter()
                    .filter(|d| d.collection_id == Some(c.id))
                    .count() as i64,
                ..c.clone()
            })
            .collect())
    }

    async fn create_collection(&self, name: &str, _creds: &Credentials) -> Result<Collection> {
        self.enter(MockOp::CreateCollection).await?;
        let mut state = self.lock();
        state.next_id += 1;
        let collection = Collection {
            id: state.next_id,
            name: name.to_string(),
            document_count: 0,
            created_at: Some(Utc::now()),
        };
        state.collections.push(collection.clone());
        Ok(collection)
    }

    async fn delete_collection(&self, id: i64, _creds: &Credentials) -> Result<()> {
        self.enter(MockOp::DeleteCollection).await?;
        let mut state = self.lock();
        let before = state.collections.len();
        state.collections.retain(|c| c.id != id);
        if state.collections.len() == before {
            return Err(ApiError::new(404, "Collection not found").into());
        }
        for doc in state.documents.iter_mut() {
            if doc.collection_id == Some(id) {
                doc.collection_id = None;
            }
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        page: PageRequest,
        _creds: &Credentials,
    ) -> Result<DocumentPage> {
        self.enter(MockOp::ListDocuments).await?;
        let items = self.lock().documents.clone();
        Ok(Self::page(items, page))
    }

    async fn list_collection_documents(
        &self,
        collection_id: i64,
        page: PageRequest,
        _creds: &Credentials,
    ) -> Result<DocumentPage> {
        self.enter(MockOp::ListCollectionDocuments).await?;
        let items = self
            .lock()
            .documents
            .iter()
            .filter(|d| d.collection_id == Some(collection_id))
            .cloned()
            .collect();
        Ok(Self::page(items, page))
    }

    async fn latest_analysis(
        &self,
        document_id: i64,
        _creds: &Credentials,
    ) -> Result<AnalysisDetail> {
        self.enter(MockOp::LatestAnalysis).await?;
        self.lock()
            .analyses
            .get(&document_id)
            .cloned()
            .ok_or_else(|| ApiError::new(404, "Analysis not found").into())
    }

    async fn save_document(
        &self,
        document_id: i64,
        collection_id: i64,
        _creds: &Credentials,
    ) -> Result<()> {
        self.enter(MockOp::SaveDocument).await?;
        let mut state = self.lock();
        if !state.collections.iter().any(|c| c.id == collection_id) {
            return Err(ApiError::new(404, "Collection not found").into());
        }
        match state.documents.iter_mut().find(|d| d.id == document_id) {
            Some(doc) => {
                doc.collection_id = Some(collection_id);
                Ok(())
            }
            None => Err(ApiError::new(404, "Document not found").into()),
        }
    }

    async fn analyze(
        &self,
        files: Vec<UploadFile>,
        collection_id: Option<i64>,
        _creds: &Credentials,
    ) -> Result<Vec<AnalysisResult>> {
        self.enter(MockOp::Analyze).await?;
        let mut state = self.lock();
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            state.next_id += 1;
            let id = state.next_id;
            let text = String::from_utf8_lossy(&file.bytes).into_owned();
            state.documents.push(DocumentItem {
                id,
                file_name: file.file_name.clone(),
                analysis_count: 1,
                last_analysis_at: Some(Utc::now()),
                collection_id,
            });
            results.push(AnalysisResult {
                file_name: file.file_name,
                data: Some(AnalysisData {
                    summary: text.lines().next().unwrap_or_default().to_string(),
                    keywords: Vec::new(),
                    sentiment: "neutral".to_string(),
                    full_text: text,
                }),
                error: None,
                reused: Some(false),
                batch_id: None,
                batch_size: None,
            });
        }
        Ok(results)
    }

    async fn generate_quiz(&self, text: &str, _creds: &Credentials) -> Result<QuizResponse> {
        self.enter(MockOp::GenerateQuiz).await?;
        Ok(QuizResponse {
            quiz: vec![QuizQuestion {
                question: format!("What is the first word of \"{}\"?", text),
                answer: text.split_whitespace().next().unwrap_or_default().to_string(),
                options: None,
            }],
        })
    }
}
