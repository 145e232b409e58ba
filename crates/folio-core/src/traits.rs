//! Core traits for folio abstractions.
//!
//! The backend is an external collaborator; everything above the HTTP client
//! talks to it through [`DocumentApi`] so the cache and store can be driven
//! by a mock in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

/// The document-analysis backend contract.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// `GET /collections`
    async fn list_collections(&self, creds: &Credentials) -> Result<Vec<Collection>>;

    /// `POST /collections`
    async fn create_collection(&self, name: &str, creds: &Credentials) -> Result<Collection>;

    /// `DELETE /collections/{id}`
    async fn delete_collection(&self, id: i64, creds: &Credentials) -> Result<()>;

    /// `GET /documents?limit&offset`
    async fn list_documents(&self, page: PageRequest, creds: &Credentials)
        -> Result<DocumentPage>;

    /// `GET /collections/{id}/documents?limit&offset`
    async fn list_collection_documents(
        &self,
        collection_id: i64,
        page: PageRequest,
        creds: &Credentials,
    ) -> Result<DocumentPage>;

    /// `GET /documents/{id}/latest-analysis`
    async fn latest_analysis(&self, document_id: i64, creds: &Credentials)
        -> Result<AnalysisDetail>;

    /// `POST /documents/save`
    async fn save_document(
        &self,
        document_id: i64,
        collection_id: i64,
        creds: &Credentials,
    ) -> Result<()>;

    /// `POST /analyze` (multipart)
    async fn analyze(
        &self,
        files: Vec<UploadFile>,
        collection_id: Option<i64>,
        creds: &Credentials,
    ) -> Result<Vec<AnalysisResult>>;

    /// `POST /generate-quiz`
    async fn generate_quiz(&self, text: &str, creds: &Credentials) -> Result<QuizResponse>;
}
