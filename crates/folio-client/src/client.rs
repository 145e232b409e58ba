//! reqwest implementation of the backend contract.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use folio_core::logging::SUBSYSTEM_API;
use folio_core::{
    defaults, AnalysisDetail, AnalysisPayload, AnalysisResult, AnalyzePayload, Collection,
    CollectionCreatedPayload, CollectionsPayload, Credentials, DocumentApi, DocumentPage, Error,
    PageRequest, QuizResponse, Result, UploadFile,
};

use crate::config::ClientConfig;
use crate::envelope::{interpret, parse_body, Envelope};

/// Successful, unwrapped response.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub payload: T,
    pub correlation_id: String,
    pub status: u16,
}

/// Request body variants.
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Form),
}

/// HTTP client for the document-analysis backend.
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = SUBSYSTEM_API,
            base_url = %config.base_url,
            timeout_secs = config.timeout_seconds,
            "Initializing API client"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Build a request with auth, language and correlation headers.
    fn build_request(
        &self,
        method: Method,
        path: &str,
        creds: &Credentials,
        request_id: &str,
    ) -> reqwest::RequestBuilder {
        let creds = self.config.resolve(creds);
        let mut req = self
            .client
            .request(method, self.url(path))
            .header("Accept", "application/json")
            .header(defaults::REQUEST_ID_HEADER, request_id);

        if let Some(ref token) = creds.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        if let Some(ref lang) = creds.lang {
            req = req.header("Accept-Language", lang);
        }

        req
    }

    /// Send a request and unwrap the envelope into `T`.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        creds: &Credentials,
        body: RequestBody,
    ) -> Result<ApiResponse<T>> {
        let request_id = Uuid::new_v4().to_string();
        let mut req = self.build_request(method.clone(), path, creds, &request_id);
        req = match body {
            RequestBody::Empty => req,
            RequestBody::Json(value) => req.json(&value),
            RequestBody::Multipart(form) => req.multipart(form),
        };

        let start = Instant::now();
        let response = req.send().await.map_err(|e| {
            warn!(subsystem = SUBSYSTEM_API, %method, path, request_id = %request_id, error = %e, "Request failed");
            Error::Request(format!("{} {} failed: {}", method, path, e))
        })?;

        let status = response.status().as_u16();
        let header_cid = response
            .headers()
            .get(defaults::REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| request_id.clone());
        let bytes = response.bytes().await.unwrap_or_default();

        debug!(
            subsystem = SUBSYSTEM_API,
            %method,
            path,
            status,
            request_id = %request_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Response received"
        );

        match interpret(status, parse_body(&bytes), &header_cid) {
            Envelope::Success {
                payload,
                correlation_id,
            } => {
                let payload = serde_json::from_value(payload).map_err(|e| {
                    Error::Serialization(format!("{} {}: unexpected payload: {}", method, path, e))
                })?;
                Ok(ApiResponse {
                    payload,
                    correlation_id,
                    status,
                })
            }
            Envelope::Failure(err) => {
                debug!(
                    subsystem = SUBSYSTEM_API,
                    status,
                    correlation_id = err.correlation_id.as_deref().unwrap_or(""),
                    error = %err.message,
                    "API error"
                );
                Err(err.into())
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, creds: &Credentials) -> Result<T> {
        Ok(self
            .send(Method::GET, path, creds, RequestBody::Empty)
            .await?
            .payload)
    }

    fn with_query(path: &str, page: PageRequest) -> String {
        let pairs = page.query_pairs();
        if pairs.is_empty() {
            return path.to_string();
        }
        let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{}?{}", path, query.join("&"))
    }
}

#[async_trait]
impl DocumentApi for ApiClient {
    async fn list_collections(&self, creds: &Credentials) -> Result<Vec<Collection>> {
        let payload: CollectionsPayload = self.get("/collections", creds).await?;
        Ok(payload.collections)
    }

    async fn create_collection(&self, name: &str, creds: &Credentials) -> Result<Collection> {
        let response: ApiResponse<CollectionCreatedPayload> = self
            .send(
                Method::POST,
                "/collections",
                creds,
                RequestBody::Json(json!({ "name": name })),
            )
            .await?;
        Ok(response.payload.collection)
    }

    async fn delete_collection(&self, id: i64, creds: &Credentials) -> Result<()> {
        self.send::<Value>(
            Method::DELETE,
            &format!("/collections/{}", id),
            creds,
            RequestBody::Empty,
        )
        .await?;
        Ok(())
    }

    async fn list_documents(
        &self,
        page: PageRequest,
        creds: &Credentials,
    ) -> Result<DocumentPage> {
        self.get(&Self::with_query("/documents", page), creds).await
    }

    async fn list_collection_documents(
        &self,
        collection_id: i64,
        page: PageRequest,
        creds: &Credentials,
    ) -> Result<DocumentPage> {
        let path = format!("/collections/{}/documents", collection_id);
        self.get(&Self::with_query(&path, page), creds).await
    }

    async fn latest_analysis(
        &self,
        document_id: i64,
        creds: &Credentials,
    ) -> Result<AnalysisDetail> {
        let payload: AnalysisPayload = self
            .get(&format!("/documents/{}/latest-analysis", document_id), creds)
            .await?;
        Ok(payload.analysis)
    }

    async fn save_document(
        &self,
        document_id: i64,
        collection_id: i64,
        creds: &Credentials,
    ) -> Result<()> {
        self.send::<Value>(
            Method::POST,
            "/documents/save",
            creds,
            RequestBody::Json(json!({
                "documentId": document_id,
                "collectionId": collection_id,
            })),
        )
        .await?;
        Ok(())
    }

    async fn analyze(
        &self,
        files: Vec<UploadFile>,
        collection_id: Option<i64>,
        creds: &Credentials,
    ) -> Result<Vec<AnalysisResult>> {
        if files.is_empty() {
            return Err(Error::InvalidInput("no files to analyze".to_string()));
        }

        let mut form = Form::new();
        for file in files {
            let mut part = Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(ref content_type) = file.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| Error::InvalidInput(format!("bad content type: {}", e)))?;
            }
            form = form.part("documents", part);
        }
        if let Some(id) = collection_id {
            form = form.text("collectionId", id.to_string());
        }

        let response: ApiResponse<AnalyzePayload> = self
            .send(Method::POST, "/analyze", creds, RequestBody::Multipart(form))
            .await?;
        Ok(response.payload.results)
    }

    async fn generate_quiz(&self, text: &str, creds: &Credentials) -> Result<QuizResponse> {
        let response: ApiResponse<QuizResponse> = self
            .send(
                Method::POST,
                "/generate-quiz",
                creds,
                RequestBody::Json(json!({ "text": text })),
            )
            .await?;
        Ok(response.payload)
    }
}
