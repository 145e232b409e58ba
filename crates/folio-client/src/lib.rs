//! # folio-client
//!
//! HTTP client for the folio document-analysis backend.
//!
//! This crate provides:
//! - [`ApiClient`], the reqwest implementation of [`folio_core::DocumentApi`]
//! - Envelope interpretation (`{data, message, detail, correlationId}`) into
//!   an explicit success/failure result
//! - Auth, language and correlation-ID headers on every request
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_client::ApiClient;
//! use folio_core::{Credentials, DocumentApi};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = ApiClient::from_env().unwrap();
//!     let creds = Credentials::new().with_token("secret");
//!     let collections = client.list_collections(&creds).await.unwrap();
//!     println!("{} collections", collections.len());
//! }
//! ```

pub mod client;
pub mod config;
pub mod envelope;

pub use client::{ApiClient, ApiResponse, RequestBody};
pub use config::ClientConfig;
pub use envelope::Envelope;
