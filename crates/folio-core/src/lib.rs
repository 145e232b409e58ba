//! # folio-core
//!
//! Core types, traits, and storage abstractions for the folio document client.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other folio crates depend on: the backend payload models, the
//! shared error type, the [`DocumentApi`] seam consumed by the cache layer,
//! and the key-value storage used for session and durable persistence.

pub mod clock;
pub mod defaults;
pub mod error;
pub mod logging;
#[cfg(feature = "mock")]
pub mod mock;
pub mod models;
pub mod storage;
pub mod traits;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ApiError, Error, Result};
pub use models::*;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use traits::*;
