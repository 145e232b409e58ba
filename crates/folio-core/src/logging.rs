//! Structured logging schema for folio.
//!
//! All crates tag their events with a `subsystem` field using the values
//! below so log aggregation can slice by layer.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded operation, requires attention |
//! | WARN  | Recoverable issue, fallback applied (swallowed background errors) |
//! | INFO  | Lifecycle events (startup, shutdown), mutations |
//! | DEBUG | Cache decisions (hit, coalesce, fetch), request outcomes |
//! | TRACE | Per-item iteration (search matches, sections) |
//!
//! ## Field names
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `subsystem` | One of the constants below |
//! | `entity` | Cache entity kind (`collections`, `documents`) |
//! | `request_id` | Correlation ID sent as `X-Request-ID` |
//! | `status` | HTTP status code |
//! | `age_ms` | Age of a cache entry |
//! | `duration_ms` | Wall-clock duration |
//! | `result_count` | Items returned |
//! | `key` | Storage key |
//! | `error` | Error message |

/// HTTP API client.
pub const SUBSYSTEM_API: &str = "api";

/// Entity cache.
pub const SUBSYSTEM_CACHE: &str = "cache";

/// Reactive data store.
pub const SUBSYSTEM_STORE: &str = "store";

/// Background revalidation scheduler.
pub const SUBSYSTEM_SCHEDULER: &str = "scheduler";

/// Key-value persistence.
pub const SUBSYSTEM_STORAGE: &str = "storage";

/// Notes, search and segmentation.
pub const SUBSYSTEM_TEXT: &str = "text";
