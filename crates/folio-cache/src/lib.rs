//! # folio-cache
//!
//! Client-side data layer for folio.
//!
//! This crate provides:
//! - [`EntityCache`]: stale-while-revalidate cache of the collections and
//!   documents lists with single-flight fetches and session persistence
//! - [`DataStore`]: observable list state shared by every view, with the
//!   collection mutations that keep it consistent
//! - [`RevalidationScheduler`]: interval and focus driven background refresh
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use folio_cache::{CacheConfig, DataStore, EntityCache, RevalidationScheduler};
//!
//! let cache = EntityCache::new(api, session, CacheConfig::from_env());
//! cache.hydrate().await;
//!
//! let store = DataStore::new(cache.clone());
//! let _mirror = store.spawn_mirror();
//! let scheduler = RevalidationScheduler::new(cache).start();
//!
//! store.fetch_collections(&creds).await?;
//! println!("{} collections", store.snapshot().collections.len());
//! scheduler.shutdown().await?;
//! ```

pub mod cache;
pub mod config;
pub mod scheduler;
pub mod store;

pub use cache::{CacheEvent, EntityCache, EntityKind, FetchMode};
pub use config::CacheConfig;
pub use scheduler::{RevalidationScheduler, SchedulerHandle, Trigger};
pub use store::{DataState, DataStore};
