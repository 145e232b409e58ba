//! Reactive data store shared by every view.
//!
//! [`DataStore`] mirrors the entity cache into a single [`DataState`]
//! published on a `tokio::sync::watch` channel. Views subscribe and re-render
//! on change; mutations go through the store so every subscriber sees the
//! same lists.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use folio_core::logging::SUBSYSTEM_STORE;
use folio_core::{Collection, Credentials, DocumentItem, DocumentPage, PageRequest, Result};

use crate::cache::{CacheEvent, EntityCache, EntityKind, FetchMode};

/// Observable state of the collection and document lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataState {
    pub collections: Vec<Collection>,
    pub documents: Vec<DocumentItem>,
    /// Unpaginated document count reported by the backend.
    pub documents_total: i64,
    pub loading_collections: bool,
    pub loading_documents: bool,
    pub error_collections: Option<String>,
    pub error_documents: Option<String>,
    /// Collection filter of the document grid. `None` shows all documents.
    pub active_collection: Option<i64>,
}

impl DataState {
    /// Documents passing the active collection filter.
    pub fn visible_documents(&self) -> Vec<DocumentItem> {
        match self.active_collection {
            None => self.documents.clone(),
            Some(id) => self
                .documents
                .iter()
                .filter(|d| d.collection_id == Some(id))
                .cloned()
                .collect(),
        }
    }

    /// The active collection, if it is in the list.
    pub fn active_collection(&self) -> Option<&Collection> {
        let id = self.active_collection?;
        self.collections.iter().find(|c| c.id == id)
    }
}

/// Store handle. Clones share state.
#[derive(Clone)]
pub struct DataStore {
    cache: EntityCache,
    state: Arc<watch::Sender<DataState>>,
}

impl DataStore {
    pub fn new(cache: EntityCache) -> Self {
        let (state, _) = watch::channel(DataState::default());
        Self {
            cache,
            state: Arc::new(state),
        }
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<DataState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DataState {
        self.state.borrow().clone()
    }

    /// Load collections. Does nothing while a load is already running.
    pub async fn fetch_collections(&self, creds: &Credentials) -> Result<()> {
        let started = self.state.send_if_modified(|s| {
            if s.loading_collections {
                return false;
            }
            s.loading_collections = true;
            s.error_collections = None;
            true
        });
        if !started {
            debug!(subsystem = SUBSYSTEM_STORE, entity = "collections", "Load already running");
            return Ok(());
        }

        match self.cache.collections(creds, FetchMode::Cached).await {
            Ok(list) => {
                self.state.send_modify(|s| {
                    s.collections = list.as_ref().clone();
                    s.loading_collections = false;
                });
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.collections.clear();
                    s.error_collections = Some(message);
                    s.loading_collections = false;
                });
                Err(e)
            }
        }
    }

    /// Load documents. Does nothing while a load is already running.
    pub async fn fetch_documents(&self, creds: &Credentials) -> Result<()> {
        let started = self.state.send_if_modified(|s| {
            if s.loading_documents {
                return false;
            }
            s.loading_documents = true;
            s.error_documents = None;
            true
        });
        if !started {
            debug!(subsystem = SUBSYSTEM_STORE, entity = "documents", "Load already running");
            return Ok(());
        }

        match self.cache.documents(creds, FetchMode::Cached).await {
            Ok(page) => {
                self.state.send_modify(|s| {
                    s.documents = page.items.clone();
                    s.documents_total = page.total;
                    s.loading_documents = false;
                });
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.documents.clear();
                    s.documents_total = 0;
                    s.error_documents = Some(message);
                    s.loading_documents = false;
                });
                Err(e)
            }
        }
    }

    /// Create a collection and put it at the head of the list.
    pub async fn create_collection(&self, name: &str, creds: &Credentials) -> Result<Collection> {
        let created = self.cache.api().create_collection(name, creds).await?;
        info!(subsystem = SUBSYSTEM_STORE, collection_id = created.id, "Collection created");

        self.cache.invalidate(EntityKind::Collections).await;
        self.state.send_modify(|s| {
            s.collections.retain(|c| c.id != created.id);
            s.collections.insert(0, created.clone());
        });
        Ok(created)
    }

    /// Delete a collection, clear it as a filter, and reload both lists.
    pub async fn delete_collection(&self, id: i64, creds: &Credentials) -> Result<()> {
        self.cache.api().delete_collection(id, creds).await?;
        info!(subsystem = SUBSYSTEM_STORE, collection_id = id, "Collection deleted");

        self.state.send_if_modified(|s| {
            if s.active_collection == Some(id) {
                s.active_collection = None;
                true
            } else {
                false
            }
        });

        self.cache.invalidate(EntityKind::Collections).await;
        self.cache.invalidate(EntityKind::Documents).await;
        let (collections, documents) =
            tokio::join!(self.fetch_collections(creds), self.fetch_documents(creds));
        collections?;
        documents
    }

    /// Associate a document with a collection and reload documents.
    pub async fn save_document_to_collection(
        &self,
        document_id: i64,
        collection_id: i64,
        creds: &Credentials,
    ) -> Result<()> {
        self.cache
            .api()
            .save_document(document_id, collection_id, creds)
            .await?;
        info!(
            subsystem = SUBSYSTEM_STORE,
            document_id, collection_id, "Document saved to collection"
        );

        self.cache.invalidate(EntityKind::Documents).await;
        self.fetch_documents(creds).await
    }

    /// Every document of one collection, read page by page from the server.
    /// Not cached: the cached documents list only holds the first page.
    pub async fn collection_documents(
        &self,
        collection_id: i64,
        creds: &Credentials,
    ) -> Result<DocumentPage> {
        let limit = self.cache.config().documents_page_limit;
        let api = self.cache.api();
        let mut items: Vec<DocumentItem> = Vec::new();
        let mut total;

        loop {
            let offset = items.len() as i64;
            let page = api
                .list_collection_documents(collection_id, PageRequest::new(limit, offset), creds)
                .await?;
            total = page.total;
            let received = page.items.len();
            items.extend(page.items);
            if received == 0 || items.len() as i64 >= total {
                break;
            }
        }

        debug!(
            subsystem = SUBSYSTEM_STORE,
            collection_id,
            result_count = items.len(),
            "Collection documents loaded"
        );
        Ok(DocumentPage { items, total })
    }

    /// Set the collection filter of the document grid.
    pub fn select_collection(&self, id: Option<i64>) {
        self.state.send_if_modified(|s| {
            if s.active_collection == id {
                return false;
            }
            s.active_collection = id;
            true
        });
    }

    /// Documents passing the active filter.
    pub fn visible_documents(&self) -> Vec<DocumentItem> {
        self.state.borrow().visible_documents()
    }

    /// Copy background cache refreshes into the store. The task runs until
    /// aborted.
    pub fn spawn_mirror(&self) -> JoinHandle<()> {
        let store = self.clone();
        let mut events = self.cache.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(CacheEvent::Refreshed(kind)) => store.apply_refresh(kind),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(subsystem = SUBSYSTEM_STORE, skipped, "Mirror lagged, resyncing");
                        store.apply_refresh(EntityKind::Collections);
                        store.apply_refresh(EntityKind::Documents);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn apply_refresh(&self, kind: EntityKind) {
        match kind {
            EntityKind::Collections => {
                if let Some(list) = self.cache.peek_collections() {
                    self.state.send_modify(|s| {
                        s.collections = list.as_ref().clone();
                        s.error_collections = None;
                    });
                }
            }
            EntityKind::Documents => {
                if let Some(page) = self.cache.peek_documents() {
                    self.state.send_modify(|s| {
                        s.documents = page.items.clone();
                        s.documents_total = page.total;
                        s.error_documents = None;
                    });
                }
            }
        }
        debug!(subsystem = SUBSYSTEM_STORE, entity = %kind, "Mirrored cache refresh");
    }
}
