//! In-memory backing store
//!
//! A process-local [`DocumentStore`] used by the CLI and the test suite.
//! Honors the parts of the contract the rest of the crate depends on:
//! write blocking after a freeze, per-record bulk failures for unparseable
//! range keys, and exact point-in-range search preferring the most
//! specific match. Force-merge and refresh are acknowledged no-ops since
//! there is nothing to merge in memory.

use crate::error::{GeoError, Result};
use crate::range::IpRange;
use crate::store::{
    BulkItemFailure, BulkResponse, DocumentStore, GeoDocument, IndexSettings, SettingsUpdate,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

struct IndexState {
    settings: IndexSettings,
    blocks_write: bool,
    auto_expand_replicas: bool,
    /// Documents keyed by their raw range string, with the parsed range
    /// alongside for containment scans
    documents: HashMap<String, (IpRange, GeoDocument)>,
}

/// Process-local document store
#[derive(Default)]
pub struct MemoryDocumentStore {
    indices: Mutex<HashMap<String, IndexState>>,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in an index, if it exists
    pub fn document_count(&self, name: &str) -> Option<usize> {
        self.indices
            .lock()
            .unwrap()
            .get(name)
            .map(|index| index.documents.len())
    }

    /// True when the index exists and has writes blocked
    pub fn is_write_blocked(&self, name: &str) -> bool {
        self.indices
            .lock()
            .unwrap()
            .get(name)
            .map(|index| index.blocks_write)
            .unwrap_or(false)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn index_exists(&self, name: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.indices.lock().unwrap().contains_key(name))
    }

    fn create_index(&self, name: &str, settings: IndexSettings, _timeout: Duration) -> Result<()> {
        let mut indices = self.indices.lock().unwrap();
        if indices.contains_key(name) {
            return Err(GeoError::InvalidState(format!(
                "index {} already exists",
                name
            )));
        }
        indices.insert(
            name.to_string(),
            IndexState {
                settings,
                blocks_write: false,
                auto_expand_replicas: false,
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    fn bulk_index(
        &self,
        name: &str,
        documents: &[GeoDocument],
        _timeout: Duration,
    ) -> Result<BulkResponse> {
        let mut indices = self.indices.lock().unwrap();
        let index = indices
            .get_mut(name)
            .ok_or_else(|| GeoError::StoreUnavailable(format!("no such index: {}", name)))?;
        if index.blocks_write {
            return Err(GeoError::InvalidState(format!(
                "index {} has writes blocked",
                name
            )));
        }
        let mut failures = Vec::new();
        for doc in documents {
            match IpRange::parse(&doc.range) {
                Ok(range) => {
                    index
                        .documents
                        .insert(doc.range.clone(), (range, doc.clone()));
                }
                Err(err) => failures.push(BulkItemFailure {
                    id: doc.range.clone(),
                    message: err.to_string(),
                }),
            }
        }
        Ok(BulkResponse { failures })
    }

    fn search_ranges(
        &self,
        name: &str,
        addrs: &[IpAddr],
        max_hits: usize,
        _timeout: Duration,
    ) -> Result<Vec<GeoDocument>> {
        let indices = self.indices.lock().unwrap();
        let index = match indices.get(name) {
            Some(index) => index,
            // Index not found is "no data yet", never an error for search
            None => return Ok(Vec::new()),
        };
        let mut hits: Vec<GeoDocument> = Vec::new();
        for &addr in addrs {
            let best = index
                .documents
                .values()
                .filter(|(range, _)| range.contains(addr))
                .max_by_key(|(range, _)| range.specificity());
            if let Some((_, doc)) = best {
                if !hits.iter().any(|h| h.range == doc.range) {
                    hits.push(doc.clone());
                }
            }
            if hits.len() >= max_hits {
                break;
            }
        }
        Ok(hits)
    }

    fn delete_index(&self, name: &str, _timeout: Duration) -> Result<()> {
        self.indices.lock().unwrap().remove(name);
        Ok(())
    }

    fn force_merge(&self, name: &str, _max_segments: u32, _timeout: Duration) -> Result<()> {
        self.require_index(name)
    }

    fn refresh(&self, name: &str, _timeout: Duration) -> Result<()> {
        self.require_index(name)
    }

    fn update_settings(&self, name: &str, update: SettingsUpdate, _timeout: Duration) -> Result<()> {
        let mut indices = self.indices.lock().unwrap();
        let index = indices
            .get_mut(name)
            .ok_or_else(|| GeoError::StoreUnavailable(format!("no such index: {}", name)))?;
        if let Some(expand) = update.auto_expand_replicas {
            index.auto_expand_replicas = expand;
        }
        if let Some(blocked) = update.blocks_write {
            index.blocks_write = blocked;
        }
        if let Some(refresh) = update.refresh_enabled {
            index.settings.refresh_enabled = refresh;
        }
        Ok(())
    }
}

impl MemoryDocumentStore {
    fn require_index(&self, name: &str) -> Result<()> {
        if self.indices.lock().unwrap().contains_key(name) {
            Ok(())
        } else {
            Err(GeoError::StoreUnavailable(format!(
                "no such index: {}",
                name
            )))
        }
    }
}
