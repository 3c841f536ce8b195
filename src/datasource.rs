//! Datasource records and the metadata snapshot cache
//!
//! A datasource is a named, independently refreshed source of
//! IP-to-geolocation data with its own backing index generation. The
//! authoritative records live in the backing store behind the
//! [`DatasourceRepository`] trait; this module caches the small per-name
//! metadata slice {current index name, expiration, state} that the
//! enrichment path needs on every lookup.
//!
//! The cache publishes complete snapshots through an atomic reference swap,
//! so readers never observe a torn map. Building is double-checked: a
//! lock-free read first, then a re-check under the build mutex before
//! rebuilding from the repository. Any write observation that cannot be
//! reconciled incrementally invalidates the whole snapshot; the next access
//! rebuilds it in one round trip.
//!
//! Exactly one instance should exist per process. A second instance would
//! maintain an independent, possibly divergent view and silently defeat
//! caching, so the composition root constructs it once and hands out `Arc`s.

use crate::error::Result;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Lifecycle state of a datasource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasourceState {
    /// First load is still running
    Creating,
    /// Current index generation is ready for lookups
    Available,
    /// A refresh is replacing the index generation
    Updating,
    /// Deletion was requested but failed part-way
    DeleteFailed,
    /// Load or refresh failed
    Failed,
}

/// Authoritative persisted datasource record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasourceRecord {
    /// Logical datasource name
    pub name: String,
    /// Name of the current backing data index
    pub current_index_name: String,
    /// Instant after which the data is considered stale
    pub expiration: SystemTime,
    /// Lifecycle state
    pub state: DatasourceState,
    /// Column names of the ingested source, range key first
    pub field_list: Vec<String>,
}

/// The cached per-datasource slice
#[derive(Debug, Clone, PartialEq)]
pub struct DatasourceMetadata {
    /// Current backing index name
    pub index_name: String,
    /// Expiration instant
    pub expiration: SystemTime,
    /// Lifecycle state
    pub state: DatasourceState,
}

impl From<&DatasourceRecord> for DatasourceMetadata {
    fn from(record: &DatasourceRecord) -> Self {
        Self {
            index_name: record.current_index_name.clone(),
            expiration: record.expiration,
            state: record.state,
        }
    }
}

/// Authoritative datasource record store boundary.
///
/// Absence is data: a missing record is `Ok(None)` and a missing backing
/// index means "no datasources yet", an empty list.
pub trait DatasourceRepository {
    /// Fetch one record by name
    fn get(&self, name: &str) -> Result<Option<DatasourceRecord>>;

    /// Fetch every record
    fn get_all(&self) -> Result<Vec<DatasourceRecord>>;
}

impl<R: DatasourceRepository + ?Sized> DatasourceRepository for Arc<R> {
    fn get(&self, name: &str) -> Result<Option<DatasourceRecord>> {
        (**self).get(name)
    }

    fn get_all(&self) -> Result<Vec<DatasourceRecord>> {
        (**self).get_all()
    }
}

type Snapshot = HashMap<String, DatasourceMetadata>;

/// Second-level cache mapping datasource name to its metadata slice
pub struct DatasourceMetadataCache<R> {
    repository: R,
    snapshot: ArcSwapOption<Snapshot>,
    build_lock: Mutex<()>,
}

impl<R: DatasourceRepository> DatasourceMetadataCache<R> {
    /// Create an empty cache over the authoritative repository
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            snapshot: ArcSwapOption::empty(),
            build_lock: Mutex::new(()),
        }
    }

    /// The current complete snapshot, building it lazily on first access.
    ///
    /// Fast path is a lock-free load. On empty, the build mutex is taken
    /// and the snapshot re-checked before rebuilding, so concurrent callers
    /// trigger at most one repository round trip.
    pub fn current(&self) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.snapshot.load_full() {
            return Ok(snapshot);
        }
        let _guard = self.build_lock.lock().unwrap();
        if let Some(snapshot) = self.snapshot.load_full() {
            return Ok(snapshot);
        }
        let records = self.repository.get_all()?;
        let snapshot: Arc<Snapshot> = Arc::new(
            records
                .iter()
                .map(|record| (record.name.clone(), DatasourceMetadata::from(record)))
                .collect(),
        );
        self.snapshot.store(Some(snapshot.clone()));
        Ok(snapshot)
    }

    /// Drop the snapshot wholesale; the next access rebuilds it
    pub fn invalidate(&self) {
        self.snapshot.store(None);
    }

    /// Current backing index name for a datasource.
    ///
    /// A snapshot miss forces one on-demand refresh of just that record,
    /// bounding staleness to one round trip behind the repository.
    pub fn index_name(&self, name: &str) -> Result<Option<String>> {
        if let Some(meta) = self.current()?.get(name) {
            return Ok(Some(meta.index_name.clone()));
        }
        Ok(self.refresh_one(name)?.map(|meta| meta.index_name))
    }

    /// Whether the datasource's data is past its expiration instant.
    ///
    /// An absent or already-expired entry is re-read from the repository
    /// before deriving the answer; a datasource missing even there counts
    /// as expired.
    pub fn is_expired(&self, name: &str) -> Result<bool> {
        let now = SystemTime::now();
        if let Some(meta) = self.current()?.get(name) {
            if meta.expiration > now {
                return Ok(false);
            }
        }
        match self.refresh_one(name)? {
            Some(meta) => Ok(meta.expiration <= now),
            None => Ok(true),
        }
    }

    /// Lifecycle state of a datasource, refreshing on a snapshot miss
    pub fn state(&self, name: &str) -> Result<Option<DatasourceState>> {
        if let Some(meta) = self.current()?.get(name) {
            return Ok(Some(meta.state));
        }
        Ok(self.refresh_one(name)?.map(|meta| meta.state))
    }

    /// Whether a datasource exists, refreshing on a snapshot miss
    pub fn has(&self, name: &str) -> Result<bool> {
        if self.current()?.contains_key(name) {
            return Ok(true);
        }
        Ok(self.refresh_one(name)?.is_some())
    }

    /// A write to the authoritative record was observed: update exactly
    /// that datasource's entry. No-op while the snapshot is empty, since
    /// the next access rebuilds from scratch anyway.
    pub fn observe_index(&self, record: &DatasourceRecord) {
        let _guard = self.build_lock.lock().unwrap();
        if let Some(current) = self.snapshot.load_full() {
            let mut next = (*current).clone();
            next.insert(record.name.clone(), DatasourceMetadata::from(record));
            self.snapshot.store(Some(Arc::new(next)));
        }
    }

    /// A delete of the authoritative record was observed: remove exactly
    /// that datasource's entry.
    pub fn observe_delete(&self, name: &str) {
        let _guard = self.build_lock.lock().unwrap();
        if let Some(current) = self.snapshot.load_full() {
            let mut next = (*current).clone();
            next.remove(name);
            self.snapshot.store(Some(Arc::new(next)));
        }
    }

    /// A write observation could not be reconciled (failed operation or
    /// unparseable document body): when in doubt, force a full rebuild.
    pub fn observe_failure(&self) {
        self.invalidate();
    }

    /// Re-read one record from the repository and fold it into the
    /// published snapshot
    fn refresh_one(&self, name: &str) -> Result<Option<DatasourceMetadata>> {
        let record = self.repository.get(name)?;
        let _guard = self.build_lock.lock().unwrap();
        if let Some(current) = self.snapshot.load_full() {
            let mut next = (*current).clone();
            match &record {
                Some(record) => {
                    next.insert(record.name.clone(), DatasourceMetadata::from(record));
                }
                None => {
                    next.remove(name);
                }
            }
            self.snapshot.store(Some(Arc::new(next)));
        }
        Ok(record.as_ref().map(DatasourceMetadata::from))
    }
}
