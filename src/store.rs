//! IP-range-keyed geolocation store
//!
//! [`GeoRangeStore`] owns the load/lookup contract against a backing
//! document store: create-if-absent with write-optimized settings, bulk
//! loading in fixed-size batches with per-record lock renewal, a one-time
//! freeze into read-optimized settings, and exact point-in-range lookups.
//!
//! The backing store itself sits behind the [`DocumentStore`] trait. Every
//! call is blocking from this crate's point of view and takes the
//! caller-supplied timeout; retry policy belongs to the caller, never this
//! layer.

use crate::error::{GeoError, Result};
use crate::range::IpRange;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

/// Attribute mapping attached to one range record
pub type GeoAttributes = HashMap<String, String>;

/// Naming prefix for datasource-backed data indices.
///
/// `delete_indices` refuses to touch anything outside this prefix so that
/// unrelated indices can never be deleted through this code path.
pub const DATA_INDEX_PREFIX: &str = ".geo-range-data.";

/// Records per bulk round trip. Balances per-request overhead against
/// worst-case memory and latency per batch.
pub const BULK_BATCH_SIZE: usize = 128;

/// One stored record: the raw range key (which doubles as the document id)
/// plus its attribute mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoDocument {
    /// Raw CIDR-or-exact range key; also the document identifier
    pub range: String,
    /// Attribute fields; blank source values are never stored
    pub attributes: GeoAttributes,
}

/// Index settings at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Primary shard count
    pub shards: u32,
    /// Replica count
    pub replicas: u32,
    /// Whether periodic refresh is enabled
    pub refresh_enabled: bool,
    /// Whether the index is hidden from wildcard expansion
    pub hidden: bool,
}

impl IndexSettings {
    /// Write-optimized settings used for bulk loads: one shard, no
    /// replicas, refresh disabled, hidden. Widened only by the freeze step
    /// once the load completes.
    pub fn bulk_load() -> Self {
        Self {
            shards: 1,
            replicas: 0,
            refresh_enabled: false,
            hidden: true,
        }
    }
}

/// Settings flipped after load; `None` fields are left untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    /// Expand replicas to all nodes
    pub auto_expand_replicas: Option<bool>,
    /// Block writes
    pub blocks_write: Option<bool>,
    /// Enable or disable refresh
    pub refresh_enabled: Option<bool>,
}

/// Per-record failure from a bulk write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// Document id of the failed record
    pub id: String,
    /// Store-reported failure message
    pub message: String,
}

/// Outcome of one bulk write; an empty failure list means full success
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Failures, one per failed record
    pub failures: Vec<BulkItemFailure>,
}

impl BulkResponse {
    /// True when at least one record failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Backing document store boundary.
///
/// Implementations are expected to block the calling thread until the
/// operation completes or the timeout elapses, surfacing the latter as
/// [`GeoError::StoreUnavailable`]. Absence of an index or document is data
/// for search operations, not an error.
pub trait DocumentStore {
    /// True when the store already reports the index
    fn index_exists(&self, name: &str, timeout: Duration) -> Result<bool>;

    /// Create an index with the given settings
    fn create_index(&self, name: &str, settings: IndexSettings, timeout: Duration) -> Result<()>;

    /// Write a batch of documents, keyed by their range string
    fn bulk_index(
        &self,
        name: &str,
        documents: &[GeoDocument],
        timeout: Duration,
    ) -> Result<BulkResponse>;

    /// Exact point-in-range query: return documents whose range contains
    /// at least one of the addresses, capped at `max_hits`. A missing
    /// index yields an empty result. Data indices are immutable after the
    /// freeze, so implementations are free to prefer local shards and
    /// cache request results.
    fn search_ranges(
        &self,
        name: &str,
        addrs: &[IpAddr],
        max_hits: usize,
        timeout: Duration,
    ) -> Result<Vec<GeoDocument>>;

    /// Drop an index
    fn delete_index(&self, name: &str, timeout: Duration) -> Result<()>;

    /// Merge the index down to `max_segments` segments
    fn force_merge(&self, name: &str, max_segments: u32, timeout: Duration) -> Result<()>;

    /// Make all indexed documents visible to search
    fn refresh(&self, name: &str, timeout: Duration) -> Result<()>;

    /// Apply a settings delta
    fn update_settings(&self, name: &str, update: SettingsUpdate, timeout: Duration) -> Result<()>;
}

/// IP-range-keyed geolocation store over a [`DocumentStore`]
pub struct GeoRangeStore<S> {
    store: S,
    timeout: Duration,
}

impl<S: DocumentStore> GeoRangeStore<S> {
    /// Wrap a backing store with the timeout applied to every remote call
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Replace the per-call timeout (sourced from dynamic configuration)
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Borrow the backing store
    pub fn backing(&self) -> &S {
        &self.store
    }

    /// Create the index with write-optimized settings unless the store
    /// already reports it
    pub fn create_index_if_absent(&self, name: &str) -> Result<()> {
        if self.store.index_exists(name, self.timeout)? {
            return Ok(());
        }
        self.store
            .create_index(name, IndexSettings::bulk_load(), self.timeout)
    }

    /// One-time post-load transition to read-optimized settings:
    /// force-merge to a single segment, refresh once, then expand replicas
    /// and block writes. Must run after the full load succeeds, never
    /// interleaved with ingestion.
    pub fn freeze_index(&self, name: &str) -> Result<()> {
        self.store.force_merge(name, 1, self.timeout)?;
        self.store.refresh(name, self.timeout)?;
        self.store.update_settings(
            name,
            SettingsUpdate {
                auto_expand_replicas: Some(true),
                blocks_write: Some(true),
                refresh_enabled: None,
            },
            self.timeout,
        )
    }

    /// Build one document from a header row and a value row.
    ///
    /// The first column is always the range key; remaining columns become
    /// attributes. Blank values are omitted entirely, never stored as empty
    /// strings. The document id equals the raw range-key string.
    pub fn build_document(field_names: &[String], field_values: &[String]) -> Result<GeoDocument> {
        if field_names.len() != field_values.len() {
            return Err(GeoError::SchemaMismatch(format!(
                "expected {} fields but record has {}",
                field_names.len(),
                field_values.len()
            )));
        }
        if field_names.is_empty() {
            return Err(GeoError::SchemaMismatch(
                "record must carry at least the range key column".to_string(),
            ));
        }
        let range = field_values[0].clone();
        let mut attributes = GeoAttributes::new();
        for (name, value) in field_names[1..].iter().zip(&field_values[1..]) {
            if value.trim().is_empty() {
                continue;
            }
            attributes.insert(name.clone(), value.clone());
        }
        Ok(GeoDocument { range, attributes })
    }

    /// Bulk-load records into an index.
    ///
    /// Consumes the iterator in batches of [`BULK_BATCH_SIZE`]; any partial
    /// batch failure aborts the whole load with the concatenated per-record
    /// messages. `renew_lock` is invoked once per record, not per batch, so
    /// the caller's externally held lock cannot expire mid-load. On
    /// successful exhaustion the index is frozen as the final step.
    ///
    /// Returns the number of records written.
    pub fn bulk_load<I, F>(
        &self,
        index_name: &str,
        field_names: &[String],
        records: I,
        mut renew_lock: F,
    ) -> Result<usize>
    where
        I: Iterator<Item = Result<Vec<String>>>,
        F: FnMut(),
    {
        let mut batch: Vec<GeoDocument> = Vec::with_capacity(BULK_BATCH_SIZE);
        let mut written = 0usize;

        for record in records {
            renew_lock();
            let values = record?;
            batch.push(Self::build_document(field_names, &values)?);
            if batch.len() == BULK_BATCH_SIZE {
                written += self.flush_batch(index_name, &mut batch)?;
            }
        }
        if !batch.is_empty() {
            written += self.flush_batch(index_name, &mut batch)?;
        }

        self.freeze_index(index_name)?;
        Ok(written)
    }

    fn flush_batch(&self, index_name: &str, batch: &mut Vec<GeoDocument>) -> Result<usize> {
        let response = self.store.bulk_index(index_name, batch, self.timeout)?;
        if response.has_failures() {
            let combined = response
                .failures
                .iter()
                .map(|f| format!("[{}] {}", f.id, f.message))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(GeoError::BulkIngestFailure(combined));
        }
        let count = batch.len();
        batch.clear();
        Ok(count)
    }

    /// Look up the attributes for one address. Absence yields an empty
    /// mapping, not an error.
    pub fn point_lookup(&self, index_name: &str, addr: IpAddr) -> Result<GeoAttributes> {
        let hits = self
            .store
            .search_ranges(index_name, std::slice::from_ref(&addr), 1, self.timeout)?;
        Ok(best_match(&hits, addr).unwrap_or_default())
    }

    /// Look up attributes for several addresses with one store round trip.
    /// Every requested address is present in the result; unresolved ones
    /// map to an empty mapping.
    pub fn multi_point_lookup(
        &self,
        index_name: &str,
        addrs: &[IpAddr],
    ) -> Result<HashMap<IpAddr, GeoAttributes>> {
        if addrs.is_empty() {
            return Ok(HashMap::new());
        }
        let hits = self
            .store
            .search_ranges(index_name, addrs, addrs.len(), self.timeout)?;
        let mut results = HashMap::with_capacity(addrs.len());
        for &addr in addrs {
            results.insert(addr, best_match(&hits, addr).unwrap_or_default());
        }
        Ok(results)
    }

    /// Delete data indices, refusing any name outside [`DATA_INDEX_PREFIX`]
    pub fn delete_indices(&self, names: &[String]) -> Result<()> {
        for name in names {
            if !name.starts_with(DATA_INDEX_PREFIX) {
                return Err(GeoError::InvalidState(format!(
                    "cannot delete index {}: not under the {} prefix",
                    name, DATA_INDEX_PREFIX
                )));
            }
        }
        for name in names {
            self.store.delete_index(name, self.timeout)?;
        }
        Ok(())
    }
}

/// Pick the most specific document whose range contains the address
fn best_match(hits: &[GeoDocument], addr: IpAddr) -> Option<GeoAttributes> {
    hits.iter()
        .filter_map(|doc| {
            let range = IpRange::parse(&doc.range).ok()?;
            range.contains(addr).then_some((range.specificity(), doc))
        })
        .max_by_key(|(specificity, _)| *specificity)
        .map(|(_, doc)| doc.attributes.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted backing store: records every call and fails bulk writes
    /// on demand.
    #[derive(Default)]
    struct ScriptedStore {
        calls: Mutex<Vec<String>>,
        /// Batch number (1-based) that should fail, with a message
        fail_batch: Option<(usize, String)>,
        batches_seen: Mutex<usize>,
    }

    impl ScriptedStore {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    impl DocumentStore for ScriptedStore {
        fn index_exists(&self, _name: &str, _timeout: Duration) -> Result<bool> {
            self.record("index_exists");
            Ok(false)
        }

        fn create_index(
            &self,
            _name: &str,
            settings: IndexSettings,
            _timeout: Duration,
        ) -> Result<()> {
            assert_eq!(settings, IndexSettings::bulk_load());
            self.record("create_index");
            Ok(())
        }

        fn bulk_index(
            &self,
            _name: &str,
            documents: &[GeoDocument],
            _timeout: Duration,
        ) -> Result<BulkResponse> {
            self.record("bulk_index");
            let mut seen = self.batches_seen.lock().unwrap();
            *seen += 1;
            if let Some((batch, message)) = &self.fail_batch {
                if *seen == *batch {
                    return Ok(BulkResponse {
                        failures: documents
                            .iter()
                            .map(|d| BulkItemFailure {
                                id: d.range.clone(),
                                message: message.clone(),
                            })
                            .collect(),
                    });
                }
            }
            Ok(BulkResponse::default())
        }

        fn search_ranges(
            &self,
            _name: &str,
            _addrs: &[IpAddr],
            _max_hits: usize,
            _timeout: Duration,
        ) -> Result<Vec<GeoDocument>> {
            self.record("search_ranges");
            Ok(Vec::new())
        }

        fn delete_index(&self, _name: &str, _timeout: Duration) -> Result<()> {
            self.record("delete_index");
            Ok(())
        }

        fn force_merge(&self, _name: &str, _max_segments: u32, _timeout: Duration) -> Result<()> {
            self.record("force_merge");
            Ok(())
        }

        fn refresh(&self, _name: &str, _timeout: Duration) -> Result<()> {
            self.record("refresh");
            Ok(())
        }

        fn update_settings(
            &self,
            _name: &str,
            _update: SettingsUpdate,
            _timeout: Duration,
        ) -> Result<()> {
            self.record("update_settings");
            Ok(())
        }
    }

    fn timeout() -> Duration {
        Duration::from_secs(30)
    }

    fn header() -> Vec<String> {
        vec!["ip".to_string(), "country".to_string(), "city".to_string()]
    }

    fn record(values: &[&str]) -> Result<Vec<String>> {
        Ok(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_build_document_omits_blank_values() {
        let doc = GeoRangeStore::<ScriptedStore>::build_document(
            &header(),
            &record(&["1.0.0.0/25", "USA", " "]).unwrap(),
        )
        .unwrap();
        assert_eq!(doc.range, "1.0.0.0/25");
        assert_eq!(doc.attributes.len(), 1);
        assert_eq!(doc.attributes["country"], "USA");
        assert!(!doc.attributes.contains_key("city"));
    }

    #[test]
    fn test_build_document_width_mismatch() {
        let err = GeoRangeStore::<ScriptedStore>::build_document(
            &header(),
            &record(&["1.0.0.0/25", "USA"]).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, GeoError::SchemaMismatch(_)));
    }

    #[test]
    fn test_bulk_load_invokes_lock_renewal_per_record() {
        let store = GeoRangeStore::new(ScriptedStore::default(), timeout());
        let rows = (0..5).map(|i| record(&[format!("10.0.{}.0/24", i).as_str(), "USA", "Seattle"]));
        let mut renewals = 0;
        let written = store
            .bulk_load(".geo-range-data.test.1", &header(), rows, || renewals += 1)
            .unwrap();
        assert_eq!(written, 5);
        assert_eq!(renewals, 5);
    }

    #[test]
    fn test_bulk_load_freezes_after_success() {
        let store = GeoRangeStore::new(ScriptedStore::default(), timeout());
        let rows = (0..130).map(|i| record(&[format!("10.{}.0.0/16", i).as_str(), "USA", ""]));
        store
            .bulk_load(".geo-range-data.test.1", &header(), rows, || {})
            .unwrap();
        let calls = store.backing().calls();
        // 130 records = one full batch of 128 plus a remainder of 2
        assert_eq!(calls.iter().filter(|c| *c == "bulk_index").count(), 2);
        let merge_pos = calls.iter().position(|c| c == "force_merge").unwrap();
        let last_bulk = calls.iter().rposition(|c| c == "bulk_index").unwrap();
        assert!(merge_pos > last_bulk, "freeze must follow the final batch");
        assert!(calls.contains(&"refresh".to_string()));
        assert!(calls.contains(&"update_settings".to_string()));
    }

    #[test]
    fn test_bulk_load_batch_failure_aborts_without_freeze() {
        let backing = ScriptedStore {
            fail_batch: Some((2, "disk full".to_string())),
            ..ScriptedStore::default()
        };
        let store = GeoRangeStore::new(backing, timeout());
        let rows = (0..130).map(|i| record(&[format!("10.{}.0.0/16", i).as_str(), "USA", ""]));
        let err = store
            .bulk_load(".geo-range-data.test.1", &header(), rows, || {})
            .unwrap_err();
        match &err {
            GeoError::BulkIngestFailure(msg) => {
                assert!(msg.contains("disk full"));
                assert!(msg.contains("10.128.0.0/16"));
                assert!(msg.contains("10.129.0.0/16"));
            }
            other => panic!("expected BulkIngestFailure, got {:?}", other),
        }
        let calls = store.backing().calls();
        assert!(
            !calls.contains(&"force_merge".to_string()),
            "freeze must never run after a failed batch"
        );
        assert!(!calls.contains(&"update_settings".to_string()));
    }

    #[test]
    fn test_create_index_if_absent_skips_existing() {
        struct Existing;
        impl DocumentStore for Existing {
            fn index_exists(&self, _: &str, _: Duration) -> Result<bool> {
                Ok(true)
            }
            fn create_index(&self, _: &str, _: IndexSettings, _: Duration) -> Result<()> {
                panic!("create_index must not be called for an existing index");
            }
            fn bulk_index(&self, _: &str, _: &[GeoDocument], _: Duration) -> Result<BulkResponse> {
                unreachable!()
            }
            fn search_ranges(
                &self,
                _: &str,
                _: &[IpAddr],
                _: usize,
                _: Duration,
            ) -> Result<Vec<GeoDocument>> {
                unreachable!()
            }
            fn delete_index(&self, _: &str, _: Duration) -> Result<()> {
                unreachable!()
            }
            fn force_merge(&self, _: &str, _: u32, _: Duration) -> Result<()> {
                unreachable!()
            }
            fn refresh(&self, _: &str, _: Duration) -> Result<()> {
                unreachable!()
            }
            fn update_settings(&self, _: &str, _: SettingsUpdate, _: Duration) -> Result<()> {
                unreachable!()
            }
        }
        let store = GeoRangeStore::new(Existing, timeout());
        store
            .create_index_if_absent(".geo-range-data.test.1")
            .unwrap();
    }

    #[test]
    fn test_delete_indices_guards_naming_prefix() {
        let store = GeoRangeStore::new(ScriptedStore::default(), timeout());
        let err = store
            .delete_indices(&[
                ".geo-range-data.test.1".to_string(),
                "unrelated-index".to_string(),
            ])
            .unwrap_err();
        assert!(matches!(err, GeoError::InvalidState(_)));
        // Nothing may be deleted when any name fails the guard
        assert!(!store.backing().calls().contains(&"delete_index".to_string()));

        store
            .delete_indices(&[".geo-range-data.test.1".to_string()])
            .unwrap();
        assert!(store.backing().calls().contains(&"delete_index".to_string()));
    }

    #[test]
    fn test_point_lookup_absence_is_empty() {
        let store = GeoRangeStore::new(ScriptedStore::default(), timeout());
        let attrs = store
            .point_lookup(".geo-range-data.test.1", "8.8.8.8".parse().unwrap())
            .unwrap();
        assert!(attrs.is_empty());
    }
}
