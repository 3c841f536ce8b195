//! IP-to-geolocation enrichment
//!
//! [`Ip2GeoResolver`] composes the three layers of the lookup path: the
//! datasource metadata cache resolves the current backing index, the
//! bounded result cache answers repeats, and the range store serves true
//! misses. A datasource that is missing or not in the Available state
//! yields an empty mapping; expired-but-present data still serves, since
//! staleness is tolerated on the read path.
//!
//! Batch resolution partitions the input deterministically: cache hits are
//! answered in place, misses are collected in input order and dispatched
//! as one store round trip, and every miss result (negatives included) is
//! written back to the cache before results are emitted in input order.

use crate::cache::BoundedGeoCache;
use crate::datasource::{DatasourceMetadataCache, DatasourceRepository, DatasourceState};
use crate::error::{GeoError, Result};
use crate::store::{DocumentStore, GeoAttributes, GeoRangeStore};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Enrichment entry point over a range store, result cache, and the
/// process-wide metadata cache
pub struct Ip2GeoResolver<S, R> {
    store: GeoRangeStore<S>,
    cache: BoundedGeoCache,
    metadata: Arc<DatasourceMetadataCache<R>>,
}

impl<S: DocumentStore, R: DatasourceRepository> Ip2GeoResolver<S, R> {
    /// Compose the resolver. The metadata cache is shared: it must be the
    /// single per-process instance, passed by `Arc` from the composition
    /// root.
    pub fn new(
        store: GeoRangeStore<S>,
        cache: BoundedGeoCache,
        metadata: Arc<DatasourceMetadataCache<R>>,
    ) -> Self {
        Self {
            store,
            cache,
            metadata,
        }
    }

    /// Borrow the range store
    pub fn store(&self) -> &GeoRangeStore<S> {
        &self.store
    }

    /// Borrow the result cache (for capacity updates from dynamic settings)
    pub fn cache(&self) -> &BoundedGeoCache {
        &self.cache
    }

    /// Resolve one IP against a datasource. Absence at any layer is an
    /// empty mapping, never an error.
    pub fn resolve(&self, datasource: &str, ip: &str) -> Result<GeoAttributes> {
        let addr = parse_ip(ip)?;
        let index_name = match self.lookup_index(datasource)? {
            Some(name) => name,
            None => return Ok(GeoAttributes::new()),
        };
        self.cache.get_or_load(&index_name, ip, |_| {
            self.store.point_lookup(&index_name, addr).map(Some)
        })
    }

    /// Resolve several IPs against a datasource with at most one store
    /// round trip, returning results in input order.
    pub fn resolve_batch(&self, datasource: &str, ips: &[String]) -> Result<Vec<GeoAttributes>> {
        let index_name = match self.lookup_index(datasource)? {
            Some(name) => name,
            None => return Ok(vec![GeoAttributes::new(); ips.len()]),
        };

        // Partition into hits and misses before dispatching anything
        let mut results: Vec<Option<GeoAttributes>> = Vec::with_capacity(ips.len());
        let mut miss_positions: Vec<usize> = Vec::new();
        let mut miss_addrs: Vec<IpAddr> = Vec::new();
        for (position, ip) in ips.iter().enumerate() {
            let addr = parse_ip(ip)?;
            match self.cache.get(&index_name, ip) {
                Some(hit) => results.push(Some(hit)),
                None => {
                    results.push(None);
                    miss_positions.push(position);
                    if !miss_addrs.contains(&addr) {
                        miss_addrs.push(addr);
                    }
                }
            }
        }

        if !miss_addrs.is_empty() {
            let loaded: HashMap<IpAddr, GeoAttributes> =
                self.store.multi_point_lookup(&index_name, &miss_addrs)?;
            for position in miss_positions {
                let ip = &ips[position];
                let addr = parse_ip(ip)?;
                let attributes = loaded.get(&addr).cloned().unwrap_or_default();
                self.cache.put(&index_name, ip, attributes.clone());
                results[position] = Some(attributes);
            }
        }

        Ok(results.into_iter().map(|r| r.unwrap_or_default()).collect())
    }

    /// Resolve the datasource's current backing index, or `None` when the
    /// datasource is unknown or not serving
    fn lookup_index(&self, datasource: &str) -> Result<Option<String>> {
        match self.metadata.state(datasource)? {
            Some(DatasourceState::Available) => self.metadata.index_name(datasource),
            Some(_) | None => Ok(None),
        }
    }
}

fn parse_ip(ip: &str) -> Result<IpAddr> {
    ip.parse()
        .map_err(|_| GeoError::InvalidArgument(format!("invalid IP address: {}", ip)))
}
