//! Georange - Planar Geospatial Indexing and IP-to-Geolocation Storage
//!
//! Georange provides the two halves of a geospatial enrichment backend:
//! converting geometry objects into planar, single-precision indexable
//! primitives, and serving IP-to-geolocation lookups from an IP-range-keyed
//! document store behind a bounded result cache.
//!
//! # Quick Start - IP Enrichment
//!
//! ```rust
//! use georange::{BulkIngestPipeline, CsvSource, GeoRangeStore, MemoryDocumentStore};
//! use std::io::Cursor;
//! use std::time::Duration;
//!
//! // Load a CSV of range-keyed records into a data index
//! let store = GeoRangeStore::new(MemoryDocumentStore::new(), Duration::from_secs(30));
//! let pipeline = BulkIngestPipeline::new(&store);
//!
//! let csv = "ip,country,city\n203.0.113.0/24,USA,Seattle\n";
//! let source = CsvSource::from_reader(Box::new(Cursor::new(csv.as_bytes().to_vec())))?;
//! let summary = pipeline.run(".geo-range-data.city.1", source, || {})?;
//! assert_eq!(summary.records, 1);
//!
//! // Exact point-in-range lookup; the index is frozen read-only by now
//! let attrs = store.point_lookup(".geo-range-data.city.1", "203.0.113.7".parse()?)?;
//! assert_eq!(attrs["country"], "USA");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Quick Start - Planar Shape Fields
//!
//! ```rust
//! use georange::{fields, Geometry, Rectangle};
//!
//! let rect = Geometry::Rectangle(Rectangle::new(0.0, 0.0, 10.0, 5.0)?);
//! let emitted = fields::index_fields(&rect)?;
//! assert_eq!(emitted.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! query geometry ──▶ fields::supported ──▶ fields::index_fields ──▶ indexer
//!
//! ip string ──▶ BoundedGeoCache ──miss──▶ GeoRangeStore ──▶ DocumentStore
//!                    │                          ▲
//!                    └── DatasourceMetadataCache ┘ (current index, state)
//! ```
//!
//! The backing document store and the authoritative datasource record
//! store are trait boundaries; [`MemoryDocumentStore`] is the bundled
//! process-local implementation used by the CLI and the test suite.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
/// Bounded lookup-result cache
pub mod cache;
/// Datasource records and the metadata snapshot cache
pub mod datasource;
/// Error types for georange operations
pub mod error;
/// Shape admissibility and indexable-field emission
pub mod fields;
/// Geometry model
pub mod geometry;
/// Bulk CSV ingestion
pub mod ingest;
/// In-memory backing store
pub mod memory;
/// Planar primitive conversion
pub mod planar;
/// IP range keys
pub mod range;
/// IP-to-geolocation enrichment
pub mod resolver;
/// IP-range-keyed geolocation store
pub mod store;

// Re-exports for consumers

pub use crate::cache::{BoundedGeoCache, CacheKey};
pub use crate::datasource::{
    DatasourceMetadata, DatasourceMetadataCache, DatasourceRecord, DatasourceRepository,
    DatasourceState,
};
pub use crate::error::{GeoError, Result};
pub use crate::fields::IndexableField;
pub use crate::geometry::{
    Circle, Coordinate, Geometry, Line, LinearRing, Polygon, Rectangle,
};
pub use crate::ingest::{BulkIngestPipeline, CsvSource, IngestSummary};
pub use crate::memory::MemoryDocumentStore;
pub use crate::range::IpRange;
pub use crate::resolver::Ip2GeoResolver;
pub use crate::store::{
    DocumentStore, GeoAttributes, GeoDocument, GeoRangeStore, IndexSettings, SettingsUpdate,
    BULK_BATCH_SIZE, DATA_INDEX_PREFIX,
};

// Version information
/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
