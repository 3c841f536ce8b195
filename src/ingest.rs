//! Bulk CSV ingestion
//!
//! Turns a CSV-like tabular source into a loaded, frozen data index. The
//! source is comma-delimited with RFC4180 quoting; the first row is the
//! header and its first column is always the range key. Files ending in
//! `.gz` are decompressed transparently, the same extension-based
//! detection the rest of the crate's file handling uses.
//!
//! Fetching the source from its remote URL is the caller's job; this
//! module starts from a local path or any `io::Read`.

use crate::error::{GeoError, Result};
use crate::store::{DocumentStore, GeoRangeStore};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Buffer size for file reading
const BUFFER_SIZE: usize = 64 * 1024;

/// Open a tabular source file with automatic gzip detection by extension
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| GeoError::Io(format!("failed to open {}: {}", path.display(), e)))?;

    let is_gzip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        let decoder = GzDecoder::new(file);
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
}

/// A CSV source with its header row consumed.
///
/// The header supplies the field list (range key first); the remaining
/// rows stream through [`CsvSource::records`]. Row width is not enforced
/// here; the document builder rejects mismatched rows with a typed
/// schema error.
pub struct CsvSource {
    field_names: Vec<String>,
    reader: csv::Reader<Box<dyn Read + Send>>,
}

impl CsvSource {
    /// Open a CSV (optionally gzipped) file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(open(path)?)
    }

    /// Wrap any reader producing RFC4180 CSV
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut header = csv::StringRecord::new();
        let got_header = reader.read_record(&mut header)?;
        if !got_header || header.is_empty() {
            return Err(GeoError::InvalidArgument(
                "CSV source is missing its header row".to_string(),
            ));
        }
        let field_names: Vec<String> = header.iter().map(String::from).collect();
        if field_names[0].trim().is_empty() {
            return Err(GeoError::InvalidArgument(
                "CSV header's first column (the range key) is blank".to_string(),
            ));
        }
        Ok(Self {
            field_names,
            reader,
        })
    }

    /// Column names from the header, range key first
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Consume the source, yielding one value row at a time
    pub fn records(self) -> impl Iterator<Item = Result<Vec<String>>> {
        self.reader.into_records().map(|record| {
            record
                .map(|row| row.iter().map(String::from).collect())
                .map_err(GeoError::from)
        })
    }
}

/// Summary of one completed ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    /// Records written to the index
    pub records: usize,
    /// Field list taken from the source header
    pub field_names: Vec<String>,
}

/// Drives a CSV source into a created, loaded, and frozen data index
pub struct BulkIngestPipeline<'a, S> {
    store: &'a GeoRangeStore<S>,
}

impl<'a, S: DocumentStore> BulkIngestPipeline<'a, S> {
    /// Build a pipeline over the range store
    pub fn new(store: &'a GeoRangeStore<S>) -> Self {
        Self { store }
    }

    /// Create the index if needed, bulk-load every record, and freeze.
    ///
    /// `renew_lock` is forwarded to the load and invoked once per record;
    /// the caller holds the concurrency lock this keeps alive. Any batch
    /// failure aborts the run with the index left unfrozen.
    pub fn run<F>(&self, index_name: &str, source: CsvSource, renew_lock: F) -> Result<IngestSummary>
    where
        F: FnMut(),
    {
        self.store.create_index_if_absent(index_name)?;
        let field_names = source.field_names().to_vec();
        let records = self
            .store
            .bulk_load(index_name, &field_names, source.records(), renew_lock)?;
        Ok(IngestSummary {
            records,
            field_names,
        })
    }
}
