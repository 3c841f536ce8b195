/// Error types for the georange library
use std::fmt;

/// Result type alias for georange operations
pub type Result<T> = std::result::Result<T, GeoError>;

/// Main error type for georange operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoError {
    /// Caller passed an empty/out-of-range input
    InvalidArgument(String),

    /// Geometry variant not representable in the planar storage scheme
    UnsupportedShape(String),

    /// Structural mismatch between expected and actual field counts
    SchemaMismatch(String),

    /// One or more records in a bulk batch failed to write;
    /// carries the concatenated per-record failure messages
    BulkIngestFailure(String),

    /// Backing store timed out or returned a transport-level failure
    StoreUnavailable(String),

    /// Safety-guard violation (e.g. deleting an index outside the
    /// expected naming convention, or writing to a frozen index)
    InvalidState(String),

    /// I/O errors
    Io(String),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            GeoError::UnsupportedShape(msg) => write!(f, "Unsupported shape: {}", msg),
            GeoError::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
            GeoError::BulkIngestFailure(msg) => write!(f, "Bulk ingest failure: {}", msg),
            GeoError::StoreUnavailable(msg) => write!(f, "Backing store unavailable: {}", msg),
            GeoError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            GeoError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for GeoError {}

impl From<std::io::Error> for GeoError {
    fn from(err: std::io::Error) -> Self {
        GeoError::Io(err.to_string())
    }
}

impl From<csv::Error> for GeoError {
    fn from(err: csv::Error) -> Self {
        GeoError::Io(err.to_string())
    }
}
