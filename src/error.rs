use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while interpreting the input GeoJSON document.
///
/// All of these are detected before any projection or network work happens.
#[derive(Debug, Clone, Error)]
pub enum GeometryError {
    /// Document is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Geometry type is not one of the supported kinds
    #[error("unsupported geometry type: {0} (expected LineString or MultiPolygon)")]
    UnsupportedType(String),

    /// The `coordinates` member is missing or malformed
    #[error("malformed coordinates: {0}")]
    MalformedCoordinates(String),

    /// Geometry carries no coordinates at all
    #[error("geometry has no coordinates")]
    Empty,
}

/// Transport errors from the tile fetcher.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("tile request failed: {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Connection-level failure (DNS, TLS, timeout, ...)
    #[error("tile request failed: {url}: {message}")]
    Transport { url: String, message: String },
}

/// Errors from the persistent tile store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cache directory or file could not be created or written
    #[error("cache write failed at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A cached entry exists but could not be read back
    #[error("cache read failed at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from the tile cache pipeline (store + fetcher).
#[derive(Debug, Error)]
pub enum CacheError {
    /// Fetch failed and no cached copy exists
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Persistent storage failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the full render pipeline.
///
/// A render either completes fully composited and cropped, or fails with
/// one of these; partial mosaics are never returned.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Input geometry was rejected
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A tile could not be obtained
    #[error("tile error: {0}")]
    Cache(#[from] CacheError),

    /// A fetched tile could not be decoded as an image
    #[error("tile decode failed for {zoom}/{x}/{y}: {message}")]
    TileDecode {
        zoom: u8,
        x: i32,
        y: i32,
        message: String,
    },

    /// The final canvas could not be encoded
    #[error("image encode failed: {message}")]
    Encode { message: String },

    /// Internal task failure (a fetch worker panicked or was cancelled)
    #[error("tile fetch task failed: {0}")]
    Task(String),
}
