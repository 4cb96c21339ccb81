//! Tile identification, fetching and caching.
//!
//! A tile is a 256x256 raster square identified by `(zoom, x, y)` in the
//! slippy-map scheme. This module maps tiles to provider URLs, fetches them
//! over HTTP, and caches the encoded bytes both on disk (indefinitely, no
//! eviction) and in a small in-memory LRU.
//!
//! # Components
//!
//! - [`TileId`]: typed `(zoom, x, y)` tile index
//! - [`TileProvider`]: provider id plus `{z}`/`{x}`/`{y}` URL template
//! - [`TileFetcher`]: transport seam; [`HttpTileFetcher`] in production
//! - [`TileStore`]: persistence seam; [`FsTileStore`] lays tiles out as
//!   `{root}/{provider}/{zoom}/{x}/{y}.png`
//! - [`TileCache`]: memory -> disk -> network lookup pipeline

mod cache;
mod fetcher;
mod store;

pub use cache::{TileCache, DEFAULT_MEMORY_CAPACITY};
pub use fetcher::{HttpTileFetcher, TileFetcher};
pub use store::{FsTileStore, TileStore};

/// Default OpenStreetMap tile URL template.
pub const OSM_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default provider identifier, used as the cache namespace.
pub const OSM_PROVIDER_ID: &str = "OSM";

// =============================================================================
// Tile Id
// =============================================================================

/// A tile index in the global slippy-map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub zoom: u8,
    pub x: i32,
    pub y: i32,
}

impl TileId {
    pub fn new(zoom: u8, x: i32, y: i32) -> Self {
        Self { zoom, x, y }
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

// =============================================================================
// Tile Provider
// =============================================================================

/// A remote tile source: a cache namespace plus a URL template.
///
/// The template contains `{z}`, `{x}` and `{y}` placeholders. Two providers
/// with different ids are cached under independent namespaces, so the same
/// `(zoom, x, y)` never collides across providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileProvider {
    /// Cache namespace, e.g. `OSM`
    pub id: String,
    /// URL template with `{z}`/`{x}`/`{y}` placeholders
    pub url_template: String,
}

impl TileProvider {
    pub fn new(id: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url_template: url_template.into(),
        }
    }

    /// The default OpenStreetMap provider.
    pub fn osm() -> Self {
        Self::new(OSM_PROVIDER_ID, OSM_URL_TEMPLATE)
    }

    /// Expand the URL template for one tile.
    pub fn tile_url(&self, tile: TileId) -> String {
        self.url_template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    /// Check that the template is a valid URL and carries all three
    /// placeholders.
    pub fn validate(&self) -> Result<(), String> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.url_template.contains(placeholder) {
                return Err(format!(
                    "provider '{}': URL template is missing the {} placeholder",
                    self.id, placeholder
                ));
            }
        }
        let probe = self.tile_url(TileId::new(1, 0, 0));
        url::Url::parse(&probe)
            .map_err(|e| format!("provider '{}': invalid URL template: {e}", self.id))?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
