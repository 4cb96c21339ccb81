//! # trackmap
//!
//! Renders a GeoJSON track or polygon onto a street-map mosaic: the
//! covering OpenStreetMap tiles are downloaded (and cached on disk
//! indefinitely), assembled into one canvas, the geometry is stroked on
//! top, and the result is cropped to the requested pixel size.
//!
//! ## Architecture
//!
//! The library is organized into several modules, leaf first:
//!
//! - [`mercator`] - pure Web-Mercator projection math
//! - [`viewport`] - zoom selection and tile-grid planning
//! - [`tile`] - tile providers, HTTP fetching and the disk/memory cache
//! - [`geojson`] - input geometry parsing
//! - [`render`] - mosaic compositing, drawing, cropping and encoding
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use trackmap::{
//!     FsTileStore, Geometry, HttpTileFetcher, MosaicCompositor, RenderRequest, TileCache,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let geometry = Geometry::from_geojson(
//!         r#"{"type":"LineString","coordinates":[[2.257921,48.585854],[2.258616,48.58588]]}"#,
//!     )?;
//!
//!     let cache = TileCache::new(HttpTileFetcher::new(), FsTileStore::new("./cache"));
//!     let compositor = MosaicCompositor::new(cache);
//!
//!     let output = compositor.render(&RenderRequest::new(geometry)).await?;
//!     std::fs::write("map.jpg", &output.data)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod geojson;
pub mod mercator;
pub mod render;
pub mod tile;
pub mod viewport;

// Re-export commonly used types
pub use config::Config;
pub use error::{CacheError, FetchError, GeometryError, RenderError, StoreError};
pub use geojson::{Geometry, Ring};
pub use mercator::{
    project, unproject, BoundingBox, GeoPoint, PixelCoord, TileCoord, MAX_ZOOM, MIN_ZOOM,
    TILE_SIZE,
};
pub use render::{
    Attribution, Canvas, MosaicCompositor, OutputFormat, RenderOutput, RenderRequest, StrokeStyle,
};
pub use tile::{
    FsTileStore, HttpTileFetcher, TileCache, TileFetcher, TileId, TileProvider, TileStore,
};
pub use viewport::{plan_viewport, select_zoom, MatrixCell, TileMatrix, Viewport};
