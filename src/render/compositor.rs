//! Mosaic compositor.
//!
//! Orchestrates one render end to end:
//!
//! 1. bounding box from the geometry extrema
//! 2. zoom selection against the requested output size
//! 3. viewport plan (render bounds, tile matrix, crop origin)
//! 4. mosaic canvas sized `cols*256 x rows*256`
//! 5. base tiles composited opaque
//! 6. optional overlay tiles alpha-blended on top
//! 7. geometry rings stroked in mosaic pixel space
//! 8. attribution label anchored to the viewport's bottom-right
//! 9. crop to the exact requested rectangle
//! 10. encode
//!
//! Tile fetches run concurrently under a small semaphore; compositing onto
//! the canvas is serialized. Any fetch failure aborts the whole render --
//! partial mosaics are never produced.

use std::sync::Arc;

use ab_glyph::FontArc;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{CacheError, RenderError};
use crate::mercator::{project, TILE_SIZE};
use crate::render::canvas::Canvas;
use crate::render::{
    OutputFormat, RenderRequest, ATTRIBUTION_MARGIN, ATTRIBUTION_SCALE, OVERLAY_OPACITY,
};
use crate::tile::{TileCache, TileFetcher, TileId, TileProvider, TileStore};
use crate::viewport::{plan_viewport, select_zoom, MatrixCell, TileMatrix, Viewport};

/// Concurrent tile downloads per render; tile servers dislike bursts.
const MAX_CONCURRENT_FETCHES: usize = 8;

/// Well-known system font locations probed for the attribution label when
/// no explicit font path is configured.
const FONT_PROBE_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// The result of one render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Encoded image bytes
    pub data: Bytes,
    /// Format the bytes are encoded in
    pub format: OutputFormat,
    /// Zoom level the map was rendered at
    pub zoom: u8,
}

/// Assembles tile mosaics and draws geometry on top.
///
/// Holds the shared tile cache; everything else comes in through the
/// [`RenderRequest`] so concurrent renders share no mutable state.
pub struct MosaicCompositor<F: TileFetcher, S: TileStore> {
    cache: Arc<TileCache<F, S>>,
}

impl<F, S> MosaicCompositor<F, S>
where
    F: TileFetcher + 'static,
    S: TileStore + 'static,
{
    pub fn new(cache: TileCache<F, S>) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Share an existing cache between compositors.
    pub fn with_shared_cache(cache: Arc<TileCache<F, S>>) -> Self {
        Self { cache }
    }

    /// Render one request to encoded image bytes.
    ///
    /// # Errors
    ///
    /// Fails if the geometry is empty, any tile cannot be fetched or
    /// decoded, or the final canvas cannot be encoded. Nothing is retried
    /// internally.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let bbox = request.geometry.bounding_box()?;

        let zoom = select_zoom(&bbox, request.width, request.height, request.zoom_multiplier);
        let viewport = plan_viewport(&bbox, zoom, request.width, request.height);

        info!(
            zoom,
            tiles = viewport.tiles.len(),
            cols = viewport.tiles.cols,
            rows = viewport.tiles.rows,
            "rendering {}x{} viewport",
            request.width,
            request.height
        );

        let (mosaic_w, mosaic_h) = viewport.tiles.pixel_size();
        let mut canvas = Canvas::new(mosaic_w, mosaic_h);

        // Base layer: opaque paint, no blending
        let base_tiles = self
            .fetch_layer(&request.base_provider, viewport.tiles, zoom)
            .await?;
        for (cell, data) in &base_tiles {
            let tile = Self::decode(cell, zoom, data)?;
            canvas.composite(
                &tile,
                (cell.col * TILE_SIZE) as i64,
                (cell.row * TILE_SIZE) as i64,
            );
        }

        // Overlay layer: blended with partial transparency
        if let Some(overlay) = &request.overlay_provider {
            let overlay_tiles = self.fetch_layer(overlay, viewport.tiles, zoom).await?;
            for (cell, data) in &overlay_tiles {
                let tile = Self::decode(cell, zoom, data)?;
                canvas.composite_blend(
                    &tile,
                    (cell.col * TILE_SIZE) as i64,
                    (cell.row * TILE_SIZE) as i64,
                    OVERLAY_OPACITY,
                );
            }
        }

        self.draw_geometry(&mut canvas, request, &viewport);
        self.draw_attribution(&mut canvas, request, &viewport);

        // Crop the mosaic down to the viewport rectangle
        canvas.crop(
            viewport.origin.x.round().max(0.0) as u32,
            viewport.origin.y.round().max(0.0) as u32,
            request.width,
            request.height,
        );

        let format = request.output_format();
        let data = canvas.encode(format, request.jpeg_quality)?;

        Ok(RenderOutput { data, format, zoom })
    }

    /// Fetch every tile of one layer, bounded-concurrently.
    ///
    /// Cells come back in completion order; callers position them by their
    /// matrix coordinates, so ordering does not matter.
    async fn fetch_layer(
        &self,
        provider: &TileProvider,
        tiles: TileMatrix,
        zoom: u8,
    ) -> Result<Vec<(MatrixCell, Bytes)>, RenderError> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
        let mut tasks: JoinSet<Result<(MatrixCell, Bytes), CacheError>> = JoinSet::new();

        for cell in tiles.cells() {
            let cache = Arc::clone(&self.cache);
            let provider = provider.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore lives as long as every task; acquire only
                // fails on close, which never happens here
                let _permit = semaphore.acquire_owned().await;
                let tile = TileId::new(zoom, cell.tile_x, cell.tile_y);
                let data = cache.get(&provider, tile).await?;
                Ok((cell, data))
            });
        }

        let mut fetched = Vec::with_capacity(tiles.len());
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| RenderError::Task(e.to_string()))?;
            fetched.push(result?);
        }

        debug!(
            provider = %provider.id,
            count = fetched.len(),
            "layer fetched"
        );
        Ok(fetched)
    }

    fn decode(cell: &MatrixCell, zoom: u8, data: &[u8]) -> Result<image::RgbaImage, RenderError> {
        Canvas::decode_tile(data).map_err(|message| RenderError::TileDecode {
            zoom,
            x: cell.tile_x,
            y: cell.tile_y,
            message,
        })
    }

    /// Stroke every ring of the geometry in mosaic pixel space.
    fn draw_geometry(&self, canvas: &mut Canvas, request: &RenderRequest, viewport: &Viewport) {
        let offset_x = viewport.tiles.min_x as f64 * TILE_SIZE as f64;
        let offset_y = viewport.tiles.min_y as f64 * TILE_SIZE as f64;

        for ring in request.geometry.rings() {
            let points: Vec<(f32, f32)> = ring
                .points
                .iter()
                .map(|&p| {
                    let px = project(p, viewport.zoom).pixel();
                    (
                        (px.x - offset_x).round() as f32,
                        (px.y - offset_y).round() as f32,
                    )
                })
                .collect();

            canvas.stroke_polyline(
                &points,
                ring.closed,
                request.stroke.width,
                request.stroke.color,
            );
        }
    }

    /// Draw the attribution label anchored to the viewport's bottom-right.
    fn draw_attribution(&self, canvas: &mut Canvas, request: &RenderRequest, viewport: &Viewport) {
        let text = request.attribution.text.as_str();
        if text.is_empty() {
            return;
        }

        let Some(font) = load_font(&request.attribution.font_path) else {
            warn!("no usable attribution font found, skipping label");
            return;
        };

        let (text_w, text_h) = Canvas::measure_text(text, &font, ATTRIBUTION_SCALE);
        let x = viewport.origin.x + request.width as f64 - (text_w + ATTRIBUTION_MARGIN) as f64;
        let y = viewport.origin.y + request.height as f64 - (text_h + ATTRIBUTION_MARGIN) as f64;

        canvas.draw_text(
            text,
            x.round() as i32,
            y.round() as i32,
            &font,
            ATTRIBUTION_SCALE,
            [60, 60, 60, 255],
        );
    }
}

/// Load the attribution font, probing system locations when no explicit
/// path is configured.
fn load_font(explicit: &Option<std::path::PathBuf>) -> Option<FontArc> {
    let candidates: Vec<std::path::PathBuf> = match explicit {
        Some(path) => vec![path.clone()],
        None => FONT_PROBE_PATHS.iter().map(Into::into).collect(),
    };

    for path in candidates {
        if let Ok(bytes) = std::fs::read(&path) {
            match FontArc::try_from_vec(bytes) {
                Ok(font) => return Some(font),
                Err(e) => warn!("ignoring unreadable font {}: {e}", path.display()),
            }
        }
    }
    None
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::geojson::Geometry;
    use crate::tile::FsTileStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a solid 256x256 PNG for every URL, or fails on demand.
    struct MockFetcher {
        tile: Bytes,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl MockFetcher {
        fn new() -> Self {
            let img = image::RgbaImage::from_pixel(256, 256, image::Rgba([200, 200, 200, 255]));
            let mut png = Vec::new();
            img.write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageFormat::Png,
            )
            .unwrap();
            Self {
                tile: Bytes::from(png),
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }
        }

        fn failing() -> Self {
            let mut fetcher = Self::new();
            fetcher.fail = true;
            fetcher
        }
    }

    #[async_trait]
    impl TileFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(self.tile.clone())
        }
    }

    fn track_request() -> RenderRequest {
        let geometry = Geometry::from_geojson(
            r#"{"type":"LineString","coordinates":[[2.257921,48.585854],[2.258616,48.58588]]}"#,
        )
        .unwrap();
        let mut request = RenderRequest::new(geometry);
        request.width = 512;
        request.height = 512;
        request
    }

    fn compositor_with(
        fetcher: MockFetcher,
        dir: &tempfile::TempDir,
    ) -> MosaicCompositor<MockFetcher, FsTileStore> {
        MosaicCompositor::new(TileCache::new(fetcher, FsTileStore::new(dir.path())))
    }

    #[tokio::test]
    async fn test_render_produces_exact_output_size() {
        let dir = tempfile::tempdir().unwrap();
        let compositor = compositor_with(MockFetcher::new(), &dir);

        let output = compositor.render(&track_request()).await.unwrap();
        assert_eq!(output.format, OutputFormat::Jpeg);

        let img = image::load_from_memory(&output.data).unwrap();
        assert_eq!(img.width(), 512);
        assert_eq!(img.height(), 512);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_render() {
        let dir = tempfile::tempdir().unwrap();
        let compositor = compositor_with(MockFetcher::failing(), &dir);

        let result = compositor.render(&track_request()).await;
        assert!(matches!(
            result,
            Err(RenderError::Cache(CacheError::Fetch(_)))
        ));
    }

    #[tokio::test]
    async fn test_overlay_doubles_tile_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new();
        let calls = Arc::clone(&fetcher.calls);
        let compositor = compositor_with(fetcher, &dir);

        let mut request = track_request();
        compositor.render(&request).await.unwrap();
        let base_only = calls.load(Ordering::SeqCst);

        request.overlay_provider = Some(TileProvider::new(
            "overlay",
            "https://overlay.example.org/{z}/{x}/{y}.png",
        ));
        compositor.render(&request).await.unwrap();

        // The second render re-serves base tiles from cache and fetches
        // only the overlay namespace
        assert_eq!(calls.load(Ordering::SeqCst), 2 * base_only);
    }

    #[tokio::test]
    async fn test_garbage_tile_bytes_fail_decode() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher {
            tile: Bytes::from_static(b"not a png"),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
        };
        let compositor = compositor_with(fetcher, &dir);

        let result = compositor.render(&track_request()).await;
        assert!(matches!(result, Err(RenderError::TileDecode { .. })));
    }
}
