//! End-to-end render tests against a mock tile fetcher.
//!
//! Tiles are served from memory as solid PNGs; the disk cache lives in a
//! per-test temp directory. No network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use trackmap::{
    plan_viewport, project, select_zoom, viewport::bbox_pixel_size, FetchError, FsTileStore,
    Geometry, MosaicCompositor, OutputFormat, RenderRequest, TileCache, TileFetcher, TILE_SIZE,
};

const TRACK: &str =
    r#"{"type":"LineString","coordinates":[[2.257921,48.585854],[2.258616,48.58588]]}"#;

const SQUARE: &str = r#"{"type":"MultiPolygon","coordinates":
    [[[[2.2500,48.5800],[2.2510,48.5800],[2.2510,48.5810],[2.2500,48.5810]]]]}"#;

/// Serves one solid light-gray 256x256 PNG for every tile URL.
struct SolidTileFetcher {
    tile: Bytes,
    calls: Arc<AtomicUsize>,
}

impl SolidTileFetcher {
    fn new() -> Self {
        let img = image::RgbaImage::from_pixel(256, 256, image::Rgba([220, 220, 220, 255]));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        Self {
            tile: Bytes::from(png),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TileFetcher for SolidTileFetcher {
    async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tile.clone())
    }
}

fn compositor(
    dir: &tempfile::TempDir,
) -> (MosaicCompositor<SolidTileFetcher, FsTileStore>, Arc<AtomicUsize>) {
    let fetcher = SolidTileFetcher::new();
    let calls = Arc::clone(&fetcher.calls);
    let cache = TileCache::new(fetcher, FsTileStore::new(dir.path()));
    (MosaicCompositor::new(cache), calls)
}

fn request(document: &str, width: u32, height: u32) -> RenderRequest {
    let geometry = Geometry::from_geojson(document).unwrap();
    let mut request = RenderRequest::new(geometry);
    request.width = width;
    request.height = height;
    // Keep tests independent of any fonts installed on the host
    request.attribution.text = String::new();
    request
}

fn is_reddish(pixel: image::Rgba<u8>) -> bool {
    pixel[0] > 150 && pixel[1] < 100 && pixel[2] < 100
}

#[tokio::test]
async fn linestring_renders_512_jpeg_with_stroked_path() {
    let dir = tempfile::tempdir().unwrap();
    let (compositor, _) = compositor(&dir);

    let output = compositor.render(&request(TRACK, 512, 512)).await.unwrap();

    // Line tracks default to JPEG
    assert_eq!(output.format, OutputFormat::Jpeg);
    assert_eq!(&output.data[0..2], &[0xFF, 0xD8]);

    let img = image::load_from_memory(&output.data).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (512, 512));

    // The red stroke must have survived JPEG encoding somewhere on canvas
    let red_pixels = img.pixels().filter(|&&p| is_reddish(p)).count();
    assert!(red_pixels > 50, "expected a visible stroke, found {red_pixels} reddish pixels");
}

#[tokio::test]
async fn linestring_zoom_satisfies_fit_property() {
    let geometry = Geometry::from_geojson(TRACK).unwrap();
    let bbox = geometry.bounding_box().unwrap();

    let zoom = select_zoom(&bbox, 512, 512, 1.0);

    let (w, h) = bbox_pixel_size(&bbox, zoom);
    assert!(w <= 512.0 && h <= 512.0);

    // This two-point track is tiny; it fits even at the deepest zoom
    assert_eq!(zoom, 18);

    let dir = tempfile::tempdir().unwrap();
    let (compositor, _) = compositor(&dir);
    let output = compositor.render(&request(TRACK, 512, 512)).await.unwrap();
    assert_eq!(output.zoom, zoom);
}

#[tokio::test]
async fn multipolygon_renders_png_with_closed_ring() {
    let dir = tempfile::tempdir().unwrap();
    let (compositor, _) = compositor(&dir);

    let req = request(SQUARE, 512, 512);
    let output = compositor.render(&req).await.unwrap();

    // Polygon renders default to PNG
    assert_eq!(output.format, OutputFormat::Png);
    assert_eq!(&output.data[0..4], &[0x89, b'P', b'N', b'G']);

    let img = image::load_from_memory(&output.data).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (512, 512));

    // Locate the closing edge (last point back to first) in output pixels:
    // its midpoint must be stroked even though the input ring is not
    // explicitly closed.
    let geometry = Geometry::from_geojson(SQUARE).unwrap();
    let bbox = geometry.bounding_box().unwrap();
    let viewport = plan_viewport(&bbox, output.zoom, 512, 512);

    let ring = geometry.rings().next().unwrap();
    let first = ring.points[0];
    let last = *ring.points.last().unwrap();
    let midpoint = trackmap::GeoPoint::new(
        (first.lon + last.lon) / 2.0,
        (first.lat + last.lat) / 2.0,
    );

    let px = project(midpoint, output.zoom).pixel();
    let x = px.x - viewport.tiles.min_x as f64 * TILE_SIZE as f64 - viewport.origin.x.round();
    let y = px.y - viewport.tiles.min_y as f64 * TILE_SIZE as f64 - viewport.origin.y.round();

    let found = (-2i64..=2).any(|dx| {
        (-2i64..=2).any(|dy| {
            let cx = (x.round() as i64 + dx).clamp(0, 511) as u32;
            let cy = (y.round() as i64 + dy).clamp(0, 511) as u32;
            is_reddish(*img.get_pixel(cx, cy))
        })
    });
    assert!(found, "closing edge not stroked near ({x:.1}, {y:.1})");
}

#[tokio::test]
async fn second_render_serves_tiles_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let (compositor, calls) = compositor(&dir);
    let req = request(TRACK, 512, 512);

    let first = compositor.render(&req).await.unwrap();
    let fetches = calls.load(Ordering::SeqCst);
    assert!(fetches > 0);

    let second = compositor.render(&req).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), fetches, "no refetch expected");
    assert_eq!(first.data, second.data);
}

#[tokio::test]
async fn disk_cache_is_shared_across_compositors() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(TRACK, 512, 512);

    let (first_compositor, first_calls) = compositor(&dir);
    first_compositor.render(&req).await.unwrap();
    let fetches = first_calls.load(Ordering::SeqCst);

    // Fresh compositor over the same cache root: everything comes from disk
    let (second_compositor, second_calls) = compositor(&dir);
    second_compositor.render(&req).await.unwrap();
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert!(fetches > 0);
}

#[tokio::test]
async fn single_point_geometry_terminates_and_renders() {
    let dir = tempfile::tempdir().unwrap();
    let (compositor, _) = compositor(&dir);

    let doc = r#"{"type":"LineString","coordinates":[[2.257921,48.585854]]}"#;
    let output = compositor.render(&request(doc, 256, 256)).await.unwrap();

    // Degenerate bbox selects the deepest zoom and still produces an image
    assert_eq!(output.zoom, 18);
    let img = image::load_from_memory(&output.data).unwrap();
    assert_eq!(img.width(), 256);
    assert_eq!(img.height(), 256);
}

#[tokio::test]
async fn empty_geometry_is_rejected_before_any_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let (compositor, calls) = compositor(&dir);

    let geometry = Geometry::from_geojson(r#"{"type":"LineString","coordinates":[]}"#);
    assert!(geometry.is_err());

    // Even a hand-built empty geometry fails before touching the network
    let mut req = request(TRACK, 64, 64);
    req.geometry = Geometry::LineString(vec![]);
    assert!(compositor.render(&req).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn tile_files_land_in_provider_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let (compositor, _) = compositor(&dir);

    let output = compositor.render(&request(TRACK, 512, 512)).await.unwrap();

    let zoom_dir = dir.path().join("OSM").join(output.zoom.to_string());
    assert!(zoom_dir.is_dir(), "expected {} to exist", zoom_dir.display());

    // Every persisted entry is one of the mosaic's tiles
    let mut entries = 0;
    for x_dir in std::fs::read_dir(&zoom_dir).unwrap() {
        for tile_file in std::fs::read_dir(x_dir.unwrap().path()).unwrap() {
            let name = tile_file.unwrap().file_name();
            assert!(name.to_string_lossy().ends_with(".png"));
            entries += 1;
        }
    }
    assert!(entries > 0);
}
