//! Configuration management.
//!
//! Command-line arguments via clap, with environment-variable overrides
//! under the `TRACKMAP_` prefix and sensible defaults for everything but
//! the input document.
//!
//! # Environment Variables
//!
//! - `TRACKMAP_WIDTH` / `TRACKMAP_HEIGHT` - output size (default: 1024)
//! - `TRACKMAP_CACHE_DIR` - tile cache root (default: ./cache)
//! - `TRACKMAP_TILE_URL` - base provider URL template
//! - `TRACKMAP_OVERLAY_URL` - overlay provider URL template
//! - `TRACKMAP_JPEG_QUALITY` - JPEG quality (default: 90)
//! - `TRACKMAP_FONT` - TTF/OTF font for the attribution label

use std::path::PathBuf;

use clap::Parser;

use crate::geojson::Geometry;
use crate::render::{
    Attribution, OutputFormat, RenderRequest, StrokeStyle, DEFAULT_JPEG_QUALITY,
    DEFAULT_OUTPUT_SIZE,
};
use crate::tile::{TileProvider, OSM_PROVIDER_ID, OSM_URL_TEMPLATE};

/// Default cache root, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Default stroke color (red, fully opaque).
pub const DEFAULT_STROKE_COLOR: &str = "#ff0000";

/// trackmap - render a GeoJSON track or polygon onto a street-map mosaic.
///
/// Reads a GeoJSON `LineString` or `MultiPolygon`, downloads the covering
/// OpenStreetMap tiles (caching them on disk), draws the geometry on top
/// and writes a single cropped raster image.
#[derive(Parser, Debug, Clone)]
#[command(name = "trackmap")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// GeoJSON input file, or `-` to read from stdin.
    pub input: PathBuf,

    /// Output image path; the extension is derived from the output format
    /// when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    // =========================================================================
    // Output Configuration
    // =========================================================================
    /// Output width in pixels.
    #[arg(long, default_value_t = DEFAULT_OUTPUT_SIZE, env = "TRACKMAP_WIDTH")]
    pub width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = DEFAULT_OUTPUT_SIZE, env = "TRACKMAP_HEIGHT")]
    pub height: u32,

    /// Output format (jpeg or png). Defaults to JPEG for line tracks and
    /// PNG for polygon renders.
    #[arg(long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "TRACKMAP_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    // =========================================================================
    // Tile Provider Configuration
    // =========================================================================
    /// Base provider id; namespaces the tile cache.
    #[arg(long, default_value = OSM_PROVIDER_ID, env = "TRACKMAP_PROVIDER")]
    pub provider: String,

    /// Base provider URL template with {z}/{x}/{y} placeholders.
    #[arg(long, default_value = OSM_URL_TEMPLATE, env = "TRACKMAP_TILE_URL")]
    pub tile_url: String,

    /// Overlay provider id.
    #[arg(long, requires = "overlay_url", env = "TRACKMAP_OVERLAY_PROVIDER")]
    pub overlay_provider: Option<String>,

    /// Overlay provider URL template; blended semi-transparently over the
    /// base layer.
    #[arg(long, requires = "overlay_provider", env = "TRACKMAP_OVERLAY_URL")]
    pub overlay_url: Option<String>,

    /// Tile cache root directory.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "TRACKMAP_CACHE_DIR")]
    pub cache_dir: PathBuf,

    // =========================================================================
    // Rendering Configuration
    // =========================================================================
    /// Zoom multiplier; values above 1 zoom the map out.
    #[arg(long, default_value_t = 1.0, env = "TRACKMAP_ZOOM_MULTIPLIER")]
    pub zoom_multiplier: f64,

    /// Stroke width in pixels.
    #[arg(long, default_value_t = 2)]
    pub stroke_width: u32,

    /// Stroke color as #rrggbb or #rrggbbaa.
    #[arg(long, default_value = DEFAULT_STROKE_COLOR)]
    pub stroke_color: String,

    /// Attribution text; pass an empty string to disable the label.
    #[arg(long, default_value = "© OpenStreetMap contributors")]
    pub attribution: String,

    /// TTF/OTF font file for the attribution label; common system
    /// locations are probed when unset.
    #[arg(long, env = "TRACKMAP_FONT")]
    pub font: Option<PathBuf>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("width and height must be greater than 0".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if !(self.zoom_multiplier.is_finite() && self.zoom_multiplier > 0.0) {
            return Err("zoom_multiplier must be a positive number".to_string());
        }

        if self.stroke_width == 0 {
            return Err("stroke_width must be greater than 0".to_string());
        }

        parse_color(&self.stroke_color)?;

        self.base_provider().validate()?;
        if let Some(overlay) = self.overlay() {
            overlay.validate()?;
            if overlay.id == self.provider {
                return Err(
                    "overlay provider id must differ from the base provider id".to_string()
                );
            }
        }

        Ok(())
    }

    /// The configured base provider.
    pub fn base_provider(&self) -> TileProvider {
        TileProvider::new(self.provider.clone(), self.tile_url.clone())
    }

    /// The configured overlay provider, if any.
    pub fn overlay(&self) -> Option<TileProvider> {
        match (&self.overlay_provider, &self.overlay_url) {
            (Some(id), Some(url)) => Some(TileProvider::new(id.clone(), url.clone())),
            _ => None,
        }
    }

    /// Build the immutable render request for a parsed geometry.
    ///
    /// Call [`Config::validate`] first; this assumes the stroke color
    /// parses.
    pub fn to_request(&self, geometry: Geometry) -> Result<RenderRequest, String> {
        let color = parse_color(&self.stroke_color)?;

        Ok(RenderRequest {
            geometry,
            width: self.width,
            height: self.height,
            zoom_multiplier: self.zoom_multiplier,
            base_provider: self.base_provider(),
            overlay_provider: self.overlay(),
            stroke: StrokeStyle {
                width: self.stroke_width,
                color,
            },
            attribution: Attribution {
                text: self.attribution.clone(),
                font_path: self.font.clone(),
            },
            jpeg_quality: self.jpeg_quality,
            format: self.format,
        })
    }

    /// The output path: explicit if given, otherwise `map.jpg`/`map.png`
    /// next to the working directory.
    pub fn output_path(&self, format: OutputFormat) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => PathBuf::from(match format {
                OutputFormat::Jpeg => "map.jpg",
                OutputFormat::Png => "map.png",
            }),
        }
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

/// Parse a `#rrggbb` or `#rrggbbaa` color into RGBA bytes.
pub fn parse_color(s: &str) -> Result<[u8; 4], String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 && hex.len() != 8 {
        return Err(format!("invalid color '{s}' (expected #rrggbb or #rrggbbaa)"));
    }

    let byte = |i: usize| -> Result<u8, String> {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| format!("invalid color '{s}' (bad hex digit)"))
    };

    Ok([
        byte(0)?,
        byte(2)?,
        byte(4)?,
        if hex.len() == 8 { byte(6)? } else { 255 },
    ])
}

// =============================================================================
// Tests
// =============================================================================
