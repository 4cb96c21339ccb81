//! Mosaic rendering.
//!
//! Turns a parsed geometry plus a [`RenderRequest`] into encoded image
//! bytes: pick a zoom, plan the viewport, assemble the tile mosaic, stroke
//! the geometry, stamp the attribution, crop, encode.
//!
//! # Components
//!
//! - [`RenderRequest`]: immutable per-render configuration
//! - [`MosaicCompositor`]: the pipeline orchestrator
//! - [`Canvas`]: the mutable raster surface (one per render, never shared)

mod canvas;
mod compositor;

pub use canvas::Canvas;
pub use compositor::{MosaicCompositor, RenderOutput};

use std::path::PathBuf;
use std::str::FromStr;

use crate::geojson::Geometry;
use crate::tile::TileProvider;

/// Default output edge length in pixels.
pub const DEFAULT_OUTPUT_SIZE: u32 = 1024;

/// Default JPEG quality for encoded renders.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Opacity applied to overlay tiles when blending them over the base
/// layer. Visually tuned; kept as a constant rather than inferred.
pub const OVERLAY_OPACITY: f32 = 0.5;

/// Inset of the attribution label from the viewport's bottom-right corner.
pub const ATTRIBUTION_MARGIN: u32 = 8;

/// Pixel scale of the attribution label.
pub const ATTRIBUTION_SCALE: f32 = 14.0;

/// Output raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("unknown format '{other}' (expected jpeg or png)")),
        }
    }
}

/// Stroke style for the geometry outline. Fill is always transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeStyle {
    /// Stroke width in pixels
    pub width: u32,
    /// RGBA stroke color
    pub color: [u8; 4],
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 2,
            color: [255, 0, 0, 255], // red
        }
    }
}

/// Attribution label configuration.
///
/// The label is anchored to the bottom-right of the render viewport. No
/// font is bundled with the crate; when neither `font_path` nor one of the
/// probed system fonts is available, the label is skipped with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    /// Label text; an empty string disables the label
    pub text: String,
    /// Explicit TTF/OTF font path; system locations are probed when unset
    pub font_path: Option<PathBuf>,
}

impl Default for Attribution {
    fn default() -> Self {
        Self {
            text: "© OpenStreetMap contributors".to_string(),
            font_path: None,
        }
    }
}

/// Everything one render needs, fixed for its whole duration.
///
/// Replaces the mutable process-wide render state of older designs with an
/// explicit immutable value passed into the compositor.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Geometry to draw
    pub geometry: Geometry,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Scale factor applied to the projected bbox during zoom selection;
    /// values > 1 zoom out
    pub zoom_multiplier: f64,
    /// Base map provider
    pub base_provider: TileProvider,
    /// Optional overlay provider, blended at [`OVERLAY_OPACITY`]
    pub overlay_provider: Option<TileProvider>,
    /// Geometry stroke style
    pub stroke: StrokeStyle,
    /// Attribution label
    pub attribution: Attribution,
    /// JPEG quality when encoding to JPEG
    pub jpeg_quality: u8,
    /// Explicit output format; derived from the geometry kind when unset
    pub format: Option<OutputFormat>,
}

impl RenderRequest {
    /// Build a request with default settings for `geometry`.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            width: DEFAULT_OUTPUT_SIZE,
            height: DEFAULT_OUTPUT_SIZE,
            zoom_multiplier: 1.0,
            base_provider: TileProvider::osm(),
            overlay_provider: None,
            stroke: StrokeStyle::default(),
            attribution: Attribution::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            format: None,
        }
    }

    /// The effective output format: the explicit one if set, otherwise
    /// JPEG for line tracks and PNG for polygon renders.
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or(match self.geometry {
            Geometry::LineString(_) => OutputFormat::Jpeg,
            Geometry::MultiPolygon(_) => OutputFormat::Png,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert!("webp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_default_format_follows_geometry() {
        let track = Geometry::LineString(vec![crate::mercator::GeoPoint::new(0.0, 0.0)]);
        let polygon = Geometry::MultiPolygon(vec![vec![vec![
            crate::mercator::GeoPoint::new(0.0, 0.0),
        ]]]);

        assert_eq!(
            RenderRequest::new(track).output_format(),
            OutputFormat::Jpeg
        );
        assert_eq!(
            RenderRequest::new(polygon).output_format(),
            OutputFormat::Png
        );
    }

    #[test]
    fn test_explicit_format_wins() {
        let track = Geometry::LineString(vec![crate::mercator::GeoPoint::new(0.0, 0.0)]);
        let mut request = RenderRequest::new(track);
        request.format = Some(OutputFormat::Png);
        assert_eq!(request.output_format(), OutputFormat::Png);
    }
}
