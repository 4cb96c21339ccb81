//! Raster canvas.
//!
//! A mutable RGBA surface owned by one render: tiles are composited onto
//! it, the geometry and attribution are drawn over them, then the surface
//! is cropped and encoded. Built on the `image` and `imageproc` crates.

use ab_glyph::{FontArc, PxScale};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut, text_size};
use std::io::Cursor;

use crate::error::RenderError;
use crate::render::OutputFormat;

/// The canvas background before any tile lands; visible only if a provider
/// serves undersized tiles.
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A W x H RGBA drawing surface.
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Allocate a surface filled with the background color.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Decode encoded tile bytes into an RGBA image.
    pub fn decode_tile(data: &[u8]) -> Result<RgbaImage, String> {
        image::load_from_memory(data)
            .map(|img| img.to_rgba8())
            .map_err(|e| e.to_string())
    }

    /// Composite a decoded image at `(x, y)`, replacing whatever is there.
    pub fn composite(&mut self, tile: &RgbaImage, x: i64, y: i64) {
        imageops::replace(&mut self.image, tile, x, y);
    }

    /// Alpha-blend a decoded image at `(x, y)` with the given opacity.
    ///
    /// The tile's own alpha channel is scaled by `opacity` before blending,
    /// so fully opaque overlay pixels end up `opacity`-transparent over the
    /// base layer.
    pub fn composite_blend(&mut self, tile: &RgbaImage, x: i64, y: i64, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        let mut faded = tile.clone();
        for pixel in faded.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
        }
        imageops::overlay(&mut self.image, &faded, x, y);
    }

    /// Stroke a polyline through `points`, optionally closing it back to
    /// the first point. Fill is always transparent; only the outline is
    /// drawn.
    pub fn stroke_polyline(
        &mut self,
        points: &[(f32, f32)],
        closed: bool,
        stroke_width: u32,
        color: [u8; 4],
    ) {
        if points.len() < 2 {
            return;
        }

        let color = Rgba(color);
        let mut segments: Vec<((f32, f32), (f32, f32))> =
            points.windows(2).map(|w| (w[0], w[1])).collect();
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if closed && first != last {
                segments.push((last, first));
            }
        }

        // Thickness by drawing the segment at small orthogonal offsets;
        // good enough for the 1-4px strokes used here.
        let half = stroke_width as i32 / 2;
        let offsets = -half..=(stroke_width as i32 - 1 - half);
        for offset in offsets {
            let d = offset as f32;
            for &(a, b) in &segments {
                draw_line_segment_mut(&mut self.image, (a.0 + d, a.1), (b.0 + d, b.1), color);
                draw_line_segment_mut(&mut self.image, (a.0, a.1 + d), (b.0, b.1 + d), color);
            }
        }
    }

    /// Draw a single line of text with its top-left corner at `(x, y)`.
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, font: &FontArc, scale: f32, color: [u8; 4]) {
        draw_text_mut(
            &mut self.image,
            Rgba(color),
            x,
            y,
            PxScale::from(scale),
            font,
            text,
        );
    }

    /// Measure a line of text at `scale`, in pixels.
    pub fn measure_text(text: &str, font: &FontArc, scale: f32) -> (u32, u32) {
        text_size(PxScale::from(scale), font, text)
    }

    /// Crop to the `width x height` rectangle anchored at `(x, y)`.
    ///
    /// The rectangle is clamped to the surface; callers plan mosaics large
    /// enough that clamping never triggers in practice.
    pub fn crop(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let x = x.min(self.image.width().saturating_sub(1));
        let y = y.min(self.image.height().saturating_sub(1));
        let width = width.min(self.image.width() - x);
        let height = height.min(self.image.height() - y);
        self.image = imageops::crop_imm(&self.image, x, y, width, height).to_image();
    }

    /// Encode the surface to the requested raster format.
    pub fn encode(&self, format: OutputFormat, jpeg_quality: u8) -> Result<Bytes, RenderError> {
        let mut buffer = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = image::DynamicImage::ImageRgba8(self.image.clone()).to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| RenderError::Encode {
                        message: e.to_string(),
                    })?;
            }
            OutputFormat::Png => {
                self.image
                    .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
                    .map_err(|e| RenderError::Encode {
                        message: e.to_string(),
                    })?;
            }
        }
        Ok(Bytes::from(buffer))
    }

    /// Borrow the underlying pixel buffer (used by tests).
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}

// =============================================================================
// Tests
// =============================================================================
