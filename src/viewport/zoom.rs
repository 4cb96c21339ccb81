//! Zoom level selection.

use tracing::debug;

use crate::mercator::{project, BoundingBox, MAX_ZOOM, MIN_ZOOM, TILE_SIZE};

/// Projected size of a bounding box in world pixels at `zoom`.
///
/// Width is measured along the box's top edge, height along its left edge;
/// both are equal to the opposite edges under Mercator since the projection
/// maps each axis independently.
pub fn bbox_pixel_size(bbox: &BoundingBox, zoom: u8) -> (f64, f64) {
    let top_left = project(bbox.northwest, zoom);
    let top_right = project(bbox.northeast(), zoom);
    let bottom_left = project(bbox.southwest(), zoom);

    let width = (top_right.x - top_left.x).abs() * TILE_SIZE as f64;
    let height = (bottom_left.y - top_left.y).abs() * TILE_SIZE as f64;

    (width, height)
}

/// Pick the most detailed zoom level whose projected bounding box fits the
/// target output size.
///
/// Scans downward from [`MAX_ZOOM`], so the result is the largest zoom for
/// which `width * multiplier <= target_width` and `height * multiplier <=
/// target_height`. Falls back to [`MIN_ZOOM`] when nothing fits. The scan
/// terminates for degenerate (zero-extent) boxes at [`MAX_ZOOM`] because a
/// zero-size box fits any target.
///
/// The projected size is monotonically non-decreasing in zoom, so a linear
/// scan finds the maximal fitting zoom.
pub fn select_zoom(
    bbox: &BoundingBox,
    target_width: u32,
    target_height: u32,
    zoom_multiplier: f64,
) -> u8 {
    let mut zoom = MAX_ZOOM;
    let (mut width, mut height) = bbox_pixel_size(bbox, zoom);

    while (width * zoom_multiplier > target_width as f64
        || height * zoom_multiplier > target_height as f64)
        && zoom > MIN_ZOOM
    {
        zoom -= 1;
        (width, height) = bbox_pixel_size(bbox, zoom);
        debug!(zoom, width, height, "zoom candidate");
    }

    zoom
}

// =============================================================================
// Tests
// =============================================================================
