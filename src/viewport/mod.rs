//! Viewport planning: zoom selection and tile-grid derivation.
//!
//! Given the geometry's bounding box and a requested output size, this
//! module picks the most detailed zoom level that still fits the output
//! ([`select_zoom`]), then derives the centered viewport: its geographic
//! bounds, the rectangular matrix of tiles covering it, and the pixel
//! offset used later to crop the mosaic ([`plan_viewport`]).

mod plan;
mod zoom;

pub use plan::{plan_viewport, MatrixCell, TileMatrix, Viewport};
pub use zoom::{bbox_pixel_size, select_zoom};
