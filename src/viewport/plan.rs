//! Viewport and tile-matrix planning.

use crate::mercator::{
    project, unproject, BoundingBox, PixelCoord, TILE_SIZE,
};

/// One cell of the tile matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixCell {
    /// Column within the mosaic (0 = westmost)
    pub col: u32,
    /// Row within the mosaic (0 = northmost)
    pub row: u32,
    /// Tile column in the global grid
    pub tile_x: i32,
    /// Tile row in the global grid
    pub tile_y: i32,
}

/// The rectangular grid of tiles covering a viewport.
///
/// Owns no pixel data; it is a plan enumerated lazily in row-major order
/// (north to south, then west to east). Iteration is restartable: `cells()`
/// returns a fresh iterator each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMatrix {
    pub min_x: i32,
    pub min_y: i32,
    pub cols: u32,
    pub rows: u32,
}

impl TileMatrix {
    /// Build the inclusive grid `[min_x, max_x] x [min_y, max_y]`.
    pub fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        debug_assert!(max_x >= min_x && max_y >= min_y);
        Self {
            min_x,
            min_y,
            cols: (max_x - min_x + 1) as u32,
            rows: (max_y - min_y + 1) as u32,
        }
    }

    /// Number of tiles in the grid.
    pub fn len(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mosaic size in pixels (`cols * 256 x rows * 256`).
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.cols * TILE_SIZE, self.rows * TILE_SIZE)
    }

    /// Whether the global tile index `(x, y)` falls inside the grid.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x
            && y >= self.min_y
            && ((x - self.min_x) as u32) < self.cols
            && ((y - self.min_y) as u32) < self.rows
    }

    /// Iterate over the grid in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = MatrixCell> + '_ {
        let (min_x, min_y) = (self.min_x, self.min_y);
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| {
            (0..cols).map(move |col| MatrixCell {
                col,
                row,
                tile_x: min_x + col as i32,
                tile_y: min_y + row as i32,
            })
        })
    }
}

/// A planned viewport: what the output image will actually display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Zoom level the plan was computed at
    pub zoom: u8,
    /// Geographic bounds of the visible area (centered on the input bbox,
    /// generally larger than it)
    pub render_bounds: BoundingBox,
    /// Tiles covering the viewport
    pub tiles: TileMatrix,
    /// Pixel offset of the viewport's northwest corner within the mosaic;
    /// the crop anchor
    pub origin: PixelCoord,
}

/// Plan the viewport for a bounding box at a fixed zoom and output size.
///
/// The viewport is centered on the box's geographic midpoint and spans
/// exactly `width x height` world pixels, so its bounds are generally wider
/// than the input box. The tile matrix is the inclusive grid between the
/// floored tile indices of the two viewport corners.
pub fn plan_viewport(bbox: &BoundingBox, zoom: u8, width: u32, height: u32) -> Viewport {
    let center = project(bbox.center(), zoom).pixel();

    let top_left = PixelCoord::new(
        center.x - width as f64 / 2.0,
        center.y - height as f64 / 2.0,
    );
    let bottom_right = PixelCoord::new(
        center.x + width as f64 / 2.0,
        center.y + height as f64 / 2.0,
    );

    let nw = unproject(top_left.tile(zoom));
    let se = unproject(bottom_right.tile(zoom));
    let render_bounds = BoundingBox::new(nw.lon, se.lon, se.lat, nw.lat);

    let (nw_x, nw_y) = project(render_bounds.northwest, zoom).tile_index();
    let (se_x, se_y) = project(render_bounds.southeast, zoom).tile_index();

    let tiles = TileMatrix::new(
        nw_x.min(se_x),
        nw_x.max(se_x),
        nw_y.min(se_y),
        nw_y.max(se_y),
    );

    let nw_pixel = project(render_bounds.northwest, zoom).pixel();
    let origin = PixelCoord::new(
        nw_pixel.x - (tiles.min_x as f64) * TILE_SIZE as f64,
        nw_pixel.y - (tiles.min_y as f64) * TILE_SIZE as f64,
    );

    Viewport {
        zoom,
        render_bounds,
        tiles,
        origin,
    }
}

// =============================================================================
// Tests
// =============================================================================
