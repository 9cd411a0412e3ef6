use crate::GridError;
use geo::geometry::{Coord, Rect};
use std::fmt;

/// Base floating point type used for all coordinates.
pub type C = f64;

/// Coordinate reference system of a [Grid].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Geographic lon/lat degrees.
    Wgs84,
    /// Spherical web mercator meters.
    WebMercator,
}

impl Crs {
    pub fn code(self) -> u8 {
        match self {
            Self::Wgs84 => 0,
            Self::WebMercator => 1,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, GridError> {
        match code {
            0 => Ok(Self::Wgs84),
            1 => Ok(Self::WebMercator),
            other => Err(GridError::Crs(other)),
        }
    }

    pub fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// The spatial domain shared by every band combined in one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    /// Northwest corner of the grid.
    ///
    /// Specifically, the outer _edge_ of the NW most cell, not its
    /// center.
    nw_corner: Coord<C>,

    /// Cell (width, height) in CRS units.
    cell_size: (C, C),

    /// Number of (rows, columns) in this grid.
    dimensions: (usize, usize),

    crs: Crs,
}

impl Grid {
    pub fn new(nw_corner: Coord<C>, cell_size: (C, C), dimensions: (usize, usize), crs: Crs) -> Self {
        Self {
            nw_corner,
            cell_size,
            dimensions,
            crs,
        }
    }

    pub fn nw_corner(&self) -> Coord<C> {
        self.nw_corner
    }

    pub fn cell_size(&self) -> (C, C) {
        self.cell_size
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    pub fn rows(&self) -> usize {
        self.dimensions.0
    }

    pub fn cols(&self) -> usize {
        self.dimensions.1
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Returns the number of cells in this grid.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.dimensions.0 * self.dimensions.1
    }

    /// Returns the outer bounds of the grid.
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(&self) -> Rect<C> {
        let (cw, ch) = self.cell_size;
        let (rows, cols) = self.dimensions;
        let se_corner = Coord {
            x: self.nw_corner.x + cols as C * cw,
            y: self.nw_corner.y - rows as C * ch,
        };
        Rect::new(self.nw_corner, se_corner)
    }

    /// Returns the (row, col) of the cell containing `coord`, if any.
    pub fn coord_to_rc(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        let (cw, ch) = self.cell_size;
        let col = ((coord.x - self.nw_corner.x) / cw).floor();
        let row = ((self.nw_corner.y - coord.y) / ch).floor();
        #[allow(clippy::cast_precision_loss)]
        if 0.0 <= row && row < self.rows() as C && 0.0 <= col && col < self.cols() as C {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some((row as usize, col as usize))
        } else {
            None
        }
    }

    /// Returns the center of cell `(row, col)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_center(&self, (row, col): (usize, usize)) -> Coord<C> {
        let (cw, ch) = self.cell_size;
        Coord {
            x: self.nw_corner.x + (col as C + 0.5) * cw,
            y: self.nw_corner.y - (row as C + 0.5) * ch,
        }
    }

    pub fn rc_to_linear_index(&self, (row, col): (usize, usize)) -> usize {
        row * self.dimensions.1 + col
    }

    pub fn linear_index_to_rc(&self, idx: usize) -> (usize, usize) {
        (idx / self.dimensions.1, idx % self.dimensions.1)
    }

    /// Returns `true` if `other` covers the same cells as `self`.
    ///
    /// Origins and cell sizes are compared to within a billionth of a
    /// cell to tolerate values that went through decimal text.
    pub fn is_aligned_with(&self, other: &Self) -> bool {
        let eps = 1e-9 * self.cell_size.0.abs().max(self.cell_size.1.abs());
        let close = |a: C, b: C| (a - b).abs() <= eps;
        self.dimensions == other.dimensions
            && self.crs == other.crs
            && close(self.nw_corner.x, other.nw_corner.x)
            && close(self.nw_corner.y, other.nw_corner.y)
            && close(self.cell_size.0, other.cell_size.0)
            && close(self.cell_size.1, other.cell_size.1)
    }
}
