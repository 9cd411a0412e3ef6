use crate::{Band, Grid, GridError, C};
use geo::geometry::Coord;
use rayon::prelude::*;

/// A boolean layer over a [Grid].
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    name: String,
    grid: Grid,
    cells: Box<[bool]>,
}

impl Mask {
    pub fn new<S: Into<String>>(name: S, grid: Grid, cells: Vec<bool>) -> Result<Self, GridError> {
        if cells.len() != grid.len() {
            return Err(GridError::SampleCount {
                got: cells.len(),
                rows: grid.rows(),
                cols: grid.cols(),
            });
        }
        Ok(Self::from_cells(name.into(), grid, cells.into_boxed_slice()))
    }

    pub(crate) fn from_cells(name: String, grid: Grid, cells: Box<[bool]>) -> Self {
        debug_assert_eq!(cells.len(), grid.len());
        Self { name, grid, cells }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Returns the number of `true` cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    pub fn get(&self, coord: Coord<C>) -> Option<bool> {
        self.grid.coord_to_rc(coord).map(|rc| self.get_rc(rc))
    }

    /// # Panics
    ///
    /// Panics if `(row, col)` lies outside the grid.
    pub fn get_rc(&self, rc: (usize, usize)) -> bool {
        assert!(rc.0 < self.grid.rows() && rc.1 < self.grid.cols());
        self.cells[self.grid.rc_to_linear_index(rc)]
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.cells.iter().copied()
    }

    /// Cell-wise logical AND of `self` and `other`.
    pub fn and<S: Into<String>>(&self, other: &Self, name: S) -> Result<Self, GridError> {
        Self::all(name, &[self, other])
    }

    /// Cell-wise logical AND of every mask in `masks`.
    pub fn all<S: Into<String>>(name: S, masks: &[&Self]) -> Result<Self, GridError> {
        let (first, rest) = masks.split_first().ok_or(GridError::Empty)?;
        for mask in rest {
            if !first.grid.is_aligned_with(&mask.grid) {
                return Err(GridError::Mismatch(
                    first.name.clone(),
                    mask.name.clone(),
                ));
            }
        }
        let cells: Vec<bool> = (0..first.cells.len())
            .into_par_iter()
            .map(|index| masks.iter().all(|mask| mask.cells[index]))
            .collect();
        Ok(Self::from_cells(name.into(), first.grid, cells.into_boxed_slice()))
    }

    /// Marks `false` cells as no-data.
    pub fn self_mask(self) -> SelfMasked {
        SelfMasked(self)
    }
}

/// A [Mask] whose `false` cells carry no signal.
///
/// Masked cells are neither zero nor "unsuitable" to a consumer; they
/// are simply absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfMasked(Mask);

impl SelfMasked {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn grid(&self) -> &Grid {
        self.0.grid()
    }

    /// Returns `Some(1)` for an unmasked cell, `None` otherwise.
    pub fn get_rc(&self, rc: (usize, usize)) -> Option<u8> {
        self.0.get_rc(rc).then_some(1)
    }

    pub fn get(&self, coord: Coord<C>) -> Option<u8> {
        self.0.get(coord).and_then(|cell| cell.then_some(1))
    }

    /// Returns the number of unmasked cells.
    pub fn count(&self) -> usize {
        self.0.count()
    }

    /// Returns an iterator over cell values, north row first.
    pub fn iter(&self) -> impl Iterator<Item = Option<u8>> + '_ {
        self.0.iter().map(|cell| cell.then_some(1))
    }

    /// Returns the layer as a band of `1.0` and `NaN`.
    pub fn to_band(&self) -> Band {
        let samples: Vec<f32> = self
            .0
            .cells
            .par_iter()
            .map(|cell| if *cell { 1.0 } else { f32::NAN })
            .collect();
        Band::from_samples(self.name().to_owned(), *self.grid(), samples.into_boxed_slice())
    }
}
