//! Gridded raster bands for climate and soil data.
//!
//! A [Band] is an immutable, named field of `f32` samples over a
//! [Grid]. Bands are loaded from (or written to) the `.band` file
//! format described in the `codec` module, and combined with simple
//! cell-wise algebra. Predicates over a band produce a [Mask].
//!
//! Every binary operation checks that its operands share a grid and
//! fails with [GridError::Mismatch] otherwise; nothing is ever
//! reprojected or resampled implicitly.

mod band;
mod codec;
mod error;
mod grid;
mod mask;

pub use crate::{
    band::Band,
    error::GridError,
    grid::{Crs, Grid, C},
    mask::{Mask, SelfMasked},
};
pub use geo;
