//! `.band` file header.
//!
//! ```text
//! offset  size  field
//!      0     4  magic "CSB1"
//!      4     4  rows (u32)
//!      8     4  cols (u32)
//!     12     8  west edge (f64)
//!     20     8  north edge (f64)
//!     28     8  cell width (f64)
//!     36     8  cell height (f64)
//!     44     1  crs code
//!     45     3  padding
//!     48   4*n  samples (f32), north row first
//! ```
//!
//! All fields are little endian.

use crate::{Crs, Grid, GridError};
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use geo::geometry::Coord;
use std::{
    io::{Read, Write},
    mem::size_of,
    path::Path,
};

pub(crate) const MAGIC: &[u8; 4] = b"CSB1";
pub(crate) const HEADER_LEN: usize = 48;
pub(crate) const SAMPLE_LEN: usize = size_of::<f32>();

pub(crate) fn read_header<R: Read>(mut rdr: R, path: &Path) -> Result<Grid, GridError> {
    let mut magic = [0_u8; 4];
    rdr.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(GridError::Magic(path.to_owned()));
    }
    let rows = rdr.read_u32::<LE>()? as usize;
    let cols = rdr.read_u32::<LE>()? as usize;
    let west = rdr.read_f64::<LE>()?;
    let north = rdr.read_f64::<LE>()?;
    let cell_w = rdr.read_f64::<LE>()?;
    let cell_h = rdr.read_f64::<LE>()?;
    let crs = Crs::from_code(rdr.read_u8()?)?;
    let mut padding = [0_u8; 3];
    rdr.read_exact(&mut padding)?;
    let invalid = |reason: String| GridError::Header(reason, path.to_owned());
    if rows == 0 || cols == 0 {
        return Err(invalid(format!("empty {rows}x{cols} grid")));
    }
    if !(cell_w.is_finite() && cell_w > 0.0 && cell_h.is_finite() && cell_h > 0.0) {
        return Err(invalid(format!("cell size {cell_w}x{cell_h}")));
    }
    if !(west.is_finite() && north.is_finite()) {
        return Err(invalid(format!("corner ({west}, {north})")));
    }
    Ok(Grid::new(
        Coord { x: west, y: north },
        (cell_w, cell_h),
        (rows, cols),
        crs,
    ))
}

pub(crate) fn write_header<W: Write>(mut wtr: W, grid: &Grid) -> std::io::Result<()> {
    let Coord { x: west, y: north } = grid.nw_corner();
    let (cell_w, cell_h) = grid.cell_size();
    let to_u32 = |n: usize| {
        u32::try_from(n).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    };
    wtr.write_all(MAGIC)?;
    wtr.write_u32::<LE>(to_u32(grid.rows())?)?;
    wtr.write_u32::<LE>(to_u32(grid.cols())?)?;
    wtr.write_f64::<LE>(west)?;
    wtr.write_f64::<LE>(north)?;
    wtr.write_f64::<LE>(cell_w)?;
    wtr.write_f64::<LE>(cell_h)?;
    wtr.write_u8(grid.crs().code())?;
    wtr.write_all(&[0_u8; 3])?;
    Ok(())
}

/// Returns the exact file length a band on `grid` must have, or
/// `None` if it is not addressable.
pub(crate) fn expected_len(grid: &Grid) -> Option<u64> {
    let rows = u64::try_from(grid.rows()).ok()?;
    let cols = u64::try_from(grid.cols()).ok()?;
    let len = rows
        .checked_mul(cols)?
        .checked_mul(SAMPLE_LEN as u64)?
        .checked_add(HEADER_LEN as u64)?;
    // Every sample offset must also fit in memory.
    usize::try_from(len).ok()?;
    Some(len)
}
