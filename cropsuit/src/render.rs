//! PNG overlays of composite layers.

use anyhow::{anyhow, bail, Error as AnyError};
use climgrid::{Grid, SelfMasked};
use log::debug;
use plotters::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use suitability::{Composite, Rgb, Scenario};

/// Returns the pixel (width, height) for drawing `grid` `width`
/// pixels wide.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn canvas_size(grid: &Grid, width: u32) -> (u32, u32) {
    let width = width.max(1);
    let height = (f64::from(width) * grid.rows() as f64 / grid.cols() as f64).round();
    (width, (height as u32).max(1))
}

/// Returns the (row, col) drawn at pixel `(x, y)`.
#[allow(clippy::cast_possible_truncation)]
fn cell_at(grid: &Grid, (width, height): (u32, u32), (x, y): (u32, u32)) -> (usize, usize) {
    let row = u64::from(y) * grid.rows() as u64 / u64::from(height);
    let col = u64::from(x) * grid.cols() as u64 / u64::from(width);
    (row as usize, col as usize)
}

/// Draws `layers` in order onto one PNG at `path`.
///
/// Masked cells are left as background, so later layers only cover
/// earlier ones where they are suitable.
pub fn draw(path: &Path, width: u32, layers: &[(&SelfMasked, Rgb)]) -> Result<(), AnyError> {
    let Some((first, _)) = layers.first() else {
        bail!("nothing to draw");
    };
    let grid = first.grid();
    if grid.rows() == 0 || grid.cols() == 0 {
        bail!("'{}' has an empty {}x{} grid", first.name(), grid.rows(), grid.cols());
    }
    if let Some((other, _)) = layers
        .iter()
        .find(|(layer, _)| !layer.grid().is_aligned_with(grid))
    {
        bail!(
            "'{}' and '{}' are not on the same grid",
            first.name(),
            other.name()
        );
    }

    let size = canvas_size(grid, width);
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("{e}"))?;
    for y in 0..size.1 {
        for x in 0..size.0 {
            let rc = cell_at(grid, size, (x, y));
            let top = layers
                .iter()
                .rev()
                .find(|(layer, _)| layer.get_rc(rc).is_some());
            if let Some((_, Rgb(r, g, b))) = top {
                #[allow(clippy::cast_possible_wrap)]
                root.draw_pixel((x as i32, y as i32), &RGBColor(*r, *g, *b))
                    .map_err(|e| anyhow!("{e}"))?;
            }
        }
    }
    root.present().map_err(|e| anyhow!("{e}"))?;
    debug!("wrote {path:?}; {} x {} px", size.0, size.1);
    Ok(())
}

/// Renders each composite, then all of them stacked, into `out_dir`.
///
/// Returns the paths written.
pub fn render_all(
    out_dir: &Path,
    width: u32,
    scenarios: &[Scenario],
    composites: &[Composite],
) -> Result<Vec<PathBuf>, AnyError> {
    fs::create_dir_all(out_dir)?;
    let layers: Vec<(&SelfMasked, Rgb)> = scenarios
        .iter()
        .zip(composites)
        .map(|(scenario, composite)| (composite.layer(), scenario.palette.suitable()))
        .collect();

    let mut written = Vec::with_capacity(layers.len() + 1);
    for (scenario, layer) in scenarios.iter().zip(&layers) {
        let path = out_dir.join(format!("suitability_{}.png", scenario.id));
        draw(&path, width, std::slice::from_ref(layer))?;
        written.push(path);
    }
    let path = out_dir.join("suitability_overlay.png");
    draw(&path, width, &layers)?;
    written.push(path);
    Ok(written)
}
