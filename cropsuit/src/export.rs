//! Web mercator export of a composite layer.

use anyhow::{bail, Error as AnyError};
use climgrid::{Band, Crs, Grid, SelfMasked, C};
use geo::geometry::{Coord, Rect};
use log::debug;
use rayon::prelude::*;
use std::{
    f64::consts::{FRAC_PI_2, FRAC_PI_4},
    path::Path,
};

/// WGS84 semi-major axis (meters), the EPSG:3857 sphere radius.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Projects degrees onto EPSG:3857 meters.
pub fn to_mercator(Coord { x, y }: Coord<C>) -> Coord<C> {
    Coord {
        x: EARTH_RADIUS_M * x.to_radians(),
        y: EARTH_RADIUS_M * (FRAC_PI_4 + y.to_radians() / 2.0).tan().ln(),
    }
}

/// Inverse of [to_mercator].
pub fn from_mercator(Coord { x, y }: Coord<C>) -> Coord<C> {
    Coord {
        x: (x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0 * (y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

/// Returns the EPSG:3857 grid with `scale_m` cells covering `region`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn target_grid(region: Rect<C>, scale_m: f64) -> Result<Grid, AnyError> {
    if !(scale_m.is_finite() && scale_m > 0.0) {
        bail!("scale {scale_m} must be a positive number of meters");
    }
    let sw = to_mercator(region.min());
    let ne = to_mercator(region.max());
    let cols = ((ne.x - sw.x) / scale_m).ceil().max(1.0) as usize;
    let rows = ((ne.y - sw.y) / scale_m).ceil().max(1.0) as usize;
    Ok(Grid::new(
        Coord { x: sw.x, y: ne.y },
        (scale_m, scale_m),
        (rows, cols),
        Crs::WebMercator,
    ))
}

/// Nearest-neighbour resamples `layer` onto `target`.
///
/// Suitable cells become `1.0`; masked cells and cells outside the
/// layer become `NaN`.
pub fn resample(layer: &SelfMasked, target: Grid) -> Result<Band, AnyError> {
    let band = layer.to_band();
    let source_crs = band.grid().crs();
    let samples: Vec<f32> = (0..target.len())
        .into_par_iter()
        .map(|idx| {
            let center = target.cell_center(target.linear_index_to_rc(idx));
            let coord = match (target.crs(), source_crs) {
                (Crs::WebMercator, Crs::Wgs84) => from_mercator(center),
                (Crs::Wgs84, Crs::WebMercator) => to_mercator(center),
                _ => center,
            };
            band.get(coord).unwrap_or(f32::NAN)
        })
        .collect();
    Ok(Band::new(layer.name(), target, samples)?)
}

/// Writes `layer` over `region` at `scale_m` to `out`.
pub fn export(layer: &SelfMasked, region: Rect<C>, scale_m: f64, out: &Path) -> Result<(), AnyError> {
    let target = target_grid(region, scale_m)?;
    debug!(
        "exporting {} to {out:?}; {} x {} cells at {scale_m} m, {}",
        layer.name(),
        target.rows(),
        target.cols(),
        target.crs()
    );
    resample(layer, target)?.write(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{export, from_mercator, resample, target_grid, to_mercator};
    use approx::assert_relative_eq;
    use climgrid::{Band, Crs, Grid, Mask};
    use geo::geometry::{Coord, Rect};

    #[test]
    fn test_mercator() {
        let origin = to_mercator(Coord { x: 0.0, y: 0.0 });
        assert_relative_eq!(origin.x, 0.0);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-9);

        let edge = to_mercator(Coord { x: 180.0, y: 0.0 });
        assert_relative_eq!(edge.x, 20_037_508.342_789_244, epsilon = 1e-6);

        let philly = Coord { x: -75.1652, y: 39.9526 };
        let back = from_mercator(to_mercator(philly));
        assert_relative_eq!(back.x, philly.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, philly.y, epsilon = 1e-9);
    }

    #[test]
    fn test_target_grid() {
        let region = Rect::new(Coord { x: -77.0, y: 39.0 }, Coord { x: -75.0, y: 41.0 });
        let grid = target_grid(region, 250.0).unwrap();
        assert_eq!(grid.crs(), Crs::WebMercator);
        // Two degrees of longitude is ~222.6 km.
        assert_eq!(grid.cols(), 891);
        let bounds = grid.bounds();
        assert!(bounds.min().x <= to_mercator(region.min()).x);
        assert!(bounds.min().y <= to_mercator(region.min()).y);
        assert!(bounds.max().y >= to_mercator(region.max()).y);

        assert!(target_grid(region, 0.0).is_err());
        assert!(target_grid(region, f64::NAN).is_err());
    }

    fn layer() -> climgrid::SelfMasked {
        // West half suitable, east half masked.
        let grid = Grid::new(Coord { x: -77.0, y: 41.0 }, (1.0, 2.0), (1, 2), Crs::Wgs84);
        Mask::new("PRISM (2010)", grid, vec![true, false])
            .unwrap()
            .self_mask()
    }

    #[test]
    fn test_resample() {
        let region = Rect::new(Coord { x: -77.5, y: 39.5 }, Coord { x: -75.0, y: 40.5 });
        let band = resample(&layer(), target_grid(region, 5_000.0).unwrap()).unwrap();
        let sample = |lon: f64, lat: f64| band.get(to_mercator(Coord { x: lon, y: lat })).unwrap();
        assert_eq!(sample(-76.5, 40.0), 1.0);
        assert!(sample(-75.5, 40.0).is_nan());
        // Outside the layer.
        assert!(sample(-77.3, 40.0).is_nan());
    }

    #[test]
    fn test_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current.band");
        let region = Rect::new(Coord { x: -77.0, y: 39.0 }, Coord { x: -75.0, y: 41.0 });
        export(&layer(), region, 10_000.0, &path).unwrap();
        let band = Band::load(&path).unwrap();
        assert_eq!(band.grid().crs(), Crs::WebMercator);
        assert_eq!(band.name(), "current");
        assert!(band.iter().any(|v| v == 1.0));
        assert!(band.iter().any(f32::is_nan));
    }
}
