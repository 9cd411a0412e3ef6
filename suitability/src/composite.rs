use crate::SuitabilityError;
use climgrid::{Mask, SelfMasked};
use serde::Serialize;

/// Per-constraint pass counts for one composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConstraintCounts {
    pub cells: usize,
    pub ph: usize,
    pub temperature: usize,
    pub precipitation: usize,
    pub suitable: usize,
}

/// Combined suitability for one scenario.
///
/// Cells failing any constraint are masked, not zero.
#[derive(Debug, Clone)]
pub struct Composite {
    label: String,
    layer: SelfMasked,
    counts: ConstraintCounts,
}

impl Composite {
    /// pH AND temperature AND precipitation, self-masked.
    pub fn combine<S: Into<String>>(
        label: S,
        ph: &Mask,
        temperature: &Mask,
        precipitation: &Mask,
    ) -> Result<Self, SuitabilityError> {
        let label = label.into();
        let combined = Mask::all(label.clone(), &[ph, temperature, precipitation])?;
        let counts = ConstraintCounts {
            cells: combined.grid().len(),
            ph: ph.count(),
            temperature: temperature.count(),
            precipitation: precipitation.count(),
            suitable: combined.count(),
        };
        Ok(Self {
            label,
            layer: combined.self_mask(),
            counts,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layer(&self) -> &SelfMasked {
        &self.layer
    }

    pub fn counts(&self) -> ConstraintCounts {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::Composite;
    use crate::SuitabilityError;
    use climgrid::{geo::Coord, Crs, Grid, GridError, Mask};

    fn grid(cols: usize) -> Grid {
        Grid::new(Coord { x: 0.0, y: 1.0 }, (1.0, 1.0), (1, cols), Crs::Wgs84)
    }

    fn mask(name: &str, cells: &[bool]) -> Mask {
        Mask::new(name, grid(cells.len()), cells.to_vec()).unwrap()
    }

    #[test]
    fn test_combine() {
        let ph = mask("ph", &[true, false, true, true]);
        let temp = mask("temp", &[true, true, false, true]);
        let precip = mask("precip", &[true, true, true, false]);
        let composite = Composite::combine("PRISM (2010)", &ph, &temp, &precip).unwrap();
        assert_eq!(composite.label(), "PRISM (2010)");
        let cells: Vec<Option<u8>> = composite.layer().iter().collect();
        assert_eq!(cells, vec![Some(1), None, None, None]);

        let counts = composite.counts();
        assert_eq!(counts.cells, 4);
        assert_eq!(counts.ph, 3);
        assert_eq!(counts.temperature, 3);
        assert_eq!(counts.precipitation, 3);
        assert_eq!(counts.suitable, 1);
    }

    #[test]
    fn test_combine_rejects_mismatched_grids() {
        let ph = mask("ph", &[true, true]);
        let temp = mask("temp", &[true, true, true]);
        let precip = mask("precip", &[true, true]);
        assert!(matches!(
            Composite::combine("x", &ph, &temp, &precip),
            Err(SuitabilityError::Grid(GridError::Mismatch(_, _)))
        ));
    }
}
