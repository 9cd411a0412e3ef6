use crate::{
    collection::ImageCollection,
    composite::Composite,
    constraints,
    scenario::{MeanTemperature, Scenario, SoilSource},
    source::RasterSource,
    units::{
        annual_precipitation, with_mean_temperature, Celsius, Kelvin, TemperatureSeries,
        TemperatureUnit, MEAN_TEMPERATURE_BAND,
    },
    CropParams, SuitabilityError,
};
use climgrid::Mask;
use log::{debug, info};
use rayon::prelude::*;

/// Crop suitability for a set of climate scenarios over one soil
/// layer.
pub struct SuitabilityModel<'a> {
    source: &'a dyn RasterSource,
    crop: CropParams,
    scenarios: Vec<Scenario>,

    /// Soil pH does not vary by scenario, so it is tested once.
    ph: Mask,
}

impl SuitabilityModel<'_> {
    pub fn builder() -> ModelBuilder {
        ModelBuilder {
            crop: None,
            soil: SoilSource::default(),
            scenarios: Scenario::defaults(),
        }
    }
}

pub struct ModelBuilder {
    /// Crop tolerances (required).
    crop: Option<CropParams>,

    /// Soil pH layer (defaults to SoilGrids 0-5cm).
    soil: SoilSource,

    /// Scenarios to evaluate (defaults to [Scenario::defaults]).
    scenarios: Vec<Scenario>,
}

impl ModelBuilder {
    /// Crop tolerances (required).
    #[must_use]
    pub fn crop(mut self, crop: CropParams) -> Self {
        self.crop = Some(crop);
        self
    }

    /// Soil pH layer (defaults to SoilGrids 0-5cm).
    #[must_use]
    pub fn soil(mut self, soil: SoilSource) -> Self {
        self.soil = soil;
        self
    }

    /// Scenarios to evaluate (defaults to [Scenario::defaults]).
    #[must_use]
    pub fn scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn build<'a>(
        &self,
        source: &'a dyn RasterSource,
    ) -> Result<SuitabilityModel<'a>, SuitabilityError> {
        let crop = self.crop.clone().ok_or(SuitabilityError::Builder("crop"))?;
        crop.validate()?;
        if self.scenarios.is_empty() {
            return Err(SuitabilityError::Builder("scenarios"));
        }

        let now = std::time::Instant::now();
        let ph_band = source.image(&self.soil.catalog, &self.soil.band)?;
        let ph = constraints::soil_ph(&ph_band, &crop);
        debug!(
            "soil pH; cells: {}, pass: {}, range: {:?}..{:?}, exec: {:?}",
            ph.grid().len(),
            ph.count(),
            ph_band.min(),
            ph_band.max(),
            now.elapsed()
        );

        Ok(SuitabilityModel {
            source,
            crop,
            scenarios: self.scenarios.clone(),
            ph,
        })
    }
}

impl SuitabilityModel<'_> {
    pub fn crop(&self) -> &CropParams {
        &self.crop
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Returns the soil pH constraint shared by all scenarios.
    pub fn ph(&self) -> &Mask {
        &self.ph
    }

    /// Returns the scenario with id `id`, if any.
    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.id == id)
    }

    /// Evaluates every constraint for `scenario` and combines them.
    pub fn evaluate(&self, scenario: &Scenario) -> Result<Composite, SuitabilityError> {
        let climate = &scenario.climate;

        let (collection, fetch_runtime) = {
            let now = std::time::Instant::now();
            let collection = self.source.collection(&scenario.query)?;
            (collection, now.elapsed())
        };

        let (temperature, temperature_runtime) = {
            let now = std::time::Instant::now();
            let mask = self.temperature(scenario, &collection)?;
            (mask, now.elapsed())
        };

        let (precipitation, precipitation_runtime) = {
            let now = std::time::Instant::now();
            let series = collection.select(&climate.precipitation)?;
            let annual = annual_precipitation(&series, climate.precipitation_unit)?;
            (constraints::precipitation(&annual, &self.crop), now.elapsed())
        };

        let composite =
            Composite::combine(scenario.label.clone(), &self.ph, &temperature, &precipitation)?;

        debug!(
            "{}; images: {}, fetch_exec: {:?}, temperature_exec: {:?}, precipitation_exec: {:?}",
            scenario.label,
            collection.len(),
            fetch_runtime,
            temperature_runtime,
            precipitation_runtime
        );
        let counts = composite.counts();
        info!(
            "{}: {} of {} cells suitable",
            scenario.label, counts.suitable, counts.cells
        );
        Ok(composite)
    }

    /// Evaluates all scenarios in parallel, returning composites in
    /// scenario order.
    pub fn evaluate_all(&self) -> Result<Vec<Composite>, SuitabilityError> {
        self.evaluate_all_with(|_| ())
    }

    /// Like [Self::evaluate_all], calling `on_done` as each scenario
    /// finishes.
    pub fn evaluate_all_with<F>(&self, on_done: F) -> Result<Vec<Composite>, SuitabilityError>
    where
        F: Fn(&Scenario) + Send + Sync,
    {
        self.scenarios
            .par_iter()
            .map(|scenario| {
                let composite = self.evaluate(scenario);
                on_done(scenario);
                composite
            })
            .collect()
    }
}

/// Private API.
impl SuitabilityModel<'_> {
    fn temperature(
        &self,
        scenario: &Scenario,
        collection: &ImageCollection,
    ) -> Result<Mask, SuitabilityError> {
        let climate = &scenario.climate;
        let (collection, mean_band) = match &climate.mean_temperature {
            MeanTemperature::Band(name) => (collection.clone(), name.as_str()),
            MeanTemperature::Derived { max } => (
                with_mean_temperature(collection, &climate.min_temperature, max)?,
                MEAN_TEMPERATURE_BAND,
            ),
        };
        let mean = collection.select(mean_band)?;
        let min = collection.select(&climate.min_temperature)?;
        match climate.temperature_unit {
            TemperatureUnit::Celsius => constraints::temperature::<Celsius>(
                &TemperatureSeries::new(mean),
                &TemperatureSeries::new(min),
                &self.crop,
            ),
            TemperatureUnit::Kelvin => constraints::temperature::<Kelvin>(
                &TemperatureSeries::new(mean),
                &TemperatureSeries::new(min),
                &self.crop,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SuitabilityModel;
    use crate::{
        collection::{Image, MONTHS},
        scenario::{Scenario, SoilSource, NEX_DCP30, PRISM, SOILGRIDS_PH},
        source::MemSource,
        units::{KELVIN_OFFSET, RATE_TO_MONTHLY_MM},
        CropParams, SuitabilityError,
    };
    use chrono::{Month, NaiveDate};
    use climgrid::{geo::Coord, Band, Crs, Grid, GridError};
    use std::sync::{Arc, Mutex};

    // Column 0 passes everything. Each other column fails exactly one
    // constraint: 1 pH, 2 July mean temperature, 3 April frost, 4
    // annual precipitation.
    const COLS: usize = 5;

    fn grid() -> Grid {
        Grid::new(Coord { x: -77.0, y: 41.0 }, (0.4, 0.4), (1, COLS), Crs::Wgs84)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn band<F: Fn(usize) -> f64>(name: &str, f: F) -> Arc<Band> {
        let samples = (0..COLS).map(|col| f(col) as f32).collect();
        Arc::new(Band::new(name, grid(), samples).unwrap())
    }

    fn tmin_c(month: Month, col: usize) -> f64 {
        if month == Month::April && col == 3 {
            3.9
        } else {
            10.0
        }
    }

    fn tmean_c(month: Month, col: usize) -> f64 {
        if month == Month::July && col == 2 {
            25.0
        } else if CropParams::sweet_corn().season.contains(&month) {
            20.0
        } else {
            5.0
        }
    }

    fn ppt_mm(col: usize) -> f64 {
        if col == 4 {
            60.0
        } else {
            100.0
        }
    }

    fn prism_image(month: Month) -> Image {
        Image::new(format!("{:02}", month.number_from_month()))
            .with_month(month)
            .with_band(band("ppt", |col| ppt_mm(col)))
            .with_band(band("tmin", |col| tmin_c(month, col)))
            .with_band(band("tmean", |col| tmean_c(month, col)))
    }

    /// NEX-DCP30 style image: Kelvin temperatures, mean derived from
    /// min and max, precipitation as a rate.
    fn nex_image(year: i32, scenario: &str, month: Month, frost: bool) -> Image {
        let tmin = move |col| {
            if frost {
                -10.0
            } else {
                tmin_c(month, col)
            }
        };
        let date = NaiveDate::from_ymd_opt(year, month.number_from_month(), 1).unwrap();
        Image::new(format!("{scenario}_{date}"))
            .with_date(date)
            .with_property("scenario", scenario)
            .with_band(band("tasmin_mean", |col| tmin(col) + KELVIN_OFFSET))
            .with_band(band("tasmax_mean", |col| {
                2.0 * (tmean_c(month, col) + KELVIN_OFFSET) - (tmin(col) + KELVIN_OFFSET)
            }))
            .with_band(band("pr_mean", |col| ppt_mm(col) / RATE_TO_MONTHLY_MM))
    }

    fn source(reversed: bool) -> MemSource {
        let mut entries = vec![(
            SOILGRIDS_PH,
            Image::new("phh2o").with_band(band("phh2o_0-5cm_mean", |col| {
                if col == 1 {
                    70.0
                } else {
                    60.0
                }
            })),
        )];
        for month in MONTHS {
            entries.push((PRISM, prism_image(month)));
            entries.push((NEX_DCP30, nex_image(2020, "rcp85", month, false)));
            // Decoys the scenario filters must exclude.
            entries.push((NEX_DCP30, nex_image(2020, "rcp45", month, true)));
            entries.push((NEX_DCP30, nex_image(2040, "rcp85", month, true)));
        }
        if reversed {
            entries.reverse();
        }
        let mut src = MemSource::new();
        for (catalog, image) in entries {
            src.insert(catalog, image);
        }
        src
    }

    fn model(src: &MemSource) -> SuitabilityModel<'_> {
        SuitabilityModel::builder()
            .crop(CropParams::sweet_corn())
            .scenarios(Scenario::defaults()[..3].to_vec())
            .build(src)
            .unwrap()
    }

    fn layer(composite: &crate::Composite) -> Vec<Option<u8>> {
        composite.layer().iter().collect()
    }

    #[test]
    fn test_each_constraint_masks_alone() {
        let src = source(false);
        let model = model(&src);
        let expected = vec![Some(1), None, None, None, None];
        for scenario in ["current", "2020"] {
            let composite = model.evaluate(model.scenario(scenario).unwrap()).unwrap();
            assert_eq!(layer(&composite), expected, "{scenario}");
            let counts = composite.counts();
            assert_eq!(counts.cells, 5);
            assert_eq!(counts.ph, 4);
            assert_eq!(counts.temperature, 3);
            assert_eq!(counts.precipitation, 4);
            assert_eq!(counts.suitable, 1);
        }
    }

    #[test]
    fn test_evaluate_all() {
        let src = source(false);
        let composites = model(&src).evaluate_all().unwrap();
        let labels: Vec<&str> = composites.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec!["PRISM (2010)", "NEX-DCP30 RCP85 (2020)", "NEX-DCP30 RCP85 (2040)"]
        );
        // 2040 has a hard April frost everywhere.
        assert_eq!(composites[2].counts().suitable, 0);
        assert_eq!(composites[2].counts().temperature, 0);
    }

    #[test]
    fn test_evaluate_all_with() {
        let src = source(false);
        let model = model(&src);
        let done = Mutex::new(Vec::new());
        let composites = model
            .evaluate_all_with(|scenario| done.lock().unwrap().push(scenario.id.clone()))
            .unwrap();
        let mut done = done.into_inner().unwrap();
        done.sort();
        assert_eq!(done, vec!["2020", "2040", "current"]);
        assert_eq!(composites.len(), 3);
        assert_eq!(composites[0].label(), "PRISM (2010)");
    }

    #[test]
    fn test_image_order_is_irrelevant() {
        let (a, b) = (source(false), source(true));
        let (a, b) = (model(&a), model(&b));
        for scenario in a.scenarios() {
            assert_eq!(
                layer(&a.evaluate(scenario).unwrap()),
                layer(&b.evaluate(scenario).unwrap()),
                "{}",
                scenario.label
            );
        }
    }

    #[test]
    fn test_data_unavailable() {
        let src = source(false);
        let model = SuitabilityModel::builder()
            .crop(CropParams::sweet_corn())
            .build(&src)
            .unwrap();
        let err = model.evaluate_all().unwrap_err();
        assert!(matches!(err, SuitabilityError::DataUnavailable(_)), "{err}");
    }

    #[test]
    fn test_builder() {
        let src = source(false);
        assert!(matches!(
            SuitabilityModel::builder().build(&src),
            Err(SuitabilityError::Builder("crop"))
        ));
        assert!(matches!(
            SuitabilityModel::builder()
                .crop(CropParams::sweet_corn())
                .scenarios(Vec::new())
                .build(&src),
            Err(SuitabilityError::Builder("scenarios"))
        ));
        assert!(matches!(
            SuitabilityModel::builder()
                .crop(CropParams::sweet_corn())
                .soil(SoilSource {
                    catalog: "projects/soilgrids-isric/clay_mean".to_owned(),
                    band: "clay_0-5cm_mean".to_owned(),
                })
                .build(&src),
            Err(SuitabilityError::UnknownCatalog(_))
        ));
    }

    #[test]
    fn test_grid_mismatch() {
        let mut src = source(false);
        let coarse = Grid::new(Coord { x: -77.0, y: 41.0 }, (0.8, 0.8), (1, COLS), Crs::Wgs84);
        src.insert(
            "soil/coarse",
            Image::new("coarse").with_band(Arc::new(Band::filled("ph", coarse, 60.0))),
        );
        let model = SuitabilityModel::builder()
            .crop(CropParams::sweet_corn())
            .soil(SoilSource {
                catalog: "soil/coarse".to_owned(),
                band: "ph".to_owned(),
            })
            .scenarios(vec![Scenario::current()])
            .build(&src)
            .unwrap();
        assert!(matches!(
            model.evaluate(&Scenario::current()),
            Err(SuitabilityError::Grid(GridError::Mismatch(_, _)))
        ));
    }

    #[test]
    fn test_missing_season_month() {
        let mut src = MemSource::new();
        src.insert(
            SOILGRIDS_PH,
            Image::new("phh2o").with_band(band("phh2o_0-5cm_mean", |_| 60.0)),
        );
        for month in MONTHS.into_iter().filter(|month| *month != Month::June) {
            src.insert(PRISM, prism_image(month));
        }
        let model = SuitabilityModel::builder()
            .crop(CropParams::sweet_corn())
            .scenarios(vec![Scenario::current()])
            .build(&src)
            .unwrap();
        assert!(matches!(
            model.evaluate_all(),
            Err(SuitabilityError::MissingMonth {
                month: Month::June,
                ..
            })
        ));
    }
}
