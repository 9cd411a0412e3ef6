//! Climate scenarios and how to draw them.

use crate::{
    source::Query,
    units::{PrecipitationUnit, TemperatureUnit},
};
pub const PRISM: &str = "OREGONSTATE/PRISM/Norm81m";
pub const NEX_DCP30: &str = "NASA/NEX-DCP30_ENSEMBLE_STATS";
pub const SOILGRIDS_PH: &str = "projects/soilgrids-isric/phh2o_mean";

/// Years with an RCP8.5 projection run.
pub const PROJECTION_YEARS: [i32; 3] = [2020, 2040, 2060];

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    // CSS color keywords.
    pub const WHITE: Self = Self(255, 255, 255);
    pub const BLUE: Self = Self(0, 0, 255);
    pub const GREEN: Self = Self(0, 128, 0);
    pub const YELLOW: Self = Self(255, 255, 0);
    pub const ORANGE: Self = Self(255, 165, 0);
}

/// A linear color ramp over `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub min: f64,
    pub max: f64,
    pub colors: Vec<Rgb>,
}

impl Palette {
    /// A ramp from white to `color` over `[0, 1]`.
    pub fn white_to(color: Rgb) -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            colors: vec![Rgb::WHITE, color],
        }
    }

    /// Returns the color for `value`, clamped to the ramp.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn color_at(&self, value: f64) -> Rgb {
        match self.colors.as_slice() {
            [] => Rgb::WHITE,
            [only] => *only,
            colors => {
                let span = self.max - self.min;
                let t = if span > 0.0 {
                    ((value - self.min) / span).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let pos = t * (colors.len() - 1) as f64;
                let lo = (pos.floor() as usize).min(colors.len() - 2);
                let frac = pos - lo as f64;
                let (a, b) = (colors[lo], colors[lo + 1]);
                let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * frac).round() as u8;
                Rgb(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
            }
        }
    }

    /// Color a suitable (value 1) cell is drawn with.
    pub fn suitable(&self) -> Rgb {
        self.color_at(self.max)
    }
}

/// How to find mean temperature in a climate source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeanTemperature {
    /// Read directly from a band.
    Band(String),

    /// Derived from the minimum band and this maximum band.
    Derived { max: String },
}

/// Where a scenario's climate comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClimateSource {
    pub temperature_unit: TemperatureUnit,
    pub min_temperature: String,
    pub mean_temperature: MeanTemperature,
    pub precipitation: String,
    pub precipitation_unit: PrecipitationUnit,
}

/// Where soil pH comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoilSource {
    pub catalog: String,
    pub band: String,
}

impl Default for SoilSource {
    fn default() -> Self {
        Self {
            catalog: SOILGRIDS_PH.to_owned(),
            band: "phh2o_0-5cm_mean".to_owned(),
        }
    }
}

/// One climate scenario to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Short name used on the command line, such as `2040`.
    pub id: String,

    /// Layer name, such as `NEX-DCP30 RCP85 (2040)`.
    pub label: String,

    pub query: Query,
    pub climate: ClimateSource,
    pub palette: Palette,
}

impl Scenario {
    /// 1981-2010 PRISM climate normals.
    pub fn current() -> Self {
        Self {
            id: "current".to_owned(),
            label: "PRISM (2010)".to_owned(),
            query: Query::new(PRISM),
            climate: ClimateSource {
                temperature_unit: TemperatureUnit::Celsius,
                min_temperature: "tmin".to_owned(),
                mean_temperature: MeanTemperature::Band("tmean".to_owned()),
                precipitation: "ppt".to_owned(),
                precipitation_unit: PrecipitationUnit::MillimetersPerMonth,
            },
            palette: Palette::white_to(Rgb::BLUE),
        }
    }

    /// NEX-DCP30 ensemble mean under RCP8.5 for `year`.
    pub fn rcp85(year: i32, color: Rgb) -> Self {
        Self {
            id: year.to_string(),
            label: format!("NEX-DCP30 RCP85 ({year})"),
            query: Query::new(NEX_DCP30).year(year).filter("scenario", "rcp85"),
            climate: ClimateSource {
                temperature_unit: TemperatureUnit::Kelvin,
                min_temperature: "tasmin_mean".to_owned(),
                mean_temperature: MeanTemperature::Derived {
                    max: "tasmax_mean".to_owned(),
                },
                precipitation: "pr_mean".to_owned(),
                precipitation_unit: PrecipitationUnit::KilogramsPerSquareMeterSecond,
            },
            palette: Palette::white_to(color),
        }
    }

    /// Current climate followed by each projection year, in drawing
    /// order.
    pub fn defaults() -> Vec<Self> {
        let colors = [Rgb::GREEN, Rgb::YELLOW, Rgb::ORANGE];
        std::iter::once(Self::current())
            .chain(
                PROJECTION_YEARS
                    .iter()
                    .zip(colors)
                    .map(|(year, color)| Self::rcp85(*year, color)),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Palette, Rgb, Scenario, NEX_DCP30};
    use crate::units::TemperatureUnit;

    #[test]
    fn test_defaults() {
        let scenarios = Scenario::defaults();
        let labels: Vec<&str> = scenarios.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "PRISM (2010)",
                "NEX-DCP30 RCP85 (2020)",
                "NEX-DCP30 RCP85 (2040)",
                "NEX-DCP30 RCP85 (2060)",
            ]
        );
        let ids: Vec<&str> = scenarios.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["current", "2020", "2040", "2060"]);

        let rcp = &scenarios[2];
        assert_eq!(rcp.query.catalog, NEX_DCP30);
        assert_eq!(
            rcp.query.to_string(),
            "'NASA/NEX-DCP30_ENSEMBLE_STATS' from 2040-01-01 to 2040-12-31 where scenario = rcp85"
        );
        assert_eq!(rcp.climate.temperature_unit, TemperatureUnit::Kelvin);
        assert_eq!(scenarios[0].climate.temperature_unit, TemperatureUnit::Celsius);
    }

    #[test]
    fn test_palettes() {
        let suitable: Vec<Rgb> = Scenario::defaults()
            .iter()
            .map(|s| s.palette.suitable())
            .collect();
        assert_eq!(
            suitable,
            vec![
                Rgb(0, 0, 255),
                Rgb(0, 128, 0),
                Rgb(255, 255, 0),
                Rgb(255, 165, 0),
            ]
        );
    }

    #[test]
    fn test_color_at() {
        let palette = Palette::white_to(Rgb(0, 0, 255));
        assert_eq!(palette.color_at(0.0), Rgb::WHITE);
        assert_eq!(palette.color_at(0.5), Rgb(128, 128, 255));
        assert_eq!(palette.color_at(7.0), Rgb(0, 0, 255));
        assert_eq!(palette.color_at(-1.0), Rgb::WHITE);

        let ramp = Palette {
            min: 0.0,
            max: 2.0,
            colors: vec![Rgb(0, 0, 0), Rgb(100, 0, 0), Rgb(100, 200, 0)],
        };
        assert_eq!(ramp.color_at(1.0), Rgb(100, 0, 0));
        assert_eq!(ramp.color_at(1.5), Rgb(100, 100, 0));
    }
}
