//! Crop tolerance parameters.

use crate::SuitabilityError;
use chrono::Month;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An inclusive `[min, max]` interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `min <= v <= max`.
    ///
    /// Samples are `f32`, so the bounds are narrowed to `f32` before
    /// comparing; otherwise a sample stored exactly at a bound could
    /// fall a rounding error outside it. `NaN` is never contained.
    #[allow(clippy::cast_possible_truncation)]
    pub fn contains(&self, v: f32) -> bool {
        (self.min as f32) <= v && v <= (self.max as f32)
    }
}

/// Tolerance ranges for one crop.
///
/// Temperatures are degrees Celsius; see [crate::units] for other
/// scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropParams {
    pub name: String,

    /// Lethal air temperature.
    pub kill_temp_c: f64,

    /// Margin the frost-month minimum must clear above `kill_temp_c`.
    pub kill_buffer_c: f64,

    /// Optimal growing-season mean temperature.
    pub optimal_temp_c: Bounds,

    /// Optimal annual precipitation (mm).
    pub optimal_precip_mm: Bounds,

    /// Optimal soil pH.
    pub optimal_ph: Bounds,

    /// Factor soil pH samples are stored multiplied by.
    pub ph_scale: f64,

    /// Months whose mean temperature must all be optimal.
    #[serde(with = "month_numbers")]
    pub season: Vec<Month>,

    /// Month whose minimum temperature must clear the kill threshold.
    #[serde(with = "month_number")]
    pub frost_month: Month,
}

impl CropParams {
    /// Sweet corn, per the FAO EcoCrop database.
    pub fn sweet_corn() -> Self {
        Self {
            name: "sweet corn".to_owned(),
            kill_temp_c: 0.0,
            kill_buffer_c: 4.0,
            optimal_temp_c: Bounds::new(16.0, 24.0),
            optimal_precip_mm: Bounds::new(800.0, 1500.0),
            optimal_ph: Bounds::new(5.5, 6.8),
            ph_scale: 10.0,
            season: vec![Month::May, Month::June, Month::July, Month::August],
            frost_month: Month::April,
        }
    }

    /// Reads parameters from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SuitabilityError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let crop: Self = serde_json::from_reader(std::io::BufReader::new(file)).map_err(
            |source| SuitabilityError::Json {
                path: path.to_owned(),
                source,
            },
        )?;
        crop.validate()?;
        Ok(crop)
    }

    pub fn validate(&self) -> Result<(), SuitabilityError> {
        let check = |what: &str, bounds: &Bounds| {
            if bounds.min.is_finite() && bounds.max.is_finite() && bounds.min <= bounds.max {
                Ok(())
            } else {
                Err(SuitabilityError::Crop(format!(
                    "{what} range [{}, {}] is empty",
                    bounds.min, bounds.max
                )))
            }
        };
        check("temperature", &self.optimal_temp_c)?;
        check("precipitation", &self.optimal_precip_mm)?;
        check("pH", &self.optimal_ph)?;
        if !(self.ph_scale.is_finite() && self.ph_scale > 0.0) {
            return Err(SuitabilityError::Crop(format!(
                "pH scale {} must be positive",
                self.ph_scale
            )));
        }
        if self.season.is_empty() {
            return Err(SuitabilityError::Crop("growing season is empty".to_owned()));
        }
        Ok(())
    }
}

impl Default for CropParams {
    fn default() -> Self {
        Self::sweet_corn()
    }
}

mod month_number {
    use crate::collection::month_from_number;
    use chrono::Month;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(month: &Month, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u32(month.number_from_month())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Month, D::Error> {
        let n = u32::deserialize(de)?;
        month_from_number(n).ok_or_else(|| D::Error::custom(format!("invalid month {n}")))
    }
}

mod month_numbers {
    use crate::collection::month_from_number;
    use chrono::Month;
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(months: &[Month], ser: S) -> Result<S::Ok, S::Error> {
        let mut seq = ser.serialize_seq(Some(months.len()))?;
        for month in months {
            seq.serialize_element(&month.number_from_month())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Month>, D::Error> {
        Vec::<u32>::deserialize(de)?
            .into_iter()
            .map(|n| {
                month_from_number(n)
                    .ok_or_else(|| D::Error::custom(format!("invalid month {n}")))
            })
            .collect()
    }
}
