//! Unit conversions and derived bands.
//!
//! Temperature scales are tracked in the type system: thresholds and
//! band series are tagged with a [Scale], so a Kelvin series can only
//! ever be compared against Kelvin thresholds.

use crate::{
    collection::{ImageCollection, MonthlySeries},
    CropParams, SuitabilityError,
};
use climgrid::Band;
use std::{marker::PhantomData, sync::Arc};

/// Offset between the Celsius and Kelvin scales.
pub const KELVIN_OFFSET: f64 = 273.15;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Mean length of a calendar month in days.
pub const DAYS_PER_MONTH: f64 = 30.4167;

/// Converts a mean precipitation rate (kg m⁻² s⁻¹) into a monthly
/// depth (mm).
pub const RATE_TO_MONTHLY_MM: f64 = SECONDS_PER_DAY * DAYS_PER_MONTH;

/// Name given to derived mean temperature bands.
pub const MEAN_TEMPERATURE_BAND: &str = "meant";

/// A temperature scale.
pub trait Scale: Copy + Send + Sync + 'static {
    /// Amount added to a Celsius value to express it on this scale.
    const FROM_CELSIUS: f64;
    const SYMBOL: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Celsius;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kelvin;

impl Scale for Celsius {
    const FROM_CELSIUS: f64 = 0.0;
    const SYMBOL: &'static str = "°C";
}

impl Scale for Kelvin {
    const FROM_CELSIUS: f64 = KELVIN_OFFSET;
    const SYMBOL: &'static str = "K";
}

/// Runtime tag for the scale a source stores its temperatures in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Kelvin,
}

/// A temperature on scale `S`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature<S> {
    value: f64,
    scale: PhantomData<S>,
}

impl Temperature<Celsius> {
    pub fn celsius(value: f64) -> Self {
        Self {
            value,
            scale: PhantomData,
        }
    }

    /// Re-expresses this temperature on scale `T`.
    pub fn to_scale<T: Scale>(self) -> Temperature<T> {
        Temperature {
            value: self.value + T::FROM_CELSIUS,
            scale: PhantomData,
        }
    }
}

impl<S: Scale> Temperature<S> {
    pub fn value(self) -> f64 {
        self.value
    }
}

impl<S: Scale> std::fmt::Display for Temperature<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, S::SYMBOL)
    }
}

/// Crop temperature thresholds on scale `S`.
///
/// Converted once per run from the crop's Celsius parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureThresholds<S> {
    pub optimal_min: Temperature<S>,
    pub optimal_max: Temperature<S>,

    /// Lowest survivable frost-month minimum: the lethal temperature
    /// plus the crop's buffer.
    pub kill: Temperature<S>,
}

impl<S: Scale> TemperatureThresholds<S> {
    pub fn from_crop(crop: &CropParams) -> Self {
        let celsius = |v: f64| Temperature::celsius(v).to_scale::<S>();
        Self {
            optimal_min: celsius(crop.optimal_temp_c.min),
            optimal_max: celsius(crop.optimal_temp_c.max),
            kill: celsius(crop.kill_temp_c + crop.kill_buffer_c),
        }
    }
}

/// A monthly temperature series stored on scale `S`.
#[derive(Debug, Clone)]
pub struct TemperatureSeries<S> {
    series: MonthlySeries,
    scale: PhantomData<S>,
}

impl<S: Scale> TemperatureSeries<S> {
    /// Tags `series` as holding temperatures on scale `S`.
    pub fn new(series: MonthlySeries) -> Self {
        Self {
            series,
            scale: PhantomData,
        }
    }

    pub fn series(&self) -> &MonthlySeries {
        &self.series
    }
}

/// How a source stores precipitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecipitationUnit {
    /// Accumulated depth per month (mm).
    MillimetersPerMonth,

    /// Mean rate (kg m⁻² s⁻¹).
    KilogramsPerSquareMeterSecond,
}

/// Returns `(min + max) * 0.5`.
pub fn mean_temperature<S: Into<String>>(
    min: &Band,
    max: &Band,
    name: S,
) -> Result<Band, SuitabilityError> {
    Ok(min.zip_with(max, name, |min, max| (min + max) * 0.5)?)
}

/// Adds a [MEAN_TEMPERATURE_BAND] derived from bands `min` and `max`
/// to every image of `collection`.
pub fn with_mean_temperature(
    collection: &ImageCollection,
    min: &str,
    max: &str,
) -> Result<ImageCollection, SuitabilityError> {
    collection.map(|image| {
        let band = |name: &str| {
            image
                .band(name)
                .ok_or_else(|| SuitabilityError::MissingBand {
                    catalog: collection.catalog().to_owned(),
                    image: image.id().to_owned(),
                    band: name.to_owned(),
                })
        };
        let meant = mean_temperature(band(min)?, band(max)?, MEAN_TEMPERATURE_BAND)?;
        Ok(image.clone().with_band(Arc::new(meant)))
    })
}

/// Returns `series` as monthly depths in millimeters.
#[allow(clippy::cast_possible_truncation)]
pub fn monthly_depth(series: &MonthlySeries, unit: PrecipitationUnit) -> MonthlySeries {
    match unit {
        PrecipitationUnit::MillimetersPerMonth => series.clone(),
        PrecipitationUnit::KilogramsPerSquareMeterSecond => {
            let name = format!("{}_mm", series.name());
            series.map(name.clone(), |band| {
                band.scale(name.clone(), RATE_TO_MONTHLY_MM as f32)
            })
        }
    }
}

/// Returns the annual precipitation total (mm) of `series`.
pub fn annual_precipitation(
    series: &MonthlySeries,
    unit: PrecipitationUnit,
) -> Result<Band, SuitabilityError> {
    let monthly = monthly_depth(series, unit);
    monthly.annual_sum(format!("{}_sum", series.name()))
}
