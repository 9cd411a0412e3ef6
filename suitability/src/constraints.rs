//! Per-constraint boolean layers.

use crate::{
    units::{Scale, TemperatureSeries, TemperatureThresholds},
    Bounds, CropParams, SuitabilityError,
};
use chrono::Month;
use climgrid::{Band, Mask};

/// Annual precipitation within the crop's optimal range.
pub fn precipitation(annual_mm: &Band, crop: &CropParams) -> Mask {
    let bounds = crop.optimal_precip_mm;
    annual_mm.threshold("precip_suit", move |v| bounds.contains(v))
}

/// Soil pH within the crop's optimal range.
///
/// `ph` holds pH multiplied by the crop's `ph_scale`.
#[allow(clippy::cast_possible_truncation)]
pub fn soil_ph(ph: &Band, crop: &CropParams) -> Mask {
    let bounds = crop.optimal_ph;
    let scale = crop.ph_scale as f32;
    ph.threshold("ph_suit", move |v| bounds.contains(v / scale))
}

/// Mean temperature optimal in every month of `season`.
pub fn seasonal_temperature<S: Scale>(
    mean: &TemperatureSeries<S>,
    thresholds: &TemperatureThresholds<S>,
    season: &[Month],
) -> Result<Mask, SuitabilityError> {
    let bounds = Bounds::new(thresholds.optimal_min.value(), thresholds.optimal_max.value());
    let months = season
        .iter()
        .map(|month| {
            let band = mean.series().get(*month)?;
            Ok(band.threshold(
                format!("temp_suit_{}", month.name().to_lowercase()),
                move |v| bounds.contains(v),
            ))
        })
        .collect::<Result<Vec<Mask>, SuitabilityError>>()?;
    let months: Vec<&Mask> = months.iter().collect();
    Ok(Mask::all("temp_suit_season", &months)?)
}

/// Minimum temperature in `month` at or above the kill threshold.
#[allow(clippy::cast_possible_truncation)]
pub fn frost_survival<S: Scale>(
    min: &TemperatureSeries<S>,
    thresholds: &TemperatureThresholds<S>,
    month: Month,
) -> Result<Mask, SuitabilityError> {
    let kill = thresholds.kill.value() as f32;
    let band = min.series().get(month)?;
    Ok(band.threshold("kill_temp", move |v| v >= kill))
}

/// Seasonal temperature AND frost survival.
pub fn temperature<S: Scale>(
    mean: &TemperatureSeries<S>,
    min: &TemperatureSeries<S>,
    crop: &CropParams,
) -> Result<Mask, SuitabilityError> {
    let thresholds = TemperatureThresholds::<S>::from_crop(crop);
    let seasonal = seasonal_temperature(mean, &thresholds, &crop.season)?;
    let frost = frost_survival(min, &thresholds, crop.frost_month)?;
    Ok(seasonal.and(&frost, "temp_suit")?)
}
