//! Crop suitability from gridded climate and soil data.
//!
//! A cell is suitable for a crop when three independent constraints
//! all hold:
//!
//! - soil pH is within the crop's optimal range,
//! - mean temperature is optimal in every growing-season month and the
//!   frost-month minimum clears the crop's kill threshold,
//! - annual precipitation is within the crop's optimal range.
//!
//! Each [Scenario] names where its climate comes from; a
//! [SuitabilityModel] evaluates scenarios against a [RasterSource] and
//! yields one self-masked [Composite] per scenario.

mod catalog;
mod collection;
mod composite;
pub mod constraints;
mod crop;
mod error;
mod model;
pub mod scenario;
mod source;
pub mod units;

pub use crate::{
    catalog::{CatalogSource, LoadMode},
    collection::{month_from_number, Image, ImageCollection, MonthlySeries, MONTHS},
    composite::{Composite, ConstraintCounts},
    crop::{Bounds, CropParams},
    error::SuitabilityError,
    model::{ModelBuilder, SuitabilityModel},
    scenario::{Palette, Rgb, Scenario, SoilSource},
    source::{MemSource, Query, RasterSource},
};
