//! Images, image collections and calendar-month series.

use crate::SuitabilityError;
use chrono::{Datelike, Month, NaiveDate};
use climgrid::Band;
use std::{
    collections::{BTreeMap, HashMap},
    ops::RangeInclusive,
    sync::Arc,
};

/// Calendar months in order, January first.
pub const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

fn month_slot(month: Month) -> usize {
    month.number_from_month() as usize - 1
}

/// Returns the month numbered `n`, January being 1.
pub fn month_from_number(n: u32) -> Option<Month> {
    n.checked_sub(1)
        .and_then(|idx| MONTHS.get(idx as usize))
        .copied()
}

/// A set of co-registered bands sharing one acquisition.
#[derive(Debug, Clone)]
pub struct Image {
    id: String,

    /// Calendar month this image describes.
    ///
    /// Climate normals carry a month but no meaningful date, so this
    /// is kept apart from `date`.
    month: Option<Month>,

    date: Option<NaiveDate>,

    properties: HashMap<String, String>,

    bands: BTreeMap<String, Arc<Band>>,
}

impl Image {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            month: None,
            date: None,
            properties: HashMap::new(),
            bands: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_month(mut self, month: Month) -> Self {
        self.month = Some(month);
        self
    }

    /// Sets the acquisition date, and the month if not already set.
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        if self.month.is_none() {
            self.month = Some(MONTHS[date.month0() as usize]);
        }
        self
    }

    #[must_use]
    pub fn with_property<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Adds `band` under its own name, replacing any same-named band.
    #[must_use]
    pub fn with_band(mut self, band: Arc<Band>) -> Self {
        self.bands.insert(band.name().to_owned(), band);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn band(&self, name: &str) -> Option<&Arc<Band>> {
        self.bands.get(name)
    }
}

/// Images returned from one catalog query.
#[derive(Debug, Clone)]
pub struct ImageCollection {
    catalog: String,
    images: Vec<Image>,
}

impl ImageCollection {
    pub fn new<S: Into<String>>(catalog: S, images: Vec<Image>) -> Self {
        Self {
            catalog: catalog.into(),
            images,
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Keeps images dated within `dates`; undated images are dropped.
    #[must_use]
    pub fn filter_date(mut self, dates: &RangeInclusive<NaiveDate>) -> Self {
        self.images
            .retain(|image| image.date.map_or(false, |date| dates.contains(&date)));
        self
    }

    /// Keeps images whose `key` property equals `value`.
    #[must_use]
    pub fn filter_metadata(mut self, key: &str, value: &str) -> Self {
        self.images.retain(|image| image.property(key) == Some(value));
        self
    }

    /// Applies `f` to every image.
    pub fn map<F>(&self, f: F) -> Result<Self, SuitabilityError>
    where
        F: Fn(&Image) -> Result<Image, SuitabilityError>,
    {
        let images = self.images.iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            catalog: self.catalog.clone(),
            images,
        })
    }

    /// Returns band `name` of every image, keyed by calendar month.
    pub fn select(&self, name: &str) -> Result<MonthlySeries, SuitabilityError> {
        let mut series = MonthlySeries::empty(name);
        for image in &self.images {
            let band = image
                .band(name)
                .ok_or_else(|| SuitabilityError::MissingBand {
                    catalog: self.catalog.clone(),
                    image: image.id.clone(),
                    band: name.to_owned(),
                })?;
            let month = image.month.ok_or_else(|| SuitabilityError::Undated {
                catalog: self.catalog.clone(),
                image: image.id.clone(),
            })?;
            series.insert(month, Arc::clone(band))?;
        }
        Ok(series)
    }
}

/// One band per calendar month.
///
/// Lookups go by [Month], never by position, so the order images
/// arrive in has no effect on which month is tested.
#[derive(Debug, Clone)]
pub struct MonthlySeries {
    name: String,
    months: [Option<Arc<Band>>; 12],
}

impl MonthlySeries {
    pub fn empty<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            months: Default::default(),
        }
    }

    /// Builds a series from `(month, band)` pairs.
    pub fn from_bands<S, I>(name: S, bands: I) -> Result<Self, SuitabilityError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (Month, Band)>,
    {
        let mut series = Self::empty(name);
        for (month, band) in bands {
            series.insert(month, Arc::new(band))?;
        }
        Ok(series)
    }

    pub fn insert(&mut self, month: Month, band: Arc<Band>) -> Result<(), SuitabilityError> {
        let slot = &mut self.months[month_slot(month)];
        if slot.is_some() {
            return Err(SuitabilityError::DuplicateMonth {
                series: self.name.clone(),
                month,
            });
        }
        *slot = Some(band);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the band for `month`.
    pub fn get(&self, month: Month) -> Result<&Arc<Band>, SuitabilityError> {
        self.months[month_slot(month)]
            .as_ref()
            .ok_or_else(|| SuitabilityError::MissingMonth {
                series: self.name.clone(),
                month,
            })
    }

    /// Returns the number of months present.
    pub fn len(&self) -> usize {
        self.months.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the months present, January first.
    pub fn iter(&self) -> impl Iterator<Item = (Month, &Arc<Band>)> {
        MONTHS
            .iter()
            .zip(self.months.iter())
            .filter_map(|(month, band)| band.as_ref().map(|band| (*month, band)))
    }

    /// Applies `f` to every month's band.
    #[must_use]
    pub fn map<S, F>(&self, name: S, f: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Band) -> Band,
    {
        let mut months: [Option<Arc<Band>>; 12] = Default::default();
        for (slot, band) in months.iter_mut().zip(self.months.iter()) {
            *slot = band.as_deref().map(|band| Arc::new(f(band)));
        }
        Self {
            name: name.into(),
            months,
        }
    }

    /// Returns the per-cell sum over all twelve months.
    ///
    /// Fails if any month is missing.
    pub fn annual_sum<S: Into<String>>(&self, name: S) -> Result<Band, SuitabilityError> {
        let bands = MONTHS
            .iter()
            .map(|month| self.get(*month).map(|band| &**band))
            .collect::<Result<Vec<&Band>, _>>()?;
        Ok(Band::sum(name, &bands)?)
    }
}
