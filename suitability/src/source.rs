use crate::{
    collection::{Image, ImageCollection},
    SuitabilityError,
};
use chrono::NaiveDate;
use climgrid::Band;
use std::{
    collections::HashMap,
    fmt,
    ops::RangeInclusive,
    sync::Arc,
};

/// Selects images from one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub catalog: String,

    /// Inclusive acquisition date range.
    pub dates: Option<RangeInclusive<NaiveDate>>,

    /// Property `(key, value)` an image must carry.
    pub filter: Option<(String, String)>,
}

impl Query {
    pub fn new<S: Into<String>>(catalog: S) -> Self {
        Self {
            catalog: catalog.into(),
            dates: None,
            filter: None,
        }
    }

    #[must_use]
    pub fn dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.dates = Some(start..=end);
        self
    }

    /// Restricts to images dated within calendar year `year`.
    #[must_use]
    pub fn year(self, year: i32) -> Self {
        match (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) {
            (Some(start), Some(end)) => self.dates(start, end),
            _ => self,
        }
    }

    #[must_use]
    pub fn filter<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.filter = Some((key.into(), value.into()));
        self
    }

    /// Returns `true` if an image with this metadata satisfies the
    /// query.
    pub fn accepts(&self, date: Option<NaiveDate>, properties: &HashMap<String, String>) -> bool {
        let date_ok = self.dates.as_ref().map_or(true, |dates| {
            date.map_or(false, |date| dates.contains(&date))
        });
        let filter_ok = self
            .filter
            .as_ref()
            .map_or(true, |(key, value)| properties.get(key) == Some(value));
        date_ok && filter_ok
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.catalog)?;
        if let Some(dates) = &self.dates {
            write!(f, " from {} to {}", dates.start(), dates.end())?;
        }
        if let Some((key, value)) = &self.filter {
            write!(f, " where {key} = {value}")?;
        }
        Ok(())
    }
}

/// Somewhere named catalogs of rasters can be read from.
pub trait RasterSource: Sync {
    /// Returns the images matching `query`.
    ///
    /// An empty result is an error, never an empty collection.
    fn collection(&self, query: &Query) -> Result<ImageCollection, SuitabilityError>;

    /// Returns band `band` of a single-image (static) catalog.
    fn image(&self, catalog: &str, band: &str) -> Result<Arc<Band>, SuitabilityError>;
}

/// An in-memory [RasterSource].
#[derive(Debug, Default)]
pub struct MemSource {
    catalogs: HashMap<String, Vec<Image>>,
}

impl MemSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, catalog: S, image: Image) {
        self.catalogs.entry(catalog.into()).or_default().push(image);
    }

    #[must_use]
    pub fn with<S: Into<String>>(mut self, catalog: S, image: Image) -> Self {
        self.insert(catalog, image);
        self
    }
}

impl RasterSource for MemSource {
    fn collection(&self, query: &Query) -> Result<ImageCollection, SuitabilityError> {
        let images = self
            .catalogs
            .get(&query.catalog)
            .ok_or_else(|| SuitabilityError::UnknownCatalog(query.catalog.clone()))?;
        let mut collection = ImageCollection::new(query.catalog.clone(), images.clone());
        if let Some(dates) = &query.dates {
            collection = collection.filter_date(dates);
        }
        if let Some((key, value)) = &query.filter {
            collection = collection.filter_metadata(key, value);
        }
        non_empty(collection, query)
    }

    fn image(&self, catalog: &str, band: &str) -> Result<Arc<Band>, SuitabilityError> {
        let images = self
            .catalogs
            .get(catalog)
            .ok_or_else(|| SuitabilityError::UnknownCatalog(catalog.to_owned()))?;
        static_band(catalog, images, band)
    }
}

pub(crate) fn non_empty(
    collection: ImageCollection,
    query: &Query,
) -> Result<ImageCollection, SuitabilityError> {
    if collection.is_empty() {
        Err(SuitabilityError::DataUnavailable(query.to_string()))
    } else {
        Ok(collection)
    }
}

/// Returns `band` from the first image carrying it.
pub(crate) fn static_band(
    catalog: &str,
    images: &[Image],
    band: &str,
) -> Result<Arc<Band>, SuitabilityError> {
    let first = images
        .first()
        .ok_or_else(|| SuitabilityError::DataUnavailable(format!("'{catalog}'")))?;
    images
        .iter()
        .find_map(|image| image.band(band))
        .cloned()
        .ok_or_else(|| SuitabilityError::MissingBand {
            catalog: catalog.to_owned(),
            image: first.id().to_owned(),
            band: band.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::{MemSource, Query, RasterSource};
    use crate::{collection::Image, SuitabilityError};
    use chrono::{Month, NaiveDate};
    use climgrid::{geo::Coord, Band, Crs, Grid};
    use std::{collections::HashMap, sync::Arc};

    fn grid() -> Grid {
        Grid::new(Coord { x: 0.0, y: 1.0 }, (1.0, 1.0), (1, 1), Crs::Wgs84)
    }

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn source() -> MemSource {
        let band = || Arc::new(Band::filled("pr_mean", grid(), 1e-5));
        MemSource::new()
            .with(
                "nex",
                Image::new("a")
                    .with_date(date(2020, 1))
                    .with_property("scenario", "rcp85")
                    .with_band(band()),
            )
            .with(
                "nex",
                Image::new("b")
                    .with_date(date(2020, 2))
                    .with_property("scenario", "rcp45")
                    .with_band(band()),
            )
            .with(
                "nex",
                Image::new("c")
                    .with_date(date(2040, 1))
                    .with_property("scenario", "rcp85")
                    .with_band(band()),
            )
            .with(
                "soil",
                Image::new("ph").with_band(Arc::new(Band::filled("phh2o_0-5cm_mean", grid(), 60.0))),
            )
    }

    #[test]
    fn test_query_display() {
        let query = Query::new("NASA/NEX-DCP30_ENSEMBLE_STATS")
            .year(2020)
            .filter("scenario", "rcp85");
        assert_eq!(
            query.to_string(),
            "'NASA/NEX-DCP30_ENSEMBLE_STATS' from 2020-01-01 to 2020-12-31 where scenario = rcp85"
        );
    }

    #[test]
    fn test_accepts() {
        let query = Query::new("nex").year(2020).filter("scenario", "rcp85");
        let props: HashMap<String, String> =
            [("scenario".to_owned(), "rcp85".to_owned())].into_iter().collect();
        assert!(query.accepts(Some(date(2020, 12)), &props));
        assert!(!query.accepts(Some(date(2021, 1)), &props));
        assert!(!query.accepts(None, &props));
        assert!(!query.accepts(Some(date(2020, 5)), &HashMap::new()));
        assert!(Query::new("nex").accepts(None, &HashMap::new()));
    }

    #[test]
    fn test_collection() {
        let src = source();
        let collection = src
            .collection(&Query::new("nex").year(2020).filter("scenario", "rcp85"))
            .unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.images()[0].id(), "a");
        assert_eq!(collection.images()[0].month(), Some(Month::January));

        let all = src.collection(&Query::new("nex")).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_data_unavailable() {
        let err = source()
            .collection(&Query::new("nex").year(2060).filter("scenario", "rcp85"))
            .unwrap_err();
        assert!(matches!(err, SuitabilityError::DataUnavailable(_)));
        assert_eq!(
            err.to_string(),
            "no images match 'nex' from 2060-01-01 to 2060-12-31 where scenario = rcp85"
        );
    }

    #[test]
    fn test_unknown_catalog() {
        assert!(matches!(
            source().collection(&Query::new("OREGONSTATE/PRISM/Norm81m")),
            Err(SuitabilityError::UnknownCatalog(_))
        ));
    }

    #[test]
    fn test_image() {
        let src = source();
        let ph = src.image("soil", "phh2o_0-5cm_mean").unwrap();
        assert_eq!(ph.get_rc((0, 0)), 60.0);
        assert!(matches!(
            src.image("soil", "phh2o_5-15cm_mean"),
            Err(SuitabilityError::MissingBand { .. })
        ));
    }
}
