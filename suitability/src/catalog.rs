//! Band file catalogs on disk.
//!
//! A catalog is a directory holding a `catalog.json` manifest and the
//! `.band` files it lists. Catalog ids are paths relative to the
//! source root, so `NASA/NEX-DCP30_ENSEMBLE_STATS` lives in
//! `<root>/NASA/NEX-DCP30_ENSEMBLE_STATS/catalog.json`.
//!
//! ```json
//! {
//!   "images": [
//!     {
//!       "id": "rcp85_202004",
//!       "date": "2020-04-01",
//!       "properties": { "scenario": "rcp85" },
//!       "bands": {
//!         "tasmin_mean": "rcp85/2020/tasmin_04.band",
//!         "tasmax_mean": "rcp85/2020/tasmax_04.band",
//!         "pr_mean": "rcp85/2020/pr_04.band"
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! Images without a date (climate normals) give their calendar month
//! as `"month": 4` instead.

use crate::{
    collection::{month_from_number, Image, ImageCollection},
    source::{non_empty, static_band, Query, RasterSource},
    SuitabilityError,
};
use chrono::NaiveDate;
use climgrid::{Band, GridError};
use dashmap::DashMap;
use log::debug;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap},
    ffi::OsStr,
    fs::File,
    io::{BufReader, ErrorKind},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

const MANIFEST: &str = "catalog.json";

/// How deep below the root [CatalogSource::new] looks for a manifest.
const MAX_CATALOG_DEPTH: usize = 4;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    images: Vec<ManifestImage>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestImage {
    id: String,

    #[serde(default)]
    month: Option<u32>,

    #[serde(default)]
    date: Option<NaiveDate>,

    #[serde(default)]
    properties: HashMap<String, String>,

    /// Band name to file, relative to the catalog directory.
    bands: BTreeMap<String, PathBuf>,
}

/// How to load band files.
///
/// The trade off between loading band data into memory versus memory
/// mapping is not obvious, and you should measure both before
/// deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Parse band and load into memory.
    InMem,

    /// Memory map file contents.
    MemMap,
}

/// A [RasterSource] reading catalogs below a root directory.
pub struct CatalogSource {
    root: PathBuf,

    mode: LoadMode,

    /// Manifests which have been parsed on demand.
    manifests: DashMap<String, Arc<Manifest>>,

    /// Bands which have been loaded on demand, by file path.
    ///
    /// Lets every scenario share one copy of the static soil band.
    bands: DashMap<PathBuf, Arc<Band>>,
}

impl CatalogSource {
    pub fn new(root: PathBuf, mode: LoadMode) -> Result<Self, SuitabilityError> {
        // Fail early if there is nothing to read.
        if has_manifest(&root, MAX_CATALOG_DEPTH)? {
            Ok(Self {
                root,
                mode,
                manifests: DashMap::new(),
                bands: DashMap::new(),
            })
        } else {
            Err(SuitabilityError::Path(root))
        }
    }
}

impl RasterSource for CatalogSource {
    fn collection(&self, query: &Query) -> Result<ImageCollection, SuitabilityError> {
        let manifest = self.manifest(&query.catalog)?;
        let dir = self.catalog_dir(&query.catalog)?;
        let images = manifest
            .images
            .iter()
            .filter(|entry| query.accepts(entry.date, &entry.properties))
            .map(|entry| self.load_image(&query.catalog, &dir, entry))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("{query} matched {} images", images.len());
        non_empty(ImageCollection::new(query.catalog.clone(), images), query)
    }

    fn image(&self, catalog: &str, band: &str) -> Result<Arc<Band>, SuitabilityError> {
        let manifest = self.manifest(catalog)?;
        let dir = self.catalog_dir(catalog)?;
        // Static layers are a single image; load only the one holding `band`.
        let images = manifest
            .images
            .iter()
            .find(|entry| entry.bands.contains_key(band))
            .or_else(|| manifest.images.first())
            .map(|entry| self.load_image(catalog, &dir, entry))
            .transpose()?
            .into_iter()
            .collect::<Vec<_>>();
        static_band(catalog, &images, band)
    }
}

/// Private API.
impl CatalogSource {
    fn catalog_dir(&self, catalog: &str) -> Result<PathBuf, SuitabilityError> {
        let id = Path::new(catalog);
        let is_relative_descent = id
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if catalog.is_empty() || !is_relative_descent {
            return Err(SuitabilityError::UnknownCatalog(catalog.to_owned()));
        }
        Ok(self.root.join(id))
    }

    fn manifest(&self, catalog: &str) -> Result<Arc<Manifest>, SuitabilityError> {
        let path = self.catalog_dir(catalog)?.join(MANIFEST);
        self.manifests
            .entry(catalog.to_owned())
            .or_try_insert_with(|| {
                debug!("parsing {path:?}");
                let file = match File::open(&path) {
                    Ok(file) => file,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(SuitabilityError::UnknownCatalog(catalog.to_owned()))
                    }
                    Err(e) => return Err(e.into()),
                };
                serde_json::from_reader(BufReader::new(file))
                    .map(Arc::new)
                    .map_err(|source| SuitabilityError::Json {
                        path: path.clone(),
                        source,
                    })
            })
            .map(|r| r.clone())
    }

    fn load_image(
        &self,
        catalog: &str,
        dir: &Path,
        entry: &ManifestImage,
    ) -> Result<Image, SuitabilityError> {
        let mut image = Image::new(entry.id.clone());
        if let Some(n) = entry.month {
            let month = month_from_number(n).ok_or_else(|| SuitabilityError::InvalidMonth {
                catalog: catalog.to_owned(),
                image: entry.id.clone(),
                month: n,
            })?;
            image = image.with_month(month);
        }
        if let Some(date) = entry.date {
            image = image.with_date(date);
        }
        for (key, value) in &entry.properties {
            image = image.with_property(key.clone(), value.clone());
        }
        for (name, file) in &entry.bands {
            image = image.with_band(self.load_band(dir.join(file), name)?);
        }
        Ok(image)
    }

    fn load_band(&self, path: PathBuf, name: &str) -> Result<Arc<Band>, SuitabilityError> {
        self.bands
            .entry(path.clone())
            .or_try_insert_with(|| {
                debug!("loading {path:?} as {name}");
                let band = match self.mode {
                    LoadMode::InMem => Band::load(&path),
                    LoadMode::MemMap => Band::memmap(&path),
                };
                match band {
                    Ok(band) => Ok(Arc::new(band.rename(name))),
                    Err(GridError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                        Err(SuitabilityError::Io(std::io::Error::new(
                            ErrorKind::NotFound,
                            format!("band file {path:?} listed for '{name}' does not exist"),
                        )))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .map(|r| r.clone())
    }
}

fn has_manifest(dir: &Path, depth: usize) -> Result<bool, std::io::Error> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if depth > 0 && has_manifest(&path, depth - 1)? {
                return Ok(true);
            }
        } else if path.file_name() == Some(OsStr::new(MANIFEST)) {
            return Ok(true);
        }
    }
    Ok(false)
}
