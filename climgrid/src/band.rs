use crate::{
    codec::{self, HEADER_LEN, SAMPLE_LEN},
    Grid, GridError, Mask, C,
};
use byteorder::{ByteOrder, LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use geo::geometry::Coord;
use log::debug;
use memmap2::Mmap;
use rayon::prelude::*;
use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// A named 2-D field of `f32` samples over a [Grid].
///
/// Missing data is stored as `NaN`. Bands are immutable; every
/// operation returns a new in-memory band.
pub struct Band {
    /// Semantic name, e.g. `ppt` or `tasmin_mean`.
    name: String,

    grid: Grid,

    samples: SampleStore,
}

enum SampleStore {
    InMem(Box<[f32]>),
    MemMap(Mmap),
}

impl SampleStore {
    fn get_unchecked(&self, index: usize) -> f32 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw) => {
                let start = HEADER_LEN + index * SAMPLE_LEN;
                LE::read_f32(&raw[start..start + SAMPLE_LEN])
            }
        }
    }
}

impl Band {
    /// Returns an in-memory band from row-major, north-first samples.
    pub fn new<S: Into<String>>(name: S, grid: Grid, samples: Vec<f32>) -> Result<Self, GridError> {
        if samples.len() != grid.len() {
            return Err(GridError::SampleCount {
                got: samples.len(),
                rows: grid.rows(),
                cols: grid.cols(),
            });
        }
        Ok(Self {
            name: name.into(),
            grid,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    pub(crate) fn from_samples(name: String, grid: Grid, samples: Box<[f32]>) -> Self {
        debug_assert_eq!(samples.len(), grid.len());
        Self {
            name,
            grid,
            samples: SampleStore::InMem(samples),
        }
    }

    /// Returns a band with every sample set to `value`.
    pub fn filled<S: Into<String>>(name: S, grid: Grid, value: f32) -> Self {
        Self {
            name: name.into(),
            grid,
            samples: SampleStore::InMem(vec![value; grid.len()].into_boxed_slice()),
        }
    }

    /// Returns a Band read into memory from the file at `path`.
    ///
    /// The band is named after the file stem.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let path = path.as_ref();
        let mut file = BufReader::new(File::open(path)?);
        let grid = codec::read_header(&mut file, path)?;
        check_len(path, &grid)?;

        let mut samples = Vec::with_capacity(grid.len());
        for _ in 0..grid.len() {
            samples.push(file.read_f32::<LE>()?);
        }

        Ok(Self {
            name: band_name(path),
            grid,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Returns a Band using the memory-mapped file as storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let grid = codec::read_header(BufReader::new(&file), path)?;
        check_len(path, &grid)?;
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self {
            name: band_name(path),
            grid,
            samples: SampleStore::MemMap(mmap),
        })
    }

    /// Writes this band to `path`.
    ///
    /// Samples go to a sibling `.tmp` file first, which is then
    /// renamed over `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), GridError> {
        let path = path.as_ref();
        let tmp_path = {
            let mut p = path.to_owned();
            p.set_extension("tmp");
            p
        };
        {
            let mut wtr = BufWriter::new(File::create(&tmp_path)?);
            codec::write_header(&mut wtr, &self.grid)?;
            for sample in self.iter() {
                wtr.write_f32::<LE>(sample)?;
            }
            wtr.flush()?;
        }
        fs::rename(&tmp_path, path)?;
        debug!("wrote {} to {path:?}", self.name);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Returns the number of samples in this band.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.grid.len()
    }

    /// Returns this band under a new name.
    #[must_use]
    pub fn rename<S: Into<String>>(self, name: S) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Returns the sample at the given coordinates.
    pub fn get(&self, coord: Coord<C>) -> Option<f32> {
        self.grid
            .coord_to_rc(coord)
            .map(|rc| self.get_rc(rc))
    }

    /// Returns the sample at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `(row, col)` lies outside the grid.
    pub fn get_rc(&self, rc: (usize, usize)) -> f32 {
        assert!(rc.0 < self.grid.rows() && rc.1 < self.grid.cols());
        self.samples.get_unchecked(self.grid.rc_to_linear_index(rc))
    }

    /// Returns an iterator over all samples, north row first.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.len()).map(|index| self.samples.get_unchecked(index))
    }

    /// Returns the smallest non-NaN sample.
    pub fn min(&self) -> Option<f32> {
        self.iter().filter(|v| !v.is_nan()).reduce(f32::min)
    }

    /// Returns the largest non-NaN sample.
    pub fn max(&self) -> Option<f32> {
        self.iter().filter(|v| !v.is_nan()).reduce(f32::max)
    }
}

/// Band algebra.
impl Band {
    /// Applies `f` to every sample.
    pub fn map<S, F>(&self, name: S, f: F) -> Self
    where
        S: Into<String>,
        F: Fn(f32) -> f32 + Send + Sync,
    {
        let samples: Vec<f32> = (0..self.len())
            .into_par_iter()
            .map(|index| f(self.samples.get_unchecked(index)))
            .collect();
        Self {
            name: name.into(),
            grid: self.grid,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        }
    }

    /// Multiplies every sample by `factor`.
    pub fn scale<S: Into<String>>(&self, name: S, factor: f32) -> Self {
        self.map(name, |v| v * factor)
    }

    /// Combines `self` and `other` sample by sample.
    pub fn zip_with<S, F>(&self, other: &Self, name: S, f: F) -> Result<Self, GridError>
    where
        S: Into<String>,
        F: Fn(f32, f32) -> f32 + Send + Sync,
    {
        self.ensure_aligned(other.name(), other.grid())?;
        let samples: Vec<f32> = (0..self.len())
            .into_par_iter()
            .map(|index| {
                f(
                    self.samples.get_unchecked(index),
                    other.samples.get_unchecked(index),
                )
            })
            .collect();
        Ok(Self {
            name: name.into(),
            grid: self.grid,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Returns the per-cell sum of `bands`.
    pub fn sum<S: Into<String>>(name: S, bands: &[&Self]) -> Result<Self, GridError> {
        let (first, rest) = bands.split_first().ok_or(GridError::Empty)?;
        for band in rest {
            first.ensure_aligned(band.name(), band.grid())?;
        }
        let samples: Vec<f32> = (0..first.len())
            .into_par_iter()
            .map(|index| {
                bands
                    .iter()
                    .map(|band| band.samples.get_unchecked(index))
                    .sum()
            })
            .collect();
        Ok(Self {
            name: name.into(),
            grid: first.grid,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Evaluates `pred` on every sample.
    pub fn threshold<S, F>(&self, name: S, pred: F) -> Mask
    where
        S: Into<String>,
        F: Fn(f32) -> bool + Send + Sync,
    {
        let cells: Vec<bool> = (0..self.len())
            .into_par_iter()
            .map(|index| pred(self.samples.get_unchecked(index)))
            .collect();
        Mask::from_cells(name.into(), self.grid, cells.into_boxed_slice())
    }

    pub(crate) fn ensure_aligned(&self, other_name: &str, other: &Grid) -> Result<(), GridError> {
        if self.grid.is_aligned_with(other) {
            Ok(())
        } else {
            Err(GridError::Mismatch(self.name.clone(), other_name.to_owned()))
        }
    }
}

impl std::fmt::Debug for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Band")
            .field("name", &self.name)
            .field("grid", &self.grid)
            .finish_non_exhaustive()
    }
}

fn band_name(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_owned()
}

fn check_len(path: &Path, grid: &Grid) -> Result<(), GridError> {
    let len = path.metadata()?.len();
    if Some(len) == codec::expected_len(grid) {
        Ok(())
    } else {
        Err(GridError::BandLen(len, path.to_owned()))
    }
}
