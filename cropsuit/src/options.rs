use anyhow::{anyhow, bail, Error as AnyError};
use clap::{Parser, Subcommand, ValueEnum};
use geo::geometry::{Coord, Rect};
use std::{path::PathBuf, str::FromStr};
use suitability::LoadMode;

/// Map where a crop can grow, now and under projected climates.
#[derive(Parser, Debug)]
pub struct Cli {
    /// Directory containing band catalogs.
    #[arg(short, long)]
    pub catalog_dir: PathBuf,

    /// Crop parameters JSON file (defaults to sweet corn).
    #[arg(long)]
    pub crop: Option<PathBuf>,

    /// How to load band files.
    #[arg(short, long, value_enum, default_value_t = Mode::MemMap)]
    pub mode: Mode,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
    InMem,
    MemMap,
}

impl From<Mode> for LoadMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::InMem => LoadMode::InMem,
            Mode::MemMap => LoadMode::MemMap,
        }
    }
}

/// A "west,south,east,north" bounding box in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region(pub Rect<f64>);

impl FromStr for Region {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let parts = s
            .split(',')
            .map(|part| f64::from_str(part.trim()))
            .collect::<Result<Vec<f64>, _>>()?;
        let [west, south, east, north] = parts[..] else {
            return Err(anyhow!("not a valid west,south,east,north region"));
        };
        if !(west < east && south < north) {
            bail!("region {s} is empty");
        }
        if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            bail!("region {s} has longitude outside [-180, 180]");
        }
        if !(-85.0..=85.0).contains(&south) || !(-85.0..=85.0).contains(&north) {
            bail!("region {s} has latitude outside [-85, 85]");
        }
        Ok(Self(Rect::new(
            Coord { x: west, y: south },
            Coord { x: east, y: north },
        )))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render one PNG per scenario and a combined overlay.
    Render {
        /// Output directory.
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Image width in pixels.
        #[arg(short, long, default_value_t = 1024)]
        width: u32,
    },

    /// Print per-scenario suitable cell counts.
    Summary {
        /// Print JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Write one scenario's suitable cells as a web mercator band.
    Export {
        /// Scenario id: current, 2020, 2040 or 2060.
        #[arg(short, long)]
        scenario: String,

        /// Band file path.
        #[arg(short, long)]
        out: PathBuf,

        /// Cell size in meters.
        #[arg(long, default_value_t = 250.0)]
        scale: f64,

        /// Area to export as "west,south,east,north".
        #[arg(long, default_value = "-77,39,-75,41", allow_hyphen_values = true)]
        region: Region,
    },
}
