use chrono::Month;
use climgrid::GridError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SuitabilityError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no catalog manifests in {0}")]
    Path(PathBuf),

    #[error("unknown catalog '{0}'")]
    UnknownCatalog(String),

    #[error("no images match {0}")]
    DataUnavailable(String),

    #[error("image '{image}' in '{catalog}' has no band '{band}'")]
    MissingBand {
        catalog: String,
        image: String,
        band: String,
    },

    #[error("image '{image}' in '{catalog}' has neither a month nor a date")]
    Undated { catalog: String, image: String },

    #[error("image '{image}' in '{catalog}' has invalid month {month}")]
    InvalidMonth {
        catalog: String,
        image: String,
        month: u32,
    },

    #[error("'{series}' has no {} band", .month.name())]
    MissingMonth { series: String, month: Month },

    #[error("'{series}' has more than one {} band", .month.name())]
    DuplicateMonth { series: String, month: Month },

    #[error("invalid crop parameters: {0}")]
    Crop(String),
}
