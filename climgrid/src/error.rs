use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid band file magic in {0}")]
    Magic(PathBuf),

    #[error("invalid band file len {0} for {1}")]
    BandLen(u64, PathBuf),

    #[error("invalid band file header ({0}) in {1}")]
    Header(String, PathBuf),

    #[error("unknown crs code {0}")]
    Crs(u8),

    #[error("{got} samples do not fill a {rows}x{cols} grid")]
    SampleCount { got: usize, rows: usize, cols: usize },

    #[error("no bands to reduce")]
    Empty,

    #[error("'{0}' and '{1}' are not on the same grid")]
    Mismatch(String, String),
}
