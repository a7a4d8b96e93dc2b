//! Flat-file boundary for the grain dryer toolkit.
//!
//! Reads the controller and lab tables into [`dryer_core`] types and writes
//! the processed tables back out. Every table is CSV except the Perten
//! instrument log, which is whitespace-separated text.
//!
//! # Table Layout
//!
//! Tabular files carry their timestamp as two leading columns, `Date`
//! (`DD-MM-YYYY`) and `Time` (`HH:MM:SS`). Every other column is a channel.
//! Rows whose timestamp does not parse are dropped on load and counted in
//! [`Loaded::dropped`]; a missing file or a missing required column fails
//! the load.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use thiserror::Error;

mod perten;
mod read;
mod write;

pub use perten::{PertenOptions, load_perten, read_perten_log};
pub use read::{load_events, load_series, read_raw_log, read_raw_rows};
pub use write::{write_events, write_reconciled, write_segments, write_series};

/// Table errors.
#[derive(Debug, Error)]
pub enum TableError {
    /// The file could not be opened or created.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error while writing.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A malformed CSV file or a failed CSV write.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// A column the table needs is absent from the header.
    #[error("{} has no {column} column", path.display())]
    MissingColumn { path: PathBuf, column: String },
    /// The file has no header at all.
    #[error("{} is empty", path.display())]
    Empty { path: PathBuf },
    /// An import setting the loader cannot apply.
    #[error(transparent)]
    Invalid(#[from] dryer_core::CoreError),
}

/// A loaded table together with the number of rows dropped on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    /// Rows dropped for a malformed timestamp (or too few fields).
    pub dropped: usize,
}

/// Creates `path` for writing, creating its parent directory if needed.
pub fn create_file(path: &Path) -> Result<BufWriter<File>, TableError> {
    let open_err = |source| TableError::Open {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(open_err)?;
    }
    File::create(path).map(BufWriter::new).map_err(open_err)
}

fn open_file(path: &Path) -> Result<File, TableError> {
    File::open(path).map_err(|source| TableError::Open {
        path: path.to_path_buf(),
        source,
    })
}
