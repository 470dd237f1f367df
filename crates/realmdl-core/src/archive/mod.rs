//! World archive handling: streaming download and tar.gz extraction.

pub mod download;
pub mod extract;

use std::path::PathBuf;

pub use download::{download_to, part_path, PartialArchive};
pub use extract::{extract, extract_archive};

/// Progress callback: `(bytes_written, total_bytes_if_known)`
pub type ProgressCallback = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// A completely downloaded world snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    pub path: PathBuf,
    pub bytes: u64,
}
