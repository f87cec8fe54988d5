//! Locating the export file to stage.

use std::{io, time::SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use pagesync_fs::{DirFile, list_files};

/// File-name prefix every export carries.
pub const EXPORT_PREFIX: &str = "latest_pages_data_";
/// File-name suffix every export carries.
pub const EXPORT_SUFFIX: &str = ".csv";

/// The export chosen for a staging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Full path to the export.
    pub path: Utf8PathBuf,
    /// Creation (or, failing that, modification) time used for selection.
    pub created: SystemTime,
}

/// Whether `name` looks like a page export.
///
/// # Examples
/// ```
/// use pagesync_data::is_export_file_name;
///
/// assert!(is_export_file_name("latest_pages_data_2024-05-01.csv"));
/// assert!(!is_export_file_name("latest_pages_data_2024-05-01.csv.bak"));
/// assert!(!is_export_file_name("pages_data_2024-05-01.csv"));
/// ```
#[must_use]
pub fn is_export_file_name(name: &str) -> bool {
    name.starts_with(EXPORT_PREFIX) && name.ends_with(EXPORT_SUFFIX)
}

/// Pick the export in `directory` with the greatest creation time.
///
/// Returns `Ok(None)` when no file in the directory matches
/// `latest_pages_data_*.csv`. File names play no part in the ordering.
pub fn select_latest_export(directory: &Utf8Path) -> io::Result<Option<ExportFile>> {
    let files = list_files(directory)?;
    Ok(newest_export(files).map(|file| ExportFile {
        path: directory.join(&file.name),
        created: file.created,
    }))
}

/// Newest matching file; the earliest-listed one wins a tie.
pub(super) fn newest_export(files: impl IntoIterator<Item = DirFile>) -> Option<DirFile> {
    files
        .into_iter()
        .filter(|file| is_export_file_name(&file.name))
        .reduce(|best, file| if file.created > best.created { file } else { best })
}
