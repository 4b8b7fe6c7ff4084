//! Filesystem helpers
//!
//! Atomic replacement of small owner-only files and tolerant reads of
//! optional files.

use std::fs::{self, File};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const STAGING_PREFIX: &str = ".netadmin-";

/// Read a file and trim surrounding whitespace.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_trimmed(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Replace `path` with `contents` atomically.
///
/// The data is written to a uniquely named staging file in the same
/// directory, given `mode`, flushed to disk and then renamed over the target.
/// Readers see either the previous file or the complete new one, and
/// concurrent writers never share a staging file.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Removed on drop if anything below fails.
    let mut staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    staging
        .as_file()
        .set_permissions(fs::Permissions::from_mode(mode))?;
    staging.write_all(contents)?;
    staging.as_file().sync_all()?;
    staging.persist(path).map_err(|e| e.error)?;

    if let Ok(dir) = File::open(dir) {
        let _ = dir.sync_all();
    }

    Ok(())
}
