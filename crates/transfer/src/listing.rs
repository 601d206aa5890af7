use std::fmt::Write as _;
use std::path::Path;

use crate::TransferError;

/// Builds the listing of the regular files directly inside `dir`.
///
/// One line per file, `"<name>  (<size> bytes)\n"`, sorted by name.
/// Subdirectories and symlinks are skipped.
pub fn generate_listing(dir: &Path) -> Result<Vec<u8>, TransferError> {
    let entries = std::fs::read_dir(dir).map_err(|e| TransferError::unavailable(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TransferError::unavailable(dir, e))?;
        // file_type() does not follow symlinks.
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        files.push((entry.file_name().to_string_lossy().into_owned(), meta.len()));
    }
    files.sort();

    let mut listing = String::new();
    for (name, size) in files {
        let _ = writeln!(listing, "{name}  ({size} bytes)");
    }
    Ok(listing.into_bytes())
}
