//! Atomic cache file writes.
//!
//! Cache files are written to a temp file next to the destination and then
//! renamed into place, so a reader never sees a half-written cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Generate a temp path for atomic writes.
/// Format: {dir}/.tmp.{random}.{filename}
pub fn temp_path(final_path: &Path) -> PathBuf {
    let filename = final_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("cache");
    let random: u64 = rand::random();
    let temp_name = format!(".tmp.{:016x}.{}", random, filename);
    final_path.with_file_name(temp_name)
}

/// Rename the temp file over the final path, replacing any existing file.
fn rename_into_place(temp_path: &Path, final_path: &Path) -> io::Result<()> {
    if let Err(e) = fs::rename(temp_path, final_path) {
        let _ = fs::remove_file(temp_path);
        return Err(e);
    }
    Ok(())
}

/// Write content to a file atomically, creating parent directories.
pub fn write_file(final_path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = final_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp = temp_path(final_path);
    fs::write(&temp, content)?;
    rename_into_place(&temp, final_path)
}
