// Atomic file rewrite: write a temp file next to the target, then rename

use jobsieve_core::error::{AppError, Result};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with whatever `write` produces.
///
/// Readers see either the old file or the complete new one, never a partial
/// write. Parent directories are created as needed.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::result::Result<(), String>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| AppError::storage(path, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| AppError::storage(path, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer).map_err(|e| AppError::storage(path, e))?;
        writer.flush().map_err(|e| AppError::storage(path, e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| AppError::storage(path, e))?;
    temp.persist(path)
        .map_err(|e| AppError::storage(path, e.error))?;
    Ok(())
}
