use std::fs;
use std::path::Path;

use crate::errors::Result;

/// Create the parent directory of `path` if it has one and it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write `content` to `path`, creating parent directories first.
pub fn write_file(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, content)?;
    Ok(())
}
