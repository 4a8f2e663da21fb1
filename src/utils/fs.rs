//! File system utilities.
//!
//! Everything persisted by groundwork goes through [`atomic_write`], so a
//! reader never observes a half-written registry or guidance file even when
//! two runs share a cache directory.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Ensures a directory exists, creating it and all parents if necessary.
///
/// Fails when the path exists but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// The content goes to a uniquely named temporary file in the target's
/// directory, is synced, and is then renamed over the target. Concurrent
/// writers never share a temp file; the last rename wins.
///
/// # Guarantees
///
/// - **Atomicity**: the file holds either the old or the new content
/// - **Durability**: content is synced to disk before the rename
/// - **Safety**: parent directories are created automatically
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().with_context(|| "Failed to sync file to disk")?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Total size in bytes of all regular files below `path`.
///
/// Symbolic links are not followed. A missing directory has size 0.
pub fn dir_size(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let mut size = 0;
    for entry in walkdir::WalkDir::new(path).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk: {}", path.display()))?;
        if entry.file_type().is_file() {
            size += entry
                .metadata()
                .with_context(|| format!("Failed to stat: {}", entry.path().display()))?
                .len();
        }
    }
    Ok(size)
}

/// Removes a directory and its contents; a missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Turns an identity key such as `@scope/pkg@1.0.0` into a single path
/// component (`@scope__pkg@1.0.0`).
///
/// Separators and characters Windows rejects become `__` or `_`; a key made
/// only of dots is prefixed so it can never mean `.` or `..`.
pub fn safe_dir_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '/' | '\\' => name.push_str("__"),
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => name.push('_'),
            c if c.is_control() => name.push('_'),
            c => name.push(c),
        }
    }
    if name.chars().all(|c| c == '.') {
        name.insert(0, '_');
    }
    name
}
