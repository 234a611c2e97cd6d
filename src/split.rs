//! Size-threshold segment splitting for large decrypted outputs.
//!
//! Operates on an already-verified plaintext file, so unlike the body
//! passes it may hold the whole file in memory.

use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default segment threshold: 50 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    /// File was at or under the threshold and is untouched.
    Unsplit,
    /// Ordered segment paths; the unsplit original has been removed.
    Split(Vec<PathBuf>),
}

/// Split `path` into `name.1, name.2, …` segments of at most `threshold`
/// bytes when it exceeds `threshold`, then remove the unsplit file.
/// Ordered concatenation of the segments reproduces the original bytes
/// exactly.
pub fn split_file(path: &Path, threshold: u64) -> io::Result<SplitOutcome> {
    if threshold == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "split threshold must be non-zero",
        ));
    }

    let size = fs::metadata(path)?.len();
    if size <= threshold {
        return Ok(SplitOutcome::Unsplit);
    }

    let data = fs::read(path)?;
    let mut parts = Vec::new();
    for (i, chunk) in data.chunks(threshold as usize).enumerate() {
        let part = segment_path(path, i + 1);
        fs::write(&part, chunk)?;
        parts.push(part);
    }
    fs::remove_file(path)?;
    info!(
        "split {} ({size} bytes) into {} segments",
        path.display(),
        parts.len()
    );
    Ok(SplitOutcome::Split(parts))
}

// "book.pdf" → "book.pdf.3"
fn segment_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}
