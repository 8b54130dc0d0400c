//! Disk space gating for populated moves.
//! Measures the source tree and compares it (plus a 10% margin) with the free
//! space of the filesystem that will receive it.

use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::RelinkError;

/// Source of free-space figures. Real runs use [`FsSpaceProbe`]; tests substitute
/// a fixed value to simulate a nearly full disk.
pub trait SpaceProbe {
    fn available_bytes(&self, path: &Path) -> io::Result<u64>;
}

/// Queries the filesystem (statvfs / GetDiskFreeSpaceEx via fs2).
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSpaceProbe;

impl SpaceProbe for FsSpaceProbe {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        fs2::available_space(existing_ancestor(path))
    }
}

/// Nearest ancestor of `path` that exists (the destination may not be created yet).
fn existing_ancestor(path: &Path) -> &Path {
    let mut cur = path;
    while !cur.exists() {
        match cur.parent() {
            Some(p) => cur = p,
            None => break,
        }
    }
    cur
}

/// Total size of regular files under `src`, not following symlinks.
pub fn tree_size(src: &Path) -> u64 {
    WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .fold(0u64, u64::saturating_add)
}

/// Bytes needed to move `size` bytes, including the 10% safety margin.
pub fn with_margin(size: u64) -> u64 {
    size.saturating_add(size / 10)
}

pub fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{} B", n)
    }
}

/// Check that `dest_dir` can absorb `src`. Returns the measured source size.
pub fn ensure_space_for_move(
    probe: &dyn SpaceProbe,
    src: &Path,
    dest_dir: &Path,
) -> Result<u64, RelinkError> {
    let size = tree_size(src);
    let required = with_margin(size);
    let available = probe.available_bytes(dest_dir).map_err(|e| {
        debug!(dest = %dest_dir.display(), error = %e, "free space could not be determined");
        RelinkError::InsufficientSpace {
            required,
            available: 0,
            dest: dest_dir.to_path_buf(),
        }
    })?;

    debug!(
        src = %src.display(),
        dest = %dest_dir.display(),
        size = %format_bytes(size),
        required = %format_bytes(required),
        available = %format_bytes(available),
        "space check"
    );
    if required > available {
        return Err(RelinkError::InsufficientSpace {
            required,
            available,
            dest: dest_dir.to_path_buf(),
        });
    }
    Ok(size)
}
