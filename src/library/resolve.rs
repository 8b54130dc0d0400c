use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{apps_dir, parse_library_paths, Library, DESCRIPTOR_NAME};
use crate::config::{validate_primary, Config};
use crate::errors::RelinkError;
use crate::platform::os_to_bytes;

/// Resolve and validate the primary root from configuration.
///
/// Dry-runs skip the write probe so they never create anything on disk.
pub fn resolve_primary(cfg: &Config) -> Result<PathBuf, RelinkError> {
    let root = cfg.effective_primary_root().ok_or_else(|| {
        RelinkError::Configuration(
            "no primary root configured and no platform data directory available".into(),
        )
    })?;
    validate_primary(&root, !cfg.dry_run)
}

/// Discover every library reachable from the canonical `primary` root.
///
/// The primary comes first. Descriptor entries are canonicalized; entries that
/// are gone, relative, duplicated, or unrepresentable in the manifest are logged
/// and dropped. A missing descriptor yields just the primary.
pub fn resolve_libraries(primary: &Path) -> Result<Vec<Library>> {
    let mut libraries = vec![Library::new(primary, true)];

    let descriptor = apps_dir(primary).join(DESCRIPTOR_NAME);
    let text = match fs::read_to_string(&descriptor) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(descriptor = %descriptor.display(), "no library descriptor; only the primary library participates");
            return Ok(libraries);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("read descriptor '{}'", descriptor.display()));
        }
    };
    let candidates = parse_library_paths(&text).map_err(|e| {
        RelinkError::Configuration(format!("malformed descriptor '{}': {e}", descriptor.display()))
    })?;

    for candidate in candidates {
        if !candidate.is_absolute() {
            warn!(path = %candidate.display(), "ignoring relative library path");
            continue;
        }
        let canonical = match dunce::canonicalize(&candidate) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %candidate.display(), error = %e, "ignoring library that cannot be resolved");
                continue;
            }
        };
        if !representable(&canonical) {
            warn!(path = %canonical.display(), "ignoring library whose path contains a tab or newline");
            continue;
        }
        if libraries.iter().any(|l| l.path == canonical) {
            debug!(path = %canonical.display(), "duplicate library entry");
            continue;
        }
        libraries.push(Library::new(canonical, false));
    }

    debug!(count = libraries.len(), "libraries resolved");
    Ok(libraries)
}

/// Manifest fields are tab-separated and newline-terminated.
pub(crate) fn representable(path: &Path) -> bool {
    !os_to_bytes(path.as_os_str())
        .iter()
        .any(|b| *b == b'\t' || *b == b'\n')
}
