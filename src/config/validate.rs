//! Primary-root validation.
//! Verifies existence, the apps-root substructure, readability and (for real runs)
//! writability before any mutation happens.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::errors::RelinkError;
use crate::fs_ops::is_writable_probe;
use crate::library::APPS_ROOT;

/// Canonicalize `root` and ensure it looks like a library.
///
/// Returns the canonical root. `require_writable` is false for dry-runs, which
/// must not touch the filesystem at all.
pub fn validate_primary(root: &Path, require_writable: bool) -> Result<PathBuf, RelinkError> {
    let canonical = dunce::canonicalize(root).map_err(|e| {
        error!(path = %root.display(), error = %e, "primary root cannot be resolved");
        RelinkError::Configuration(format!(
            "primary root '{}' cannot be resolved: {e}",
            root.display()
        ))
    })?;
    if !canonical.is_dir() {
        return Err(RelinkError::Configuration(format!(
            "primary root '{}' is not a directory",
            canonical.display()
        )));
    }

    let apps = canonical.join(APPS_ROOT);
    if !apps.is_dir() {
        error!(apps = %apps.display(), "primary root has no apps directory");
        return Err(RelinkError::Configuration(format!(
            "primary root '{}' does not contain '{}'",
            canonical.display(),
            APPS_ROOT
        )));
    }

    fs::read_dir(&apps).map_err(|e| {
        RelinkError::Configuration(format!(
            "cannot read '{}': {e}; check permissions",
            apps.display()
        ))
    })?;
    debug!(apps = %apps.display(), "apps root readable");

    if require_writable {
        is_writable_probe(&apps).map_err(|e| {
            RelinkError::Configuration(format!(
                "cannot write to '{}': {e}; check permissions",
                apps.display()
            ))
        })?;
        debug!(apps = %apps.display(), "apps root writable");
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_apps_root_is_configuration_error() {
        let td = tempdir().unwrap();
        let err = validate_primary(td.path(), true).unwrap_err();
        assert!(matches!(err, RelinkError::Configuration(_)));
        assert!(err.to_string().contains(APPS_ROOT));
    }

    #[test]
    fn missing_root_is_configuration_error() {
        let td = tempdir().unwrap();
        let err = validate_primary(&td.path().join("nope"), false).unwrap_err();
        assert!(matches!(err, RelinkError::Configuration(_)));
    }

    #[test]
    fn valid_root_is_canonicalized() {
        let td = tempdir().unwrap();
        fs::create_dir_all(td.path().join(APPS_ROOT)).unwrap();
        let got = validate_primary(&td.path().join(".").join(APPS_ROOT).join(".."), true).unwrap();
        assert_eq!(got, dunce::canonicalize(td.path()).unwrap());
    }
}
