//! Redirect (directory symlink) inspection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What currently sits at a category path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathState {
    Missing,
    /// A redirect; `matches` is true when it resolves to the expected target.
    Redirect { target: PathBuf, matches: bool },
    Directory,
    /// A regular file or other non-directory object.
    Other,
}

/// Classify `path` without following a final symlink.
pub fn inspect(path: &Path, expected_target: &Path) -> io::Result<PathState> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PathState::Missing),
        Err(e) => return Err(e),
    };
    let ft = meta.file_type();
    if ft.is_symlink() {
        let raw = fs::read_link(path)?;
        let target = absolute_link_target(path, &raw);
        let matches = same_location(&target, expected_target);
        Ok(PathState::Redirect { target, matches })
    } else if ft.is_dir() {
        Ok(PathState::Directory)
    } else {
        Ok(PathState::Other)
    }
}

/// Relative link targets are resolved against the link's parent directory.
fn absolute_link_target(link: &Path, raw: &Path) -> PathBuf {
    if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        link.parent().map(|p| p.join(raw)).unwrap_or_else(|| raw.to_path_buf())
    }
}

/// Exact path equality, or equality after resolving both sides when they exist.
fn same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    #[test]
    fn classifies_all_states() {
        let td = tempdir().unwrap();
        let expected = td.path().join("primary");
        let other = td.path().join("other");
        fs::create_dir_all(&expected).unwrap();
        fs::create_dir_all(&other).unwrap();

        assert_eq!(inspect(&td.path().join("none"), &expected).unwrap(), PathState::Missing);
        assert_eq!(inspect(&other, &expected).unwrap(), PathState::Directory);

        let good = td.path().join("good");
        symlink(&expected, &good).unwrap();
        assert!(matches!(inspect(&good, &expected).unwrap(), PathState::Redirect { matches: true, .. }));

        let rel = td.path().join("rel");
        symlink("primary", &rel).unwrap();
        assert!(matches!(inspect(&rel, &expected).unwrap(), PathState::Redirect { matches: true, .. }));

        let bad = td.path().join("bad");
        symlink(&other, &bad).unwrap();
        assert!(matches!(inspect(&bad, &expected).unwrap(), PathState::Redirect { matches: false, .. }));

        let file = td.path().join("file");
        fs::write(&file, b"").unwrap();
        assert_eq!(inspect(&file, &expected).unwrap(), PathState::Other);
    }
}
