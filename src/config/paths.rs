//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log/library paths and detects symlinked
//! ancestors for log-file safety.

use dirs::{config_dir, data_dir, home_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;

/// Config file location: `$CACHE_RELINK_CONFIG` when set, else the OS config dir.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    if let Some(mut base) = config_dir() {
        base.push("cache_relink");
        base.push("config.xml");
        Some(base)
    } else {
        home_dir().map(|h| h.join(".config").join("cache_relink").join("config.xml"))
    }
}

/// OS-appropriate default log file path (data dir). Does not create anything.
pub fn default_log_path() -> Option<PathBuf> {
    if let Some(mut base) = data_dir() {
        base.push("cache_relink");
        base.push("cache_relink.log");
        Some(base)
    } else {
        home_dir().map(|h| {
            h.join(".local")
                .join("share")
                .join("cache_relink")
                .join("cache_relink.log")
        })
    }
}

/// Default primary library root: `<data dir>/Steam`.
pub fn default_primary_root() -> Option<PathBuf> {
    data_dir()
        .or_else(|| home_dir().map(|h| h.join(".local").join("share")))
        .map(|d| d.join("Steam"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_symlinked_ancestor() {
        let td = tempdir().unwrap();
        let real = td.path().join("real");
        fs::create_dir_all(&real).unwrap();
        let link = td.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(path_has_symlink_ancestor(&link.join("x.log")).unwrap());
        assert!(!path_has_symlink_ancestor(&real.join("x.log")).unwrap());
    }
}
