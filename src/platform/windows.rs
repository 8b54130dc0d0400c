//! Windows implementations of platform helpers (best-effort).
//!
//! Notes:
//! - Windows lacks POSIX mode semantics; modes are ignored.
//! - Directory redirects use directory symlinks, which need Developer Mode or
//!   the symlink privilege.

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::temp::{tmp_sibling_name, TempGuard};

/// Atomic write via temp sibling + rename. `mode` is ignored.
pub fn atomic_write(path: &Path, contents: &[u8], _mode: u32) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target path has no parent"))?;
    fs::create_dir_all(parent).with_context(|| format!("create parent '{}'", parent.display()))?;

    let guard = TempGuard::new(tmp_sibling_name(path));
    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(guard.path())
        .with_context(|| format!("create temp '{}'", guard.path().display()))?;
    f.write_all(contents).context("write temp")?;
    f.sync_all().context("fsync temp")?;
    drop(f);

    if path.exists() {
        // MoveFileEx without REPLACE_EXISTING refuses to overwrite.
        fs::remove_file(path).with_context(|| format!("replace '{}'", path.display()))?;
    }
    fs::rename(guard.path(), path)
        .with_context(|| format!("rename '{}' -> '{}'", guard.path().display(), path.display()))?;
    guard.commit();
    Ok(())
}

pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    atomic_write(path, contents, 0o600)
}

pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// No-op on Windows; POSIX-style directory modes are not applicable.
pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}

pub fn create_dir_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

/// Directory symlinks are removed with RemoveDirectory on Windows.
pub fn remove_dir_link(link: &Path) -> io::Result<()> {
    fs::remove_dir(link)
}

/// Liveness probing is not implemented here.
pub fn process_alive(_pid: u32) -> Option<bool> {
    None
}

pub fn os_to_bytes(s: &OsStr) -> Vec<u8> {
    s.to_string_lossy().into_owned().into_bytes()
}

pub fn os_from_bytes(b: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(b).into_owned())
}
