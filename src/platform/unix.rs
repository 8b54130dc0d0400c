//! Unix implementations of platform helpers (Linux and macOS).

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use super::temp::{tmp_sibling_name, TempGuard};

/// Atomically write `contents` to `path` with the given file mode,
/// fsync-ing the temp file and the parent directory.
///
/// Steps:
/// - Ensure parent directory exists
/// - Create unique hidden temp sibling with O_EXCL semantics
/// - Write contents, fsync temp, rename to destination, fsync parent dir
/// - On any failure (or unwinding) the guard removes the temp file
pub fn atomic_write(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target path has no parent"))?;
    fs::create_dir_all(parent).with_context(|| format!("create parent '{}'", parent.display()))?;

    let guard = TempGuard::new(tmp_sibling_name(path));

    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .custom_flags(libc::O_CLOEXEC)
        .open(guard.path())
        .with_context(|| format!("create temp '{}'", guard.path().display()))?;
    f.write_all(contents).context("write temp")?;
    f.sync_all().context("fsync temp")?;
    drop(f);

    fs::rename(guard.path(), path)
        .with_context(|| format!("rename '{}' -> '{}'", guard.path().display(), path.display()))?;
    guard.commit();

    let dir_file =
        File::open(parent).with_context(|| format!("open dir '{}'", parent.display()))?;
    dir_file.sync_all().context("fsync parent dir")?;
    Ok(())
}

/// Write config atomically with 0600 permissions.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    atomic_write(path, contents, 0o600)
}

/// Open log file for appending; set 0600 only when creating a new file.
/// Existing files keep their permissions (e.g. group-readable for log shipping).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600) // applies on create
        .open(path)
}

/// POSIX chmod 0700 for directories.
pub fn set_dir_mode_0700(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

/// Create a directory redirect at `link` pointing to `target`.
pub fn create_dir_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Remove a directory redirect (the link itself, never its target).
pub fn remove_dir_link(link: &Path) -> io::Result<()> {
    fs::remove_file(link)
}

/// Whether `pid` refers to a live process. `None` when it cannot be determined.
pub fn process_alive(pid: u32) -> Option<bool> {
    let pid = libc::pid_t::try_from(pid).ok()?;
    // Signal 0 performs the permission/existence check without delivering anything.
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return Some(true);
    }
    match io::Error::last_os_error().raw_os_error() {
        Some(libc::ESRCH) => Some(false),
        Some(libc::EPERM) => Some(true),
        _ => None,
    }
}

/// Raw name bytes for manifest/item-list serialization.
pub fn os_to_bytes(s: &OsStr) -> Vec<u8> {
    s.as_bytes().to_vec()
}

pub fn os_from_bytes(b: &[u8]) -> OsString {
    OsString::from_vec(b.to_vec())
}
