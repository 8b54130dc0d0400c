//! Bulk movement of directory entries.
//!
//! Both engines move entries through the [`Transfer`] trait:
//! - [`NativeTransfer`] renames each entry, falling back to a per-file copy
//!   (temp file + rename, metadata preserved) when the rename crosses
//!   filesystems. Each source file is removed as soon as its copy has landed, so
//!   worst-case extra disk usage is one file, not the whole tree.
//! - [`RsyncTransfer`] delegates to `rsync -a --remove-source-files`.
//!
//! A directory entry whose name already exists as a directory at the
//! destination (left there by an interrupted attempt) is merged into it.
//! Existing files are never replaced.
//!
//! Callers must not trust the result alone: they re-check that the source is
//! empty before removing or replacing it.

use anyhow::{anyhow, bail, Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::TransferMode;
use crate::errors::RelinkError;
use crate::platform::temp::{tmp_sibling_name, TempGuard};
use crate::shutdown;

use super::helpers::io_error_with_help;
use super::meta::preserve_metadata;
use super::util::{fsync_dir, is_cross_device, prune_empty_dirs, sorted_entries};

pub trait Transfer {
    /// Move each of `names` from `from_dir` into `to_dir`, removing source copies
    /// as they succeed. Stops at the first failure, leaving the partial state.
    fn move_entries(
        &self,
        from_dir: &Path,
        to_dir: &Path,
        names: &[OsString],
    ) -> Result<(), RelinkError>;
}

/// Build the transfer implementation selected by configuration.
pub fn transfer_for(mode: TransferMode, progress: bool) -> Box<dyn Transfer> {
    match mode {
        TransferMode::Native => Box::new(NativeTransfer { progress }),
        TransferMode::Rsync => Box::new(RsyncTransfer::new(progress)),
    }
}

fn failure(src: &Path, e: impl std::fmt::Display) -> RelinkError {
    RelinkError::TransferFailure {
        src: src.to_path_buf(),
        reason: e.to_string(),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeTransfer {
    pub progress: bool,
}

impl Transfer for NativeTransfer {
    fn move_entries(
        &self,
        from_dir: &Path,
        to_dir: &Path,
        names: &[OsString],
    ) -> Result<(), RelinkError> {
        let total = names.len();
        for (i, name) in names.iter().enumerate() {
            shutdown::check()?;
            let src = from_dir.join(name);
            let dst = to_dir.join(name);
            let moved = match fs::symlink_metadata(&dst) {
                Ok(m) if m.is_dir() && is_real_dir(&src) => {
                    debug!(dst = %dst.display(), "destination directory exists; merging");
                    merge_dir_into(&src, &dst)
                }
                Ok(_) => {
                    return Err(failure(&src, format!("destination '{}' already exists", dst.display())));
                }
                Err(_) => move_one(&src, &dst),
            };
            moved.map_err(|e| match e.downcast::<RelinkError>() {
                Ok(typed) => typed,
                Err(e) => failure(&src, format!("{e:#}")),
            })?;
            if self.progress {
                info!(entry = %name.to_string_lossy(), "[{}/{}] moved", i + 1, total);
            } else {
                debug!(src = %src.display(), dst = %dst.display(), "moved entry");
            }
        }
        Ok(())
    }
}

fn is_real_dir(p: &Path) -> bool {
    fs::symlink_metadata(p).is_ok_and(|m| m.is_dir())
}

/// Move the contents of `src` into the existing directory `dst`, descending
/// into directories present on both sides, then remove `src`.
fn merge_dir_into(src: &Path, dst: &Path) -> Result<()> {
    for name in sorted_entries(src).map_err(io_error_with_help("list", src))? {
        shutdown::check()?;
        let from = src.join(&name);
        let to = dst.join(&name);
        let Ok(existing) = fs::symlink_metadata(&to) else {
            move_one(&from, &to)?;
            continue;
        };
        let source = fs::symlink_metadata(&from).map_err(io_error_with_help("stat", &from))?;
        if existing.is_dir() && source.is_dir() {
            merge_dir_into(&from, &to)?;
        } else if is_landed_copy(&source, &existing) {
            // Copied and renamed into place, but the source was not yet removed.
            fs::remove_file(&from).map_err(io_error_with_help("remove moved file", &from))?;
        } else {
            bail!("destination '{}' already exists", to.display());
        }
    }
    fs::remove_dir(src).map_err(io_error_with_help("remove merged directory", src))?;
    Ok(())
}

/// Same length and modification time on two regular files; copies keep the mtime.
fn is_landed_copy(source: &fs::Metadata, existing: &fs::Metadata) -> bool {
    source.is_file()
        && existing.is_file()
        && source.len() == existing.len()
        && source.modified().ok().is_some_and(|m| existing.modified().ok() == Some(m))
}

/// Rename, or copy-then-remove across filesystems.
fn move_one(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(src = %src.display(), "cross-device rename; copying instead");
            copy_entry_then_remove(src, dst)
        }
        Err(e) => Err(io_error_with_help("rename", src)(e)),
    }
}

fn copy_entry_then_remove(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src).map_err(io_error_with_help("stat", src))?;
    let ft = meta.file_type();
    if ft.is_symlink() {
        copy_symlink(src, dst)?;
        fs::remove_file(src).map_err(io_error_with_help("remove moved link", src))?;
    } else if ft.is_file() {
        copy_file(src, dst, &meta)?;
        fs::remove_file(src).map_err(io_error_with_help("remove moved file", src))?;
    } else if ft.is_dir() {
        copy_dir_then_remove(src, dst)?;
    } else {
        return Err(anyhow!("unsupported file type at {}", src.display()));
    }
    Ok(())
}

fn copy_dir_then_remove(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        shutdown::check()?;
        let entry = entry.with_context(|| format!("walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        let ft = entry.file_type();
        if ft.is_dir() {
            fs::create_dir_all(&target).map_err(io_error_with_help("create directory", &target))?;
        } else if ft.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            fs::remove_file(entry.path()).map_err(io_error_with_help("remove moved link", entry.path()))?;
        } else {
            let meta = entry.metadata().with_context(|| format!("stat {}", entry.path().display()))?;
            copy_file(entry.path(), &target, &meta)?;
            fs::remove_file(entry.path()).map_err(io_error_with_help("remove moved file", entry.path()))?;
        }
    }
    prune_empty_dirs(src);
    fs::remove_dir(src).map_err(io_error_with_help("remove emptied directory", src))?;
    Ok(())
}

/// Copy into a temp sibling, fsync, then rename into place.
fn copy_file(src: &Path, dst: &Path, meta: &fs::Metadata) -> Result<()> {
    let guard = TempGuard::new(tmp_sibling_name(dst));
    fs::copy(src, guard.path()).map_err(io_error_with_help("copy to temporary file", guard.path()))?;
    fs::File::open(guard.path())
        .and_then(|f| f.sync_all())
        .map_err(io_error_with_help("fsync temporary file", guard.path()))?;
    preserve_metadata(meta, guard.path())?;
    fs::rename(guard.path(), dst).map_err(io_error_with_help("rename temporary file", dst))?;
    guard.commit();
    if let Some(parent) = dst.parent() {
        let _ = fsync_dir(parent);
    }
    Ok(())
}

fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(io_error_with_help("read link", src))?;
    #[cfg(unix)]
    std::os::unix::fs::symlink(&target, dst).map_err(io_error_with_help("recreate link", dst))?;
    #[cfg(windows)]
    {
        let resolved = src.parent().map(|p| p.join(&target)).unwrap_or_else(|| target.clone());
        let res = if resolved.is_dir() {
            std::os::windows::fs::symlink_dir(&target, dst)
        } else {
            std::os::windows::fs::symlink_file(&target, dst)
        };
        res.map_err(io_error_with_help("recreate link", dst))?;
    }
    Ok(())
}

/// External `rsync` transfer. One invocation per call; the exit status is
/// reported, but emptiness of the source is verified by the caller.
#[derive(Debug, Clone)]
pub struct RsyncTransfer {
    pub program: PathBuf,
    pub progress: bool,
}

impl RsyncTransfer {
    pub fn new(progress: bool) -> Self {
        Self {
            program: PathBuf::from("rsync"),
            progress,
        }
    }

    fn command(&self, from_dir: &Path, to_dir: &Path, names: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-a").arg("--remove-source-files");
        if self.progress {
            cmd.arg("--info=progress2");
        }
        cmd.arg("--");
        for name in names {
            cmd.arg(from_dir.join(name));
        }
        // Trailing separator: copy into the directory, not as a sibling of it.
        let mut dest = to_dir.as_os_str().to_owned();
        dest.push(std::path::MAIN_SEPARATOR_STR);
        cmd.arg(dest);
        cmd
    }
}

impl Transfer for RsyncTransfer {
    fn move_entries(
        &self,
        from_dir: &Path,
        to_dir: &Path,
        names: &[OsString],
    ) -> Result<(), RelinkError> {
        shutdown::check()?;
        if names.is_empty() {
            return Ok(());
        }
        let mut cmd = self.command(from_dir, to_dir, names);
        cmd.stdin(Stdio::null()).stderr(Stdio::piped());
        cmd.stdout(if self.progress { Stdio::inherit() } else { Stdio::null() });
        debug!(cmd = ?cmd, "running rsync");
        let out = cmd.output().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => failure(from_dir, format!("'{}' not found on PATH", self.program.display())),
            _ => failure(from_dir, e),
        })?;
        // --remove-source-files leaves directories behind; clear the empty ones.
        for name in names {
            let src = from_dir.join(name);
            if fs::symlink_metadata(&src).map(|m| m.is_dir()).unwrap_or(false) {
                prune_empty_dirs(&src);
                let _ = fs::remove_dir(&src);
            }
        }
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let tail = stderr.lines().rev().take(3).collect::<Vec<_>>();
            return Err(failure(
                from_dir,
                format!("rsync exited with {}: {}", out.status, tail.into_iter().rev().collect::<Vec<_>>().join(" | ")),
            ));
        }
        Ok(())
    }
}
