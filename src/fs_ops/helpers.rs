//! I/O error enrichment.
//!
//! Wraps io::Error with the operation, the path, and a short platform-aware hint
//! so log lines are actionable without a debugger.
//!
//! Usage:
//!   fs::remove_dir(dir).map_err(io_error_with_help("remove emptied source", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

/// Hint for an OS error code, when we have one worth printing.
fn os_hint(code: i32) -> Option<&'static str> {
    #[cfg(unix)]
    {
        match code {
            libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
            libc::EXDEV => Some("cross-filesystem; rename not possible, a copy is required"),
            libc::EBUSY => Some("resource busy; is a game or the client still running?"),
            libc::ENOENT => Some("path not found; it may have been removed concurrently"),
            libc::EEXIST => Some("already exists"),
            libc::ENOTEMPTY => Some("directory not empty"),
            libc::ENOSPC => Some("no space left on device"),
            libc::EROFS => Some("read-only filesystem"),
            libc::ELOOP => Some("too many symbolic link levels; possible redirect cycle"),
            libc::ENAMETOOLONG => Some("file name or path too long"),
            _ => None,
        }
    }
    #[cfg(windows)]
    {
        match code {
            5 => Some("access denied; check permissions"),
            17 => Some("not same device; a copy is required"),
            32 => Some("sharing violation; file is in use"),
            2 | 3 => Some("path not found"),
            80 | 183 => Some("already exists"),
            112 => Some("disk full"),
            1314 => Some("symlink privilege missing; enable Developer Mode"),
            _ => None,
        }
    }
}

fn kind_hint(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::NotFound => Some("path not found"),
        io::ErrorKind::AlreadyExists => Some("already exists"),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Some("busy/timed out; retry later"),
        _ => None,
    }
}

/// Format "<op> '<path>': <err> (<hint>) [os code: N]".
pub(crate) fn describe_io_error(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    let hint = match e.raw_os_error() {
        Some(code) => os_hint(code),
        None => kind_hint(e.kind()),
    };
    if let Some(h) = hint {
        msg.push_str(&format!(" ({h})"));
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {code}]"));
    }
    msg
}

/// Adapter for anyhow::Result code.
/// Returns a closure suitable for `.map_err(...)` that converts io::Error -> anyhow::Error.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(describe_io_error(op, path, &e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_op_path_and_hint() {
        let e = io::Error::from(io::ErrorKind::NotFound);
        let msg = describe_io_error("read item list", Path::new("/x/items/abc"), &e);
        assert!(msg.starts_with("read item list '/x/items/abc'"));
        assert!(msg.contains("path not found"));
    }

    #[cfg(unix)]
    #[test]
    fn raw_code_is_appended() {
        let e = io::Error::from_raw_os_error(libc::EXDEV);
        let msg = describe_io_error("rename", Path::new("/a"), &e);
        assert!(msg.contains("cross-filesystem"));
        assert!(msg.contains(&format!("[os code: {}]", libc::EXDEV)));
    }
}
