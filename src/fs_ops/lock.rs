//! Per-root run lock.
//! Uses a marker file to ensure only one process mutates a primary library at a time.
//!
//! Design:
//! - The marker `.cache_relink.lock` lives in the library's apps directory and is
//!   created with `create_new`, which is atomic on every filesystem we care about
//!   (including network mounts without flock support).
//! - Line 1 holds the owning pid, line 2 a per-acquisition token.
//! - Contention is handled by bounded polling, never by blocking syscalls.
//!
//! Notes:
//! - The lock is released when the RunLock guard is dropped, but only if the
//!   marker still carries our token. A run that lost a timeout race never
//!   deletes somebody else's marker.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace, warn};

use crate::errors::RelinkError;
use crate::platform::process_alive;
use crate::shutdown;

pub const LOCK_FILE_NAME: &str = ".cache_relink.lock";

static TOKEN_SEQ: AtomicU64 = AtomicU64::new(0);

/// RAII guard held while a run lock is active.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    token: String,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.lines().nth(1) == Some(self.token.as_str()) => {
                if let Err(e) = fs::remove_file(&self.path) {
                    warn!(path = %self.path.display(), error = %e, "failed to remove lock marker");
                } else {
                    trace!(path = %self.path.display(), "lock released");
                }
            }
            Ok(_) => {
                warn!(path = %self.path.display(), "lock marker was replaced by another run; leaving it");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "lock marker vanished before release");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read lock marker on release");
            }
        }
    }
}

pub fn lock_file_path(apps_dir: &Path) -> PathBuf {
    apps_dir.join(LOCK_FILE_NAME)
}

fn new_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = TOKEN_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}:{}:{}", std::process::id(), nanos, seq)
}

/// Owner pid recorded in an existing marker, if readable.
pub fn read_lock_owner(apps_dir: &Path) -> Option<u32> {
    let contents = fs::read_to_string(lock_file_path(apps_dir)).ok()?;
    contents.lines().next()?.trim().parse().ok()
}

/// Single non-blocking attempt. `Ok(None)` means another run holds the marker.
pub fn try_acquire_run_lock(apps_dir: &Path) -> io::Result<Option<RunLock>> {
    let path = lock_file_path(apps_dir);
    let mut f = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(e),
    };
    let token = new_token();
    let written = writeln!(f, "{}\n{}", std::process::id(), token).and_then(|()| f.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(&path);
        return Err(e);
    }
    trace!(path = %path.display(), "lock acquired");
    Ok(Some(RunLock { path, token }))
}

/// Acquire the run lock for `apps_dir`, polling every `poll` for at most `timeout`.
///
/// Errors:
/// - `LockTimeout` naming the marker and its recorded owner when the bound expires.
/// - `Interrupted` when a shutdown is requested while waiting.
pub fn acquire_run_lock(
    apps_dir: &Path,
    timeout: Duration,
    poll: Duration,
) -> anyhow::Result<RunLock> {
    let start = Instant::now();
    let mut announced = false;
    loop {
        shutdown::check()?;
        if let Some(lock) = try_acquire_run_lock(apps_dir)? {
            let waited = start.elapsed();
            if !waited.is_zero() && announced {
                debug!(path = %lock.path.display(), waited_ms = waited.as_millis() as u64, "lock acquired after wait");
            }
            return Ok(lock);
        }

        let owner = read_lock_owner(apps_dir);
        if !announced {
            warn!(
                marker = %lock_file_path(apps_dir).display(),
                owner = owner.map(|p| p.to_string()).unwrap_or_else(|| "unknown".into()),
                timeout_s = timeout.as_secs(),
                "another run holds the lock; waiting"
            );
            announced = true;
        }

        let waited = start.elapsed();
        if waited >= timeout {
            let marker = lock_file_path(apps_dir);
            if let Some(pid) = owner
                && process_alive(pid) == Some(false)
            {
                warn!(
                    marker = %marker.display(),
                    pid,
                    "lock owner is not running; remove the marker manually if no other run is active"
                );
            }
            return Err(RelinkError::LockTimeout {
                marker,
                owner,
                waited,
            }
            .into());
        }
        sleep(poll.min(timeout.saturating_sub(waited)).max(Duration::from_millis(1)));
    }
}
