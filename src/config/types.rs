//! Core configuration types.
//! - Config holds runtime settings with sensible defaults and is passed
//!   explicitly into every engine call.
//! - LogLevel and TransferMode are small enums with string parsing.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::paths;
use super::{DEFAULT_LOCK_POLL, DEFAULT_LOCK_TIMEOUT};

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// How directory contents are physically moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// In-process rename with a copy fallback across filesystems.
    #[default]
    Native,
    /// Delegate to an external `rsync` invocation.
    Rsync,
}

impl FromStr for TransferMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "rename" => Ok(TransferMode::Native),
            "rsync" => Ok(TransferMode::Rsync),
            other => Err(format!("invalid transfer mode: '{other}' (expected native or rsync)")),
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferMode::Native => "native",
            TransferMode::Rsync => "rsync",
        })
    }
}

/// Runtime configuration for a relocation or restoration run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary library root; `None` means the platform default.
    pub primary_root: Option<PathBuf>,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// If true, log intended actions but do not modify the filesystem or take the lock
    pub dry_run: bool,
    /// Gate each populated move on available destination space
    pub space_check: bool,
    /// Emit per-entry progress while transferring
    pub progress: bool,
    /// Upper bound on waiting for another instance's lock
    pub lock_timeout: Duration,
    /// Poll interval while waiting for a lock
    pub lock_poll: Duration,
    /// Mechanism used to move directory contents
    pub transfer: TransferMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_root: None,
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path(),
            dry_run: false,
            space_check: true,
            progress: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_poll: DEFAULT_LOCK_POLL,
            transfer: TransferMode::Native,
        }
    }
}

impl Config {
    /// Construct a Config for an explicit primary root; other fields use defaults.
    pub fn new(primary_root: impl Into<PathBuf>) -> Self {
        Self {
            primary_root: Some(primary_root.into()),
            ..Default::default()
        }
    }

    /// The configured primary root, or the platform default when unset.
    pub fn effective_primary_root(&self) -> Option<PathBuf> {
        self.primary_root
            .clone()
            .or_else(paths::default_primary_root)
    }
}
