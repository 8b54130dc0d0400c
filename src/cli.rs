//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Only flags that were given override the config file.

use clap::{Parser, ValueHint};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::types::{Config, LogLevel, TransferMode};

/// Consolidate per-library cache directories into the primary library, or undo it.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Relocate library cache directories into the primary library behind redirects"
)]
pub struct Args {
    /// Undo a previous relocation using its manifest.
    #[arg(long, help = "Restore every relocated category from the manifest")]
    pub restore: bool,

    /// Dry-run: log actions but do not modify the filesystem.
    #[arg(
        short = 'n',
        long,
        help = "Show what would be done, but do not modify files/directories"
    )]
    pub dry_run: bool,

    #[arg(long, help = "Do not report per-entry transfer progress")]
    pub no_progress: bool,

    #[arg(long, help = "Skip the free-space check before each move")]
    pub no_space_check: bool,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    #[arg(
        long,
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        help = "Primary library root (default: <data dir>/Steam)"
    )]
    pub primary_root: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Seconds to wait for another running instance before giving up"
    )]
    pub lock_timeout: Option<u64>,

    #[arg(long, value_name = "MODE", help = "Transfer mechanism: native or rsync")]
    pub transfer: Option<TransferMode>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    #[arg(long, help = "Print the config file location and exit")]
    pub print_config: bool,

    #[arg(long, help = "Write a template config file at the config location and exit")]
    pub init_config: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(root) = &self.primary_root {
            cfg.primary_root = Some(root.clone());
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if self.dry_run {
            cfg.dry_run = true;
        }
        if self.no_progress {
            cfg.progress = false;
        }
        if self.no_space_check {
            cfg.space_check = false;
        }
        if let Some(secs) = self.lock_timeout {
            cfg.lock_timeout = Duration::from_secs(secs);
        }
        if let Some(mode) = self.transfer {
            cfg.transfer = mode;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
