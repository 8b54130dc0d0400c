//! Typed error definitions for cache_relink.
//! Provides a small set of well-known failure modes for better logs and tests.
//!
//! Fatal conditions (`Configuration`, `LockTimeout`, `ManifestExists`) abort a run
//! before any mutation. The rest are scoped to one (library, category) pair and
//! end up in the run summary instead.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelinkError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Timed out after {}s waiting for lock {marker} (held by pid {})",
        waited.as_secs(),
        owner.map(|p| p.to_string()).unwrap_or_else(|| "unknown".into())
    )]
    LockTimeout {
        marker: PathBuf,
        owner: Option<u32>,
        waited: Duration,
    },

    #[error("A relocation manifest already exists at {0}; run a restore first")]
    ManifestExists(PathBuf),

    #[error("Insufficient disk space for destination {dest}: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        required: u64,
        available: u64,
        dest: PathBuf,
    },

    #[error("Transfer from {src} failed: {reason}")]
    TransferFailure { src: PathBuf, reason: String },

    #[error("{link} conflicts with the expected redirect to {expected} (found {found})")]
    ConflictingRedirect {
        link: PathBuf,
        found: PathBuf,
        expected: PathBuf,
    },

    #[error("Destination {dest} already holds an entry named '{name}'")]
    NameCollision { name: String, dest: PathBuf },

    #[error("{path} still holds {remaining} entries after transfer; left in place")]
    ResidualData { path: PathBuf, remaining: usize },

    #[error("Manifest data at {path} is unusable: {reason}")]
    ManifestCorruption { path: PathBuf, reason: String },

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl RelinkError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            RelinkError::Configuration(_) => 10,
            RelinkError::LockTimeout { .. } => 11,
            RelinkError::ManifestExists(_) => 12,
            RelinkError::InsufficientSpace { .. } => 20,
            RelinkError::TransferFailure { .. } => 21,
            RelinkError::ConflictingRedirect { .. } => 22,
            RelinkError::NameCollision { .. } => 23,
            RelinkError::ResidualData { .. } => 24,
            RelinkError::ManifestCorruption { .. } => 30,
            RelinkError::Interrupted => 130,
        }
    }

    /// Short machine-friendly kind label.
    pub fn kind(&self) -> &'static str {
        match self {
            RelinkError::Configuration(_) => "configuration",
            RelinkError::LockTimeout { .. } => "lock_timeout",
            RelinkError::ManifestExists(_) => "manifest_exists",
            RelinkError::InsufficientSpace { .. } => "insufficient_space",
            RelinkError::TransferFailure { .. } => "transfer_failure",
            RelinkError::ConflictingRedirect { .. } => "conflicting_redirect",
            RelinkError::NameCollision { .. } => "name_collision",
            RelinkError::ResidualData { .. } => "residual_data",
            RelinkError::ManifestCorruption { .. } => "manifest_corruption",
            RelinkError::Interrupted => "interrupted",
        }
    }

    /// True for conditions that abort the whole run rather than one pair.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RelinkError::Configuration(_)
                | RelinkError::LockTimeout { .. }
                | RelinkError::ManifestExists(_)
                | RelinkError::Interrupted
        )
    }
}
