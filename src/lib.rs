//! Core library for `cache_relink`.
//!
//! Moves cache categories (`shadercache`, `compatdata`) out of secondary
//! libraries into the primary library, leaves redirects in their place, and
//! records every step in a manifest so the whole thing can be undone.
//!
//! Entry points are [`relocate`] and [`restore`]; both take an explicit
//! [`Config`] and return a [`RunSummary`].

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs_ops;
pub mod library;
pub mod manifest;
pub mod output;
pub mod platform;
pub mod shutdown;

pub use config::{
    default_config_path, default_log_path, default_primary_root, path_has_symlink_ancestor,
    Config, LogLevel, TransferMode, CONFIG_ENV,
};
pub use engine::{
    relocate, relocate_with, restore, restore_with, Backends, PairOutcome, PairReport, RunKind,
    RunSummary,
};
pub use errors::RelinkError;
pub use library::{resolve_libraries, resolve_primary, Category, Library, APPS_ROOT};
pub use manifest::{item_list_id, ActionRecord, ManifestStore};
