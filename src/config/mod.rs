//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{
    default_config_path, default_log_path, default_primary_root, path_has_symlink_ancestor,
};
pub use types::{Config, LogLevel, TransferMode};
pub use validate::validate_primary;
pub use xml::{create_template_config, load_config_from_xml_path, load_xml_overrides};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CACHE_RELINK_CONFIG";
pub const DEFAULT_LOCK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
pub const DEFAULT_LOCK_POLL: std::time::Duration = std::time::Duration::from_millis(250);
