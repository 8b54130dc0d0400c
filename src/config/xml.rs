//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a commented template on request (`--init-config`).
//!
//! Notes:
//! - This module only reads/writes the config file; primary-root validation happens elsewhere.
//! - Unknown XML fields are rejected so typos surface instead of being ignored.

use anyhow::{bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel, TransferMode};
use super::DEFAULT_LOCK_TIMEOUT;
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
pub struct XmlConfig {
    primary_root: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    space_check: Option<bool>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    progress: Option<bool>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    lock_timeout_seconds: Option<u64>,
    transfer: Option<String>,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| s.trim().parse::<u64>().ok()))
}

fn de_bool_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }))
}

impl XmlConfig {
    /// Overlay the values present in the file onto `cfg`.
    pub fn apply_to(&self, cfg: &mut Config) -> Result<()> {
        if let Some(root) = non_empty(self.primary_root.as_deref()) {
            cfg.primary_root = Some(PathBuf::from(root));
        }
        if let Some(level) = non_empty(self.log_level.as_deref()) {
            cfg.log_level = level
                .parse::<LogLevel>()
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        if let Some(file) = non_empty(self.log_file.as_deref()) {
            cfg.log_file = Some(PathBuf::from(file));
        }
        if let Some(v) = self.space_check {
            cfg.space_check = v;
        }
        if let Some(v) = self.progress {
            cfg.progress = v;
        }
        if let Some(secs) = self.lock_timeout_seconds {
            cfg.lock_timeout = Duration::from_secs(secs);
        }
        if let Some(mode) = non_empty(self.transfer.as_deref()) {
            cfg.transfer = mode.parse::<TransferMode>().map_err(|e| anyhow::anyhow!(e))?;
        }
        Ok(())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

/// Load and parse a specific XML file.
pub fn load_config_from_xml_path(path: &Path) -> Result<XmlConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    debug!(path = %path.display(), "Loaded config xml");
    Ok(parsed)
}

/// Load overrides from the default (or env-selected) location.
/// Returns Ok(None) when no config file exists there.
pub fn load_xml_overrides() -> Result<Option<(PathBuf, XmlConfig)>> {
    let Some(path) = default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let parsed = load_config_from_xml_path(&path)?;
    Ok(Some((path, parsed)))
}

/// Create a commented template config (secure atomic write, 0600).
/// Refuses to overwrite an existing file or write through a symlinked ancestor.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "/path/to/cache_relink.log".into());

    let content = format!(
        "<!--\n  cache_relink configuration (XML)\n\n    primary_root          -> library that receives all cache data (default: <data dir>/Steam)\n    log_level             -> quiet | normal | info | debug\n    log_file              -> path to log file (optional; stdout still used)\n    space_check           -> true/false, refuse moves that would exhaust free space\n    progress              -> true/false, per-entry progress while transferring\n    lock_timeout_seconds  -> how long to wait for another running instance\n    transfer              -> native | rsync\n\n  CLI flags override XML values.\n-->\n<config>\n  <primary_root></primary_root>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <space_check>true</space_check>\n  <progress>true</progress>\n  <lock_timeout_seconds>{}</lock_timeout_seconds>\n  <transfer>native</transfer>\n</config>\n",
        suggested_log,
        DEFAULT_LOCK_TIMEOUT.as_secs()
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}
