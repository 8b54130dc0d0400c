use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use cache_relink::config::{create_template_config, load_xml_overrides};
use cache_relink::{default_config_path, Config, LogLevel, TransferMode, CONFIG_ENV};
use serial_test::serial;
use tempfile::tempdir;

fn with_config_env<T>(path: &std::path::Path, f: impl FnOnce() -> T) -> T {
    // SAFETY: tests touching the environment are serialized.
    unsafe { std::env::set_var(CONFIG_ENV, path) };
    let out = f();
    unsafe { std::env::remove_var(CONFIG_ENV) };
    out
}

#[test]
#[serial]
fn env_var_selects_config_file() {
    let td = tempdir().unwrap();
    let path = td.path().join("custom.xml");
    let chosen = with_config_env(&path, default_config_path);
    assert_eq!(chosen, Some(path));
}

#[test]
#[serial]
fn xml_values_overlay_defaults() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.xml");
    fs::write(
        &path,
        r#"<config>
  <primary_root>/games/steam</primary_root>
  <log_level> debug </log_level>
  <space_check>no</space_check>
  <progress>false</progress>
  <lock_timeout_seconds> 5 </lock_timeout_seconds>
  <transfer>rsync</transfer>
</config>"#,
    )
    .unwrap();

    let (found, xml) = with_config_env(&path, load_xml_overrides).unwrap().unwrap();
    assert_eq!(found, path);
    let mut cfg = Config::default();
    xml.apply_to(&mut cfg).unwrap();
    assert_eq!(cfg.primary_root, Some(PathBuf::from("/games/steam")));
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert!(!cfg.space_check);
    assert!(!cfg.progress);
    assert_eq!(cfg.lock_timeout, Duration::from_secs(5));
    assert_eq!(cfg.transfer, TransferMode::Rsync);
}

#[test]
#[serial]
fn absent_file_means_no_overrides() {
    let td = tempdir().unwrap();
    let path = td.path().join("missing.xml");
    assert!(with_config_env(&path, load_xml_overrides).unwrap().is_none());
}

#[test]
#[serial]
fn invalid_level_is_reported() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.xml");
    fs::write(&path, "<config><log_level>loud</log_level></config>").unwrap();
    let (_, xml) = with_config_env(&path, load_xml_overrides).unwrap().unwrap();
    let err = xml.apply_to(&mut Config::default()).unwrap_err();
    assert!(err.to_string().contains("loud"));
}

#[cfg(unix)]
#[test]
fn template_is_private() {
    use std::os::unix::fs::PermissionsExt;
    let td = tempdir().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let path = root.join("cache_relink").join("config.xml");
    create_template_config(&path).unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
