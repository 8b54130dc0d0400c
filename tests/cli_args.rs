use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use cache_relink::cli::Args;
use cache_relink::{Config, LogLevel, TransferMode};

#[test]
fn flags_override_config() {
    let args = Args::try_parse_from([
        "cache_relink",
        "--restore",
        "-n",
        "--no-progress",
        "--no-space-check",
        "--primary-root",
        "/lib/a",
        "--lock-timeout",
        "7",
        "--transfer",
        "rsync",
    ])
    .unwrap();
    assert!(args.restore);

    let mut cfg = Config::default();
    args.apply_overrides(&mut cfg);
    assert!(cfg.dry_run);
    assert!(!cfg.progress);
    assert!(!cfg.space_check);
    assert_eq!(cfg.primary_root, Some(PathBuf::from("/lib/a")));
    assert_eq!(cfg.lock_timeout, Duration::from_secs(7));
    assert_eq!(cfg.transfer, TransferMode::Rsync);
}

#[test]
fn unset_flags_leave_config_alone() {
    let args = Args::try_parse_from(["cache_relink"]).unwrap();
    let mut cfg = Config::new("/from/xml");
    cfg.space_check = false;
    cfg.transfer = TransferMode::Rsync;
    args.apply_overrides(&mut cfg);
    assert_eq!(cfg.primary_root, Some(PathBuf::from("/from/xml")));
    assert!(!cfg.space_check);
    assert_eq!(cfg.transfer, TransferMode::Rsync);
    assert!(!cfg.dry_run);
}

#[test]
fn debug_wins_over_log_level() {
    let args = Args::try_parse_from(["cache_relink", "--log-level", "quiet", "-d"]).unwrap();
    assert_eq!(args.effective_log_level(), Some(LogLevel::Debug));
    let args = Args::try_parse_from(["cache_relink", "--log-level", "info"]).unwrap();
    assert_eq!(args.effective_log_level(), Some(LogLevel::Info));
}

#[test]
fn bad_transfer_mode_is_rejected() {
    assert!(Args::try_parse_from(["cache_relink", "--transfer", "scp"]).is_err());
    assert!(Args::try_parse_from(["cache_relink", "--lock-timeout", "soon"]).is_err());
}
