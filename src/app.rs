//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler and
//! dispatches to relocation or restoration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

use cache_relink::cli::Args;
use cache_relink::config::{create_template_config, load_xml_overrides};
use cache_relink::output as out;
use cache_relink::{default_config_path, relocate, restore, shutdown, Config, RelinkError, CONFIG_ENV};

use crate::logging::init_tracing;

const EXIT_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

/// Run the CLI application.
pub fn run(args: Args) -> ExitCode {
    if args.print_config {
        print_config();
        return ExitCode::SUCCESS;
    }
    if args.init_config {
        return match init_config() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                out::error(&format!("{e:#}"));
                ExitCode::from(EXIT_CONFIG)
            }
        };
    }

    // Logging is not up yet, so configuration problems go straight to stderr.
    let (cfg, source) = match build_config(&args) {
        Ok(v) => v,
        Err(e) => {
            out::error(&format!("{e:#}"));
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let guard = match init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json) {
        Ok(g) => g,
        Err(e) => {
            out::error(&format!("failed to initialize logging: {e:#}"));
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // The guard is dropped on SIGINT so buffered file logs are flushed.
    let guard_slot = Arc::new(Mutex::new(guard));
    {
        let guard_slot = Arc::clone(&guard_slot);
        if let Err(e) = ctrlc::set_handler(move || {
            shutdown::request();
            out::warn("interrupt received; stopping after the current entry");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        }) {
            warn!(error = %e, "could not install interrupt handler");
        }
    }

    debug!(?args, config_file = ?source, primary = ?cfg.effective_primary_root(), "starting cache_relink");

    let result = if args.restore {
        restore(&cfg)
    } else {
        relocate(&cfg)
    };
    let code = match result {
        Ok(summary) => {
            out::print_summary(&summary);
            if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAILED)
            }
        }
        Err(e) => report_failure(&e),
    };

    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    code
}

/// Defaults, then the XML file, then CLI flags.
fn build_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    let mut cfg = Config::default();
    let mut source = None;
    if let Some((path, xml)) = load_xml_overrides()? {
        xml.apply_to(&mut cfg)
            .with_context(|| format!("invalid value in '{}'", path.display()))?;
        source = Some(path);
    }
    args.apply_overrides(&mut cfg);
    Ok((cfg, source))
}

fn print_config() {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
        out::info(&format!(
            "Using {CONFIG_ENV} (explicit): {}",
            PathBuf::from(explicit).display()
        ));
        return;
    }
    match default_config_path() {
        Some(p) if p.exists() => out::info(&format!("Config file: {}", p.display())),
        Some(p) => out::info(&format!(
            "Config file: {} (not present; create one with --init-config)",
            p.display()
        )),
        None => out::warn("Could not determine a config file location"),
    }
}

fn init_config() -> Result<()> {
    let path = default_config_path().context("could not determine a config file location")?;
    create_template_config(&path)?;
    out::success(&format!("Template config written to {}", path.display()));
    Ok(())
}

fn report_failure(e: &anyhow::Error) -> ExitCode {
    let Some(re) = e.downcast_ref::<RelinkError>() else {
        error!(error = %format!("{e:#}"), "run failed");
        return ExitCode::from(EXIT_FAILED);
    };
    let (code, kind) = (re.code(), re.kind());
    match re {
        RelinkError::Interrupted => {
            warn!(code, kind, "run interrupted; re-run to resume");
            return ExitCode::from(EXIT_INTERRUPTED);
        }
        RelinkError::LockTimeout { marker, owner, .. } => {
            error!(code, kind, marker = %marker.display(), owner = ?owner, "{re}")
        }
        RelinkError::ManifestExists(path) => {
            error!(code, kind, manifest = %path.display(), "{re}")
        }
        RelinkError::Configuration(_) => {
            error!(code, kind, "{re}");
            return ExitCode::from(EXIT_CONFIG);
        }
        _ if !re.is_fatal() => {
            error!(code, kind, "{re}; re-run to resume or use --restore to undo")
        }
        _ => error!(code, kind, "{re}"),
    }
    ExitCode::from(EXIT_FAILED)
}
