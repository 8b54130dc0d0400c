//! Restoration: undo a relocation using the manifest as the only source of truth.

use anyhow::Result;
use std::collections::{BTreeSet, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::summary::{PairOutcome, RunKind, RunSummary};
use super::{is_interrupt, Backends};
use crate::config::Config;
use crate::errors::RelinkError;
use crate::fs_ops::{acquire_run_lock, inspect, io_error_with_help, tree_size, PathState};
use crate::library::{apps_dir, category_dir, resolve_libraries, resolve_primary, Category};
use crate::manifest::{item_list_id, ActionRecord, ManifestStore};
use crate::platform::remove_dir_link;
use crate::shutdown;

pub fn restore(cfg: &Config) -> Result<RunSummary> {
    restore_with(cfg, &Backends::from_config(cfg))
}

pub fn restore_with(cfg: &Config, backends: &Backends) -> Result<RunSummary> {
    let primary = resolve_primary(cfg)?;
    let apps = apps_dir(&primary);
    let store = ManifestStore::new(&apps);
    let mut summary = RunSummary::new(RunKind::Restore, cfg.dry_run);

    if cfg.dry_run {
        if store.has_state() {
            plan(&store, &primary, &mut summary)?;
        } else {
            info!(primary = %primary.display(), "no relocation manifest; nothing to restore");
        }
        summary.log();
        return Ok(summary);
    }

    let _lock = acquire_run_lock(&apps, cfg.lock_timeout, cfg.lock_poll)?;
    if !store.has_state() {
        info!(primary = %primary.display(), "no relocation manifest; nothing to restore");
        summary.log();
        return Ok(summary);
    }

    let manifest = store.load()?;
    for issue in manifest.corrupt {
        summary.push_issue(issue);
    }
    let resumed = store.restore_is_open();
    if resumed {
        info!(state = %store.dir().display(), "resuming unfinished restoration");
    }
    store.open_restore()?;

    let mut run = Restoration {
        backends,
        primary: &primary,
        store,
        summary,
    };
    let outcome = run
        .restore_records(&manifest.records, resumed)
        .and_then(|()| run.restore_unfinished(&manifest.records));
    // Retired once every pair has been attempted; an interruption keeps it for a rerun.
    let retired = match &outcome {
        Ok(()) => {
            if run.summary.pairs.iter().any(|p| p.outcome.error().is_some()) {
                warn!("some entries could not be moved back and remain in the primary library");
            }
            run.store.retire()
        }
        Err(_) => Ok(()),
    };
    run.summary.log();
    outcome?;
    retired?;
    Ok(run.summary)
}

/// Dry-run: report what each record would do without touching anything.
fn plan(store: &ManifestStore, primary: &Path, summary: &mut RunSummary) -> Result<()> {
    let manifest = store.load()?;
    for issue in manifest.corrupt {
        summary.push_issue(issue);
    }
    let resumed = store.restore_is_open();
    for rec in &manifest.records {
        let link = category_dir(&rec.library, rec.category);
        let target = category_dir(primary, rec.category);
        let outcome = match inspect(&link, &target).map_err(io_error_with_help("inspect", &link))? {
            PathState::Redirect { matches: true, .. } => planned(store, &target, rec),
            PathState::Directory if resumed => planned(store, &target, rec),
            PathState::Redirect { target: found, .. } => {
                PairOutcome::Failed(RelinkError::ConflictingRedirect {
                    link,
                    found,
                    expected: target,
                })
            }
            _ => PairOutcome::NotRedirect,
        };
        summary.push(rec.library.clone(), rec.category, outcome);
    }
    Ok(())
}

fn planned(store: &ManifestStore, target: &Path, rec: &ActionRecord) -> PairOutcome {
    let Some(id) = rec.item_list_id.as_deref() else {
        return PairOutcome::Planned { items: 0, bytes: 0 };
    };
    match store.read_item_list(id) {
        Ok(names) => PairOutcome::Planned {
            items: names.len(),
            bytes: names.iter().map(|n| tree_size(&target.join(n))).sum(),
        },
        Err(e) => PairOutcome::Failed(RelinkError::ManifestCorruption {
            path: store.item_list_path(id),
            reason: e.to_string(),
        }),
    }
}

struct Restoration<'a> {
    backends: &'a Backends,
    primary: &'a Path,
    store: ManifestStore,
    summary: RunSummary,
}

impl Restoration<'_> {
    fn restore_records(&mut self, records: &[ActionRecord], resumed: bool) -> Result<()> {
        for rec in records {
            shutdown::check()?;
            let outcome = self.restore_pair(
                &rec.library,
                rec.category,
                rec.item_list_id.as_deref(),
                resumed,
            );
            self.settle(&rec.library, rec.category, outcome)?;
        }
        Ok(())
    }

    /// ItemLists without a manifest record belong to pairs whose relocation
    /// never finished. Match them to libraries by id and move their entries back.
    fn restore_unfinished(&mut self, records: &[ActionRecord]) -> Result<()> {
        let referenced: HashSet<&str> = records
            .iter()
            .filter_map(|r| r.item_list_id.as_deref())
            .collect();
        let mut pending: BTreeSet<String> = self
            .store
            .item_list_ids()?
            .into_iter()
            .filter(|id| !referenced.contains(id.as_str()))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let libraries = match resolve_libraries(self.primary) {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "cannot discover libraries for unfinished item lists");
                Vec::new()
            }
        };
        for lib in libraries.iter().filter(|l| !l.is_primary) {
            for category in Category::ALL {
                let id = item_list_id(&lib.path, category);
                if !pending.remove(&id) {
                    continue;
                }
                shutdown::check()?;
                info!(library = %lib.path.display(), %category, "restoring unfinished relocation");
                let outcome = self.restore_pair(&lib.path, category, Some(&id), true);
                self.settle(&lib.path, category, outcome)?;
            }
        }

        for id in pending {
            let names = self.store.read_item_list(&id).unwrap_or_default();
            let names: Vec<String> = names.iter().map(|n| n.to_string_lossy().into_owned()).collect();
            warn!(
                id = %id,
                entries = ?names,
                "item list matches no known library; its entries stay in the primary library"
            );
        }
        Ok(())
    }

    fn settle(&mut self, library: &Path, category: Category, outcome: Result<PairOutcome>) -> Result<()> {
        let outcome = match outcome {
            Ok(o) => o,
            Err(e) if is_interrupt(&e) => return Err(e),
            Err(e) => {
                PairOutcome::Failed(RelinkError::TransferFailure {
                    src: category_dir(self.primary, category),
                    reason: format!("{e:#}"),
                })
            }
        };
        self.summary.push(library.to_path_buf(), category, outcome);
        Ok(())
    }

    /// `tolerant` accepts a plain directory (or a missing one) where the redirect
    /// used to be: an earlier restoration or relocation stopped part-way.
    fn restore_pair(
        &mut self,
        library: &Path,
        category: Category,
        item_list: Option<&str>,
        tolerant: bool,
    ) -> Result<PairOutcome> {
        let link = category_dir(library, category);
        let target = category_dir(self.primary, category);

        match inspect(&link, &target).map_err(io_error_with_help("inspect", &link))? {
            PathState::Redirect { matches: true, .. } => {
                remove_dir_link(&link).map_err(io_error_with_help("remove redirect", &link))?;
                fs::create_dir(&link).map_err(io_error_with_help("create", &link))?;
                debug!(path = %link.display(), "redirect replaced by directory");
            }
            PathState::Redirect { target: found, .. } => {
                return Ok(PairOutcome::Failed(RelinkError::ConflictingRedirect {
                    link,
                    found,
                    expected: target,
                }));
            }
            PathState::Directory if tolerant => {
                debug!(path = %link.display(), "directory already in place");
            }
            PathState::Missing if tolerant && link.parent().is_some_and(Path::is_dir) => {
                fs::create_dir(&link).map_err(io_error_with_help("create", &link))?;
            }
            _ => return Ok(PairOutcome::NotRedirect),
        }

        let Some(id) = item_list else {
            return Ok(PairOutcome::Restored {
                restored: 0,
                skipped: 0,
                conflicts: 0,
            });
        };
        let names = match self.store.read_item_list(id) {
            Ok(n) => n,
            Err(e) => {
                return Ok(PairOutcome::Failed(RelinkError::ManifestCorruption {
                    path: self.store.item_list_path(id),
                    reason: format!("{e}; entries left in the primary library"),
                }));
            }
        };
        self.move_back(&target, &link, &names)
    }

    fn move_back(&self, from: &Path, to: &Path, names: &[OsString]) -> Result<PairOutcome> {
        let mut skipped = 0;
        let mut conflicts = 0;
        let mut batch = Vec::with_capacity(names.len());
        for name in names {
            let src = from.join(name);
            let dst = to.join(name);
            let in_primary = fs::symlink_metadata(&src).is_ok();
            let in_library = fs::symlink_metadata(&dst).is_ok();
            match (in_primary, in_library) {
                (true, false) => {}
                (false, true) => {
                    debug!(entry = %dst.display(), "entry already back in place");
                    continue;
                }
                (false, false) => {
                    warn!(entry = %src.display(), "listed entry is missing from the primary library");
                    skipped += 1;
                    continue;
                }
                (true, true) => {
                    let differs = entries_differ(&src, &dst);
                    warn!(
                        entry = %dst.display(),
                        differs,
                        "entry already present in library; primary copy left in place"
                    );
                    conflicts += 1;
                    continue;
                }
            }
            batch.push(name.clone());
        }

        match self.backends.transfer.move_entries(from, to, &batch) {
            Ok(()) => Ok(PairOutcome::Restored {
                restored: batch.len(),
                skipped,
                conflicts,
            }),
            Err(RelinkError::Interrupted) => Err(RelinkError::Interrupted.into()),
            Err(e) => Ok(PairOutcome::Failed(e)),
        }
    }
}

/// Cheap comparison: file type, then recursive size (or link target for symlinks).
fn entries_differ(a: &Path, b: &Path) -> bool {
    let (Ok(ma), Ok(mb)) = (fs::symlink_metadata(a), fs::symlink_metadata(b)) else {
        return true;
    };
    let (ta, tb) = (ma.file_type(), mb.file_type());
    if ta.is_dir() != tb.is_dir() || ta.is_symlink() != tb.is_symlink() {
        return true;
    }
    if ta.is_symlink() {
        return fs::read_link(a).ok() != fs::read_link(b).ok();
    }
    tree_size(a) != tree_size(b)
}
