//! Relocation: move each secondary library's cache categories into the primary
//! library and leave redirects behind.
//!
//! Per (library, category) pair:
//! - redirect to the primary category dir: skipped
//! - any other redirect, or a plain file: conflict, untouched
//! - absent: skipped
//! - empty directory: replaced by a redirect
//! - populated directory: entries moved (ItemList written first), source
//!   verified empty, then replaced by a redirect
//!
//! An unfinished run (`run.open` in the state dir) is resumed on the next
//! invocation; a finished one blocks relocation until it is restored.

use anyhow::Result;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use super::summary::{PairOutcome, RunKind, RunSummary};
use super::{is_interrupt, Backends};
use crate::config::Config;
use crate::errors::RelinkError;
use crate::fs_ops::{
    acquire_run_lock, ensure_space_for_move, inspect, io_error_with_help, prune_empty_dirs,
    sorted_entries, tree_size, PathState, SpaceProbe,
};
use crate::library::{apps_dir, category_dir, resolve_libraries, resolve_primary, Category, Library};
use crate::manifest::{item_list_id, ActionRecord, ManifestStore};
use crate::platform::{create_dir_link, os_to_bytes};
use crate::shutdown;

/// Relocate with the filesystem probe and the configured transfer.
pub fn relocate(cfg: &Config) -> Result<RunSummary> {
    relocate_with(cfg, &Backends::from_config(cfg))
}

pub fn relocate_with(cfg: &Config, backends: &Backends) -> Result<RunSummary> {
    let primary = resolve_primary(cfg)?;
    let apps = apps_dir(&primary);
    let store = ManifestStore::new(&apps);
    refuse_completed_manifest(&store)?;

    let libraries = resolve_libraries(&primary)?;
    let secondaries: Vec<&Library> = libraries.iter().filter(|l| !l.is_primary).collect();
    let mut summary = RunSummary::new(RunKind::Relocate, cfg.dry_run);
    if secondaries.is_empty() {
        info!(primary = %primary.display(), "no secondary libraries; nothing to relocate");
        summary.log();
        return Ok(summary);
    }

    if cfg.dry_run {
        for lib in &secondaries {
            for category in Category::ALL {
                let outcome = plan_pair(cfg, backends.space.as_ref(), &store, &primary, lib, category)?;
                summary.push(lib.path.clone(), category, outcome);
            }
        }
        summary.log();
        return Ok(summary);
    }

    let _lock = acquire_run_lock(&apps, cfg.lock_timeout, cfg.lock_poll)?;
    refuse_completed_manifest(&store)?;

    let mut run = Relocation::begin(cfg, backends, &primary, store, summary)?;
    let outcome = run.relocate_all(&secondaries);
    let finished = run.finish();
    run.summary.log();
    outcome?;
    finished?;
    Ok(run.summary)
}

fn refuse_completed_manifest(store: &ManifestStore) -> Result<(), RelinkError> {
    if store.manifest_exists() && !store.run_is_open() {
        return Err(RelinkError::ManifestExists(store.manifest_path()));
    }
    Ok(())
}

/// Result of the read-only checks shared by real runs and dry-runs.
enum Assessment {
    AlreadyLinked,
    Missing,
    Empty,
    Populated { names: Vec<OsString>, bytes: u64 },
    Refused(RelinkError),
}

/// `claimed` holds names an interrupted attempt already listed for this pair;
/// their partial copies in `target` are finished rather than treated as clashes.
fn assess(
    cfg: &Config,
    space: &dyn SpaceProbe,
    source: &Path,
    target: &Path,
    claimed: &[OsString],
) -> Result<Assessment> {
    let state = inspect(source, target).map_err(io_error_with_help("inspect", source))?;
    match state {
        PathState::Redirect { matches: true, .. } => return Ok(Assessment::AlreadyLinked),
        PathState::Redirect { target: found, .. } => {
            return Ok(Assessment::Refused(RelinkError::ConflictingRedirect {
                link: source.to_path_buf(),
                found,
                expected: target.to_path_buf(),
            }));
        }
        PathState::Other => {
            return Ok(Assessment::Refused(RelinkError::ConflictingRedirect {
                link: source.to_path_buf(),
                found: source.to_path_buf(),
                expected: target.to_path_buf(),
            }));
        }
        PathState::Missing => return Ok(Assessment::Missing),
        PathState::Directory => {}
    }

    let names = sorted_entries(source).map_err(io_error_with_help("list", source))?;
    if names.is_empty() {
        return Ok(Assessment::Empty);
    }

    if let Some(bad) = names.iter().find(|n| os_to_bytes(n).contains(&b'\n')) {
        return Ok(Assessment::Refused(RelinkError::TransferFailure {
            src: source.join(bad),
            reason: "entry name contains a newline and cannot be recorded".into(),
        }));
    }

    let bytes = if cfg.space_check {
        match ensure_space_for_move(space, source, target) {
            Ok(size) => size,
            Err(e) => return Ok(Assessment::Refused(e)),
        }
    } else if cfg.dry_run {
        tree_size(source)
    } else {
        0
    };

    if let Some(clash) = names
        .iter()
        .find(|n| !claimed.contains(n) && fs::symlink_metadata(target.join(n)).is_ok())
    {
        return Ok(Assessment::Refused(RelinkError::NameCollision {
            name: clash.to_string_lossy().into_owned(),
            dest: target.to_path_buf(),
        }));
    }

    Ok(Assessment::Populated { names, bytes })
}

/// Names listed by the pair's write-ahead ItemList when resuming an unfinished run.
fn claimed_names(store: &ManifestStore, resumed: bool, id: &str) -> Result<Vec<OsString>> {
    if !resumed {
        return Ok(Vec::new());
    }
    match store.read_item_list(id) {
        Ok(names) => Ok(names),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(io_error_with_help("read item list", &store.item_list_path(id))(e)),
    }
}

fn plan_pair(
    cfg: &Config,
    space: &dyn SpaceProbe,
    store: &ManifestStore,
    primary: &Path,
    lib: &Library,
    category: Category,
) -> Result<PairOutcome> {
    let source = lib.category_dir(category);
    let target = category_dir(primary, category);
    let claimed = claimed_names(store, store.run_is_open(), &item_list_id(&lib.path, category))?;
    Ok(match assess(cfg, space, &source, &target, &claimed)? {
        Assessment::AlreadyLinked => PairOutcome::AlreadyLinked,
        Assessment::Missing => PairOutcome::Missing,
        Assessment::Empty => PairOutcome::Planned { items: 0, bytes: 0 },
        Assessment::Populated { names, bytes } => PairOutcome::Planned {
            items: names.len(),
            bytes,
        },
        Assessment::Refused(e) => PairOutcome::Failed(e),
    })
}

struct Relocation<'a> {
    cfg: &'a Config,
    backends: &'a Backends,
    primary: &'a Path,
    store: ManifestStore,
    records: Vec<ActionRecord>,
    resumed: bool,
    opened: bool,
    keep_open: bool,
    summary: RunSummary,
}

impl<'a> Relocation<'a> {
    fn begin(
        cfg: &'a Config,
        backends: &'a Backends,
        primary: &'a Path,
        store: ManifestStore,
        mut summary: RunSummary,
    ) -> Result<Self> {
        let resumed = store.run_is_open();
        let mut records = Vec::new();
        if resumed {
            let manifest = store.load()?;
            info!(
                state = %store.dir().display(),
                records = manifest.records.len(),
                "resuming unfinished relocation run"
            );
            for issue in manifest.corrupt {
                summary.push_issue(issue);
            }
            records = manifest.records;
        }
        Ok(Self {
            cfg,
            backends,
            primary,
            store,
            records,
            resumed,
            opened: resumed,
            keep_open: false,
            summary,
        })
    }

    fn relocate_all(&mut self, libraries: &[&Library]) -> Result<()> {
        for lib in libraries {
            for category in Category::ALL {
                if shutdown::is_requested() {
                    self.keep_open = true;
                    return Err(RelinkError::Interrupted.into());
                }
                let outcome = match self.relocate_pair(lib, category) {
                    Ok(o) => o,
                    Err(e) if is_interrupt(&e) => {
                        self.keep_open = true;
                        return Err(e);
                    }
                    Err(e) => PairOutcome::Failed(RelinkError::TransferFailure {
                        src: lib.category_dir(category),
                        reason: format!("{e:#}"),
                    }),
                };
                if matches!(
                    outcome.error(),
                    Some(RelinkError::TransferFailure { .. } | RelinkError::ResidualData { .. })
                ) {
                    self.keep_open = true;
                }
                self.summary.push(lib.path.clone(), category, outcome);
            }
        }
        Ok(())
    }

    fn relocate_pair(&mut self, lib: &Library, category: Category) -> Result<PairOutcome> {
        let source = lib.category_dir(category);
        let target = category_dir(self.primary, category);
        let id = item_list_id(&lib.path, category);

        let claimed = claimed_names(&self.store, self.resumed, &id)?;
        match assess(self.cfg, self.backends.space.as_ref(), &source, &target, &claimed)? {
            Assessment::AlreadyLinked => {
                self.adopt_if_unrecorded(lib, category, &id)?;
                Ok(PairOutcome::AlreadyLinked)
            }
            Assessment::Missing => Ok(PairOutcome::Missing),
            Assessment::Refused(e) => Ok(PairOutcome::Failed(e)),
            Assessment::Empty => {
                self.ensure_open()?;
                self.swap_for_redirect(&source, &target)?;
                // An earlier attempt may have moved everything before stopping.
                let record = if self.store.item_list_path(&id).exists() {
                    ActionRecord::linked_populated(&lib.path, category)
                } else {
                    ActionRecord::linked_empty(&lib.path, category)
                };
                self.record(record)?;
                Ok(PairOutcome::Linked { items: 0 })
            }
            Assessment::Populated { names, .. } => {
                self.ensure_open()?;
                self.store.merge_item_list(&id, &names)?;
                fs::create_dir_all(&target).map_err(io_error_with_help("create", &target))?;

                info!(
                    library = %lib.path.display(),
                    %category,
                    entries = names.len(),
                    "moving entries into primary library"
                );
                match self.backends.transfer.move_entries(&source, &target, &names) {
                    Ok(()) => {}
                    Err(RelinkError::Interrupted) => return Err(RelinkError::Interrupted.into()),
                    Err(e) => return Ok(PairOutcome::Failed(e)),
                }

                prune_empty_dirs(&source);
                let remaining = sorted_entries(&source)
                    .map_err(io_error_with_help("list", &source))?
                    .len();
                if remaining > 0 {
                    return Ok(PairOutcome::Failed(RelinkError::ResidualData {
                        path: source,
                        remaining,
                    }));
                }

                self.swap_for_redirect(&source, &target)?;
                self.record(ActionRecord::linked_populated(&lib.path, category))?;
                Ok(PairOutcome::Linked { items: names.len() })
            }
        }
    }

    /// Replace the (verified empty) `source` directory with a redirect to `target`.
    fn swap_for_redirect(&self, source: &Path, target: &Path) -> Result<()> {
        fs::create_dir_all(target).map_err(io_error_with_help("create", target))?;
        // remove_dir refuses a non-empty directory, so nothing unverified is lost.
        fs::remove_dir(source).map_err(io_error_with_help("remove", source))?;
        create_dir_link(target, source).map_err(io_error_with_help("link", source))?;
        debug!(link = %source.display(), target = %target.display(), "redirect created");
        Ok(())
    }

    /// A resumed run may find a redirect it created just before stopping; its
    /// ItemList proves ownership.
    fn adopt_if_unrecorded(&mut self, lib: &Library, category: Category, id: &str) -> Result<()> {
        if !self.resumed
            || self.records.iter().any(|r| r.same_pair(&lib.path, category))
            || !self.store.item_list_path(id).exists()
        {
            return Ok(());
        }
        info!(library = %lib.path.display(), %category, "recording redirect from interrupted attempt");
        self.record(ActionRecord::linked_populated(&lib.path, category))
    }

    fn ensure_open(&mut self) -> Result<()> {
        if !self.opened {
            self.store.open_run()?;
            self.opened = true;
        }
        Ok(())
    }

    fn record(&mut self, record: ActionRecord) -> Result<()> {
        match self
            .records
            .iter_mut()
            .find(|r| r.same_pair(&record.library, record.category))
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.store.persist(&self.records)
    }

    /// Close, keep open, or drop the state directory depending on what is left.
    fn finish(&mut self) -> Result<()> {
        if !self.store.has_state() {
            return Ok(());
        }
        let ids = self.store.item_list_ids()?;
        if self.records.is_empty() && ids.is_empty() {
            return self.store.retire();
        }

        let referenced: HashSet<&str> = self
            .records
            .iter()
            .filter_map(|r| r.item_list_id.as_deref())
            .collect();
        let unfinished = ids.iter().filter(|id| !referenced.contains(id.as_str())).count();
        if unfinished > 0 {
            self.keep_open = true;
        }

        if self.keep_open {
            if !self.opened {
                self.store.open_run()?;
            }
            warn!(
                state = %self.store.dir().display(),
                unfinished,
                "relocation left unfinished; re-run to resume or restore to undo"
            );
            Ok(())
        } else {
            self.store.close_run()
        }
    }
}
