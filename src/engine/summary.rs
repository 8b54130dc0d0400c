//! Per-pair outcomes and the run summary both engines return.

use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::errors::RelinkError;
use crate::fs_ops::format_bytes;
use crate::library::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Relocate,
    Restore,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunKind::Relocate => "relocation",
            RunKind::Restore => "restoration",
        })
    }
}

#[derive(Debug)]
pub enum PairOutcome {
    /// Category replaced by a redirect; `items` entries moved (0 for an empty category).
    Linked { items: usize },
    /// Already a redirect to the primary category directory.
    AlreadyLinked,
    /// Category directory does not exist in this library.
    Missing,
    /// Dry-run: what a real run would do.
    Planned { items: usize, bytes: u64 },
    /// Redirect replaced by a directory and entries moved back.
    Restored {
        restored: usize,
        skipped: usize,
        conflicts: usize,
    },
    /// Restoration found something other than the expected redirect and left it alone.
    NotRedirect,
    Failed(RelinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Succeeded,
    Skipped,
    Failed,
}

impl PairOutcome {
    pub fn tally(&self) -> Tally {
        match self {
            PairOutcome::Linked { .. }
            | PairOutcome::Planned { .. }
            | PairOutcome::Restored { .. } => Tally::Succeeded,
            PairOutcome::AlreadyLinked | PairOutcome::Missing | PairOutcome::NotRedirect => {
                Tally::Skipped
            }
            PairOutcome::Failed(_) => Tally::Failed,
        }
    }

    pub fn error(&self) -> Option<&RelinkError> {
        match self {
            PairOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for PairOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairOutcome::Linked { items: 0 } => write!(f, "linked (empty)"),
            PairOutcome::Linked { items } => write!(f, "linked, {items} entries moved"),
            PairOutcome::AlreadyLinked => write!(f, "already linked"),
            PairOutcome::Missing => write!(f, "not present"),
            PairOutcome::Planned { items, bytes } => {
                write!(f, "would move {items} entries ({})", format_bytes(*bytes))
            }
            PairOutcome::Restored {
                restored,
                skipped,
                conflicts,
            } => write!(
                f,
                "restored {restored} entries ({skipped} missing, {conflicts} conflicts)"
            ),
            PairOutcome::NotRedirect => write!(f, "not a redirect; left alone"),
            PairOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

#[derive(Debug)]
pub struct PairReport {
    pub library: PathBuf,
    pub category: Category,
    pub outcome: PairOutcome,
}

#[derive(Debug)]
pub struct RunSummary {
    pub kind: RunKind,
    pub dry_run: bool,
    pub pairs: Vec<PairReport>,
    /// Problems not tied to one pair, e.g. unreadable manifest lines.
    pub issues: Vec<RelinkError>,
}

impl RunSummary {
    pub fn new(kind: RunKind, dry_run: bool) -> Self {
        Self {
            kind,
            dry_run,
            pairs: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Record and log one pair outcome.
    pub fn push(&mut self, library: PathBuf, category: Category, outcome: PairOutcome) {
        let lib = library.display();
        match &outcome {
            PairOutcome::Failed(e) => {
                warn!(library = %lib, %category, code = e.code(), kind = e.kind(), "{e}")
            }
            PairOutcome::NotRedirect => {
                warn!(library = %lib, %category, "{outcome}")
            }
            other => info!(library = %lib, %category, "{other}"),
        }
        self.pairs.push(PairReport {
            library,
            category,
            outcome,
        });
    }

    pub fn push_issue(&mut self, e: RelinkError) {
        warn!(code = e.code(), kind = e.kind(), "{e}");
        self.issues.push(e);
    }

    fn count(&self, t: Tally) -> usize {
        self.pairs.iter().filter(|p| p.outcome.tally() == t).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(Tally::Succeeded)
    }

    pub fn skipped(&self) -> usize {
        self.count(Tally::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(Tally::Failed) + self.issues.len()
    }

    /// A run fails only when nothing succeeded and something failed.
    pub fn is_success(&self) -> bool {
        !(self.succeeded() == 0 && self.failed() > 0)
    }

    /// Emit the closing summary line.
    pub fn log(&self) {
        let (succeeded, skipped, failed) = (self.succeeded(), self.skipped(), self.failed());
        if self.is_success() {
            info!(run = %self.kind, dry_run = self.dry_run, succeeded, skipped, failed, "run complete");
        } else {
            error!(run = %self.kind, dry_run = self.dry_run, succeeded, skipped, failed, "run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: PairOutcome) -> PairReport {
        PairReport {
            library: PathBuf::from("/b"),
            category: Category::ShaderCache,
            outcome,
        }
    }

    #[test]
    fn success_rule() {
        let mut s = RunSummary::new(RunKind::Relocate, false);
        assert!(s.is_success());

        s.pairs.push(report(PairOutcome::Failed(RelinkError::Interrupted)));
        assert!(!s.is_success());

        s.pairs.push(report(PairOutcome::Linked { items: 2 }));
        assert!(s.is_success());
        assert_eq!((s.succeeded(), s.skipped(), s.failed()), (1, 0, 1));
    }

    #[test]
    fn skips_alone_are_success() {
        let mut s = RunSummary::new(RunKind::Restore, false);
        s.pairs.push(report(PairOutcome::AlreadyLinked));
        s.pairs.push(report(PairOutcome::Missing));
        assert!(s.is_success());
        assert_eq!(s.skipped(), 2);
    }
}
