//! Relocation and restoration engines.
//!
//! Both take an explicit [`Config`] and a set of [`Backends`]; tests swap the
//! backends to simulate a full disk or a failing transfer.

mod relocate;
mod restore;
mod summary;

pub use relocate::{relocate, relocate_with};
pub use restore::{restore, restore_with};
pub use summary::{PairOutcome, PairReport, RunKind, RunSummary, Tally};

use crate::config::Config;
use crate::errors::RelinkError;
use crate::fs_ops::{transfer_for, FsSpaceProbe, SpaceProbe, Transfer};

/// Pluggable collaborators used while moving data.
pub struct Backends {
    pub space: Box<dyn SpaceProbe>,
    pub transfer: Box<dyn Transfer>,
}

impl Backends {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            space: Box::new(FsSpaceProbe),
            transfer: transfer_for(cfg.transfer, cfg.progress),
        }
    }
}

fn is_interrupt(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<RelinkError>(), Some(RelinkError::Interrupted))
}
