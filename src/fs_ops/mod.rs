//! Filesystem operations used by both engines: run lock, space gate, redirect
//! inspection, bulk transfer, and error enrichment.

mod helpers;
pub mod link;
mod lock;
mod meta;
mod space;
mod transfer;
mod util;

pub use helpers::io_error_with_help;
pub use link::{inspect, PathState};
pub use lock::{
    acquire_run_lock, lock_file_path, read_lock_owner, try_acquire_run_lock, RunLock,
    LOCK_FILE_NAME,
};
pub use space::{
    ensure_space_for_move, format_bytes, tree_size, with_margin, FsSpaceProbe, SpaceProbe,
};
pub use transfer::{transfer_for, NativeTransfer, RsyncTransfer, Transfer};
pub use util::{is_writable_probe, prune_empty_dirs, sorted_entries};
