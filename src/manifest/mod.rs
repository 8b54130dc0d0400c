//! Durable record of a relocation run: which (library, category) pairs were
//! redirected and which entries each one moved into the primary library.

mod record;
mod store;

pub use record::{item_list_id, ActionRecord};
pub use store::{Manifest, ManifestStore, ITEMS_DIR, MANIFEST_FILE, STATE_DIR_NAME};
