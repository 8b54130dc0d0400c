//! On-disk state directory holding the manifest, ItemLists and run markers.
//!
//! Layout under the primary apps root:
//! - `.cache_relink/manifest.tsv`
//! - `.cache_relink/items/<id>`
//! - `.cache_relink/run.open` while a relocation run is unfinished
//! - `.cache_relink/restore.open` while a restoration is unfinished
//!
//! Every file is replaced atomically; readers never see partial content.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::record::{decode_item_list, encode_item_list, is_valid_id, ActionRecord};
use crate::errors::RelinkError;
use crate::fs_ops::io_error_with_help;
use crate::platform::{atomic_write, set_dir_mode_0700};

pub const STATE_DIR_NAME: &str = ".cache_relink";
pub const MANIFEST_FILE: &str = "manifest.tsv";
pub const ITEMS_DIR: &str = "items";
const RUN_MARKER: &str = "run.open";
const RESTORE_MARKER: &str = "restore.open";

/// Records read back from disk, plus any lines that could not be parsed.
#[derive(Debug, Default)]
pub struct Manifest {
    pub records: Vec<ActionRecord>,
    pub corrupt: Vec<RelinkError>,
}

#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    /// Store rooted in the primary library's apps directory.
    pub fn new(apps_dir: &Path) -> Self {
        Self {
            dir: apps_dir.join(STATE_DIR_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn item_list_path(&self, id: &str) -> PathBuf {
        self.dir.join(ITEMS_DIR).join(id)
    }

    pub fn has_state(&self) -> bool {
        fs::symlink_metadata(&self.dir).is_ok()
    }

    pub fn manifest_exists(&self) -> bool {
        self.manifest_path().exists()
    }

    /// True while a relocation run has not finished cleanly.
    pub fn run_is_open(&self) -> bool {
        self.dir.join(RUN_MARKER).exists()
    }

    pub fn restore_is_open(&self) -> bool {
        self.dir.join(RESTORE_MARKER).exists()
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.is_dir() {
            fs::create_dir_all(self.dir.join(ITEMS_DIR))
                .map_err(io_error_with_help("create state dir", &self.dir))?;
            set_dir_mode_0700(&self.dir)
                .map_err(io_error_with_help("restrict state dir", &self.dir))?;
            debug!(dir = %self.dir.display(), "state directory created");
        }
        Ok(())
    }

    pub fn open_run(&self) -> Result<()> {
        self.ensure_dir()?;
        atomic_write(&self.dir.join(RUN_MARKER), format!("{}\n", std::process::id()).as_bytes(), 0o600)
    }

    pub fn close_run(&self) -> Result<()> {
        remove_if_present(&self.dir.join(RUN_MARKER))
    }

    pub fn open_restore(&self) -> Result<()> {
        self.ensure_dir()?;
        atomic_write(&self.dir.join(RESTORE_MARKER), format!("{}\n", std::process::id()).as_bytes(), 0o600)
    }

    /// Read all records. A missing manifest yields an empty one.
    pub fn load(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Manifest::default()),
            Err(e) => return Err(io_error_with_help("read manifest", &path)(e)),
        };

        let mut manifest = Manifest::default();
        for (idx, line) in bytes.split(|b| *b == b'\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            match ActionRecord::parse_line(line) {
                Ok(rec) => manifest.records.push(rec),
                Err(reason) => manifest.corrupt.push(RelinkError::ManifestCorruption {
                    path: path.clone(),
                    reason: format!("line {}: {reason}", idx + 1),
                }),
            }
        }
        trace!(records = manifest.records.len(), corrupt = manifest.corrupt.len(), "manifest loaded");
        Ok(manifest)
    }

    /// Replace the manifest with `records`.
    pub fn persist(&self, records: &[ActionRecord]) -> Result<()> {
        self.ensure_dir()?;
        let body: Vec<u8> = records.iter().flat_map(ActionRecord::to_line).collect();
        atomic_write(&self.manifest_path(), &body, 0o600)
            .with_context(|| format!("persist manifest '{}'", self.manifest_path().display()))?;
        debug!(records = records.len(), "manifest persisted");
        Ok(())
    }

    pub fn read_item_list(&self, id: &str) -> io::Result<Vec<OsString>> {
        fs::read(self.item_list_path(id)).map(|b| decode_item_list(&b))
    }

    /// Write the ItemList for `id`, keeping names recorded by an earlier attempt.
    /// Returns the merged list, sorted byte-wise.
    pub fn merge_item_list(&self, id: &str, names: &[OsString]) -> Result<Vec<OsString>> {
        self.ensure_dir()?;
        let mut merged = match self.read_item_list(id) {
            Ok(existing) => existing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_error_with_help("read item list", &self.item_list_path(id))(e)),
        };
        for name in names {
            if !merged.contains(name) {
                merged.push(name.clone());
            }
        }
        merged.sort_by(|a, b| a.as_encoded_bytes().cmp(b.as_encoded_bytes()));
        atomic_write(&self.item_list_path(id), &encode_item_list(&merged), 0o600)?;
        trace!(id, items = merged.len(), "item list written");
        Ok(merged)
    }

    /// Ids of every ItemList on disk, sorted.
    pub fn item_list_ids(&self) -> Result<Vec<String>> {
        let items = self.dir.join(ITEMS_DIR);
        let rd = match fs::read_dir(&items) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error_with_help("list item lists", &items)(e)),
        };
        let mut ids: Vec<String> = rd
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| is_valid_id(n))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Delete the whole state directory.
    pub fn retire(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                debug!(dir = %self.dir.display(), "state directory removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error_with_help("remove state dir", &self.dir)(e)),
        }
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            Err(io_error_with_help("remove marker", path)(e))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Category;
    use crate::manifest::item_list_id;
    use tempfile::tempdir;

    #[test]
    fn persist_and_load_round_trip_with_corrupt_line() {
        let td = tempdir().unwrap();
        let store = ManifestStore::new(td.path());
        let recs = vec![
            ActionRecord::linked_populated("/games/b", Category::ShaderCache),
            ActionRecord::linked_empty("/games/b", Category::CompatData),
        ];
        store.persist(&recs).unwrap();

        let mut raw = fs::read(store.manifest_path()).unwrap();
        raw.extend_from_slice(b"garbage line\n");
        fs::write(store.manifest_path(), raw).unwrap();

        let m = store.load().unwrap();
        assert_eq!(m.records, recs);
        assert_eq!(m.corrupt.len(), 1);
        assert!(m.corrupt[0].to_string().contains("line 3"));
    }

    #[test]
    fn merge_keeps_earlier_names() {
        let td = tempdir().unwrap();
        let store = ManifestStore::new(td.path());
        let id = item_list_id(Path::new("/games/b"), Category::ShaderCache);
        store.merge_item_list(&id, &["f1".into()]).unwrap();
        let merged = store.merge_item_list(&id, &["f2".into(), "f1".into()]).unwrap();
        assert_eq!(merged, vec![OsString::from("f1"), OsString::from("f2")]);
        assert_eq!(fs::read(store.item_list_path(&id)).unwrap(), b"f1\nf2\n");
        assert_eq!(store.item_list_ids().unwrap(), vec![id]);
    }

    #[test]
    fn merge_keeps_list_sorted_after_resume() {
        let td = tempdir().unwrap();
        let store = ManifestStore::new(td.path());
        let id = item_list_id(Path::new("/games/b"), Category::CompatData);
        store.merge_item_list(&id, &["m".into(), "z".into()]).unwrap();
        let merged = store.merge_item_list(&id, &["a".into(), "z".into()]).unwrap();
        assert_eq!(merged, vec![OsString::from("a"), OsString::from("m"), OsString::from("z")]);
        assert_eq!(fs::read(store.item_list_path(&id)).unwrap(), b"a\nm\nz\n");
    }

    #[test]
    fn markers_and_retire() {
        let td = tempdir().unwrap();
        let store = ManifestStore::new(td.path());
        assert!(!store.has_state());
        assert!(store.load().unwrap().records.is_empty());

        store.open_run().unwrap();
        assert!(store.run_is_open());
        store.close_run().unwrap();
        store.close_run().unwrap();
        assert!(!store.run_is_open());

        store.retire().unwrap();
        assert!(!store.has_state());
        store.retire().unwrap();
    }
}
