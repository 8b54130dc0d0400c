// Shared fixtures for integration tests.
//
// Builds a primary library `A` and a secondary library `B` under one temp
// root, with a descriptor listing both, plus fake backends for simulating a
// full disk or a misbehaving transfer.
#![allow(dead_code)]

use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cache_relink::fs_ops::{FsSpaceProbe, NativeTransfer, SpaceProbe, Transfer};
use cache_relink::{Backends, Category, Config, ManifestStore, RelinkError, APPS_ROOT};

pub struct Libraries {
    pub temp: TempDir,
    pub a: PathBuf,
    pub b: PathBuf,
}

impl Libraries {
    /// `A` (primary) and `B`, both with an apps root, listed in A's descriptor.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        temp.child("A").child(APPS_ROOT).create_dir_all().unwrap();
        temp.child("B").child(APPS_ROOT).create_dir_all().unwrap();
        let root = dunce::canonicalize(temp.path()).unwrap();
        let libs = Self {
            a: root.join("A"),
            b: root.join("B"),
            temp,
        };
        write_descriptor(&libs.a, &[&libs.a, &libs.b]);
        libs
    }

    pub fn config(&self) -> Config {
        let mut cfg = Config::new(&self.a);
        cfg.log_file = None;
        cfg.progress = false;
        cfg.lock_timeout = Duration::from_secs(2);
        cfg.lock_poll = Duration::from_millis(10);
        cfg
    }

    pub fn apps(&self, lib: &Path) -> PathBuf {
        lib.join(APPS_ROOT)
    }

    pub fn cat(&self, lib: &Path, category: Category) -> PathBuf {
        self.apps(lib).join(category.dir_name())
    }

    pub fn store(&self) -> ManifestStore {
        ManifestStore::new(&self.apps(&self.a))
    }

    /// Populate `lib`'s category directory with `(name, contents)` files.
    pub fn fill(&self, lib: &Path, category: Category, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.cat(lib, category);
        fs::create_dir_all(&dir).unwrap();
        for (name, body) in files {
            let p = dir.join(name);
            if let Some(parent) = p.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(p, body).unwrap();
        }
        dir
    }
}

pub fn write_descriptor(primary: &Path, libraries: &[&Path]) {
    let mut body = String::from("\"libraryfolders\"\n{\n");
    for (i, p) in libraries.iter().enumerate() {
        body.push_str(&format!(
            "\t\"{i}\"\n\t{{\n\t\t\"path\"\t\t\"{}\"\n\t\t\"label\"\t\t\"\"\n\t}}\n",
            p.display()
        ));
    }
    body.push_str("}\n");
    fs::write(
        primary.join(APPS_ROOT).join("libraryfolders.vdf"),
        body,
    )
    .unwrap();
}

/// Sorted names directly inside `dir` (empty when it does not exist).
pub fn names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = match fs::read_dir(dir) {
        Ok(rd) => rd
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    v.sort();
    v
}

pub fn is_symlink(p: &Path) -> bool {
    fs::symlink_metadata(p)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

pub fn is_plain_dir(p: &Path) -> bool {
    fs::symlink_metadata(p)
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

/// Reports a fixed amount of free space.
pub struct FixedSpace(pub u64);

impl SpaceProbe for FixedSpace {
    fn available_bytes(&self, _path: &Path) -> io::Result<u64> {
        Ok(self.0)
    }
}

/// Fails without moving anything.
pub struct FailingTransfer;

impl Transfer for FailingTransfer {
    fn move_entries(&self, from_dir: &Path, _to: &Path, _names: &[OsString]) -> Result<(), RelinkError> {
        Err(RelinkError::TransferFailure {
            src: from_dir.to_path_buf(),
            reason: "simulated failure".into(),
        })
    }
}

/// Moves every entry but the last, then claims success.
pub struct LeavesOneBehind;

impl Transfer for LeavesOneBehind {
    fn move_entries(&self, from_dir: &Path, to_dir: &Path, names: &[OsString]) -> Result<(), RelinkError> {
        let keep = names.len().saturating_sub(1);
        NativeTransfer::default().move_entries(from_dir, to_dir, &names[..keep])
    }
}

/// Moves the first entry, then behaves as if Ctrl-C arrived.
pub struct InterruptAfterFirst;

impl Transfer for InterruptAfterFirst {
    fn move_entries(&self, from_dir: &Path, to_dir: &Path, names: &[OsString]) -> Result<(), RelinkError> {
        let native = NativeTransfer::default();
        native.move_entries(from_dir, to_dir, &names[..names.len().min(1)])?;
        cache_relink::shutdown::request();
        native.move_entries(from_dir, to_dir, &names[names.len().min(1)..])
    }
}

/// Moves only the first file inside the first (directory) entry, then stops
/// as if Ctrl-C arrived mid-copy.
pub struct StopsInsideDirectory;

impl Transfer for StopsInsideDirectory {
    fn move_entries(&self, from_dir: &Path, to_dir: &Path, names: &[OsString]) -> Result<(), RelinkError> {
        let Some(first) = names.first() else {
            return Ok(());
        };
        let src = from_dir.join(first);
        let dst = to_dir.join(first);
        let mut children: Vec<_> = fs::read_dir(&src).unwrap().map(|e| e.unwrap().file_name()).collect();
        children.sort();
        fs::create_dir_all(&dst).unwrap();
        fs::rename(src.join(&children[0]), dst.join(&children[0])).unwrap();
        cache_relink::shutdown::request();
        Err(RelinkError::Interrupted)
    }
}

pub fn backends(space: impl SpaceProbe + 'static, transfer: impl Transfer + 'static) -> Backends {
    Backends {
        space: Box::new(space),
        transfer: Box::new(transfer),
    }
}

pub fn native_with_space(bytes: u64) -> Backends {
    backends(FixedSpace(bytes), NativeTransfer::default())
}

pub fn real_backends() -> Backends {
    backends(FsSpaceProbe, NativeTransfer::default())
}
