#![cfg(unix)]

mod common;

use std::thread;
use std::time::Duration;

use cache_relink::fs_ops::{read_lock_owner, try_acquire_run_lock};
use cache_relink::{relocate, restore, Category, RelinkError};
use common::{is_symlink, names, Libraries};

#[test]
fn second_run_times_out_naming_the_owner() {
    let libs = Libraries::new();
    let source = libs.fill(&libs.b, Category::ShaderCache, &[("f1", "one")]);
    let held = try_acquire_run_lock(&libs.apps(&libs.a)).unwrap().unwrap();

    let mut cfg = libs.config();
    cfg.lock_timeout = Duration::from_millis(150);
    let err = relocate(&cfg).unwrap_err();
    match err.downcast_ref::<RelinkError>() {
        Some(RelinkError::LockTimeout { owner, marker, .. }) => {
            assert_eq!(*owner, Some(std::process::id()));
            assert_eq!(marker, held.path());
        }
        other => panic!("expected LockTimeout, got {other:?}"),
    }
    assert_eq!(names(&source), vec!["f1"]);
    assert!(!libs.store().has_state());

    let err = restore(&cfg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RelinkError>(),
        Some(RelinkError::LockTimeout { .. })
    ));
    drop(held);
}

#[test]
fn second_run_waits_for_the_first_to_finish() {
    let libs = Libraries::new();
    let source = libs.fill(&libs.b, Category::ShaderCache, &[("f1", "one")]);
    let apps = libs.apps(&libs.a);
    let held = try_acquire_run_lock(&apps).unwrap().unwrap();

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        drop(held);
    });
    let summary = relocate(&libs.config()).unwrap();
    releaser.join().unwrap();

    assert!(summary.is_success());
    assert!(is_symlink(&source));
    assert_eq!(read_lock_owner(&apps), None);
}

#[test]
fn dry_run_ignores_a_held_lock() {
    let libs = Libraries::new();
    libs.fill(&libs.b, Category::ShaderCache, &[("f1", "one")]);
    let _held = try_acquire_run_lock(&libs.apps(&libs.a)).unwrap().unwrap();

    let mut cfg = libs.config();
    cfg.dry_run = true;
    cfg.lock_timeout = Duration::from_millis(50);
    assert!(relocate(&cfg).unwrap().is_success());
}
