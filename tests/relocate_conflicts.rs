#![cfg(unix)]

mod common;

use std::fs;

use cache_relink::{relocate, Category, PairOutcome, RelinkError};
use common::{is_plain_dir, is_symlink, names, Libraries};

#[test]
fn foreign_redirect_is_never_retargeted() {
    let libs = Libraries::new();
    let elsewhere = libs.temp.path().join("elsewhere");
    fs::create_dir_all(&elsewhere).unwrap();
    let link = libs.cat(&libs.b, Category::ShaderCache);
    std::os::unix::fs::symlink(&elsewhere, &link).unwrap();

    let summary = relocate(&libs.config()).unwrap();
    let PairOutcome::Failed(RelinkError::ConflictingRedirect { found, .. }) = &summary.pairs[0].outcome
    else {
        panic!("expected a conflict, got {:?}", summary.pairs[0].outcome);
    };
    assert_eq!(found, &elsewhere);
    assert_eq!(fs::read_link(&link).unwrap(), elsewhere);
    // One failure, nothing succeeded.
    assert!(!summary.is_success());
    assert!(!libs.store().dir().exists());
}

#[test]
fn plain_file_in_place_of_category_is_a_conflict() {
    let libs = Libraries::new();
    let path = libs.cat(&libs.b, Category::CompatData);
    fs::write(&path, b"not a dir").unwrap();

    let summary = relocate(&libs.config()).unwrap();
    assert!(matches!(
        summary.pairs[1].outcome,
        PairOutcome::Failed(RelinkError::ConflictingRedirect { .. })
    ));
    assert_eq!(fs::read(&path).unwrap(), b"not a dir");
}

#[test]
fn name_collision_refuses_before_moving_anything() {
    let libs = Libraries::new();
    libs.fill(&libs.a, Category::ShaderCache, &[("f2", "primary copy")]);
    let source = libs.fill(&libs.b, Category::ShaderCache, &[("f1", "1"), ("f2", "secondary copy")]);

    let summary = relocate(&libs.config()).unwrap();
    let PairOutcome::Failed(RelinkError::NameCollision { name, .. }) = &summary.pairs[0].outcome else {
        panic!("expected a collision, got {:?}", summary.pairs[0].outcome);
    };
    assert_eq!(name, "f2");
    assert!(is_plain_dir(&source));
    assert_eq!(names(&source), vec!["f1", "f2"]);
    assert_eq!(names(&libs.cat(&libs.a, Category::ShaderCache)), vec!["f2"]);
    assert!(!libs.store().dir().exists());
}

#[test]
fn failures_in_one_pair_do_not_stop_the_others() {
    let libs = Libraries::new();
    libs.fill(&libs.a, Category::ShaderCache, &[("dup", "a")]);
    libs.fill(&libs.b, Category::ShaderCache, &[("dup", "b")]);
    libs.fill(&libs.b, Category::CompatData, &[("100/x", "x")]);

    let summary = relocate(&libs.config()).unwrap();
    assert_eq!((summary.succeeded(), summary.failed()), (1, 1));
    assert!(summary.is_success());
    assert!(is_symlink(&libs.cat(&libs.b, Category::CompatData)));
    assert!(is_plain_dir(&libs.cat(&libs.b, Category::ShaderCache)));
}
