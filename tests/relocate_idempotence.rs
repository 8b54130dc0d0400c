#![cfg(unix)]

mod common;

use std::fs;

use cache_relink::{relocate, Category, PairOutcome, RelinkError};
use common::{is_symlink, names, Libraries};

#[test]
fn second_relocation_is_refused_and_mutates_nothing() {
    let libs = Libraries::new();
    libs.fill(&libs.b, Category::ShaderCache, &[("f1", "1")]);
    let cfg = libs.config();
    relocate(&cfg).unwrap();

    // New data shows up in B before the second attempt.
    libs.fill(&libs.b, Category::CompatData, &[("new", "n")]);
    let manifest_before = fs::read(libs.store().manifest_path()).unwrap();

    let err = relocate(&cfg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RelinkError>(),
        Some(RelinkError::ManifestExists(_))
    ));
    assert_eq!(fs::read(libs.store().manifest_path()).unwrap(), manifest_before);
    assert_eq!(names(&libs.cat(&libs.b, Category::CompatData)), vec!["new"]);
    assert!(!libs.apps(&libs.a).join(".cache_relink.lock").exists());
}

#[test]
fn existing_matching_redirect_is_skipped() {
    let libs = Libraries::new();
    let target = libs.cat(&libs.a, Category::ShaderCache);
    fs::create_dir_all(&target).unwrap();
    std::os::unix::fs::symlink(&target, libs.cat(&libs.b, Category::ShaderCache)).unwrap();

    let summary = relocate(&libs.config()).unwrap();
    assert!(matches!(summary.pairs[0].outcome, PairOutcome::AlreadyLinked));
    assert!(matches!(summary.pairs[1].outcome, PairOutcome::Missing));
    assert!(summary.is_success());
    // Nothing was done, so nothing is recorded.
    assert!(!libs.store().dir().exists());
    assert!(is_symlink(&libs.cat(&libs.b, Category::ShaderCache)));
}

#[test]
fn relative_redirect_to_primary_counts_as_linked() {
    let libs = Libraries::new();
    fs::create_dir_all(libs.cat(&libs.a, Category::CompatData)).unwrap();
    std::os::unix::fs::symlink(
        "../../A/steamapps/compatdata",
        libs.cat(&libs.b, Category::CompatData),
    )
    .unwrap();
    let summary = relocate(&libs.config()).unwrap();
    assert!(matches!(summary.pairs[1].outcome, PairOutcome::AlreadyLinked));
}
