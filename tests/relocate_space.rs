#![cfg(unix)]

mod common;

use cache_relink::{relocate_with, Category, PairOutcome, RelinkError};
use common::{is_plain_dir, is_symlink, names, native_with_space, Libraries};

#[test]
fn shortfall_fails_only_that_pair() {
    let libs = Libraries::new();
    let source = libs.fill(&libs.b, Category::ShaderCache, &[("big", "x".repeat(1000).as_str())]);

    // 1000 bytes plus the 10% margin needs 1100.
    let summary = relocate_with(&libs.config(), &native_with_space(1099)).unwrap();
    let PairOutcome::Failed(RelinkError::InsufficientSpace { required, available, .. }) =
        &summary.pairs[0].outcome
    else {
        panic!("expected a space failure, got {:?}", summary.pairs[0].outcome);
    };
    assert_eq!((*required, *available), (1100, 1099));
    assert!(is_plain_dir(&source));
    assert_eq!(names(&source), vec!["big"]);
    assert!(!libs.store().dir().exists());
}

#[test]
fn exact_fit_is_allowed() {
    let libs = Libraries::new();
    libs.fill(&libs.b, Category::ShaderCache, &[("big", "x".repeat(1000).as_str())]);
    let summary = relocate_with(&libs.config(), &native_with_space(1100)).unwrap();
    assert!(matches!(summary.pairs[0].outcome, PairOutcome::Linked { items: 1 }));
}

#[test]
fn disabled_check_ignores_free_space() {
    let libs = Libraries::new();
    libs.fill(&libs.b, Category::CompatData, &[("100/pfx", "data")]);
    let mut cfg = libs.config();
    cfg.space_check = false;

    let summary = relocate_with(&cfg, &native_with_space(0)).unwrap();
    assert!(matches!(summary.pairs[1].outcome, PairOutcome::Linked { items: 1 }));
    assert!(is_symlink(&libs.cat(&libs.b, Category::CompatData)));
}
