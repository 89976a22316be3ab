#![allow(
    clippy::unwrap_used,
    reason = "test assertions use unwrap for clarity"
)]

use super::*;
use crate::testing::{write, Fixture};
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn test_split_finds_install_root() {
    let layout = EnvLayout::default();
    let (install, package) = layout
        .split(Path::new("/opt/apps/e1/lib/v1/site-modules/qux.unit"))
        .unwrap();
    assert_eq!(install, PathBuf::from("/opt/apps/e1"));
    assert_eq!(package, PathBuf::from("/opt/apps/e1/lib/v1/site-modules"));
}

#[test]
fn test_split_rejects_shallow_or_missing_segment() {
    let layout = EnvLayout::default();
    assert_eq!(layout.split(Path::new("/a/site-modules/x.unit")), None);
    assert_eq!(layout.split(Path::new("/opt/apps/e1/lib/x.unit")), None);
}

#[test]
fn test_classify_with_marker() {
    let fx = Fixture::new();
    let site = fx.env("e1");
    let file = write(&site, "qux.unit", "");

    let mut registry = EnvironmentRegistry::default();
    let id = registry.classify(&file);
    assert!(id.is_some());

    let env = registry.get(id.unwrap());
    assert_eq!(env.root(), site.as_path());
    assert_eq!(env.install_root(), Some(fx.root().join("e1").as_path()));
    assert!(env.is_validated());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_classify_nested_file_reuses_known_root() {
    let fx = Fixture::new();
    let site = fx.env("e1");
    let a = write(&site, "a.unit", "");
    let b = write(&site, "pkg/deep/b.unit", "");

    let mut registry = EnvironmentRegistry::default();
    let first = registry.classify(&a);
    let second = registry.classify(&b);
    assert_eq!(first, second);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_classify_outside_any_environment() {
    let fx = Fixture::new();
    let dir = fx.dir("app");
    let file = write(&dir, "main.unit", "");

    let mut registry = EnvironmentRegistry::default();
    assert_eq!(registry.classify(&file), None);
    assert!(registry.is_empty());
}

#[test]
fn test_negative_result_is_not_cached() {
    let fx = Fixture::new();
    let site = fx.unmarked_env("late");
    let file = write(&site, "qux.unit", "");

    let mut registry = EnvironmentRegistry::default();
    assert_eq!(registry.classify(&file), None);

    // The packaging phase finishes the environment afterwards.
    fs::write(fx.root().join("late").join("envmux.cfg"), "").unwrap();
    assert!(registry.classify(&file).is_some());
}

#[test]
fn test_positive_result_is_permanent() {
    let fx = Fixture::new();
    let site = fx.env("e1");
    let file = write(&site, "qux.unit", "");

    let mut registry = EnvironmentRegistry::default();
    let id = registry.classify(&file);
    assert!(id.is_some());

    fs::remove_file(fx.root().join("e1").join("envmux.cfg")).unwrap();
    assert_eq!(registry.classify(&file), id);
}

#[test]
fn test_register_root_explicit() {
    let fx = Fixture::new();
    let marked = fx.env("e1");
    let plain = fx.dir("loose");

    let mut registry = EnvironmentRegistry::default();
    let a = registry.register_root(&marked);
    let b = registry.register_root(&plain);
    assert!(registry.get(a).is_validated());
    assert!(!registry.get(b).is_validated());
    assert_eq!(registry.get(b).install_root(), None);

    // Idempotent, and classification below the root is now an ancestor check.
    assert_eq!(registry.register_root(&marked), a);
    assert_eq!(registry.classify(&plain.join("x.unit")), Some(b));
    assert_eq!(registry.by_root(&marked), Some(a));
}

#[test]
fn test_root_itself_is_not_beneath_root() {
    let fx = Fixture::new();
    let plain = fx.dir("loose");
    let mut registry = EnvironmentRegistry::default();
    registry.register_root(&plain);
    assert_eq!(registry.known(&plain), None);
}

#[test]
fn test_dotdot_spelling_is_the_same_environment() {
    let fx = Fixture::new();
    let site = fx.env("e1");
    let file = write(&site, "caller.unit", "");
    let detour = fx
        .root()
        .join("e1/../e1/lib/v1/site-modules/caller.unit");

    let mut registry = EnvironmentRegistry::default();
    let id = registry.classify(&detour).unwrap();
    assert_eq!(registry.get(id).root(), site.as_path());
    assert_eq!(registry.get(id).install_root(), Some(fx.root().join("e1").as_path()));
    assert_eq!(registry.classify(&file), Some(id));
    assert_eq!(registry.known(&detour), Some(id));
    assert_eq!(registry.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_symlinked_environment_resolves_to_canonical_root() {
    let fx = Fixture::new();
    let site = fx.env("e1");
    let file = write(&site, "caller.unit", "");
    std::os::unix::fs::symlink(fx.root().join("e1"), fx.root().join("alias")).unwrap();
    let aliased_site = fx.root().join("alias/lib/v1/site-modules");

    let mut registry = EnvironmentRegistry::default();
    let id = registry.classify(&aliased_site.join("caller.unit")).unwrap();
    assert_eq!(registry.get(id).root(), site.as_path());
    assert_eq!(registry.classify(&file), Some(id));
    assert_eq!(registry.register_root(&aliased_site), id);
    assert_eq!(registry.by_root(&aliased_site), Some(id));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_try_get_rejects_foreign_ids() {
    let fx = Fixture::new();
    let mut other = EnvironmentRegistry::default();
    other.register_root(&fx.env("a"));
    let foreign = other.register_root(&fx.env("b"));

    let mut registry = EnvironmentRegistry::default();
    let own = registry.register_root(&fx.env("c"));
    assert!(registry.try_get(own).is_some());
    assert_eq!(registry.try_get(foreign), None);
}
