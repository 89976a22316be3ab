//! End-to-end resolution across several environments in one runtime.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

mod common;

use std::fs;
use std::sync::Arc;

use common::{write, Install};
use envmux_core::{
    ActivationKind, Frame, ImportError, ImportRequest, Runtime, IMPORT_MAP_FILE,
};
use pretty_assertions::assert_eq;

fn version_of(module: &envmux_core::ModuleRef) -> String {
    module.get_str("version").unwrap().to_string()
}

#[test]
fn end_to_end_each_caller_sees_its_own_qux() {
    let install = Install::new();
    let host = install.dir("host");
    let e1 = install.env("e1");
    let e2 = install.env("e2");
    write(&e1, "qux.unit", "let version = \"1\"");
    write(&e2, "qux.unit", "let version = \"2\"");
    write(&e1, "bar.unit", "use qux");
    write(&e2, "baz.unit", "use qux");
    write(&host, "qux.unit", "let version = \"host\"");
    let main = write(&install.dir("app"), "main.unit", "use bar\nuse baz");

    let mut rt = install.runtime(&[&host, &e1, &e2], &[]);
    let main = rt.run_path(&main).unwrap();

    let bar = main.get_module("bar").unwrap();
    let baz = main.get_module("baz").unwrap();
    assert_eq!(version_of(&bar.get_module("qux").unwrap()), "1");
    assert_eq!(version_of(&baz.get_module("qux").unwrap()), "2");

    // Neither environment's qux leaked into the host state.
    assert!(!rt.modules().contains("qux"));
    let host_qux = rt.import(ImportRequest::new("qux")).unwrap().module;
    assert_eq!(version_of(&host_qux), "host");

    assert_eq!(rt.active_environment(), None);
    assert_eq!(rt.activation_depth(), 0);
    assert_eq!(rt.search_path().entries(), &[host, e1, e2]);
}

#[test]
fn end_to_end_host_without_qux_is_not_found() {
    let install = Install::new();
    let host = install.dir("host");
    let e1 = install.env("e1");
    let e2 = install.env("e2");
    write(&e1, "qux.unit", "let version = \"1\"");
    write(&e2, "qux.unit", "let version = \"2\"");
    write(&e1, "bar.unit", "use qux");
    write(&e2, "baz.unit", "use qux");
    let e1_caller = write(&e1, "launcher.unit", "");
    let e2_caller = write(&e2, "launcher.unit", "");

    let mut rt = install.runtime(&[&host], &[]);
    let bar = rt
        .import(ImportRequest::new("bar").from_caller(&e1_caller))
        .unwrap()
        .module;
    let baz = rt
        .import(ImportRequest::new("baz").from_caller(&e2_caller))
        .unwrap()
        .module;
    assert_eq!(version_of(&bar.get_module("qux").unwrap()), "1");
    assert_eq!(version_of(&baz.get_module("qux").unwrap()), "2");

    let err = rt.import(ImportRequest::new("qux")).unwrap_err();
    assert!(matches!(err, ImportError::NotFound { .. }), "{err:?}");
}

#[test]
fn repeated_requests_reuse_each_environments_module() {
    let install = Install::new();
    let e1 = install.env("e1");
    let e2 = install.env("e2");
    write(&e1, "x.unit", "let version = \"1\"");
    write(&e2, "x.unit", "let version = \"2\"");
    let c1 = write(&e1, "caller.unit", "");
    let c2 = write(&e2, "caller.unit", "");
    let mut rt = install.runtime(&[], &[]);

    let first = rt.import(ImportRequest::new("x").from_caller(&c1)).unwrap().module;
    let second = rt.import(ImportRequest::new("x").from_caller(&c2)).unwrap().module;
    let again = rt.import(ImportRequest::new("x").from_caller(&c1)).unwrap().module;

    assert_eq!(version_of(&first), "1");
    assert_eq!(version_of(&second), "2");
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn alternate_spellings_of_a_caller_share_one_environment() {
    let install = Install::new();
    let e1 = install.env("e1");
    write(&e1, "x.unit", "let version = \"1\"");
    let caller = write(&e1, "caller.unit", "");
    let detour = install
        .root()
        .join("envs/e1/../e1/lib/v1/site-modules/caller.unit");
    let mut rt = install.runtime(&[], &[]);

    let first = rt.import(ImportRequest::new("x").from_caller(&caller)).unwrap().module;
    let second = rt.import(ImportRequest::new("x").from_caller(&detour)).unwrap().module;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(rt.registry().len(), 1);
    assert_eq!(rt.environment(first.environment().unwrap()).root(), e1.as_path());
}

#[test]
fn explicit_root_spelled_with_dotdot_matches_inferred_environment() {
    let install = Install::new();
    let e1 = install.env("e1");
    write(&e1, "x.unit", "let version = \"1\"");
    write(&e1, "w.unit", "let version = \"w\"");
    let caller = write(&e1, "caller.unit", "");
    let mapped_root = install.root().join("envs/e1/../e1/lib/v1/site-modules");
    let mut rt = install.runtime(&[], &[("x", mapped_root.as_path())]);

    let x = rt.import(ImportRequest::new("x")).unwrap().module;
    let w = rt.import(ImportRequest::new("w").from_caller(&caller)).unwrap().module;

    assert_eq!(x.environment(), w.environment());
    assert_eq!(rt.registry().len(), 1);
}

#[test]
fn explicit_mapping_from_install_dir_beats_caller_environment() {
    let install = Install::new();
    let home = install.dir("home");
    let e1 = install.env("e1");
    let e2 = install.env("e2");
    write(&e1, "x.unit", "let version = \"1\"");
    write(&e2, "x.unit", "let version = \"2\"");
    let caller = write(&e1, "caller.unit", "");
    write(
        &home,
        IMPORT_MAP_FILE,
        &format!(r#"{{"x": "{}"}}"#, e2.display()),
    );

    let mut rt = Runtime::from_install_dir(&home, Vec::new()).unwrap();
    let x = rt
        .import(ImportRequest::new("x").from_caller(&caller))
        .unwrap()
        .module;
    assert_eq!(version_of(&x), "2");
    assert!(rt.registry().by_root(&e2).is_some());
}

#[test]
fn inner_failure_leaves_activations_balanced() {
    let install = Install::new();
    let host = install.dir("host");
    let e1 = install.env("e1");
    let e2 = install.env("e2");
    write(&e1, "bar.unit", "use qux");
    write(&e1, "qux.unit", "use helper");
    write(&e2, "helper.unit", "fail \"helper is broken\"");

    let mut rt = install.runtime(&[&host], &[("bar", &e1), ("helper", &e2)]);
    let err = rt.import(ImportRequest::new("bar")).unwrap_err();
    assert!(
        matches!(&err, ImportError::Failed { message, .. } if message == "helper is broken"),
        "{err:?}"
    );

    assert_eq!(rt.active_environment(), None);
    assert_eq!(rt.activation_depth(), 0);
    assert!(!rt.is_forced());
    assert_eq!(rt.search_path().entries(), &[host]);
    assert_eq!(rt.call_stack().depth(), 0);

    let e1_id = rt.registry().by_root(&e1).unwrap();
    assert!(rt.module_state().lookup_in(Some(e1_id), "bar").is_none());
    assert!(rt.module_state().lookup_in(Some(e1_id), "qux").is_none());
}

#[test]
fn reactivating_active_environment_changes_nothing() {
    let install = Install::new();
    let e1 = install.env("e1");
    write(&e1, "x.unit", "");
    let caller = write(&e1, "caller.unit", "");
    let mut rt = install.runtime(&[], &[]);
    rt.import(ImportRequest::new("x").from_caller(&caller)).unwrap();
    let e1_id = rt.registry().by_root(&e1).unwrap();

    rt.with_activation(Some(e1_id), ActivationKind::Inferred, |rt| {
        let once = rt.modules().snapshot();
        rt.with_activation(Some(e1_id), ActivationKind::Inferred, |rt| {
            assert!(rt.modules().snapshot().same_modules(&once));
        });
        assert!(rt.modules().snapshot().same_modules(&once));
    });
}

#[test]
fn negative_classification_is_not_cached() {
    let install = Install::new();
    let site = install
        .root()
        .join("late")
        .join("lib")
        .join("v1")
        .join("site-modules");
    fs::create_dir_all(&site).unwrap();
    let file = write(&site, "m.unit", "");
    let mut rt = install.runtime(&[], &[]);

    assert_eq!(rt.classify(&file), None);
    assert_eq!(rt.classify(&install.root().join("elsewhere/x.unit")), None);

    fs::write(install.root().join("late").join("envmux.cfg"), "").unwrap();
    let id = rt.classify(&file).unwrap();
    assert_eq!(rt.environment(id).root(), site.as_path());
    assert!(rt.environment(id).is_validated());
}

#[test]
fn modules_added_after_a_load_are_found_on_the_next_activation() {
    let install = Install::new();
    let e1 = install.env("e1");
    write(&e1, "first.unit", "");
    let caller = write(&e1, "caller.unit", "");
    let mut rt = install.runtime(&[], &[]);

    rt.import(ImportRequest::new("first").from_caller(&caller)).unwrap();
    assert!(!rt.importer_cache().contains(&e1));

    write(&e1, "second.unit", "let fresh = \"yes\"");
    let second = rt
        .import(ImportRequest::new("second").from_caller(&caller))
        .unwrap()
        .module;
    assert_eq!(second.get_str("fresh").as_deref(), Some("yes"));
}

#[test]
fn direct_parent_package_loads_follow_the_caller() {
    let install = Install::new();
    let host = install.dir("host");
    let e1 = install.env("e1");
    write(&e1, "pkg/mod.unit", "let owner = \"e1\"");
    write(&e1, "pkg/sub.unit", "");
    write(&host, "pkg/mod.unit", "let owner = \"host\"");
    let caller = write(&e1, "caller.unit", "");
    let mut rt = install.runtime(&[&host], &[]);

    let sub = rt
        .with_frame(Frame::file(&caller), |rt| rt.import_module("pkg.sub"))
        .unwrap();
    assert_eq!(sub.name().as_str(), "pkg.sub");
    let pkg = rt.modules().get("pkg").unwrap();
    assert_eq!(pkg.get_str("owner").as_deref(), Some("e1"));
}
