#![allow(
    clippy::unwrap_used,
    reason = "test assertions use unwrap for clarity"
)]

use super::*;
use crate::config::IMPORT_MAP_FILE;
use crate::testing::{write, Fixture};
use pretty_assertions::assert_eq;

#[test]
fn test_build_preloads_core_module() {
    let rt = Runtime::builder().build();
    let table = rt.modules();
    let core = table.get(CORE_MODULE).unwrap();
    assert_eq!(core.origin(), &ModuleOrigin::Builtin);
    assert_eq!(
        core.get_str("version").as_deref(),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert!(rt.module_state().baseline().contains(CORE_MODULE));
}

#[test]
fn test_default_finder_chain_order() {
    #[derive(Debug)]
    struct Never;

    impl Finder for Never {
        fn name(&self) -> &'static str {
            "never"
        }

        fn find_spec(
            &self,
            _: &mut Runtime,
            _: &crate::finder::FindRequest<'_>,
        ) -> crate::error::ImportResult<Option<crate::finder::ModuleSpec>> {
            Ok(None)
        }
    }

    let rt = Runtime::builder().finder(Rc::new(Never)).build();
    assert_eq!(rt.finder_names(), vec!["probe", "builtin", "path", "never"]);
}

#[test]
fn test_from_install_dir_requires_import_map() {
    let fx = Fixture::new();
    let home = fx.dir("home");

    let err = Runtime::from_install_dir(&home, Vec::new()).unwrap_err();
    assert!(matches!(err, ConfigError::Missing { .. }), "{err:?}");

    let e1 = fx.env("e1");
    let json = format!(r#"{{"bar": "{}"}}"#, e1.display());
    write(&home, IMPORT_MAP_FILE, &json);
    let rt = Runtime::from_install_dir(&home, vec![fx.dir("host")]).unwrap();
    assert_eq!(rt.import_map().root_for("bar"), Some(e1.as_path()));
    assert_eq!(rt.search_path().len(), 1);
}

#[test]
fn test_with_frame_is_scoped() {
    let mut rt = Runtime::builder().build();
    let depth = rt.with_frame(Frame::synthetic("outer"), |rt| {
        rt.with_frame(Frame::file("/abs/inner.unit"), |rt| rt.call_stack().depth())
    });
    assert_eq!(depth, 2);
    assert_eq!(rt.call_stack().depth(), 0);
}

#[test]
fn test_with_frame_pops_on_unwind() {
    let mut rt = Runtime::builder().build();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        rt.with_frame(Frame::file("/abs/outer.unit"), |rt| {
            rt.with_frame(Frame::core("import"), |_| panic!("finder panicked"));
        });
    }));
    assert!(outcome.is_err());
    assert_eq!(rt.call_stack().depth(), 0);
}

#[test]
fn test_caller_resolution_reads_call_stack() {
    let fx = Fixture::new();
    let e1 = fx.env("e1");
    let bar = write(&e1, "bar.unit", "");
    let mut rt = Runtime::builder().build();

    assert_eq!(rt.resolve_caller(), None);
    let env = rt.with_frame(Frame::file(&bar), Runtime::resolve_caller);
    assert!(env.is_some());
    assert_eq!(env, rt.classify(&bar));
    assert_eq!(rt.environment(env.unwrap()).root(), e1.as_path());
    assert_eq!(rt.registry().len(), 1);
}

#[test]
fn test_invalidate_caches_drops_listings() {
    let fx = Fixture::new();
    let host = fx.dir("host");
    let mut rt = Runtime::builder().search_root(&host).build();
    rt.importer_cache_mut().finder_for(&host);

    rt.invalidate_caches();
    assert!(rt.importer_cache().is_empty());
}

#[test]
fn test_builtin_registration() {
    let platform = ModuleName::parse("platform").unwrap();
    let rt = Runtime::builder()
        .builtin(platform.clone(), [("os", "test")])
        .search_roots(vec![PathBuf::from("/a"), PathBuf::from("/b")])
        .layout(EnvLayout::default())
        .build();
    assert!(rt.is_builtin(&platform));
    assert_eq!(rt.builtin_attrs(&platform).unwrap().len(), 1);
    assert!(!rt.is_builtin(&ModuleName::parse("other").unwrap()));
    assert_eq!(rt.layout().extension, "unit");
    assert_eq!(rt.search_path().len(), 2);
}

#[test]
fn test_root_added_at_runtime_is_searched() {
    let fx = Fixture::new();
    let late = fx.dir("late");
    write(&late, "extra.unit", "");
    let mut rt = Runtime::builder().build();
    assert!(rt.import_module("extra").is_err());

    rt.search_path_mut().push(late.clone());
    assert!(rt.search_path().contains(&late));
    assert_eq!(rt.import_module("extra").unwrap().name().as_str(), "extra");
}

#[test]
fn test_layout_is_the_registry_layout() {
    let layout = EnvLayout {
        extension: "mod".to_string(),
        ..EnvLayout::default()
    };
    let rt = Runtime::builder().layout(layout.clone()).build();
    assert_eq!(rt.layout(), &layout);
    assert_eq!(rt.registry().layout(), &layout);
}

#[test]
fn test_try_environment_for_foreign_id() {
    let fx = Fixture::new();
    let mut other = Runtime::builder().build();
    let foreign = other.classify(&write(&fx.env("e1"), "a.unit", "")).unwrap();

    let rt = Runtime::builder().build();
    assert_eq!(rt.try_environment(foreign), None);
    assert_eq!(
        other.try_environment(foreign).map(Environment::root),
        Some(fx.root().join("e1/lib/v1/site-modules").as_path())
    );
}
