//! Installation fixtures shared by the integration tests.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "each test binary uses a subset of the fixtures; setup panics on I/O failure"
)]

use std::fs;
use std::path::{Path, PathBuf};

use envmux_core::{ImportMap, Runtime};
use tempfile::TempDir;

/// A temporary tree of environments and a host directory.
pub struct Install {
    _dir: TempDir,
    root: PathBuf,
}

impl Install {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = dir.path().canonicalize().expect("canonicalize temp dir");
        Install { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a marked environment and return its `site-modules` directory.
    pub fn env(&self, name: &str) -> PathBuf {
        let install = self.root.join("envs").join(name);
        let site = install.join("lib").join("v1").join("site-modules");
        fs::create_dir_all(&site).unwrap();
        fs::write(install.join("envmux.cfg"), "version = 1\n").unwrap();
        site
    }

    pub fn dir(&self, name: &str) -> PathBuf {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Runtime whose host search path is `roots` and whose import map is `map`.
    pub fn runtime(&self, roots: &[&Path], map: &[(&str, &Path)]) -> Runtime {
        Runtime::builder()
            .search_roots(roots.iter().map(|r| r.to_path_buf()))
            .import_map(ImportMap::from_entries(map.iter().copied()))
            .build()
    }
}

pub fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
