//! On-disk fixtures for unit tests.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "fixture setup panics on I/O failure"
)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory laid out like a packaged installation.
pub(crate) struct Fixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        // Canonical so frame paths and registered roots compare equal.
        let root = dir.path().canonicalize().expect("canonicalize temp dir");
        Fixture { _dir: dir, root }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Create an environment named `name` and return its package directory.
    pub(crate) fn env(&self, name: &str) -> PathBuf {
        let install = self.root.join(name);
        let site = install.join("lib").join("v1").join("site-modules");
        fs::create_dir_all(&site).unwrap();
        fs::write(install.join("envmux.cfg"), "version = 1\n").unwrap();
        site
    }

    /// Same layout as [`Fixture::env`] but without the marker.
    pub(crate) fn unmarked_env(&self, name: &str) -> PathBuf {
        let site = self
            .root
            .join(name)
            .join("lib")
            .join("v1")
            .join("site-modules");
        fs::create_dir_all(&site).unwrap();
        site
    }

    /// A plain directory outside any environment.
    pub(crate) fn dir(&self, name: &str) -> PathBuf {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}

/// Write `content` to `dir/rel`, creating parents.
pub(crate) fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
