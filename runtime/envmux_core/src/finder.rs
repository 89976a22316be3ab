//! The ordered finder chain.
//!
//! A load that misses the module table asks each finder in turn for a
//! [`ModuleSpec`]; the first spec wins. The default chain is:
//!
//! ```text
//! [0] ResolutionChainProbe   re-enters caller inference (see probe.rs)
//! [1] BuiltinFinder          modules registered on the builder
//! [2] PathFinder             search path / package locations on disk
//! ```
//!
//! Finders receive the runtime mutably so they can activate environments
//! and consult shared caches; the chain is snapshotted before each lookup so
//! a finder may safely re-enter it.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ImportResult;
use crate::module::ModuleOrigin;
use crate::name::ModuleName;
use crate::runtime::Runtime;

/// File name of a package's own unit, without the extension.
pub(crate) const PACKAGE_UNIT: &str = "mod";

/// Everything needed to create and execute a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleSpec {
    pub name: ModuleName,
    pub origin: ModuleOrigin,
    /// `Some` for packages: where submodules are searched.
    pub search_locations: Option<Vec<PathBuf>>,
    /// Name of the finder that produced the spec.
    pub finder: &'static str,
}

/// A lookup handed to one finder.
#[derive(Debug)]
pub struct FindRequest<'a> {
    pub name: &'a ModuleName,
    /// Parent package locations for submodules; `None` means the search path.
    pub search_locations: Option<&'a [PathBuf]>,
    /// Index of the receiving finder in the chain.
    pub position: usize,
}

/// One link of the resolution chain.
pub trait Finder: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Produce a spec for `request.name`, or `None` to let the next finder run.
    fn find_spec(
        &self,
        runtime: &mut Runtime,
        request: &FindRequest<'_>,
    ) -> ImportResult<Option<ModuleSpec>>;

    /// Drop any internal caches.
    fn invalidate_caches(&self) {}
}

/// Serves modules registered with [`RuntimeBuilder::builtin`](crate::RuntimeBuilder::builtin).
#[derive(Debug, Default)]
pub struct BuiltinFinder;

impl Finder for BuiltinFinder {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn find_spec(
        &self,
        runtime: &mut Runtime,
        request: &FindRequest<'_>,
    ) -> ImportResult<Option<ModuleSpec>> {
        if request.search_locations.is_some() || !runtime.is_builtin(request.name) {
            return Ok(None);
        }
        Ok(Some(ModuleSpec {
            name: request.name.clone(),
            origin: ModuleOrigin::Builtin,
            search_locations: None,
            finder: self.name(),
        }))
    }
}

/// Finds unit files under the search path or a package's locations.
#[derive(Debug, Default)]
pub struct PathFinder;

impl Finder for PathFinder {
    fn name(&self) -> &'static str {
        "path"
    }

    fn find_spec(
        &self,
        runtime: &mut Runtime,
        request: &FindRequest<'_>,
    ) -> ImportResult<Option<ModuleSpec>> {
        let roots: Vec<PathBuf> = match request.search_locations {
            Some(locations) => locations.to_vec(),
            None => runtime.search_path().entries().to_vec(),
        };
        let extension = runtime.layout().extension.clone();

        for root in &roots {
            let directory = runtime.importer_cache_mut().finder_for(root);
            if let Some(mut spec) = directory.find(request.name, &extension) {
                spec.finder = self.name();
                tracing::trace!(name = %request.name, origin = %spec.origin, "path finder hit");
                return Ok(Some(spec));
            }
        }
        Ok(None)
    }
}

/// Cached listing of one search directory.
///
/// The listing is taken once, when the finder is created; files added later
/// are invisible until the cache entry is evicted.
#[derive(Debug)]
pub struct DirectoryFinder {
    path: PathBuf,
    entries: FxHashSet<OsString>,
}

impl DirectoryFinder {
    /// List `path`. A missing or unreadable directory yields an empty finder.
    pub fn new(path: &Path) -> Self {
        let entries = match fs::read_dir(path) {
            Ok(read) => read
                .filter_map(Result::ok)
                .map(|entry| entry.file_name())
                .collect(),
            Err(error) => {
                tracing::trace!(path = %path.display(), %error, "search directory not listable");
                FxHashSet::default()
            }
        };
        DirectoryFinder {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look for `name`'s leaf here: a package directory first, then a unit file.
    pub fn find(&self, name: &ModuleName, extension: &str) -> Option<ModuleSpec> {
        let leaf = name.leaf();

        if self.entries.contains(std::ffi::OsStr::new(leaf)) {
            let package_dir = self.path.join(leaf);
            let init = package_dir.join(PACKAGE_UNIT).with_extension(extension);
            if init.is_file() {
                return Some(ModuleSpec {
                    name: name.clone(),
                    origin: ModuleOrigin::File(init),
                    search_locations: Some(vec![package_dir]),
                    finder: "directory",
                });
            }
        }

        let file_name = format!("{leaf}.{extension}");
        if self.entries.contains(std::ffi::OsStr::new(&file_name)) {
            return Some(ModuleSpec {
                name: name.clone(),
                origin: ModuleOrigin::File(self.path.join(file_name)),
                search_locations: None,
                finder: "directory",
            });
        }
        None
    }
}

/// Process-wide cache of [`DirectoryFinder`]s keyed by directory.
#[derive(Debug, Default)]
pub struct ImporterCache {
    finders: FxHashMap<PathBuf, Rc<DirectoryFinder>>,
}

impl ImporterCache {
    /// The cached finder for `dir`, listing it on first use.
    pub fn finder_for(&mut self, dir: &Path) -> Rc<DirectoryFinder> {
        Rc::clone(
            self.finders
                .entry(dir.to_path_buf())
                .or_insert_with(|| Rc::new(DirectoryFinder::new(dir))),
        )
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.finders.contains_key(dir)
    }

    /// Drop the entry for `dir`. Returns whether one existed.
    pub fn evict(&mut self, dir: &Path) -> bool {
        self.finders.remove(dir).is_some()
    }

    pub fn clear(&mut self) {
        self.finders.clear();
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }
}
