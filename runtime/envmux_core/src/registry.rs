//! Environment discovery and path classification.
//!
//! An environment is an isolated installation root produced by the packaging
//! phase:
//!
//! ```text
//! <install_root>/
//!   ├── envmux.cfg                      marker artifact
//!   └── lib/<tag>/site-modules/         package tree = module-search root
//!         ├── qux.unit
//!         └── http/mod.unit
//! ```
//!
//! The registry is append-only. A root is added either structurally (a path
//! containing the package segment whose install root carries the marker) or
//! explicitly (a root named by the import map). Once added, classifying any
//! path beneath it is an ancestor check; a negative detection is never
//! remembered, so an environment created later is still picked up.
//!
//! Roots are stored canonicalized. A symlinked or `..` spelling of an
//! environment resolves to the same [`EnvId`]; paths that cannot be resolved
//! on disk are compared as given.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use rustc_hash::FxHashMap;

/// Index of a registered environment.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvId(u32);

impl EnvId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env#{}", self.0)
    }
}

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env#{}", self.0)
    }
}

/// On-disk conventions shared by the packaging phase and the runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvLayout {
    /// Name of the package-directory segment (`site-modules`).
    pub package_segment: String,
    /// Marker file expected at the install root (`envmux.cfg`).
    pub marker: String,
    /// Extension of module unit files, without the dot (`unit`).
    pub extension: String,
}

impl Default for EnvLayout {
    fn default() -> Self {
        EnvLayout {
            package_segment: "site-modules".to_string(),
            marker: "envmux.cfg".to_string(),
            extension: "unit".to_string(),
        }
    }
}

impl EnvLayout {
    /// Split `path` at the first package segment.
    ///
    /// Returns `(install_root, package_dir)`, where the install root is the
    /// directory two segments above the package segment. `None` when the
    /// segment is absent or sits too close to the filesystem root to leave
    /// room for an install root.
    pub fn split(&self, path: &Path) -> Option<(PathBuf, PathBuf)> {
        let components: Vec<Component<'_>> = path.components().collect();
        let index = components
            .iter()
            .position(|c| c.as_os_str() == self.package_segment.as_str())?;
        if index <= 2 {
            return None;
        }
        let install_root: PathBuf = components[..index - 2].iter().collect();
        let package_dir: PathBuf = components[..=index].iter().collect();
        Some((install_root, package_dir))
    }

    /// Whether the marker artifact exists under `install_root`.
    pub fn has_marker(&self, install_root: &Path) -> bool {
        install_root.join(&self.marker).is_file()
    }
}

/// A registered environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    id: EnvId,
    root: PathBuf,
    install_root: Option<PathBuf>,
    validated: bool,
}

impl Environment {
    pub fn id(&self) -> EnvId {
        self.id
    }

    /// Canonical root (the package directory). Identity of the environment.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root prepended to the search path while the environment is active.
    pub fn search_root(&self) -> &Path {
        &self.root
    }

    /// Install root holding the marker, when the root follows the layout.
    pub fn install_root(&self) -> Option<&Path> {
        self.install_root.as_deref()
    }

    /// Whether the marker artifact was present when the root was registered.
    pub fn is_validated(&self) -> bool {
        self.validated
    }
}

/// Append-only set of known environments.
#[derive(Debug, Default)]
pub struct EnvironmentRegistry {
    layout: EnvLayout,
    envs: Vec<Environment>,
    by_root: FxHashMap<PathBuf, EnvId>,
}

impl EnvironmentRegistry {
    pub fn new(layout: EnvLayout) -> Self {
        EnvironmentRegistry {
            layout,
            envs: Vec::new(),
            by_root: FxHashMap::default(),
        }
    }

    pub fn layout(&self) -> &EnvLayout {
        &self.layout
    }

    /// Classify `path` as belonging to an environment.
    ///
    /// Known roots are matched by ancestry first. Otherwise the path is
    /// inspected structurally and, if the marker is found, its package
    /// directory is registered permanently.
    pub fn classify(&mut self, path: &Path) -> Option<EnvId> {
        let resolved = canonical(path);
        if let Some(id) = self.known_resolved(&resolved) {
            return Some(id);
        }

        let (install_root, package_dir) = self
            .layout
            .split(&resolved)
            .or_else(|| self.layout.split(path))?;
        if !self.layout.has_marker(&install_root) {
            tracing::trace!(path = %path.display(), "no environment marker");
            return None;
        }

        let id = self.insert(canonical(&package_dir), Some(canonical(&install_root)), true);
        tracing::debug!(
            %id,
            root = %self.get(id).root().display(),
            "discovered environment"
        );
        Some(id)
    }

    /// Ancestor check against already-registered roots only.
    ///
    /// When roots nest, the deepest one wins.
    pub fn known(&self, path: &Path) -> Option<EnvId> {
        self.known_resolved(&canonical(path))
    }

    fn known_resolved(&self, path: &Path) -> Option<EnvId> {
        self.envs
            .iter()
            .filter(|env| path != env.root && path.starts_with(&env.root))
            .max_by_key(|env| env.root.components().count())
            .map(|env| env.id)
    }

    /// Register a root named explicitly (by the import map).
    ///
    /// Returns the existing id when the root is already known. The validated
    /// flag records whether the marker sits at the expected offset.
    pub fn register_root(&mut self, root: &Path) -> EnvId {
        let root = canonical(root);
        if let Some(&id) = self.by_root.get(&root) {
            return id;
        }
        let install_root = self
            .layout
            .split(&root)
            .filter(|(_, package_dir)| *package_dir == root)
            .map(|(install_root, _)| install_root);
        let validated = install_root
            .as_deref()
            .is_some_and(|install| self.layout.has_marker(install));
        if !validated {
            tracing::warn!(
                root = %root.display(),
                "explicitly mapped root has no environment marker"
            );
        }
        self.insert(root, install_root, validated)
    }

    fn insert(&mut self, root: PathBuf, install_root: Option<PathBuf>, validated: bool) -> EnvId {
        if let Some(&id) = self.by_root.get(&root) {
            return id;
        }
        let id = EnvId(u32::try_from(self.envs.len()).unwrap_or(u32::MAX));
        self.by_root.insert(root.clone(), id);
        self.envs.push(Environment {
            id,
            root,
            install_root,
            validated,
        });
        id
    }

    /// Look up a registered environment.
    ///
    /// # Panics
    ///
    /// Panics if `id` was minted by another registry. Ids from this one stay
    /// valid because entries are never removed.
    pub fn get(&self, id: EnvId) -> &Environment {
        &self.envs[id.index()]
    }

    pub fn try_get(&self, id: EnvId) -> Option<&Environment> {
        self.envs.get(id.index())
    }

    pub fn by_root(&self, root: &Path) -> Option<EnvId> {
        self.by_root.get(&canonical(root)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.envs.iter()
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }
}

/// `path` with symlinks and `..` resolved, or unchanged if it does not exist.
fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests;
