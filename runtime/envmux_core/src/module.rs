//! Runtime representation of a loaded module.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::cache::ModuleRef;
use crate::finder::ModuleSpec;
use crate::name::ModuleName;
use crate::registry::EnvId;

/// Where a module's definition came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Registered with the runtime, no file behind it.
    Builtin,
    /// A unit file on disk.
    File(PathBuf),
    /// Source text handed to the runtime directly (no location).
    Synthetic(Arc<str>),
}

impl ModuleOrigin {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ModuleOrigin::File(path) => Some(path),
            ModuleOrigin::Builtin | ModuleOrigin::Synthetic(_) => None,
        }
    }
}

impl fmt::Display for ModuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleOrigin::Builtin => f.write_str("<builtin>"),
            ModuleOrigin::File(path) => write!(f, "{}", path.display()),
            ModuleOrigin::Synthetic(label) => write!(f, "<{label}>"),
        }
    }
}

/// A module attribute.
#[derive(Clone, Debug)]
pub enum Value {
    Str(Arc<str>),
    Module(ModuleRef),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Module(_) => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleRef> {
        match self {
            Value::Module(m) => Some(m),
            Value::Str(_) => None,
        }
    }
}

/// Module values compare by identity; strings by content.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A loaded module.
///
/// Attribute storage uses interior mutability: a module is published to the
/// module table before its body runs (so import cycles observe the partially
/// initialized module) and keeps gaining attributes while it executes.
pub struct Module {
    name: ModuleName,
    origin: ModuleOrigin,
    /// Directories searched for submodules; `Some` marks a package.
    search_locations: Option<Vec<PathBuf>>,
    /// Environment whose state was live when the module was created.
    environment: Option<EnvId>,
    attrs: RwLock<FxHashMap<Arc<str>, Value>>,
}

impl Module {
    pub fn new(
        name: ModuleName,
        origin: ModuleOrigin,
        search_locations: Option<Vec<PathBuf>>,
        environment: Option<EnvId>,
    ) -> Self {
        Module {
            name,
            origin,
            search_locations,
            environment,
            attrs: RwLock::new(FxHashMap::default()),
        }
    }

    pub(crate) fn from_spec(spec: &ModuleSpec, environment: Option<EnvId>) -> Self {
        Module::new(
            spec.name.clone(),
            spec.origin.clone(),
            spec.search_locations.clone(),
            environment,
        )
    }

    #[inline]
    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    #[inline]
    pub fn origin(&self) -> &ModuleOrigin {
        &self.origin
    }

    pub fn is_package(&self) -> bool {
        self.search_locations.is_some()
    }

    pub fn search_locations(&self) -> Option<&[PathBuf]> {
        self.search_locations.as_deref()
    }

    pub fn environment(&self) -> Option<EnvId> {
        self.environment
    }

    /// Package against which relative imports in this module resolve.
    ///
    /// A package is its own anchor; a plain module anchors on its parent.
    pub fn package(&self) -> Option<ModuleName> {
        if self.is_package() {
            Some(self.name.clone())
        } else {
            self.name.parent()
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.attrs.read().get(name).cloned()
    }

    /// String attribute shortcut.
    pub fn get_str(&self, name: &str) -> Option<Arc<str>> {
        match self.attrs.read().get(name) {
            Some(Value::Str(s)) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    /// Module attribute shortcut.
    pub fn get_module(&self, name: &str) -> Option<ModuleRef> {
        match self.attrs.read().get(name) {
            Some(Value::Module(m)) => Some(Arc::clone(m)),
            _ => None,
        }
    }

    pub fn set_attr(&self, name: &str, value: Value) {
        self.attrs.write().insert(Arc::from(name), value);
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.read().contains_key(name)
    }

    /// Attribute names, sorted.
    pub fn attr_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.attrs.read().keys().cloned().collect();
        names.sort();
        names
    }
}

// Attributes may reference other modules (and cycles back), so only the
// identity is printed.
impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}
