//! The shared module table and per-environment module state.
//!
//! There is exactly one [`ModuleTable`] per runtime. Handles to it may be held
//! anywhere (host code, finders, tests); switching environments never
//! replaces the table, it overwrites the table's contents. Every other
//! environment's state sits in a saved [`ModuleSnapshot`] until it becomes
//! live again.
//!
//! ```text
//! activate(Some(e2))   while e1 is live
//!   ├── saved[e1]  ← copy of live contents
//!   ├── target     ← saved[e2], or the pristine baseline on first use
//!   └── live       ← target (cleared and refilled in place)
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::module::Module;
use crate::name::ModuleName;
use crate::registry::EnvId;

/// Shared handle to a loaded module.
pub type ModuleRef = Arc<Module>;

/// Immutable copy of a module table's contents.
#[derive(Clone, Default)]
pub struct ModuleSnapshot(FxHashMap<ModuleName, ModuleRef>);

impl ModuleSnapshot {
    pub fn get(&self, name: &str) -> Option<&ModuleRef> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Module names, sorted.
    pub fn names(&self) -> Vec<ModuleName> {
        let mut names: Vec<_> = self.0.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether both snapshots map the same names to the same module objects.
    pub fn same_modules(&self, other: &ModuleSnapshot) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|(name, module)| other.0.get(name).is_some_and(|m| Arc::ptr_eq(m, module)))
    }
}

impl fmt::Debug for ModuleSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// The single live module table.
///
/// The lock only provides interior mutability for outstanding handles; the
/// runtime itself is single-threaded and never holds the lock across a load.
#[derive(Clone, Default)]
pub struct ModuleTable(Arc<RwLock<FxHashMap<ModuleName, ModuleRef>>>);

impl ModuleTable {
    pub fn new() -> Self {
        ModuleTable::default()
    }

    pub fn get(&self, name: &str) -> Option<ModuleRef> {
        self.0.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.read().contains_key(name)
    }

    pub fn insert(&self, name: ModuleName, module: ModuleRef) {
        self.0.write().insert(name, module);
    }

    pub fn remove(&self, name: &str) -> Option<ModuleRef> {
        self.0.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Module names, sorted.
    pub fn names(&self) -> Vec<ModuleName> {
        let mut names: Vec<_> = self.0.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot(self.0.read().clone())
    }

    /// Whether two handles refer to the same container.
    pub fn same_container(&self, other: &ModuleTable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Overwrite the contents in place; the container itself is kept.
    fn replace_contents(&self, snapshot: ModuleSnapshot) {
        let mut live = self.0.write();
        live.clear();
        live.extend(snapshot.0);
    }
}

impl fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleTable").field(&self.snapshot()).finish()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum SnapshotKey {
    Host,
    Env(EnvId),
}

impl From<Option<EnvId>> for SnapshotKey {
    fn from(env: Option<EnvId>) -> Self {
        env.map_or(SnapshotKey::Host, SnapshotKey::Env)
    }
}

/// Owner of the live table and every inactive environment's saved state.
#[derive(Debug)]
pub struct ModuleStateCache {
    live: ModuleTable,
    /// Contents of the table when the cache was created. Seeds every
    /// environment on its first activation.
    baseline: ModuleSnapshot,
    saved: FxHashMap<SnapshotKey, ModuleSnapshot>,
    active: Option<EnvId>,
}

impl ModuleStateCache {
    /// Take ownership of state switching for `live`, with the host active.
    pub fn new(live: ModuleTable) -> Self {
        let baseline = live.snapshot();
        ModuleStateCache {
            live,
            baseline,
            saved: FxHashMap::default(),
            active: None,
        }
    }

    #[inline]
    pub fn table(&self) -> &ModuleTable {
        &self.live
    }

    #[inline]
    pub fn active(&self) -> Option<EnvId> {
        self.active
    }

    pub fn baseline(&self) -> &ModuleSnapshot {
        &self.baseline
    }

    /// Make `env`'s module state live (`None` is the host).
    ///
    /// A no-op when `env` is already active.
    pub fn activate(&mut self, env: Option<EnvId>) {
        if env == self.active {
            return;
        }

        let outgoing = self.live.snapshot();
        self.saved.insert(self.active.into(), outgoing);

        let incoming = self
            .saved
            .remove(&SnapshotKey::from(env))
            .unwrap_or_else(|| self.baseline.clone());
        self.live.replace_contents(incoming);

        tracing::trace!(from = ?self.active, to = ?env, modules = self.live.len(), "module state switched");
        self.active = env;
    }

    /// The module `name` as seen by `env`, whether or not `env` is live.
    pub fn lookup_in(&self, env: Option<EnvId>, name: &str) -> Option<ModuleRef> {
        if env == self.active {
            return self.live.get(name);
        }
        match self.saved.get(&SnapshotKey::from(env)) {
            Some(snapshot) => snapshot.get(name).cloned(),
            None => self.baseline.get(name).cloned(),
        }
    }
}
