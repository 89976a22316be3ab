//! The runtime: every piece of process-wide state a load touches.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::activation::ActivationFrame;
use crate::cache::{ModuleStateCache, ModuleTable};
use crate::caller::{resolve_caller, CallStack, Frame};
use crate::config::{ConfigError, ImportMap};
use crate::finder::{BuiltinFinder, Finder, ImporterCache, PathFinder};
use crate::module::{Module, ModuleOrigin, Value};
use crate::name::ModuleName;
use crate::probe::ResolutionChainProbe;
use crate::registry::{EnvId, EnvLayout, Environment, EnvironmentRegistry};
use crate::search_path::SearchPath;

/// Name of the module the runtime preloads about itself.
pub const CORE_MODULE: &str = "envmux";

type BuiltinAttrs = Vec<(Arc<str>, Arc<str>)>;

/// Configures a [`Runtime`].
///
/// ```text
/// let runtime = RuntimeBuilder::new()
///     .search_root("/srv/app/site-modules")
///     .import_map(ImportMap::load(install_dir)?)
///     .builtin(ModuleName::parse("platform")?, [("os", "linux")])
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    layout: EnvLayout,
    search_path: Vec<PathBuf>,
    import_map: ImportMap,
    builtins: FxHashMap<ModuleName, BuiltinAttrs>,
    finders: Vec<Rc<dyn Finder>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        RuntimeBuilder::default()
    }

    #[must_use]
    pub fn layout(mut self, layout: EnvLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Append a host search root.
    #[must_use]
    pub fn search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_path.push(root.into());
        self
    }

    #[must_use]
    pub fn search_roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_path.extend(roots);
        self
    }

    #[must_use]
    pub fn import_map(mut self, import_map: ImportMap) -> Self {
        self.import_map = import_map;
        self
    }

    /// Register a builtin module served by [`BuiltinFinder`].
    #[must_use]
    pub fn builtin<K, V>(mut self, name: ModuleName, attrs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Arc<str>>,
        V: Into<Arc<str>>,
    {
        let attrs = attrs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.builtins.insert(name, attrs);
        self
    }

    /// Append a finder after the standard ones.
    #[must_use]
    pub fn finder(mut self, finder: Rc<dyn Finder>) -> Self {
        self.finders.push(finder);
        self
    }

    pub fn build(self) -> Runtime {
        let table = ModuleTable::new();
        if let Ok(core) = ModuleName::parse(CORE_MODULE) {
            let module = Module::new(core.clone(), ModuleOrigin::Builtin, None, None);
            module.set_attr("version", Value::Str(Arc::from(env!("CARGO_PKG_VERSION"))));
            table.insert(core, Arc::new(module));
        }

        let mut finders: Vec<Rc<dyn Finder>> = vec![
            Rc::new(ResolutionChainProbe),
            Rc::new(BuiltinFinder),
            Rc::new(PathFinder),
        ];
        finders.extend(self.finders);

        Runtime {
            registry: EnvironmentRegistry::new(self.layout),
            import_map: self.import_map,
            cache: ModuleStateCache::new(table),
            search_path: SearchPath::new(self.search_path),
            importer_cache: ImporterCache::default(),
            call_stack: CallStack::new(),
            activations: Vec::new(),
            forced: false,
            finders,
            builtins: self.builtins,
        }
    }
}

/// Single-threaded module runtime.
///
/// Owns the shared module table, the search path, the environment registry,
/// and the stack of active environments. All load entry points take
/// `&mut self`; one load is in flight at a time.
#[derive(Debug)]
pub struct Runtime {
    pub(crate) registry: EnvironmentRegistry,
    pub(crate) import_map: ImportMap,
    pub(crate) cache: ModuleStateCache,
    pub(crate) search_path: SearchPath,
    pub(crate) importer_cache: ImporterCache,
    pub(crate) call_stack: CallStack,
    pub(crate) activations: Vec<ActivationFrame>,
    /// Set while an explicit-mapping activation is live.
    pub(crate) forced: bool,
    pub(crate) finders: Vec<Rc<dyn Finder>>,
    builtins: FxHashMap<ModuleName, BuiltinAttrs>,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Build a runtime from an installation directory.
    ///
    /// The import map is read from `install_dir`; a missing or malformed map
    /// is fatal.
    pub fn from_install_dir(
        install_dir: &Path,
        search_path: impl IntoIterator<Item = PathBuf>,
    ) -> Result<Runtime, ConfigError> {
        let import_map = ImportMap::load(install_dir)?;
        tracing::debug!(
            install_dir = %install_dir.display(),
            entries = import_map.len(),
            "loaded import map"
        );
        Ok(RuntimeBuilder::new()
            .search_roots(search_path)
            .import_map(import_map)
            .build())
    }

    pub fn layout(&self) -> &EnvLayout {
        self.registry.layout()
    }

    pub fn import_map(&self) -> &ImportMap {
        &self.import_map
    }

    /// Handle to the shared module table.
    pub fn modules(&self) -> ModuleTable {
        self.cache.table().clone()
    }

    pub fn module_state(&self) -> &ModuleStateCache {
        &self.cache
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    pub fn search_path_mut(&mut self) -> &mut SearchPath {
        &mut self.search_path
    }

    pub fn importer_cache(&self) -> &ImporterCache {
        &self.importer_cache
    }

    pub fn importer_cache_mut(&mut self) -> &mut ImporterCache {
        &mut self.importer_cache
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    /// Look up a registered environment.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not minted by this runtime's registry.
    pub fn environment(&self, id: EnvId) -> &Environment {
        self.registry.get(id)
    }

    /// Like [`Runtime::environment`], but `None` for a foreign `id`.
    pub fn try_environment(&self, id: EnvId) -> Option<&Environment> {
        self.registry.try_get(id)
    }

    /// The environment whose module state is live (`None` is the host).
    pub fn active_environment(&self) -> Option<EnvId> {
        self.cache.active()
    }

    /// Number of scoped activations currently open.
    pub fn activation_depth(&self) -> usize {
        self.activations.len()
    }

    /// Whether caller inference is suppressed by an explicit activation.
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn is_builtin(&self, name: &ModuleName) -> bool {
        self.builtins.contains_key(name)
    }

    pub(crate) fn builtin_attrs(&self, name: &ModuleName) -> Option<&[(Arc<str>, Arc<str>)]> {
        self.builtins.get(name).map(Vec::as_slice)
    }

    /// Classify a path as belonging to an environment.
    pub fn classify(&mut self, path: &Path) -> Option<EnvId> {
        self.registry.classify(path)
    }

    /// Environment of the code issuing the current request, from the call stack.
    pub fn resolve_caller(&mut self) -> Option<EnvId> {
        resolve_caller(&self.call_stack, &mut self.registry)
    }

    /// Run `f` with `frame` as the innermost call-stack frame.
    ///
    /// The frame is popped on every exit, including unwinding out of `f`.
    pub fn with_frame<T>(&mut self, frame: Frame, f: impl FnOnce(&mut Runtime) -> T) -> T {
        self.call_stack.push(frame);
        let scope = FrameScope { runtime: self };
        f(&mut *scope.runtime)
    }

    /// Drop the importer cache and every finder's internal caches.
    pub fn invalidate_caches(&mut self) {
        self.importer_cache.clear();
        for finder in self.finders.clone() {
            finder.invalidate_caches();
        }
    }

    /// Names of the finders in chain order.
    pub fn finder_names(&self) -> Vec<&'static str> {
        self.finders.iter().map(|f| f.name()).collect()
    }
}

/// Pops the frame pushed by [`Runtime::with_frame`].
struct FrameScope<'rt> {
    runtime: &'rt mut Runtime,
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        if self.runtime.call_stack.pop().is_none() {
            tracing::warn!("frame scope closed on an empty call stack");
        }
    }
}

#[cfg(test)]
mod tests;
