//! Scoped environment activation.
//!
//! [`Runtime::activate_scoped`] pushes an activation and returns a guard that
//! pops it when dropped: on success, on an early `?` return, and during
//! unwinding. The guard holds `&mut Runtime` and derefs to it, so nested
//! loads run through the guard and the borrow checker enforces LIFO order.
//!
//! ```text
//! activate_scoped(Some(e1), Inferred)
//!   ├── search path  ← e1 root prepended
//!   ├── module table ← e1 state
//!   ├── forced flag  ← unchanged (Explicit sets it)
//!   └── push ActivationFrame { previous, pushed_root, previous_forced }
//! drop(guard)
//!   ├── forced flag  ← previous_forced
//!   ├── search path  ← pushed root removed, its importer-cache entry evicted
//!   └── module table ← previous state
//! ```

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use crate::registry::EnvId;
use crate::runtime::Runtime;

/// Why an environment is being activated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActivationKind {
    /// Named by the import map. Suppresses caller inference while open.
    Explicit,
    /// Chosen by caller inference, or the host fallback.
    Inferred,
    /// Opened by the resolution-chain probe around the remaining finders.
    Probe,
}

impl ActivationKind {
    #[inline]
    pub fn forces(self) -> bool {
        matches!(self, ActivationKind::Explicit)
    }
}

/// One entry of the activation stack.
#[derive(Clone, Debug)]
pub(crate) struct ActivationFrame {
    kind: ActivationKind,
    env: Option<EnvId>,
    previous: Option<EnvId>,
    pushed_root: Option<PathBuf>,
    previous_forced: bool,
}

/// RAII guard for one activation. Derefs to the runtime.
pub struct ScopedActivation<'rt> {
    runtime: &'rt mut Runtime,
}

impl Drop for ScopedActivation<'_> {
    fn drop(&mut self) {
        self.runtime.deactivate();
    }
}

impl Deref for ScopedActivation<'_> {
    type Target = Runtime;

    fn deref(&self) -> &Self::Target {
        self.runtime
    }
}

impl DerefMut for ScopedActivation<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.runtime
    }
}

impl Runtime {
    /// Activate `env` (`None` is the host) until the returned guard drops.
    pub fn activate_scoped(
        &mut self,
        env: Option<EnvId>,
        kind: ActivationKind,
    ) -> ScopedActivation<'_> {
        let previous = self.cache.active();
        let pushed_root = env.map(|id| self.registry.get(id).search_root().to_path_buf());
        if let Some(root) = &pushed_root {
            self.search_path.prepend(root.clone());
        }

        self.cache.activate(env);

        let previous_forced = self.forced;
        if kind.forces() {
            self.forced = true;
        }

        tracing::debug!(
            ?kind,
            ?env,
            ?previous,
            depth = self.activations.len() + 1,
            "activate"
        );
        self.activations.push(ActivationFrame {
            kind,
            env,
            previous,
            pushed_root,
            previous_forced,
        });

        ScopedActivation { runtime: self }
    }

    /// Run `f` under a scoped activation of `env`.
    pub fn with_activation<T>(
        &mut self,
        env: Option<EnvId>,
        kind: ActivationKind,
        f: impl FnOnce(&mut Runtime) -> T,
    ) -> T {
        let mut scoped = self.activate_scoped(env, kind);
        f(&mut *scoped)
    }

    fn deactivate(&mut self) {
        let Some(frame) = self.activations.pop() else {
            tracing::warn!("deactivate with no open activation");
            return;
        };

        self.forced = frame.previous_forced;

        if let Some(root) = &frame.pushed_root {
            self.search_path.remove_activated(root);
            self.importer_cache.evict(root);
        }

        self.cache.activate(frame.previous);

        tracing::debug!(
            kind = ?frame.kind,
            env = ?frame.env,
            restored = ?frame.previous,
            depth = self.activations.len(),
            "deactivate"
        );
    }
}
