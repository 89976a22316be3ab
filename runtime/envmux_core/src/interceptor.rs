//! The interception point for every load request.
//!
//! ```text
//! import(request)
//!   ├── DECIDE_ENV
//!   │     ├── top-level name in import map → Explicit(env), forces nested loads
//!   │     ├── already forced               → Forced (stay in enclosing activation)
//!   │     ├── caller frame in environment  → Inferred(env)
//!   │     └── otherwise                    → Host
//!   ├── ACTIVATE   (ScopedActivation)
//!   ├── RESOLVE    find_and_load, may recurse into import()
//!   └── DEACTIVATE (guard drop, on every exit path)
//! ```

use std::path::PathBuf;

use crate::activation::ActivationKind;
use crate::cache::ModuleRef;
use crate::caller::Frame;
use crate::error::ImportResult;
use crate::name::{resolve_relative, ModuleName};
use crate::registry::EnvId;
use crate::runtime::Runtime;

/// A load request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRequest {
    name: String,
    level: u32,
    package: Option<ModuleName>,
    caller: Option<PathBuf>,
}

impl ImportRequest {
    /// An absolute request for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        ImportRequest {
            name: name.into(),
            level: 0,
            package: None,
            caller: None,
        }
    }

    /// Make the request package-relative (`level` leading dots from `package`).
    #[must_use]
    pub fn relative(mut self, level: u32, package: Option<ModuleName>) -> Self {
        self.level = level;
        self.package = package;
        self
    }

    /// Name the file of the code issuing the request.
    ///
    /// Pushed as the innermost frame for the duration of the request, so host
    /// code can state its owner explicitly instead of relying on the stack.
    #[must_use]
    pub fn from_caller(mut self, path: impl Into<PathBuf>) -> Self {
        self.caller = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn absolute_name(&self) -> ImportResult<ModuleName> {
        resolve_relative(&self.name, self.level, self.package.as_ref())
    }
}

/// The module a request named, and its top-level package.
///
/// `use a.b.c` binds `a`, so both ends are handed back while the activation
/// that loaded them is still open.
#[derive(Clone, Debug)]
pub struct Imported {
    pub module: ModuleRef,
    pub top_level: ModuleRef,
}

/// Which environment a request is served from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnvDecision {
    /// The import map names the top-level module.
    Explicit(EnvId),
    /// An explicit activation is open; stay in it.
    Forced,
    /// The caller's code lives in this environment.
    Inferred(EnvId),
    /// No mapping and no caller environment: host resolution.
    Host,
}

impl Runtime {
    /// Intercepted load entry point.
    #[tracing::instrument(level = "debug", skip_all, fields(name = %request.name(), level = request.level()))]
    pub fn import(&mut self, request: ImportRequest) -> ImportResult<Imported> {
        match request.caller.clone() {
            Some(caller) => self.with_frame(Frame::file(caller), |rt| rt.intercept(&request)),
            None => self.intercept(&request),
        }
    }

    /// Decide the environment for `name` without activating anything.
    ///
    /// Relative requests (`level > 0`) never consult the import map; they
    /// stay with their package's environment.
    pub fn decide_environment(&mut self, name: &ModuleName, level: u32) -> EnvDecision {
        if level == 0 {
            if let Some(root) = self.import_map.root_for(name.top_level()) {
                let root = root.to_path_buf();
                return EnvDecision::Explicit(self.registry.register_root(&root));
            }
        }
        if self.forced {
            return EnvDecision::Forced;
        }
        match self.resolve_caller() {
            Some(env) => EnvDecision::Inferred(env),
            None => EnvDecision::Host,
        }
    }

    fn intercept(&mut self, request: &ImportRequest) -> ImportResult<Imported> {
        let name = request.absolute_name()?;
        self.with_frame(Frame::core("import"), |rt| {
            let decision = rt.decide_environment(&name, request.level);
            tracing::debug!(%name, ?decision, "environment decided");
            match decision {
                EnvDecision::Explicit(env) => {
                    let mut scoped = rt.activate_scoped(Some(env), ActivationKind::Explicit);
                    scoped.resolve(&name)
                }
                EnvDecision::Inferred(env) => {
                    let mut scoped = rt.activate_scoped(Some(env), ActivationKind::Inferred);
                    scoped.resolve(&name)
                }
                EnvDecision::Host => {
                    let mut scoped = rt.activate_scoped(None, ActivationKind::Inferred);
                    scoped.resolve(&name)
                }
                EnvDecision::Forced => rt.resolve(&name),
            }
        })
    }

    fn resolve(&mut self, name: &ModuleName) -> ImportResult<Imported> {
        let module = self.find_and_load(name)?;
        let top_level = if name.is_top_level() {
            module.clone()
        } else {
            self.find_and_load(&name.top_level_name())?
        };
        Ok(Imported { module, top_level })
    }
}
