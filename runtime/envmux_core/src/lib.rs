//! Per-environment module resolution.
//!
//! A single [`Runtime`] hosts several independently installed environments
//! that may each ship a different version of a module with the same name.
//! Every load request is routed to the environment its caller was packaged
//! with, and the process-wide module table is swapped to that environment's
//! private state for exactly the duration of the load.
//!
//! # Architecture
//!
//! ```text
//! Runtime::import(request)                      (ImportInterceptor)
//!   ├── decide_environment
//!   │     ├── ImportMap (explicit, forces nested loads)
//!   │     └── resolve_caller ── CallStack ── EnvironmentRegistry::classify
//!   ├── activate_scoped ──► ModuleStateCache::activate + SearchPath::prepend
//!   ├── find_and_load
//!   │     └── finder chain
//!   │           ├── ResolutionChainProbe (re-enters caller inference)
//!   │           ├── BuiltinFinder
//!   │           └── PathFinder ── ImporterCache ── DirectoryFinder
//!   └── ScopedActivation::drop ──► restore table, search path, forced flag
//! ```
//!
//! The runtime is single-threaded: nesting is expressed through borrowed
//! RAII guards, so deactivation order is enforced by the borrow checker.

mod activation;
mod cache;
mod caller;
mod config;
mod error;
mod finder;
mod interceptor;
mod loader;
mod module;
mod name;
mod probe;
mod registry;
mod runtime;
mod search_path;
mod source;
mod stack;

#[cfg(test)]
mod testing;

pub use activation::{ActivationKind, ScopedActivation};
pub use cache::{ModuleRef, ModuleSnapshot, ModuleStateCache, ModuleTable};
pub use caller::{resolve_caller, CallStack, Frame, FrameLocation};
pub use config::{ConfigError, ImportMap, IMPORT_MAP_FILE};
pub use error::{ImportError, ImportResult};
pub use finder::{
    BuiltinFinder, DirectoryFinder, FindRequest, Finder, ImporterCache, ModuleSpec, PathFinder,
};
pub use interceptor::{EnvDecision, ImportRequest, Imported};
pub use module::{Module, ModuleOrigin, Value};
pub use name::{resolve_relative, ModuleName};
pub use probe::ResolutionChainProbe;
pub use registry::{EnvId, EnvLayout, Environment, EnvironmentRegistry};
pub use runtime::{Runtime, RuntimeBuilder, CORE_MODULE};
pub use search_path::SearchPath;
pub use source::{parse_unit, ImportTarget, SourceLine, Statement, UnitSource};
pub use stack::ensure_sufficient_stack;
