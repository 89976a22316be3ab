//! Load-request failures.

use std::io;
use std::path::PathBuf;

use crate::name::ModuleName;

/// An error surfaced by a load request.
///
/// Every variant is observed by the caller only after the activation that
/// produced it has been unwound, so the module table and search path are
/// already back to their pre-request state.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// No finder in the chain produced a spec for the name.
    #[error("no module named '{name}'")]
    NotFound { name: ModuleName },

    /// A dotted name whose parent has no submodule search locations.
    #[error("no module named '{name}'; '{parent}' is not a package")]
    NotAPackage {
        name: ModuleName,
        parent: ModuleName,
    },

    /// The requested name is not a well-formed dotted name.
    #[error("invalid module name '{0}'")]
    InvalidName(String),

    /// A relative import issued from code with no enclosing package.
    #[error("attempted relative import of '{name}' with no known parent package")]
    RelativeWithoutPackage { name: String },

    /// A relative import that climbs above the top-level package.
    #[error("attempted relative import beyond top-level package (level {level} in '{package}')")]
    RelativeBeyondTopLevel { level: u32, package: String },

    /// A unit file that does not parse.
    #[error("{}:{line}: {message}", .path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A unit file that could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A module body that raised a failure while executing.
    #[error("module '{name}' failed: {message}")]
    Failed { name: ModuleName, message: String },

    /// `from m use item` where `m` has no `item` and no submodule of that name.
    #[error("cannot import name '{attr}' from '{module}'")]
    MissingAttribute { module: ModuleName, attr: String },
}

impl ImportError {
    /// Returns `true` for a genuine not-found (the standard not-found failure).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ImportError::NotFound { .. } | ImportError::NotAPackage { .. }
        )
    }
}

/// Result of a load request.
pub type ImportResult<T> = Result<T, ImportError>;
