//! Command handlers for the `envmux` CLI.
//!
//! Each submodule implements one command. Handlers that print take a
//! [`Runtime`] built by [`open_runtime`]; the formatting they print is
//! exposed separately so it can be tested without a process boundary.

use std::env;
use std::path::{Path, PathBuf};

use envmux_core::{ImportError, Runtime};

mod classify;
mod import;
mod map;
mod run;

pub use classify::{classify_path, describe_classification};
pub use import::{describe_import, import_name};
pub use map::{format_map, print_map};
pub use run::{format_attributes, run_file};

/// Overrides the install directory.
pub const HOME_VAR: &str = "ENVMUX_HOME";
/// Host search path, in the platform's `PATH` syntax.
pub const PATH_VAR: &str = "ENVMUX_PATH";

/// Exit status for a missing or malformed import map.
pub const CONFIG_EXIT: i32 = 2;

/// The runtime's install directory.
///
/// `--home=<dir>` wins, then `ENVMUX_HOME`, then the directory holding the
/// executable.
pub fn install_dir(flag: Option<&str>) -> PathBuf {
    if let Some(dir) = flag {
        return PathBuf::from(dir);
    }
    if let Some(dir) = env::var_os(HOME_VAR) {
        return PathBuf::from(dir);
    }
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Host search roots from `ENVMUX_PATH`; empty when unset.
pub fn host_search_path() -> Vec<PathBuf> {
    env::var_os(PATH_VAR)
        .map(|value| env::split_paths(&value).collect())
        .unwrap_or_default()
}

/// Build the runtime for `install_dir`, exiting with status 2 when the
/// import map cannot be loaded.
pub fn open_runtime(install_dir: &Path) -> Runtime {
    match Runtime::from_install_dir(install_dir, host_search_path()) {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(install_dir = %install_dir.display(), "cannot load import map");
            eprintln!("error: {error}");
            std::process::exit(CONFIG_EXIT);
        }
    }
}

/// Absolute form of a user-supplied path, so caller inference can see it.
///
/// Falls back to the path as given; the load then reports the I/O error.
pub(crate) fn absolute(path: &str) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path))
}

/// Print a load failure and exit with status 1.
pub(crate) fn fail(error: &ImportError) -> ! {
    eprintln!("error: {error}");
    std::process::exit(1);
}
