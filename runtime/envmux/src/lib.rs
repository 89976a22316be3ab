//! The `envmux` driver.
//!
//! Thin command layer over [`envmux_core`]: locates the installation,
//! loads the import map, builds a runtime and prints what each command
//! resolved. All resolution logic lives in the core crate.

pub mod commands;
pub mod tracing_setup;
