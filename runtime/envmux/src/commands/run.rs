//! The `run` command: execute a unit file as the main module.

use std::fmt::Write as _;

use envmux_core::{ModuleRef, Runtime, Value};

use super::{absolute, fail};

/// Run a unit and print the attributes it ends up with.
pub fn run_file(runtime: &mut Runtime, path: &str) {
    let path = absolute(path);
    tracing::debug!(path = %path.display(), "running unit");
    match runtime.run_path(&path) {
        Ok(module) => print!("{}", format_attributes(runtime, &module)),
        Err(error) => fail(&error),
    }
}

/// One `name = value` line per attribute, sorted by name.
///
/// Module values show where they were loaded from and which environment's
/// state they were loaded into.
pub fn format_attributes(runtime: &Runtime, module: &ModuleRef) -> String {
    let mut out = String::new();
    for name in module.attr_names() {
        let Some(value) = module.get_attr(&name) else {
            continue;
        };
        let rendered = match value {
            Value::Str(s) => format!("{s:?}"),
            Value::Module(m) => {
                let env = match m.environment() {
                    Some(id) => runtime.environment(id).root().display().to_string(),
                    None => "host".to_string(),
                };
                format!("<module {} from {} [{env}]>", m.name(), m.origin())
            }
        };
        let _ = writeln!(out, "{name} = {rendered}");
    }
    out
}
