//! The `import` command: resolve one module through the interceptor.

use envmux_core::{ImportRequest, ModuleRef, Runtime};

use super::{absolute, fail};

/// Import `name`, optionally on behalf of the code at `from`.
pub fn import_name(runtime: &mut Runtime, name: &str, from: Option<&str>) {
    let mut request = ImportRequest::new(name);
    if let Some(caller) = from {
        request = request.from_caller(absolute(caller));
    }
    tracing::debug!(name, caller = ?from, "importing from the command line");
    match runtime.import(request) {
        Ok(imported) => println!("{}", describe_import(runtime, &imported.module)),
        Err(error) => fail(&error),
    }
}

/// `name  origin  environment` for a loaded module.
pub fn describe_import(runtime: &Runtime, module: &ModuleRef) -> String {
    let env = match module.environment() {
        Some(id) => runtime.environment(id).root().display().to_string(),
        None => "host".to_string(),
    };
    format!("{}\t{}\t{env}", module.name(), module.origin())
}
