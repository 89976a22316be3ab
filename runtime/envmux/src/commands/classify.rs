//! The `classify` command.

use envmux_core::Runtime;

use super::absolute;

pub fn classify_path(runtime: &mut Runtime, path: &str) {
    println!("{}", describe_classification(runtime, path));
}

/// Root of the environment owning `path`, or `none`.
pub fn describe_classification(runtime: &mut Runtime, path: &str) -> String {
    match runtime.classify(&absolute(path)) {
        Some(id) => runtime.environment(id).root().display().to_string(),
        None => "none".to_string(),
    }
}
