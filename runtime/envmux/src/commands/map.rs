//! The `map` command: show the explicit import map.

use std::fmt::Write as _;

use envmux_core::{ImportMap, Runtime};

pub fn print_map(runtime: &Runtime) {
    print!("{}", format_map(runtime.import_map()));
}

/// One `name -> root` line per entry, in name order.
pub fn format_map(map: &ImportMap) -> String {
    if map.is_empty() {
        return "no explicit mappings\n".to_string();
    }
    let mut out = String::new();
    for (name, root) in map.iter() {
        let _ = writeln!(out, "{name} -> {}", root.display());
    }
    out
}
