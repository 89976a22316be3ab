//! envmux CLI
//!
//! Runs module units with each load served from the environment its caller
//! was packaged with.

use envmux::commands::{
    classify_path, import_name, install_dir, open_runtime, print_map, run_file,
};
use envmux::tracing_setup::init_tracing;

fn main() {
    init_tracing();

    let mut home: Option<String> = None;
    let mut args: Vec<String> = Vec::new();
    for arg in std::env::args().skip(1) {
        if let Some(dir) = arg.strip_prefix("--home=") {
            home = Some(dir.to_string());
        } else {
            args.push(arg);
        }
    }

    let Some(command) = args.first() else {
        print_usage();
        return;
    };

    match command.as_str() {
        "run" => {
            if args.len() < 2 {
                eprintln!("Usage: envmux run <file.unit>");
                std::process::exit(1);
            }
            let mut runtime = open_runtime(&install_dir(home.as_deref()));
            run_file(&mut runtime, &args[1]);
        }
        "import" => {
            let mut name = None;
            let mut from = None;
            for arg in args.iter().skip(1) {
                if let Some(caller) = arg.strip_prefix("--from=") {
                    from = Some(caller);
                } else if !arg.starts_with('-') && name.is_none() {
                    name = Some(arg.as_str());
                }
            }

            let Some(name) = name else {
                eprintln!("error: missing module name");
                eprintln!("Usage: envmux import <name> [--from=<caller path>]");
                std::process::exit(1);
            };

            let mut runtime = open_runtime(&install_dir(home.as_deref()));
            import_name(&mut runtime, name, from);
        }
        "classify" => {
            if args.len() < 2 {
                eprintln!("Usage: envmux classify <path>");
                std::process::exit(1);
            }
            let mut runtime = open_runtime(&install_dir(home.as_deref()));
            classify_path(&mut runtime, &args[1]);
        }
        "map" => {
            let runtime = open_runtime(&install_dir(home.as_deref()));
            print_map(&runtime);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("envmux {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            if std::path::Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("unit"))
            {
                let mut runtime = open_runtime(&install_dir(home.as_deref()));
                run_file(&mut runtime, command);
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!("envmux: per-environment module resolution");
    println!();
    println!("Usage: envmux [--home=<dir>] <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file.unit>       Run a unit and print its attributes");
    println!("  import <name>         Import a module and print where it came from");
    println!("  classify <path>       Print the environment owning a path, or 'none'");
    println!("  map                   Print the explicit import map");
    println!("  help                  Show this help message");
    println!("  version               Show version information");
    println!();
    println!("Import options:");
    println!("  --from=<path>         Import on behalf of the code at <path>");
    println!();
    println!("Global options:");
    println!("  --home=<dir>          Install directory holding import_map.json");
    println!();
    println!("Environment:");
    println!("  ENVMUX_HOME           Install directory (default: the executable's directory)");
    println!("  ENVMUX_PATH           Host search path");
    println!("  RUST_LOG              Enable tracing, e.g. RUST_LOG=envmux_core=debug");
    println!();
    println!("Examples:");
    println!("  envmux run app/main.unit");
    println!("  envmux import qux --from=/opt/envs/bar/lib/v1/site-modules/bar.unit");
    println!("  envmux classify /opt/envs/bar/lib/v1/site-modules/bar.unit");
}
