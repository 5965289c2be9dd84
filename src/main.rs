//! slotweave CLI
//!
//! Usage:
//!   slotweave [OPTIONS] <TEMPLATE>
//!
//! Options:
//!   -c, --config <FILE>   Engine configuration (TOML format)
//!   -d, --dir <DIR>       Template search directory (repeatable)
//!   -p, --param <K=V>     Global param passed to every component (repeatable)
//!   -h, --help            Print help

use std::path::PathBuf;

use clap::Parser;

use slotweave::{Engine, EngineConfig, Params, Value};

#[derive(Parser)]
#[command(name = "slotweave")]
#[command(about = "Render a template with component and slot composition")]
struct Cli {
    /// Logical template name to render (aliases and search directories apply)
    template: String,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template search directory (repeatable, probed in order)
    #[arg(short, long = "dir")]
    directories: Vec<PathBuf>,

    /// Global param as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let mut engine = Engine::from_config(&config);
    for directory in &cli.directories {
        engine = engine.with_directory(directory);
    }
    for (key, value) in &cli.params {
        engine = engine.with_global_param(key.as_str(), Value::from(value.as_str()));
    }

    match engine.render(&cli.template, Params::new()) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
