//! Wad - dependency artifact cache for CI
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wad::cli::{Cli, Commands};
use wad::config::{ConfigManager, Settings};
use wad::error::{WadError, WadResult};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> WadResult<()> {
    let cli = Cli::parse();

    // 0 = info, 1 = debug, 2+ = trace
    let filter = match cli.verbosity() {
        0 => EnvFilter::new("wad=info"),
        1 => EnvFilter::new("wad=debug"),
        _ => EnvFilter::new("wad=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let root =
        std::env::current_dir().map_err(|e| WadError::io("getting current directory", e))?;

    // An explicit --config wins; otherwise look for .wad.toml unless --no-local
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else if cli.no_local {
        debug!("Local config discovery disabled (--no-local)");
        ConfigManager::new()
    } else {
        match ConfigManager::find_local_config(&root) {
            Some(path) => {
                debug!("Found local config: {}", path.display());
                ConfigManager::with_path(path)
            }
            None => ConfigManager::new(),
        }
    };

    let file_config = config_manager.load()?;
    let settings = Settings::resolve(cli.overrides(), file_config, |name| {
        std::env::var(name).ok()
    })?;

    match cli.command {
        None => wad::cli::commands::setup(&settings, &root),
        Some(Commands::Download) => wad::cli::commands::download(&settings, &root),
        Some(Commands::Upload(args)) => wad::cli::commands::upload(args, &settings, &root),
    }
}
