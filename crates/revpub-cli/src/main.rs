mod cli;
mod cmd;
mod config_gen;
mod dispatch;
mod format;
mod table;

use clap::Parser;

use revpub_core::config;

use cli::{Cli, Commands};
use config_gen::run_config_generate;
use dispatch::dispatch_command;

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !cli.command.needs_config() {
        let result = match &cli.command {
            Commands::Config { dest } => run_config_generate(dest.as_deref()),
            Commands::Init { path } => cmd::init::run_init(path),
            _ => Ok(()),
        };
        if let Err(e) = result {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let source = match config::resolve_config_path(cli.config.as_deref()) {
        Some(s) => s,
        None => {
            eprintln!("Error: no configuration file found.");
            eprintln!("Searched: --config, ${}, ./revpub.yaml", config::CONFIG_ENV_VAR);
            eprintln!();
            eprintln!("Run `revpub config` to generate a starter config file.");
            std::process::exit(1);
        }
    };

    tracing::info!("Using config: {source}");

    let cfg = match config::load_config(source.path()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = dispatch_command(&cli.command, &cfg) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
