//! Main entry point for multiaccounts.

use anyhow::Context;
use clap::Parser;
use multiaccounts::cli::Cli;
use multiaccounts::utils::error_exit;

fn main() {
    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error_exit(&format!("{e:#}"), 1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    cli.execute().context("command failed")
}
