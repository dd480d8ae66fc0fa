mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, render, scan, CheckArgs, RenderArgs, ScanArgs};
use config::Config;
use std::path::PathBuf;
use tracing::Level;

/// Tessera CLI - render and inspect stored components
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a component tree and print the resulting HTML
    Render(RenderArgs),

    /// Resolve a component's references without rendering
    Scan(ScanArgs),

    /// Compile component scripts and report what fails
    Check(CheckArgs),
}

fn init_logging(verbose: bool, config: &Config) {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::WARN)
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

async fn run(cli: Cli, cwd: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&cwd)?;
    init_logging(cli.verbose, &config);

    match cli.command {
        Command::Render(args) => render(args, &config, &cwd).await,
        Command::Scan(args) => scan(args, &config, &cwd).await,
        Command::Check(args) => check(args),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => run(cli, cwd).await,
        Err(err) => Err(anyhow::anyhow!("Cannot get current directory: {}", err)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
