use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tessera_common::DirectoryStore;
use tessera_evaluator::{HostEffect, RenderSession, RenderSource};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Component id to render
    #[arg(required_unless_present = "html")]
    pub id: Option<String>,

    /// Component store directory (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Render this markup file instead of a stored component
    #[arg(long, conflicts_with = "id")]
    pub html: Option<PathBuf>,

    /// Stylesheet for --html
    #[arg(long, requires = "html")]
    pub css: Option<PathBuf>,

    /// Script for --html
    #[arg(long, requires = "html")]
    pub js: Option<PathBuf>,

    /// Write the HTML to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the lifecycle journal as JSON
    #[arg(long)]
    pub journal: bool,
}

pub async fn render(args: RenderArgs, config: &Config, cwd: &Path) -> Result<()> {
    let store_dir = match &args.store {
        Some(dir) => cwd.join(dir),
        None => config.get_store_dir(cwd),
    };
    let source = render_source(&args)?;

    let mut session =
        RenderSession::new(DirectoryStore::new(&store_dir)).with_options(config.render.clone());
    session.render(source).await;

    if let Some(err) = session.last_error() {
        return Err(anyhow!("{}", err));
    }

    let html = session.html();
    match &args.out {
        Some(path) => {
            fs::write(path, &html)?;
            eprintln!("  {} {}", "✓".green(), path.display());
        }
        None => println!("{}", html),
    }

    for effect in session.host().effects() {
        eprintln!("  {} {}", "→".bright_blue(), describe_effect(effect));
    }

    for diagnostic in session.diagnostics() {
        eprintln!(
            "  {} {} - {}",
            "⚠".yellow(),
            display_id(&diagnostic.component_id),
            diagnostic.message.yellow()
        );
    }

    if args.journal {
        eprintln!("{}", serde_json::to_string_pretty(session.journal())?);
    }

    Ok(())
}

fn render_source(args: &RenderArgs) -> Result<RenderSource> {
    if let Some(html) = &args.html {
        return Ok(RenderSource::literal(
            read_file(Some(html.as_path()))?,
            read_file(args.css.as_deref())?,
            read_file(args.js.as_deref())?,
        ));
    }

    args.id
        .clone()
        .map(RenderSource::id)
        .ok_or_else(|| anyhow!("Nothing to render: pass a component id or --html"))
}

fn read_file(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))
        }
        None => Ok(String::new()),
    }
}

fn describe_effect(effect: &HostEffect) -> String {
    match effect {
        HostEffect::Alert { message } => format!("alert: {}", message),
        HostEffect::Console { level, message } => {
            format!("console.{}: {}", format!("{:?}", level).to_lowercase(), message)
        }
        HostEffect::Open { url } => format!("open: {}", url),
        HostEffect::Navigate { url } => format!("navigate: {}", url),
    }
}

fn display_id(id: &str) -> &str {
    if id.is_empty() {
        "<literal>"
    } else {
        id
    }
}
