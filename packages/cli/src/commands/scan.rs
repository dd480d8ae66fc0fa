use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tessera_bundle::resolve;
use tessera_common::DirectoryStore;

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Root component id
    pub id: String,

    /// Component store directory (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,
}

pub async fn scan(args: ScanArgs, config: &Config, cwd: &Path) -> Result<()> {
    let store_dir = match &args.store {
        Some(dir) => cwd.join(dir),
        None => config.get_store_dir(cwd),
    };
    let store = DirectoryStore::new(&store_dir);

    println!("{}", format!("🔍 Resolving '{}'...", args.id).bright_blue().bold());

    let set = resolve(&store, &args.id).await?;

    for id in set.ids() {
        let references = set.references_of(id);
        if references.is_empty() {
            println!("  {} {}", "✓".green(), id);
        } else {
            println!("  {} {} → {}", "✓".green(), id, references.join(", "));
        }
    }

    let mut failures = 0;
    for (id, err) in set.failures() {
        failures += 1;
        println!("  {} {} - {}", "✗".red(), id, err.to_string().red());
    }

    println!();
    if failures == 0 {
        println!("{} Resolved {} components", "✅".green(), set.len());
    } else {
        println!(
            "{} Resolved {} components, {} failed",
            "⚠️".yellow(),
            set.len(),
            failures
        );
    }

    Ok(())
}
