use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tessera_common::ComponentRecord;
use tessera_evaluator::{parse_script, ScriptError};
use tessera_parser::{format_errors, ParseError};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Script file, component record (.json) or directory of either
    pub input: PathBuf,
}

pub fn check(args: CheckArgs) -> Result<()> {
    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_component_files(&args.input)
    } else {
        return Err(anyhow!("Input path does not exist: {}", args.input.display()));
    };

    println!("🔍 {} {} files", "Checking".green().bold(), files.len());
    println!();

    let mut failed = 0;
    for file in &files {
        match check_file(file) {
            Ok(0) => println!("  {} {}", "✓".green(), file.display()),
            Ok(count) => {
                failed += 1;
                println!("  {} {} - {} problems", "✗".red(), file.display(), count);
            }
            Err(e) => {
                failed += 1;
                eprintln!("  {} {} - {}", "✗".red(), file.display(), e.to_string().red());
            }
        }
    }

    println!();
    if failed == 0 {
        println!("{} All scripts compile", "✅".green());
        Ok(())
    } else {
        Err(anyhow!("{} of {} files failed to check", failed, files.len()))
    }
}

fn find_component_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| matches!(path.extension().and_then(|s| s.to_str()), Some("js" | "ts" | "json")))
        .collect()
}

/// Number of problems found in one file, printed as they are found
fn check_file(path: &Path) -> Result<usize> {
    let script = if path.extension().and_then(|s| s.to_str()) == Some("json") {
        ComponentRecord::from_file(path)?.script
    } else {
        fs::read_to_string(path)?
    };

    let definition = parse_script(&script);
    let mut parse_errors: Vec<ParseError> = Vec::new();
    let mut other = Vec::new();
    for diagnostic in &definition.diagnostics {
        match diagnostic {
            ScriptError::Compile { source, .. } => parse_errors.push(source.clone()),
            err => other.push(err.to_string()),
        }
    }

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
    if !parse_errors.is_empty() {
        eprintln!("{}", format_errors(&script, file_name, &parse_errors));
    }
    for message in &other {
        eprintln!("  {} {}", "⚠".yellow(), message);
    }

    Ok(parse_errors.len() + other.len())
}
