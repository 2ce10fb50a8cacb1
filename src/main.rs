use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod manifest;
mod organize;

use config::Config;
use organize::{RunOptions, SyncEvent};

/// Organizes per-restaurant image folders and keeps the site manifest in sync.
#[derive(Debug, Parser)]
#[command(name = "pic-organizer", version, about)]
struct Cli {
    /// TOML config file; a missing file means defaults
    #[arg(short, long, default_value = "organizer.toml")]
    config: PathBuf,

    /// Manifest to organize (overrides the config file)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Base directory holding the entity folders (overrides the config file)
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Report every decision without touching files or the manifest
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_from(&cli.config)?;
    if let Some(manifest) = cli.manifest {
        config.manifest = manifest;
    }
    if let Some(base_dir) = cli.base_dir {
        config.base_dir = Some(base_dir);
    }
    config.validate()?;

    let base_dir = config.resolve_base_dir()?;
    println!(
        "🍽️  Organizing {} under {}",
        config.manifest.display(),
        base_dir.display()
    );
    if cli.dry_run {
        println!("🔍 Dry run: nothing on disk or in the manifest will change");
    }

    let opts = RunOptions {
        manifest_path: config.manifest.clone(),
        base_dir,
        conversions: config.conversions.clone(),
        dry_run: cli.dry_run,
    };

    let dry_run = cli.dry_run;
    let summary = organize::run(&opts, &mut |event| print_event(event, dry_run))?;

    println!(
        "✅ Done: {} entities, {} renamed, {} converted, {} skipped, {} failed",
        summary.entities, summary.renamed, summary.converted, summary.skipped, summary.failed
    );
    if summary.failed > 0 {
        eprintln!(
            "⚠️  {} entities reported errors, see warnings above",
            summary.failed
        );
    }

    Ok(())
}

/// One line per pipeline decision, mirroring the summary counters.
fn print_event(event: SyncEvent, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    match event {
        SyncEvent::FolderCreated { path } => {
            println!("{prefix}📁 Created folder: {}", path.display());
        }
        SyncEvent::FolderExists { path } => {
            println!("{prefix}📂 Folder already exists: {}", path.display());
        }
        SyncEvent::Converted { from, to } => {
            println!("{prefix}🔄 Converted {from} to {to}");
        }
        SyncEvent::Renamed { from, to } => {
            println!("{prefix}✏️  Renamed file: {from} to {to}");
        }
        SyncEvent::AlreadyCanonical { entity, file } => {
            println!("{prefix}⏭️  File {file} already starts with {entity}, skipping rename");
        }
        SyncEvent::EntityFailed { label, message } => {
            eprintln!("{prefix}⚠️  {label}: {message}");
        }
    }
}
