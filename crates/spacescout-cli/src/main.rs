mod commands;
mod fs_adapter;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use fs_adapter::{FsContentSource, FsMutator};
use progress::CliReporter;
use spacescout_core::analysis::aggregate;
use spacescout_core::analysis::cleanup_plan::{CommitDisposition, CommitOptions, Selection};
use spacescout_core::model::{ItemKind, PolicyTag};
use spacescout_core::{CleanupEngine, EngineConfig};
use tracing::error;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match spacescout_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Report) => {
            if let Err(err) = run_report(&config) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::Dupes) => {
            if let Err(err) = run_dupes(&config) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::AutoClean { yes, dry_run }) => {
            if let Err(err) = run_auto_clean(&config, yes, dry_run) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn refresh_engine(config: &EngineConfig) -> anyhow::Result<CleanupEngine> {
    if config.scan_roots.is_empty() {
        anyhow::bail!("no scan_roots configured; set them in Config.toml");
    }

    let source = FsContentSource::new(config.scan_roots.clone(), &config.ignore_patterns);
    let engine = CleanupEngine::new(config.clone());
    let outcome = engine.refresh(&source, &CliReporter::new())?;

    println!();
    println!(
        "Scanned {} items ({} skipped) in {:.2}s",
        outcome.items_indexed,
        outcome.items_skipped,
        (outcome.list_duration + outcome.fingerprint_duration + outcome.index_duration).as_secs_f64(),
    );

    Ok(engine)
}

fn run_report(config: &EngineConfig) -> anyhow::Result<()> {
    let engine = refresh_engine(config)?;
    let summary = engine.summary();

    println!();
    println!("{}", "Storage summary".bold());
    for kind in ItemKind::ALL {
        println!(
            "  {:<10} {:>12}  {:>3}%",
            format!("{:?}", kind),
            format_bytes(summary.segment_bytes(kind)),
            aggregate::segment_percent(&summary, kind),
        );
    }
    println!(
        "  {:<10} {:>12}",
        "used",
        format_bytes(summary.used_bytes).green()
    );

    let tags = engine.policy_tags();
    let count = |tag: PolicyTag| tags.values().filter(|t| **t == tag).count();
    println!();
    println!(
        "Policy: {} keep, {} review, {} safe to delete",
        count(PolicyTag::Keep),
        format!("{}", count(PolicyTag::Review)).yellow(),
        format!("{}", count(PolicyTag::SafeToDelete)).red(),
    );

    Ok(())
}

fn run_dupes(config: &EngineConfig) -> anyhow::Result<()> {
    let engine = refresh_engine(config)?;

    for kind in [ItemKind::Photo, ItemKind::MediaFile, ItemKind::Other] {
        let clusters = engine.clusters(kind);
        if clusters.is_empty() {
            continue;
        }

        println!();
        println!("{} ({} groups)", format!("{:?}", kind).bold(), clusters.len());
        for cluster in clusters {
            println!(
                "  {} x{}  {}",
                format_bytes(cluster.total_bytes).red(),
                cluster.members.len(),
                cluster.sample_ref.0,
            );
            for member in &cluster.members {
                println!("    {}", member.item_id);
            }
        }
    }

    Ok(())
}

fn run_auto_clean(config: &EngineConfig, yes: bool, dry_run: bool) -> anyhow::Result<()> {
    let engine = refresh_engine(config)?;

    let plan = engine.create_plan(&Selection::Tagged(PolicyTag::SafeToDelete))?;
    if plan.entries.is_empty() {
        println!("Nothing is tagged safe to delete.");
        return Ok(());
    }

    println!();
    println!(
        "Plan {}: {} items, estimated {} freed",
        plan.id,
        plan.entries.len(),
        format_bytes(plan.estimated_bytes_freed).green(),
    );

    if dry_run {
        for entry in &plan.entries {
            println!("  {:>12}  {}", format_bytes(entry.size_bytes), entry.item_id);
        }
        return Ok(());
    }

    if !yes && !prompt_confirm("Delete these items permanently?", Some(false))? {
        return Ok(());
    }

    let options = CommitOptions {
        mutator_timeout: config.mutator_timeout(),
        concurrency: config.commit_concurrency,
        cancel: None,
    };
    let outcome = engine.commit_plan(plan.id, &FsMutator, &options, &CliReporter::new())?;

    for result in &outcome.results {
        if let CommitDisposition::Failed { error } = &result.disposition {
            println!("  {} {}: {}", "failed".red(), result.item_id, error);
        }
    }
    println!(
        "Freed {} ({} of {} items)",
        format_bytes(outcome.bytes_freed).green(),
        outcome.succeeded(),
        outcome.results.len(),
    );

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB * KIB {
        format!("{:.2} GiB", b / (KIB * KIB * KIB))
    } else if b >= KIB * KIB {
        format!("{:.1} MiB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
