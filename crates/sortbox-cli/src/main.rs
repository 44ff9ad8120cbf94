mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, PlannerChoice};
use dotenv::dotenv;
use progress::CliReporter;
use sortbox_core::config::PlannerKind;
use sortbox_core::{
    build_planner, AppConfig, ArtifactKind, Organizer, Plan, SkipRecord, SourceEntry,
    UndoOptions, Workspace,
};
use tracing::{error, info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let mut config = match sortbox_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    apply_overrides(&mut config, &args);

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    let result = match command {
        Commands::PrintConfig => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        Commands::Scan => open_organizer(&config).and_then(|o| run_scan(&o)),
        Commands::Index => open_organizer(&config).and_then(|o| run_index(&o)),
        Commands::Plan { planner } => {
            if let Some(choice) = planner {
                config.planner.kind = match choice {
                    PlannerChoice::Heuristic => PlannerKind::Heuristic,
                    PlannerChoice::Remote => PlannerKind::Remote,
                };
            }
            open_organizer(&config).and_then(|o| run_plan(&o))
        }
        Commands::ShowPlan => open_organizer(&config).and_then(|o| run_show_plan(&o)),
        Commands::Apply { plan, yes } => {
            open_organizer(&config).and_then(|o| run_apply(&o, plan.as_deref(), yes))
        }
        Commands::Undo {
            log,
            keep_folders,
            yes,
        } => open_organizer(&config).and_then(|o| run_undo(&o, log.as_deref(), keep_folders, yes)),
        Commands::History => open_organizer(&config).and_then(|o| run_history(&o)),
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Cli) {
    let as_string = |p: &PathBuf| p.to_string_lossy().into_owned();
    if let Some(source) = &args.source {
        config.source_root = Some(as_string(source));
    }
    if let Some(library) = &args.library {
        config.library_root = Some(as_string(library));
    }
    if let Some(workspace) = &args.workspace {
        config.workspace_dir = Some(as_string(workspace));
    }
}

fn open_organizer(config: &AppConfig) -> anyhow::Result<Organizer> {
    let source = config
        .source_root
        .as_deref()
        .ok_or_else(|| anyhow!("no source folder; pass --source or set SORTBOX_SOURCE_ROOT"))?;
    let library = config
        .library_root
        .as_deref()
        .ok_or_else(|| anyhow!("no library folder; pass --library or set SORTBOX_LIBRARY_ROOT"))?;
    let organizer = Organizer::open(config.clone(), Path::new(source), Path::new(library))
        .context("opening workspace")?;
    info!(
        "Workspace {} at {}",
        organizer.workspace().key().cyan(),
        organizer.workspace().dir().display()
    );
    Ok(organizer)
}

fn run_scan(organizer: &Organizer) -> anyhow::Result<()> {
    let reporter = CliReporter::new();
    let overview = organizer.scan_source(&reporter)?;

    let (mut dirs, mut files, mut links, mut unreadable) = (0, 0, 0, 0);
    for entry in &overview.entries {
        match entry {
            SourceEntry::File { .. } => files += 1,
            SourceEntry::Link { .. } => links += 1,
            SourceEntry::Directory {
                unreadable: true, ..
            } => {
                dirs += 1;
                unreadable += 1;
            }
            SourceEntry::Directory { .. } => dirs += 1,
        }
    }

    println!();
    info!(
        "{} top-level items: {} folders, {} files, {} links",
        format!("{}", overview.entries.len()).green(),
        dirs,
        files,
        links
    );
    if unreadable > 0 {
        warn!("{} folders could not be read", format!("{}", unreadable).red());
    }
    Ok(())
}

fn run_index(organizer: &Organizer) -> anyhow::Result<()> {
    let reporter = CliReporter::new();
    let index = organizer.index_library(&reporter)?;

    println!();
    for category in &index.categories {
        let subs: Vec<&str> = category.subcategories.iter().map(|s| s.name.as_str()).collect();
        println!(
            "{} {} {}",
            category.name.cyan(),
            subs.join(", "),
            category.notes.dimmed()
        );
    }
    info!("{} categories", format!("{}", index.categories.len()).green());
    Ok(())
}

fn run_plan(organizer: &Organizer) -> anyhow::Result<()> {
    let planner = build_planner(&organizer.config().planner)?;
    let reporter = CliReporter::new();
    let result = organizer.create_plan(planner.as_ref(), &reporter)?;

    println!();
    print_plan(&result.plan);
    info!(
        "Scan: {}, Index: {}, Planner: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.index_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.planner_duration.as_secs_f64()).green(),
    );
    info!("Plan saved to {}", result.plan_path.display());
    Ok(())
}

fn run_show_plan(organizer: &Organizer) -> anyhow::Result<()> {
    match organizer.latest_plan()? {
        Some(plan) => print_plan(&plan),
        None => println!("No plan yet. Run `sortbox plan` first."),
    }
    Ok(())
}

fn print_plan(plan: &Plan) {
    for folder in &plan.new_folders {
        let target = match folder.target_subcategory() {
            Some(sub) => format!("{}/{}", folder.category, sub),
            None => folder.category.clone(),
        };
        println!("{} {}  {}", "new".yellow(), target, folder.reason.dimmed());
    }
    for placement in &plan.placements {
        let target = match placement.target_subcategory() {
            Some(sub) => format!("{}/{}", placement.category, sub),
            None => placement.category.clone(),
        };
        println!(
            "{} -> {}  {}",
            placement.path,
            target.cyan(),
            placement.reason.dimmed()
        );
    }
    if !plan.notes.is_empty() {
        println!("{}", plan.notes.dimmed());
    }
    println!(
        "{} placements, {} new folders",
        format!("{}", plan.placements.len()).green(),
        format!("{}", plan.new_folders.len()).yellow()
    );
}

fn run_apply(organizer: &Organizer, plan_file: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    let plan: Option<Plan> = match plan_file {
        Some(path) => Some(
            Workspace::load_file(path).with_context(|| format!("reading {}", path.display()))?,
        ),
        None => None,
    };

    let placements = match &plan {
        Some(plan) => plan.placements.len(),
        None => organizer
            .latest_plan()?
            .map(|p| p.placements.len())
            .ok_or_else(|| anyhow!("no plan yet; run `sortbox plan` first"))?,
    };

    let prompt = format!(
        "Move up to {} items into {}?",
        placements,
        organizer.workspace().library_root().display()
    );
    if !yes && !prompt_confirm(&prompt, Some(false))? {
        return Ok(());
    }

    let reporter = CliReporter::new();
    let result = match &plan {
        Some(plan) => organizer.apply_plan(plan, &reporter)?,
        None => organizer.apply_latest_plan(&reporter)?,
    };

    println!();
    for folder in &result.report.created_folders {
        println!("{} {}", "created".yellow(), folder);
    }
    print_skips(result.all_skips());
    info!(
        "{} moved, {} skipped ({}s rescan, {}s apply)",
        format!("{}", result.report.moved()).green(),
        format!("{}", result.all_skips().count()).red(),
        format!("{:.2}", result.scan_duration.as_secs_f64()),
        format!("{:.2}", result.apply_duration.as_secs_f64()),
    );
    if result.report.cancelled {
        warn!("Apply was cancelled before finishing");
    }
    info!("Move log: {}", result.report.log_path.display());
    Ok(())
}

fn run_undo(
    organizer: &Organizer,
    log_file: Option<&Path>,
    keep_folders: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let prompt = match log_file {
        Some(path) => format!("Undo the moves recorded in {}?", path.display()),
        None => "Undo the most recent apply?".to_string(),
    };
    if !yes && !prompt_confirm(&prompt, Some(false))? {
        return Ok(());
    }

    let options = UndoOptions {
        keep_created_folders: keep_folders,
    };
    let reporter = CliReporter::new();
    let result = organizer.undo_latest(&options, log_file, &reporter)?;

    println!();
    for record in &result.report.restored {
        if record.restored_rel != record.source_rel {
            println!(
                "{} {} restored as {}",
                "renamed".yellow(),
                record.source_rel,
                record.restored_rel
            );
        }
    }
    print_skips(result.report.failures.iter());
    for dir in &result.report.removed_folders {
        println!("{} {}", "removed".dimmed(), dir);
    }
    info!(
        "{} restored, {} failed in {}s from {}",
        format!("{}", result.report.restored.len()).green(),
        format!("{}", result.report.failures.len()).red(),
        format!("{:.2}", result.undo_duration.as_secs_f64()),
        result.log_path.display()
    );
    Ok(())
}

fn run_history(organizer: &Organizer) -> anyhow::Result<()> {
    for kind in ArtifactKind::ALL {
        let snapshots = organizer.workspace().history(kind)?;
        println!("{} ({})", kind.stem().cyan(), snapshots.len());
        for path in snapshots {
            if let Some(name) = path.file_name() {
                println!("  {}", name.to_string_lossy());
            }
        }
    }
    Ok(())
}

fn print_skips<'a>(skips: impl Iterator<Item = &'a SkipRecord>) {
    for skip in skips {
        println!("{} {}: {}", "skipped".red(), skip.item, skip.reason);
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
