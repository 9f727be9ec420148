mod commands;
mod logging;
mod progress;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{BackupCommand, Cli, Commands, RenameCommand};
use dotenv::dotenv;
use progress::CliReporter;
use reelsweep_core::config::{load_configuration, load_configuration_from};
use reelsweep_core::rename::{apply_tv_rename, preview_tv_rename, RenamePreview};
use reelsweep_core::{
    AppConfig, BackupManager, BackupSnapshot, ExecutionReport, ProgressTracker, SafetyGate,
    ScanEngine, ScanResult, UserDecisions,
};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let loaded = match &args.config {
        Some(path) => load_configuration_from(path),
        None => load_configuration(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let outcome = match args.command {
        Some(Commands::Scan { csv, json }) => run_scan(&config, csv.as_deref(), json.as_deref()),
        Some(Commands::Clean {
            dry_run,
            yes,
            decisions,
        }) => run_clean(&config, dry_run, yes, decisions.as_deref()),
        Some(Commands::Backup { action }) => run_backup(&config, action),
        Some(Commands::Rename { action }) => run_rename(&config, action),
        Some(Commands::PrintConfig) => config
            .to_toml()
            .map(|toml| println!("{}", toml))
            .map_err(anyhow::Error::from),
        Some(Commands::InitConfig { path, force }) => init_config(&config, &path, force),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
    Ok(())
}

fn engine(config: &AppConfig) -> anyhow::Result<ScanEngine> {
    let engine = ScanEngine::new(config.clone())
        .with_reporter(Arc::new(CliReporter::new()))
        .with_configured_verifier()?;
    Ok(engine)
}

fn run_scan(config: &AppConfig, csv: Option<&Path>, json: Option<&Path>) -> anyhow::Result<()> {
    let result = engine(config)?.scan()?;
    print_scan_report(&result);

    if let Some(path) = csv {
        export_csv(&result, path)?;
        info!("Duplicate list written to {}", path.display());
    }
    if let Some(path) = json {
        fs::write(path, serde_json::to_string_pretty(&result)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Scan result written to {}", path.display());
    }
    Ok(())
}

fn run_clean(
    config: &AppConfig,
    dry_run: bool,
    yes: bool,
    decisions: Option<&Path>,
) -> anyhow::Result<()> {
    let engine = engine(config)?;
    let mut result = engine.scan()?;

    if let Some(path) = decisions {
        let raw =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let decisions: UserDecisions = serde_json::from_str(&raw)
            .with_context(|| format!("parsing decisions in {}", path.display()))?;
        decisions.apply(&mut result);
    }
    print_scan_report(&result);

    if result.total_files_to_delete == 0 && result.compliance_issues.is_empty() {
        println!("{}", "Nothing to clean".green());
        return Ok(());
    }

    let dry_run = dry_run || config.safety.dry_run;
    if !dry_run && !yes {
        let prompt = format!(
            "Delete {} files ({}) and fix {} naming issues?",
            result.total_files_to_delete,
            format_size(result.space_to_free),
            result.compliance_issues.len()
        );
        if !prompt_confirm(&prompt, Some(false))? {
            println!("Aborted");
            return Ok(());
        }
    }

    let report = engine.clean(&result, dry_run)?;
    print_execution_report(&report);
    Ok(())
}

fn run_backup(config: &AppConfig, action: BackupCommand) -> anyhow::Result<()> {
    let manager = BackupManager::new(config.backup_dir());

    match action {
        BackupCommand::Create { library } => {
            let paths = match library.as_str() {
                "movies" => config.movie_paths().to_vec(),
                "tv" => config.tv_paths().to_vec(),
                "all" => config.all_library_paths(),
                other => bail!("unknown library type '{}' (use movies, tv or all)", other),
            };
            if paths.is_empty() {
                bail!("no {} library paths configured", library);
            }
            let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
            let mut snapshot = manager.create(&library, &paths)?;
            manager.complete(&mut snapshot)?;
            println!(
                "Created backup {}: {} files, {}",
                snapshot.id.cyan(),
                snapshot.files.len(),
                format_size(snapshot.total_size())
            );
        }
        BackupCommand::List => {
            let snapshots = manager.list()?;
            if snapshots.is_empty() {
                println!("No backups in {}", manager.dir().display());
            }
            for snapshot in snapshots {
                println!(
                    "{}  {}  {:?}  {} files, {} operations",
                    snapshot.id.cyan(),
                    snapshot.created_at.format("%Y-%m-%d %H:%M:%S"),
                    snapshot.status,
                    snapshot.files.len(),
                    snapshot.operations.len()
                );
            }
        }
        BackupCommand::Verify { id } => {
            let snapshot = manager.load(&id)?;
            let report = manager.verify_integrity(&snapshot);
            if report.is_intact() {
                println!("{} all {} files present", "✓".green(), report.checked);
            } else {
                for path in &report.missing {
                    println!("  {} {}", "missing".red(), path.display());
                }
                for path in &report.size_changed {
                    println!("  {} {}", "changed".yellow(), path.display());
                }
                println!(
                    "{} of {} files missing, {} changed",
                    report.missing.len(),
                    report.checked,
                    report.size_changed.len()
                );
            }
        }
        BackupCommand::Revert { id, yes } => {
            let mut snapshot = manager.load(&id)?;
            let completed = snapshot.operations.iter().filter(|op| op.completed).count();
            println!(
                "Backup {} holds {} completed operations",
                snapshot.id.cyan(),
                completed
            );
            if !yes && !prompt_confirm("Revert them?", Some(false))? {
                println!("Aborted");
                return Ok(());
            }
            let gate = SafetyGate::new(&config.safety).with_libraries(revert_roots(&snapshot));
            let report = manager.revert(&mut snapshot, &gate)?;
            println!(
                "Reverted {}, {} failed, {} deletions cannot be undone",
                format!("{}", report.reverted).green(),
                format!("{}", report.failed).red(),
                report.not_revertible
            );
            for err in &report.errors {
                println!("  {} {}: {}", "✗".red(), err.path.display(), err.message);
            }
        }
        BackupCommand::Delete { id, yes } => {
            if !yes && !prompt_confirm(&format!("Delete backup {}?", id), Some(false))? {
                println!("Aborted");
                return Ok(());
            }
            manager.delete(&id)?;
            println!("Deleted backup {}", id);
        }
    }
    Ok(())
}

/// Libraries a revert may touch. Rename snapshots capture the show folders themselves,
/// so their parent is the library.
fn revert_roots(snapshot: &BackupSnapshot) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = snapshot
        .library_paths
        .iter()
        .map(|path| match (snapshot.library_type.as_str(), path.parent()) {
            ("rename", Some(parent)) => parent.to_path_buf(),
            _ => path.clone(),
        })
        .collect();
    roots.sort();
    roots.dedup();
    roots
}

fn run_rename(config: &AppConfig, action: RenameCommand) -> anyhow::Result<()> {
    match action {
        RenameCommand::Preview {
            base,
            old_title,
            new_title,
        } => {
            let preview = preview_tv_rename(&base, &old_title, &new_title, &config.safety)?;
            print_rename_preview(&preview);
        }
        RenameCommand::Apply {
            base,
            old_title,
            new_title,
            dry_run,
            yes,
        } => {
            let preview = preview_tv_rename(&base, &old_title, &new_title, &config.safety)?;
            print_rename_preview(&preview);
            if !preview.can_proceed {
                bail!("rename would collide with existing folders");
            }
            if !dry_run
                && !yes
                && !prompt_confirm(
                    &format!("Rename '{}' to '{}'?", old_title, new_title),
                    Some(false),
                )?
            {
                println!("Aborted");
                return Ok(());
            }

            let reporter = CliReporter::new();
            let tracker = ProgressTracker::new(&reporter, "renaming");
            let outcome = apply_tv_rename(
                &base,
                &old_title,
                &new_title,
                config,
                dry_run,
                Some(&tracker),
            )?;
            for result in &outcome.results {
                match &result.error {
                    None => println!(
                        "  {} {} -> {}",
                        "✓".green(),
                        result.old_path.display(),
                        result.new_path.display()
                    ),
                    Some(err) => println!(
                        "  {} {}: {}",
                        "✗".red(),
                        result.old_path.display(),
                        err
                    ),
                }
            }
            if let Some(id) = &outcome.backup_id {
                println!("Recorded in backup {}", id.cyan());
            }
            if outcome.failures() > 0 {
                bail!("{} renames failed", outcome.failures());
            }
        }
    }
    Ok(())
}

fn init_config(config: &AppConfig, path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, config.to_toml()?).with_context(|| format!("writing {}", path.display()))?;
    println!("Configuration written to {}", path.display());
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

fn print_scan_report(result: &ScanResult) {
    println!();
    if result.total_duplicates > 0 {
        println!("{}", "Duplicates".bold());
        for group in result.duplicate_groups() {
            println!("  {} [{}]", group.label().cyan(), group.kind);
            if let Some(keeper) = group.keeper() {
                println!(
                    "    {} {} ({}, {})",
                    "keep  ".green(),
                    keeper.path.display(),
                    format_size(keeper.size),
                    keeper.resolution
                );
            }
            for file in group.deletions() {
                println!(
                    "    {} {} ({}, {})",
                    "delete".red(),
                    file.path.display(),
                    format_size(file.size),
                    file.resolution
                );
            }
        }
    }

    if !result.compliance_issues.is_empty() {
        println!("{}", "Naming issues".bold());
        for issue in &result.compliance_issues {
            println!("  {} {}", format!("[{}]", issue.action).yellow(), issue.path.display());
            println!("      {}", issue.problem.dimmed());
            println!("      -> {}", issue.suggested_path.display());
        }
    }

    let review = result.titles_needing_review();
    if !review.is_empty() {
        println!("{}", "Ambiguous show titles".bold());
        for title in review {
            let folder = title
                .folder_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!(
                "  {}: folder '{}' vs filename '{}' ({} episodes)",
                folder.magenta(),
                title.folder_match.title,
                title.filename_match.title,
                title.affected_files.len()
            );
            println!("      {}", title.reason.dimmed());
        }
    }

    println!();
    info!(
        "Scan: {}, {} duplicate groups, {} files to delete, {} to free, {} naming issues",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{}", result.total_duplicates).red(),
        format!("{}", result.total_files_to_delete).red(),
        format_size(result.space_to_free).red(),
        format!("{}", result.compliance_issues.len()).yellow(),
    );
}

fn print_execution_report(report: &ExecutionReport) {
    let prefix = if report.dry_run { "[dry run] " } else { "" };
    println!(
        "{}Deleted {} files ({}), renamed {}, moved {}",
        prefix,
        format!("{}", report.deleted).green(),
        format_size(report.bytes_freed),
        report.renamed,
        report.moved
    );
    for err in &report.errors {
        println!("  {} {}: {}", "✗".red(), err.path.display(), err.message);
    }
    if let Some(id) = &report.backup_id {
        println!("Recorded in backup {} (revert with `reelsweep backup revert {}`)", id.cyan(), id);
    }
}

fn export_csv(result: &ScanResult, path: &Path) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["kind", "group", "action", "path", "size_bytes", "resolution"])?;
    for group in result.duplicate_groups() {
        for (idx, file) in group.files.iter().enumerate() {
            let action = if idx == 0 { "keep" } else { "delete" };
            writer.write_record([
                group.kind.to_string(),
                group.label(),
                action.to_string(),
                file.path.display().to_string(),
                file.size.to_string(),
                file.resolution.to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn print_rename_preview(preview: &RenamePreview) {
    println!("{}", "Rename preview".bold());
    for ((folder, target), episodes) in preview
        .matching_folders
        .iter()
        .zip(&preview.target_paths)
        .zip(&preview.episode_counts)
    {
        println!(
            "  {} -> {} ({} episodes)",
            folder.display(),
            target.display().to_string().cyan(),
            episodes
        );
    }
    for warning in &preview.empty_folder_warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    for warning in &preview.collision_warnings {
        println!("  {} {}", "collision:".red(), warning);
    }
    println!("{} episodes in total", preview.total_episodes);
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

        if io::stdin().read_line(&mut input)? == 0 {
            // stdin closed: take the default, or refuse.
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
