use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use bundesliga_dashboard::config::{DEFAULT_CONFIG_FILE, DashboardConfig};
use bundesliga_dashboard::dataset;
use bundesliga_dashboard::import::{self, ImportSources};
use bundesliga_dashboard::logging;

fn main() -> Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    DashboardConfig::load_env_file();
    let config_path = arg_value(&args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = DashboardConfig::load(&config_path)?;
    config.apply_process_env()?;
    logging::init(&config.logging.filter)?;

    let sources = ImportSources {
        matches: arg_value(&args, "--matches").map(PathBuf::from),
        standings: arg_value(&args, "--standings").map(PathBuf::from),
        scorers: arg_value(&args, "--scorers").map(PathBuf::from),
    };
    if sources.is_empty() {
        return Err(anyhow!(
            "nothing to import; pass --matches, --standings and/or --scorers"
        ));
    }

    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| config.db_path())
        .context("unable to resolve sqlite path")?;
    let season_arg = arg_value(&args, "--season").or(config.database.season.clone());

    let mut conn = dataset::open_db(&db_path)?;
    let run = import::import_files(&mut conn, &sources, season_arg.as_deref())?;

    println!("Import complete (run {})", run.run_id);
    println!("DB: {}", db_path.display());
    println!("Season: {}", run.season);
    println!(
        "Teams: {}  Matches: {}  Standings: {}  Scorers: {}",
        run.counts.teams, run.counts.matches, run.counts.standings, run.counts.scorers
    );
    if !run.errors.is_empty() {
        println!("Errors: {}", run.errors.len());
        for err in run.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
