use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use bundesliga_dashboard::config::{DEFAULT_CONFIG_FILE, DashboardConfig};
use bundesliga_dashboard::dashboard::{Dashboard, DashboardSnapshot};
use bundesliga_dashboard::league_table::team_name;
use bundesliga_dashboard::standings::{Team, TeamId, TieBreak};
use bundesliga_dashboard::{dataset, export, logging};

fn main() -> Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    DashboardConfig::load_env_file();
    let config_path = arg_value(&args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = DashboardConfig::load(&config_path)?;
    config.apply_process_env()?;
    apply_args(&mut config, &args)?;

    logging::init(&config.logging.filter)?;

    let db_path = config
        .db_path()
        .context("unable to resolve sqlite path")?;
    if !db_path.exists() {
        return Err(anyhow!(
            "no database at {}; run import_football_data first",
            db_path.display()
        ));
    }
    let conn = dataset::open_db(&db_path)?;

    let dashboard = Dashboard::new(config.selection.clone());
    let input = dashboard.load_input(&conn, config.database.season.as_deref())?;
    let snapshot = dashboard.snapshot(input);

    print_snapshot(&snapshot, dashboard.selection().tie_break);

    if let Some(path) = arg_value(&args, "--xlsx") {
        let path = PathBuf::from(path);
        let report = export::write_workbook(&path, &snapshot)?;
        tracing::info!(
            path = %path.display(),
            rows = report.rows,
            table = report.table,
            "workbook written"
        );
        println!("Workbook: {}", path.display());
    }
    if let Some(path) = arg_value(&args, "--json") {
        let path = PathBuf::from(path);
        export::write_json(&path, &snapshot)?;
        println!("JSON: {}", path.display());
    }

    Ok(())
}

fn apply_args(config: &mut DashboardConfig, args: &[String]) -> Result<()> {
    if let Some(db) = arg_value(args, "--db") {
        config.database.path = Some(PathBuf::from(db));
    }
    if let Some(season) = arg_value(args, "--season") {
        config.database.season = Some(season);
    }
    if let Some(raw) = arg_value(args, "--top") {
        config.selection.top_n = raw
            .parse::<usize>()
            .with_context(|| format!("--top expects a count, got {raw}"))?;
    }
    if let Some(raw) = arg_value(args, "--tie-break") {
        config.selection.tie_break =
            TieBreak::parse(&raw).ok_or_else(|| anyhow!("unknown --tie-break {raw}"))?;
    }
    if args.iter().any(|a| a == "--carry-forward") {
        config.selection.carry_forward = true;
    }
    Ok(())
}

/// Accepts both `--flag=value` and `--flag value`.
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

fn print_snapshot(snapshot: &DashboardSnapshot, tie_break: TieBreak) {
    let names = snapshot
        .teams
        .iter()
        .map(|t| (t.id, t.clone()))
        .collect::<HashMap<TeamId, Team>>();

    println!("Season {}", snapshot.season);
    match snapshot.latest_matchday {
        Some(md) => println!("Latest matchday: {md}"),
        None => println!("No finished matches"),
    }

    println!();
    println!("Cumulative standings (tie-break: {})", tie_break.as_str());
    println!("{:>3}  {:<30} {:>4} {:>4}", "#", "Team", "MD", "Pts");
    for entry in &snapshot.table {
        println!(
            "{:>3}  {:<30} {:>4} {:>4}",
            entry.position, entry.name, entry.matchdays_played, entry.points
        );
    }

    if !snapshot.standings.is_empty() {
        println!();
        println!("League standings");
        println!(
            "{:>3}  {:<30} {:>4} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4}",
            "#", "Team", "Pts", "P", "W", "D", "L", "GF", "GA", "GD"
        );
        for row in &snapshot.standings {
            println!(
                "{:>3}  {:<30} {:>4} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4}",
                row.position,
                row.team_name,
                row.points,
                row.played_games,
                row.won,
                row.draw,
                row.lost,
                row.goals_for,
                row.goals_against,
                row.goal_difference
            );
        }
    }

    println!();
    let selected = snapshot
        .default_selection
        .iter()
        .map(|id| team_name(&names, *id))
        .collect::<Vec<_>>();
    println!("Default chart selection: {}", selected.join(", "));

    let s = &snapshot.summary;
    println!();
    println!("Finished matches: {} over {} matchdays", s.finished_matches, s.matchdays);
    println!(
        "Home wins {:.1}%  Draws {:.1}%  Away wins {:.1}%",
        s.home_win_pct(),
        s.draw_pct(),
        s.away_win_pct()
    );
    if let Some(gpm) = s.goals_per_match() {
        println!("Goals per match: {gpm:.2}");
    }
    if s.unresolved > 0 {
        println!("Matches without a usable outcome: {}", s.unresolved);
    }

    if !snapshot.scorers.is_empty() {
        println!();
        println!("Top scorers");
        for (idx, scorer) in snapshot.scorers.iter().enumerate() {
            println!(
                "{:>3}  {:<28} {:<26} {:>3}",
                idx + 1,
                scorer.player_name,
                scorer.team_name,
                scorer.goals
            );
        }
    }
}
