use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};

use crate::dashboard::DashboardSnapshot;
use crate::league_table::team_name;
use crate::standings::{CumulativeStandingsRow, Team, TeamId};

/// One chart line: cumulative points per matchday for a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub team: TeamId,
    pub name: String,
    pub selected: bool,
    pub points: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub rows: usize,
    pub table: usize,
    pub records: usize,
    pub scorers: usize,
}

/// Series ordered with the default selection first (in rank order), then the
/// remaining teams by name.
pub fn chart_series(
    rows: &[CumulativeStandingsRow],
    teams: &HashMap<TeamId, Team>,
    selected: &[TeamId],
) -> Vec<ChartSeries> {
    let mut by_team: HashMap<TeamId, Vec<(u32, u32)>> = HashMap::new();
    for row in rows {
        by_team
            .entry(row.team)
            .or_default()
            .push((row.matchday, row.cumulative_points));
    }

    let mut out: Vec<ChartSeries> = by_team
        .into_iter()
        .map(|(team, mut points)| {
            points.sort_by_key(|(matchday, _)| *matchday);
            ChartSeries {
                team,
                name: team_name(teams, team),
                selected: selected.contains(&team),
                points,
            }
        })
        .collect();

    let rank = |id: TeamId| selected.iter().position(|s| *s == id);
    out.sort_by(|a, b| match (rank(a.team), rank(b.team)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name).then(a.team.cmp(&b.team)),
    });
    out
}

pub fn write_json(path: &Path, snapshot: &DashboardSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let json = serde_json::to_string_pretty(snapshot).context("serialize dashboard snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

pub fn write_workbook(path: &Path, snapshot: &DashboardSnapshot) -> Result<ExportReport> {
    let names: HashMap<TeamId, Team> = snapshot
        .teams
        .iter()
        .map(|t| (t.id, t.clone()))
        .collect();

    let mut points_rows = vec![vec![
        "Matchday".to_string(),
        "Team ID".to_string(),
        "Team".to_string(),
        "Cumulative Points".to_string(),
        "Default Selection".to_string(),
    ]];
    for row in &snapshot.rows {
        points_rows.push(vec![
            row.matchday.to_string(),
            row.team.to_string(),
            team_name(&names, row.team),
            row.cumulative_points.to_string(),
            yes_no(snapshot.default_selection.contains(&row.team)),
        ]);
    }

    let mut table_rows = vec![vec![
        "Position".to_string(),
        "Team ID".to_string(),
        "Team".to_string(),
        "Points".to_string(),
        "Matchdays".to_string(),
    ]];
    for entry in &snapshot.table {
        table_rows.push(vec![
            entry.position.to_string(),
            entry.team.to_string(),
            entry.name.clone(),
            entry.points.to_string(),
            entry.matchdays_played.to_string(),
        ]);
    }

    let mut record_rows = vec![vec![
        "Team ID".to_string(),
        "Team".to_string(),
        "Played".to_string(),
        "Won".to_string(),
        "Drawn".to_string(),
        "Lost".to_string(),
        "Win %".to_string(),
        "Home Win %".to_string(),
        "Away Win %".to_string(),
    ]];
    for record in &snapshot.records {
        record_rows.push(vec![
            record.team.to_string(),
            team_name(&names, record.team),
            record.played.to_string(),
            record.won.to_string(),
            record.drawn.to_string(),
            record.lost.to_string(),
            format!("{:.1}", record.win_pct()),
            format!("{:.1}", record.home_win_pct()),
            format!("{:.1}", record.away_win_pct()),
        ]);
    }

    let mut scorer_rows = vec![vec![
        "Player".to_string(),
        "Team".to_string(),
        "Goals".to_string(),
        "Assists".to_string(),
        "Penalties".to_string(),
    ]];
    for scorer in &snapshot.scorers {
        scorer_rows.push(vec![
            scorer.player_name.clone(),
            scorer.team_name.clone(),
            scorer.goals.to_string(),
            opt_to_string(scorer.assists),
            opt_to_string(scorer.penalties),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("CumulativePoints")?;
        write_rows(sheet, &points_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Table")?;
        write_rows(sheet, &table_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("TeamRecords")?;
        write_rows(sheet, &record_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Scorers")?;
        write_rows(sheet, &scorer_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        rows: snapshot.rows.len(),
        table: snapshot.table.len(),
        records: snapshot.records.len(),
        scorers: snapshot.scorers.len(),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> String {
    let label = if flag { "yes" } else { "no" };
    label.to_string()
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
