use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;

use crate::dataset::{self, ImportCounts, ScorerRow, StandingRow, StoredMatch};
use crate::standings::{MatchStatus, Outcome, Team};

#[derive(Debug, Clone, Default)]
pub struct ParsedMatches {
    pub season: Option<String>,
    pub teams: Vec<Team>,
    pub matches: Vec<StoredMatch>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedStandings {
    pub season: Option<String>,
    pub teams: Vec<Team>,
    pub rows: Vec<StandingRow>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedScorers {
    pub season: Option<String>,
    pub teams: Vec<Team>,
    pub rows: Vec<ScorerRow>,
}

/// Parses a football-data.org `/competitions/{code}/matches` payload.
/// `season` overrides whatever the payload says.
pub fn parse_matches_json(raw: &str, season: Option<&str>) -> Result<ParsedMatches> {
    let Some(value) = parse_body(raw)? else {
        return Ok(ParsedMatches::default());
    };
    let season_hint = season
        .map(|s| s.to_string())
        .or_else(|| payload_season(&value));

    let items = value
        .get("matches")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing matches array"))?;

    let mut teams = BTreeMap::new();
    let mut matches = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        let match_season = season_hint.clone().or_else(|| item_season(item));
        let Some(match_season) = match_season else {
            skipped += 1;
            continue;
        };
        match parse_match(item, &match_season) {
            Some((m, home, away)) => {
                teams.insert(home.id, home);
                teams.insert(away.id, away);
                matches.push(m);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "match entries without id, matchday, season or teams");
    }

    Ok(ParsedMatches {
        season: season_hint,
        teams: teams.into_values().collect(),
        matches,
        skipped,
    })
}

/// Parses a `/competitions/{code}/standings` payload, keeping the TOTAL table.
pub fn parse_standings_json(raw: &str, season: Option<&str>) -> Result<ParsedStandings> {
    let Some(value) = parse_body(raw)? else {
        return Ok(ParsedStandings::default());
    };
    let season = season
        .map(|s| s.to_string())
        .or_else(|| payload_season(&value))
        .ok_or_else(|| anyhow!("standings payload has no season"))?;

    let tables = value
        .get("standings")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing standings array"))?;
    let table = tables
        .iter()
        .find(|t| t.get("type").and_then(|x| x.as_str()) == Some("TOTAL"))
        .or_else(|| tables.first())
        .and_then(|t| t.get("table"))
        .and_then(|t| t.as_array())
        .ok_or_else(|| anyhow!("standings payload has no table"))?;

    let mut teams = BTreeMap::new();
    let mut rows = Vec::with_capacity(table.len());
    for entry in table {
        let Some(team) = entry.get("team").and_then(parse_team) else {
            continue;
        };
        let Some(position) = entry.get("position").and_then(as_u32_any) else {
            continue;
        };
        let int = |key: &str| entry.get(key).and_then(as_i64_any).unwrap_or(0);
        let goals_for = int("goalsFor");
        let goals_against = int("goalsAgainst");
        rows.push(StandingRow {
            season: season.clone(),
            position,
            team_id: team.id,
            team_name: team.name.clone(),
            points: int("points"),
            played_games: int("playedGames"),
            won: int("won"),
            draw: int("draw"),
            lost: int("lost"),
            goals_for,
            goals_against,
            goal_difference: entry
                .get("goalDifference")
                .and_then(as_i64_any)
                .unwrap_or(goals_for - goals_against),
        });
        teams.insert(team.id, team);
    }
    rows.sort_by_key(|r| r.position);

    Ok(ParsedStandings {
        season: Some(season),
        teams: teams.into_values().collect(),
        rows,
    })
}

/// Parses a `/competitions/{code}/scorers` payload.
pub fn parse_scorers_json(raw: &str, season: Option<&str>) -> Result<ParsedScorers> {
    let Some(value) = parse_body(raw)? else {
        return Ok(ParsedScorers::default());
    };
    let season = season
        .map(|s| s.to_string())
        .or_else(|| payload_season(&value))
        .ok_or_else(|| anyhow!("scorers payload has no season"))?;

    let items = value
        .get("scorers")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing scorers array"))?;

    let mut teams = BTreeMap::new();
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Some(player) = item.get("player") else {
            continue;
        };
        let Some(player_id) = player.get("id").and_then(as_u64_any) else {
            continue;
        };
        let Some(team) = item.get("team").and_then(parse_team) else {
            continue;
        };
        let player_name = player
            .get("name")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string();
        rows.push(ScorerRow {
            season: season.clone(),
            player_id,
            player_name,
            team_id: team.id,
            team_name: team.name.clone(),
            goals: item.get("goals").and_then(as_i64_any).unwrap_or(0),
            assists: item.get("assists").and_then(as_i64_any),
            penalties: item.get("penalties").and_then(as_i64_any),
        });
        teams.insert(team.id, team);
    }

    Ok(ParsedScorers {
        season: Some(season),
        teams: teams.into_values().collect(),
        rows,
    })
}

fn parse_body(raw: &str) -> Result<Option<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let value = serde_json::from_str::<Value>(trimmed).context("invalid football-data json")?;
    Ok(Some(value))
}

fn parse_match(v: &Value, season: &str) -> Option<(StoredMatch, Team, Team)> {
    let match_id = as_u64_any(v.get("id")?)?;
    let matchday = v.get("matchday").and_then(as_u32_any).filter(|md| *md > 0)?;
    let home = parse_team(v.get("homeTeam")?)?;
    let away = parse_team(v.get("awayTeam")?)?;
    let status = v
        .get("status")
        .and_then(|x| x.as_str())
        .map(MatchStatus::parse)
        .unwrap_or(MatchStatus::Unknown);

    let score = v.get("score");
    let full_time = score.and_then(|s| s.get("fullTime"));
    let home_goals = full_time.and_then(|ft| ft.get("home")).and_then(as_i32_any);
    let away_goals = full_time.and_then(|ft| ft.get("away")).and_then(as_i32_any);
    let outcome = score
        .and_then(|s| s.get("winner"))
        .and_then(|x| x.as_str())
        .and_then(Outcome::parse)
        .or_else(|| {
            if status != MatchStatus::Finished {
                return None;
            }
            match (home_goals, away_goals) {
                (Some(h), Some(a)) => Some(Outcome::from_goals(h, a)),
                _ => None,
            }
        });

    let m = StoredMatch {
        match_id,
        season: season.to_string(),
        matchday,
        utc_date: v
            .get("utcDate")
            .and_then(|x| x.as_str())
            .map(|s| s.to_string()),
        home_team_id: home.id,
        away_team_id: away.id,
        status,
        outcome,
        home_goals,
        away_goals,
    };
    Some((m, home, away))
}

fn parse_team(v: &Value) -> Option<Team> {
    let id = as_u32_any(v.get("id")?)?;
    let name = v
        .get("name")
        .and_then(|x| x.as_str())
        .or_else(|| v.get("shortName").and_then(|x| x.as_str()))
        .unwrap_or_default()
        .trim()
        .to_string();
    if name.is_empty() {
        return None;
    }
    Some(Team { id, name })
}

fn payload_season(value: &Value) -> Option<String> {
    if let Some(season) = value.get("filters").and_then(|f| f.get("season")) {
        if let Some(s) = season.as_str() {
            return Some(s.to_string());
        }
        if let Some(n) = season.as_u64() {
            return Some(n.to_string());
        }
    }
    item_season(value)
}

fn item_season(value: &Value) -> Option<String> {
    let start = value
        .get("season")
        .and_then(|s| s.get("startDate"))
        .and_then(|x| x.as_str())?;
    let year = start.get(..4)?;
    year.chars()
        .all(|c| c.is_ascii_digit())
        .then(|| year.to_string())
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

fn as_u32_any(v: &Value) -> Option<u32> {
    let n = as_u64_any(v)?;
    u32::try_from(n).ok()
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

fn as_i32_any(v: &Value) -> Option<i32> {
    let n = as_i64_any(v)?;
    i32::try_from(n).ok()
}

/// Payload files for one import run. Any subset may be given.
#[derive(Debug, Clone, Default)]
pub struct ImportSources {
    pub matches: Option<PathBuf>,
    pub standings: Option<PathBuf>,
    pub scorers: Option<PathBuf>,
}

impl ImportSources {
    pub fn is_empty(&self) -> bool {
        self.matches.is_none() && self.standings.is_none() && self.scorers.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportRun {
    pub run_id: i64,
    pub season: String,
    pub counts: ImportCounts,
    pub errors: Vec<String>,
}

/// Imports every given file, each in its own transaction. A file that cannot
/// be read, parsed or written is rolled back and noted in `errors`; the run row
/// is always recorded. Only a failure to record the run itself is returned.
pub fn import_files(
    conn: &mut Connection,
    sources: &ImportSources,
    season: Option<&str>,
) -> Result<ImportRun> {
    let started_at = Utc::now().to_rfc3339();
    let mut counts = ImportCounts::default();
    let mut errors: Vec<String> = Vec::new();
    let mut season = season.map(|s| s.to_string());

    if let Some(path) = &sources.matches {
        match import_matches_file(conn, path, season.as_deref()) {
            Ok((parsed_season, file_counts, skipped)) => {
                if skipped > 0 {
                    errors.push(format!("{}: skipped {skipped} match entries", path.display()));
                }
                season = season.or(parsed_season);
                add_counts(&mut counts, &file_counts);
            }
            Err(err) => errors.push(format!("{}: {err:#}", path.display())),
        }
    }

    if let Some(path) = &sources.standings {
        match import_standings_file(conn, path, season.as_deref()) {
            Ok((parsed_season, file_counts)) => {
                season = season.or(parsed_season);
                add_counts(&mut counts, &file_counts);
            }
            Err(err) => errors.push(format!("{}: {err:#}", path.display())),
        }
    }

    if let Some(path) = &sources.scorers {
        match import_scorers_file(conn, path, season.as_deref()) {
            Ok((parsed_season, file_counts)) => {
                season = season.or(parsed_season);
                add_counts(&mut counts, &file_counts);
            }
            Err(err) => errors.push(format!("{}: {err:#}", path.display())),
        }
    }

    let season = season.unwrap_or_else(|| "unknown".to_string());
    let run_id = dataset::record_import_run(conn, &season, &started_at, &counts, &errors)?;
    for err in &errors {
        tracing::warn!(run_id, "{err}");
    }
    tracing::info!(
        run_id,
        season = %season,
        matches = counts.matches,
        standings = counts.standings,
        scorers = counts.scorers,
        "import run recorded"
    );

    Ok(ImportRun {
        run_id,
        season,
        counts,
        errors,
    })
}

fn import_matches_file(
    conn: &mut Connection,
    path: &Path,
    season: Option<&str>,
) -> Result<(Option<String>, ImportCounts, usize)> {
    let raw = read_file(path)?;
    let parsed = parse_matches_json(&raw, season)?;
    let mut counts = ImportCounts::default();
    let tx = conn.transaction().context("begin matches transaction")?;
    counts.teams = upsert_teams(&tx, &parsed.teams)?;
    for m in &parsed.matches {
        dataset::upsert_match(&tx, m)?;
        counts.matches += 1;
    }
    tx.commit().context("commit matches transaction")?;
    Ok((parsed.season, counts, parsed.skipped))
}

fn import_standings_file(
    conn: &mut Connection,
    path: &Path,
    season: Option<&str>,
) -> Result<(Option<String>, ImportCounts)> {
    let raw = read_file(path)?;
    let parsed = parse_standings_json(&raw, season)?;
    let mut counts = ImportCounts::default();
    let tx = conn.transaction().context("begin standings transaction")?;
    counts.teams = upsert_teams(&tx, &parsed.teams)?;
    for row in &parsed.rows {
        dataset::upsert_standing(&tx, row)?;
        counts.standings += 1;
    }
    tx.commit().context("commit standings transaction")?;
    Ok((parsed.season, counts))
}

fn import_scorers_file(
    conn: &mut Connection,
    path: &Path,
    season: Option<&str>,
) -> Result<(Option<String>, ImportCounts)> {
    let raw = read_file(path)?;
    let parsed = parse_scorers_json(&raw, season)?;
    let mut counts = ImportCounts::default();
    let tx = conn.transaction().context("begin scorers transaction")?;
    counts.teams = upsert_teams(&tx, &parsed.teams)?;
    for row in &parsed.rows {
        dataset::upsert_scorer(&tx, row)?;
        counts.scorers += 1;
    }
    tx.commit().context("commit scorers transaction")?;
    Ok((parsed.season, counts))
}

fn add_counts(total: &mut ImportCounts, file: &ImportCounts) {
    total.teams += file.teams;
    total.matches += file.matches;
    total.standings += file.standings;
    total.scorers += file.scorers;
}

fn upsert_teams(conn: &Connection, teams: &[Team]) -> Result<usize> {
    for team in teams {
        dataset::upsert_team(conn, team)?;
    }
    Ok(teams.len())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}
