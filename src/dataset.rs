use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::standings::{Match, MatchStatus, Outcome, Team, TeamId};

const DATA_DIR: &str = "bundesliga_dashboard";
const DB_FILE: &str = "football_data.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub match_id: u64,
    pub season: String,
    pub matchday: u32,
    pub utc_date: Option<String>,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub status: MatchStatus,
    pub outcome: Option<Outcome>,
    pub home_goals: Option<i32>,
    pub away_goals: Option<i32>,
}

impl StoredMatch {
    pub fn as_match(&self) -> Match {
        Match {
            id: self.match_id,
            matchday: self.matchday,
            home_team: self.home_team_id,
            away_team: self.away_team_id,
            outcome: self.outcome,
            status: self.status,
        }
    }
}

/// One row of the stored league table, as published by the data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub season: String,
    pub position: u32,
    pub team_id: TeamId,
    pub team_name: String,
    pub points: i64,
    pub played_games: i64,
    pub won: i64,
    pub draw: i64,
    pub lost: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    pub goal_difference: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerRow {
    pub season: String,
    pub player_id: u64,
    pub player_name: String,
    pub team_id: TeamId,
    pub team_name: String,
    pub goals: i64,
    pub assists: Option<i64>,
    pub penalties: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub teams: usize,
    pub matches: usize,
    pub standings: usize,
    pub scorers: usize,
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(DATA_DIR).join(DB_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(DATA_DIR).join(DB_FILE))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .context("enable wal")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS matches (
            match_id INTEGER PRIMARY KEY,
            season TEXT NOT NULL,
            matchday INTEGER NOT NULL,
            utc_date TEXT NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            outcome TEXT NULL,
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
        CREATE INDEX IF NOT EXISTS idx_matches_status ON matches(status);
        CREATE INDEX IF NOT EXISTS idx_matches_matchday ON matches(matchday);

        CREATE TABLE IF NOT EXISTS standings (
            season TEXT NOT NULL,
            position INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            points INTEGER NOT NULL,
            played_games INTEGER NOT NULL,
            won INTEGER NOT NULL,
            draw INTEGER NOT NULL,
            lost INTEGER NOT NULL,
            goals_for INTEGER NOT NULL,
            goals_against INTEGER NOT NULL,
            goal_difference INTEGER NOT NULL,
            PRIMARY KEY (season, team_id)
        );

        CREATE TABLE IF NOT EXISTS scorers (
            season TEXT NOT NULL,
            player_id INTEGER NOT NULL,
            player_name TEXT NOT NULL,
            team_id INTEGER NOT NULL,
            goals INTEGER NOT NULL,
            assists INTEGER NULL,
            penalties INTEGER NULL,
            PRIMARY KEY (season, player_id)
        );

        CREATE TABLE IF NOT EXISTS import_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            season TEXT NOT NULL,
            teams INTEGER NOT NULL,
            matches INTEGER NOT NULL,
            standings INTEGER NOT NULL,
            scorers INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn upsert_team(conn: &Connection, team: &Team) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO teams (id, name, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            updated_at = excluded.updated_at
        "#,
        params![team.id as i64, team.name, Utc::now().to_rfc3339()],
    )
    .context("upsert team")?;
    Ok(())
}

pub fn upsert_match(conn: &Connection, m: &StoredMatch) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO matches (
            match_id, season, matchday, utc_date,
            home_team_id, away_team_id, status, outcome,
            home_goals, away_goals, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(match_id) DO UPDATE SET
            season = excluded.season,
            matchday = excluded.matchday,
            utc_date = excluded.utc_date,
            home_team_id = excluded.home_team_id,
            away_team_id = excluded.away_team_id,
            status = excluded.status,
            outcome = excluded.outcome,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            updated_at = excluded.updated_at
        "#,
        params![
            m.match_id as i64,
            m.season,
            m.matchday as i64,
            m.utc_date,
            m.home_team_id as i64,
            m.away_team_id as i64,
            m.status.as_str(),
            m.outcome.map(Outcome::as_str),
            m.home_goals,
            m.away_goals,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert match")?;
    Ok(())
}

pub fn upsert_standing(conn: &Connection, row: &StandingRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO standings (
            season, position, team_id, points, played_games,
            won, draw, lost, goals_for, goals_against, goal_difference
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(season, team_id) DO UPDATE SET
            position = excluded.position,
            points = excluded.points,
            played_games = excluded.played_games,
            won = excluded.won,
            draw = excluded.draw,
            lost = excluded.lost,
            goals_for = excluded.goals_for,
            goals_against = excluded.goals_against,
            goal_difference = excluded.goal_difference
        "#,
        params![
            row.season,
            row.position as i64,
            row.team_id as i64,
            row.points,
            row.played_games,
            row.won,
            row.draw,
            row.lost,
            row.goals_for,
            row.goals_against,
            row.goal_difference,
        ],
    )
    .context("upsert standing")?;
    Ok(())
}

pub fn upsert_scorer(conn: &Connection, row: &ScorerRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO scorers (
            season, player_id, player_name, team_id, goals, assists, penalties
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(season, player_id) DO UPDATE SET
            player_name = excluded.player_name,
            team_id = excluded.team_id,
            goals = excluded.goals,
            assists = excluded.assists,
            penalties = excluded.penalties
        "#,
        params![
            row.season,
            row.player_id as i64,
            row.player_name,
            row.team_id as i64,
            row.goals,
            row.assists,
            row.penalties,
        ],
    )
    .context("upsert scorer")?;
    Ok(())
}

pub fn load_teams(conn: &Connection) -> Result<HashMap<TeamId, Team>> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM teams")
        .context("prepare load teams query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Team {
                id: row.get::<_, u32>(0)?,
                name: row.get(1)?,
            })
        })
        .context("query load teams")?;

    let mut out = HashMap::new();
    for row in rows {
        let team = row.context("decode team row")?;
        out.insert(team.id, team);
    }
    Ok(out)
}

/// Every stored match of `season` regardless of status.
pub fn load_season_matches(conn: &Connection, season: &str) -> Result<Vec<StoredMatch>> {
    load_matches_where(conn, season, false)
}

pub fn load_finished_stored_matches(conn: &Connection, season: &str) -> Result<Vec<StoredMatch>> {
    load_matches_where(conn, season, true)
}

/// Finished matches of `season` as engine input, ordered by matchday then id.
pub fn load_finished_matches(conn: &Connection, season: &str) -> Result<Vec<Match>> {
    let stored = load_finished_stored_matches(conn, season)?;
    Ok(stored.iter().map(StoredMatch::as_match).collect())
}

fn load_matches_where(
    conn: &Connection,
    season: &str,
    finished_only: bool,
) -> Result<Vec<StoredMatch>> {
    let sql = format!(
        r#"
        SELECT
            match_id, season, matchday, utc_date,
            home_team_id, away_team_id, status, outcome,
            home_goals, away_goals
        FROM matches
        WHERE season = ?1 {}
        ORDER BY matchday ASC, match_id ASC
        "#,
        if finished_only {
            "AND status = 'FINISHED'"
        } else {
            ""
        }
    );
    let mut stmt = conn.prepare(&sql).context("prepare load matches query")?;

    let rows = stmt
        .query_map(params![season], |row| {
            let status: String = row.get(6)?;
            let outcome: Option<String> = row.get(7)?;
            Ok((
                StoredMatch {
                    match_id: row.get::<_, u64>(0)?,
                    season: row.get(1)?,
                    matchday: row.get::<_, u32>(2)?,
                    utc_date: row.get(3)?,
                    home_team_id: row.get::<_, u32>(4)?,
                    away_team_id: row.get::<_, u32>(5)?,
                    status: MatchStatus::parse(&status),
                    outcome: outcome.as_deref().and_then(Outcome::parse),
                    home_goals: row.get(8)?,
                    away_goals: row.get(9)?,
                },
                status,
                outcome,
            ))
        })
        .context("query load matches")?;

    let mut out = Vec::new();
    let mut unknown_outcomes = 0usize;
    let mut unknown_statuses = 0usize;
    for row in rows {
        let (m, raw_status, raw_outcome) = row.context("decode match row")?;
        if m.status == MatchStatus::Unknown {
            unknown_statuses += 1;
            tracing::debug!(match_id = m.match_id, status = %raw_status, "unrecognised match status");
        }
        if m.status == MatchStatus::Finished && m.outcome.is_none() {
            unknown_outcomes += 1;
            tracing::debug!(
                match_id = m.match_id,
                outcome = raw_outcome.as_deref().unwrap_or("<null>"),
                "finished match without a usable outcome"
            );
        }
        out.push(m);
    }
    if unknown_outcomes > 0 {
        tracing::warn!(
            season,
            count = unknown_outcomes,
            "finished matches with missing or unrecognised outcome score zero points"
        );
    }
    if unknown_statuses > 0 {
        tracing::warn!(season, count = unknown_statuses, "matches with unrecognised status");
    }
    Ok(out)
}

/// League table for `season`, ordered by position.
pub fn load_standings(conn: &Connection, season: &str) -> Result<Vec<StandingRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                s.season, s.position, s.team_id, COALESCE(t.name, ''),
                s.points, s.played_games, s.won, s.draw, s.lost,
                s.goals_for, s.goals_against, s.goal_difference
            FROM standings s
            LEFT JOIN teams t ON t.id = s.team_id
            WHERE s.season = ?1
            ORDER BY s.position ASC
            "#,
        )
        .context("prepare load standings query")?;

    let rows = stmt
        .query_map(params![season], |row| {
            Ok(StandingRow {
                season: row.get(0)?,
                position: row.get::<_, u32>(1)?,
                team_id: row.get::<_, u32>(2)?,
                team_name: row.get(3)?,
                points: row.get(4)?,
                played_games: row.get(5)?,
                won: row.get(6)?,
                draw: row.get(7)?,
                lost: row.get(8)?,
                goals_for: row.get(9)?,
                goals_against: row.get(10)?,
                goal_difference: row.get(11)?,
            })
        })
        .context("query load standings")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode standing row")?);
    }
    Ok(out)
}

pub fn load_top_scorers(conn: &Connection, season: &str, limit: usize) -> Result<Vec<ScorerRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                s.season, s.player_id, s.player_name, s.team_id, COALESCE(t.name, ''),
                s.goals, s.assists, s.penalties
            FROM scorers s
            LEFT JOIN teams t ON t.id = s.team_id
            WHERE s.season = ?1
            ORDER BY s.goals DESC, COALESCE(s.assists, 0) DESC, s.player_name ASC
            LIMIT ?2
            "#,
        )
        .context("prepare load scorers query")?;

    let rows = stmt
        .query_map(params![season, limit as i64], |row| {
            Ok(ScorerRow {
                season: row.get(0)?,
                player_id: row.get::<_, u64>(1)?,
                player_name: row.get(2)?,
                team_id: row.get::<_, u32>(3)?,
                team_name: row.get(4)?,
                goals: row.get(5)?,
                assists: row.get(6)?,
                penalties: row.get(7)?,
            })
        })
        .context("query load scorers")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode scorer row")?);
    }
    Ok(out)
}

pub fn latest_season(conn: &Connection) -> Result<Option<String>> {
    let season = conn
        .query_row("SELECT MAX(season) FROM matches", [], |row| {
            row.get::<_, Option<String>>(0)
        })
        .optional()
        .context("query latest season")?;
    Ok(season.flatten())
}

pub fn record_import_run(
    conn: &Connection,
    season: &str,
    started_at: &str,
    counts: &ImportCounts,
    errors: &[String],
) -> Result<i64> {
    let errors_json = serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        r#"
        INSERT INTO import_runs (
            started_at, finished_at, season, teams, matches, standings, scorers, errors_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            started_at,
            Utc::now().to_rfc3339(),
            season,
            counts.teams as i64,
            counts.matches as i64,
            counts.standings as i64,
            counts.scorers as i64,
            errors_json,
        ],
    )
    .context("insert import run")?;
    Ok(conn.last_insert_rowid())
}
