use std::path::PathBuf;

use rusqlite::params;

use bundesliga_dashboard::dataset::{
    self, ImportCounts, ScorerRow, StandingRow, StoredMatch, open_in_memory,
};
use bundesliga_dashboard::import::{ImportSources, import_files};
use bundesliga_dashboard::standings::{MatchStatus, Outcome, Team};

fn stored(
    match_id: u64,
    season: &str,
    matchday: u32,
    home: u32,
    away: u32,
    status: MatchStatus,
    outcome: Option<Outcome>,
) -> StoredMatch {
    StoredMatch {
        match_id,
        season: season.to_string(),
        matchday,
        utc_date: None,
        home_team_id: home,
        away_team_id: away,
        status,
        outcome,
        home_goals: None,
        away_goals: None,
    }
}

#[test]
fn finished_matches_are_filtered_by_season_and_status() {
    let conn = open_in_memory().expect("in-memory db");
    let rows = vec![
        stored(3, "2023", 2, 1, 2, MatchStatus::Finished, Some(Outcome::Draw)),
        stored(1, "2023", 1, 1, 2, MatchStatus::Finished, Some(Outcome::HomeWin)),
        stored(2, "2023", 1, 3, 4, MatchStatus::Timed, None),
        stored(9, "2022", 1, 1, 2, MatchStatus::Finished, Some(Outcome::AwayWin)),
    ];
    for m in &rows {
        dataset::upsert_match(&conn, m).expect("upsert match");
    }

    let finished = dataset::load_finished_matches(&conn, "2023").expect("load finished");
    let ids: Vec<u64> = finished.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(finished[0].outcome, Some(Outcome::HomeWin));

    let all = dataset::load_season_matches(&conn, "2023").expect("load all");
    assert_eq!(all.len(), 3);
    assert_eq!(dataset::latest_season(&conn).expect("latest"), Some("2023".to_string()));
}

#[test]
fn upsert_replaces_existing_match() {
    let conn = open_in_memory().expect("in-memory db");
    dataset::upsert_match(&conn, &stored(1, "2023", 1, 1, 2, MatchStatus::Timed, None))
        .expect("first upsert");
    dataset::upsert_match(
        &conn,
        &stored(1, "2023", 1, 1, 2, MatchStatus::Finished, Some(Outcome::AwayWin)),
    )
    .expect("second upsert");

    let finished = dataset::load_finished_matches(&conn, "2023").expect("load finished");
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome, Some(Outcome::AwayWin));
}

#[test]
fn unrecognised_stored_outcome_loads_as_none() {
    let conn = open_in_memory().expect("in-memory db");
    conn.execute(
        "INSERT INTO matches (match_id, season, matchday, home_team_id, away_team_id, status, outcome, updated_at)
         VALUES (?1, '2023', 1, 1, 2, 'FINISHED', 'ABANDONED', 'now')",
        params![77i64],
    )
    .expect("raw insert");

    let finished = dataset::load_finished_matches(&conn, "2023").expect("load finished");
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome, None);
}

#[test]
fn empty_store_has_no_season() {
    let conn = open_in_memory().expect("in-memory db");
    assert_eq!(dataset::latest_season(&conn).expect("latest"), None);
    assert!(dataset::load_finished_matches(&conn, "2023").expect("load").is_empty());
}

#[test]
fn standings_come_back_in_position_order_with_names() {
    let conn = open_in_memory().expect("in-memory db");
    for (id, name) in [(3, "Bayer 04 Leverkusen"), (5, "FC Bayern München")] {
        dataset::upsert_team(&conn, &Team { id, name: name.to_string() }).expect("team");
    }
    for (position, team_id, points) in [(2u32, 5u32, 78i64), (1, 3, 90)] {
        dataset::upsert_standing(
            &conn,
            &StandingRow {
                season: "2023".to_string(),
                position,
                team_id,
                team_name: String::new(),
                points,
                played_games: 34,
                won: 0,
                draw: 0,
                lost: 0,
                goals_for: 0,
                goals_against: 0,
                goal_difference: 0,
            },
        )
        .expect("standing");
    }

    let table = dataset::load_standings(&conn, "2023").expect("load standings");
    assert_eq!(table.len(), 2);
    assert_eq!(table[0].position, 1);
    assert_eq!(table[0].team_name, "Bayer 04 Leverkusen");
    assert_eq!(table[1].points, 78);

    let teams = dataset::load_teams(&conn).expect("load teams");
    assert_eq!(teams.get(&5).map(|t| t.name.as_str()), Some("FC Bayern München"));
}

#[test]
fn top_scorers_sorted_and_limited() {
    let conn = open_in_memory().expect("in-memory db");
    let scorer = |player_id: u64, name: &str, goals: i64, assists: Option<i64>| ScorerRow {
        season: "2023".to_string(),
        player_id,
        player_name: name.to_string(),
        team_id: 5,
        team_name: String::new(),
        goals,
        assists,
        penalties: None,
    };
    for row in [
        scorer(1, "Kane", 36, Some(8)),
        scorer(2, "Guirassy", 28, Some(2)),
        scorer(3, "Openda", 24, Some(7)),
        scorer(4, "Undav", 18, None),
        scorer(5, "Boniface", 24, Some(9)),
    ] {
        dataset::upsert_scorer(&conn, &row).expect("scorer");
    }

    let top = dataset::load_top_scorers(&conn, "2023", 4).expect("load scorers");
    let names: Vec<&str> = top.iter().map(|s| s.player_name.as_str()).collect();
    assert_eq!(names, vec!["Kane", "Guirassy", "Boniface", "Openda"]);
}

#[test]
fn import_runs_are_recorded() {
    let conn = open_in_memory().expect("in-memory db");
    let counts = ImportCounts {
        teams: 18,
        matches: 306,
        standings: 18,
        scorers: 10,
    };
    let run_id = dataset::record_import_run(
        &conn,
        "2023",
        "2024-05-19T00:00:00Z",
        &counts,
        &["scorers.json: missing scorers array".to_string()],
    )
    .expect("record run");
    let (matches, errors): (i64, String) = conn
        .query_row(
            "SELECT matches, errors_json FROM import_runs WHERE run_id = ?1",
            params![run_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("read run");
    assert_eq!(matches, 306);
    assert!(errors.contains("missing scorers array"));
}

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn run_rows(conn: &rusqlite::Connection) -> Vec<(i64, String)> {
    let mut stmt = conn
        .prepare("SELECT matches, errors_json FROM import_runs ORDER BY run_id")
        .expect("prepare");
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("query runs")
        .collect::<Result<Vec<_>, _>>()
        .expect("read runs")
}

#[test]
fn import_files_loads_every_payload() {
    let mut conn = open_in_memory().expect("in-memory db");
    let sources = ImportSources {
        matches: Some(fixture_path("football_data_matches.json")),
        standings: Some(fixture_path("football_data_standings.json")),
        scorers: Some(fixture_path("football_data_scorers.json")),
    };
    let run = import_files(&mut conn, &sources, None).expect("import run");
    assert_eq!(run.season, "2023");
    assert_eq!(run.counts.matches, 6);
    assert_eq!(run.counts.standings, 4);
    assert_eq!(run.counts.scorers, 3);
    assert!(run.errors.iter().all(|e| e.contains("skipped")));

    let runs = run_rows(&conn);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, 6);
}

#[test]
fn unreadable_file_is_recorded_and_others_still_import() {
    let mut conn = open_in_memory().expect("in-memory db");
    let sources = ImportSources {
        matches: Some(fixture_path("football_data_matches.json")),
        standings: Some(fixture_path("does_not_exist.json")),
        scorers: Some(fixture_path("football_data_scorers.json")),
    };
    let run = import_files(&mut conn, &sources, None).expect("run still recorded");
    assert_eq!(run.counts.matches, 6);
    assert_eq!(run.counts.standings, 0);
    assert_eq!(run.counts.scorers, 3);
    assert!(run.errors.iter().any(|e| e.contains("does_not_exist.json")));

    let runs = run_rows(&conn);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, 6);
    assert!(runs[0].1.contains("does_not_exist.json"));

    let stored: i64 = conn
        .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))
        .expect("count matches");
    assert_eq!(stored, 6);
    assert!(dataset::load_standings(&conn, "2023").expect("standings").is_empty());
}

#[test]
fn malformed_payload_is_rolled_back_and_recorded() {
    let dir = std::env::temp_dir().join(format!("bundesliga_import_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let bad = dir.join("matches.json");
    std::fs::write(&bad, r#"{"competition":{"code":"BL1"}}"#).expect("write payload");

    let mut conn = open_in_memory().expect("in-memory db");
    let sources = ImportSources {
        matches: Some(bad.clone()),
        ..ImportSources::default()
    };
    let run = import_files(&mut conn, &sources, Some("2023")).expect("run still recorded");
    assert_eq!(run.counts, ImportCounts::default());
    assert_eq!(run.errors.len(), 1);
    assert!(run.errors[0].contains("missing matches array"));
    assert_eq!(run_rows(&conn).len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}
