use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use bundesliga_dashboard::config::SelectionConfig;
use bundesliga_dashboard::dashboard::{Dashboard, DashboardSnapshot};
use bundesliga_dashboard::dataset;
use bundesliga_dashboard::export;
use bundesliga_dashboard::import;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn seeded_db() -> Connection {
    let conn = dataset::open_in_memory().expect("in-memory db");
    let matches = import::parse_matches_json(&read_fixture("football_data_matches.json"), None)
        .expect("matches parse");
    for team in &matches.teams {
        dataset::upsert_team(&conn, team).expect("team");
    }
    for m in &matches.matches {
        dataset::upsert_match(&conn, m).expect("match");
    }
    let standings =
        import::parse_standings_json(&read_fixture("football_data_standings.json"), None)
            .expect("standings parse");
    for row in &standings.rows {
        dataset::upsert_standing(&conn, row).expect("standing");
    }
    let scorers = import::parse_scorers_json(&read_fixture("football_data_scorers.json"), None)
        .expect("scorers parse");
    for row in &scorers.rows {
        dataset::upsert_scorer(&conn, row).expect("scorer");
    }
    conn
}

fn snapshot_with(selection: SelectionConfig) -> DashboardSnapshot {
    let conn = seeded_db();
    let dashboard = Dashboard::new(selection);
    let input = dashboard.load_input(&conn, None).expect("season loads");
    dashboard.snapshot(input)
}

fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("bundesliga_dashboard_{}_{name}", std::process::id()));
    path
}

#[test]
fn snapshot_from_imported_season() {
    let snapshot = snapshot_with(SelectionConfig::default());
    assert_eq!(snapshot.season, "2023");
    assert_eq!(snapshot.latest_matchday, Some(3));

    // Only Dortmund and Stuttgart played on matchday 3.
    assert_eq!(snapshot.default_selection, vec![4, 10]);
    assert_eq!(snapshot.table.len(), 2);
    assert_eq!(snapshot.table[0].name, "Borussia Dortmund");
    assert_eq!(snapshot.table[0].points, 5);
    assert_eq!(snapshot.table[0].matchdays_played, 3);

    let md2: Vec<(u32, u32)> = snapshot
        .rows
        .iter()
        .filter(|r| r.matchday == 2)
        .map(|r| (r.team, r.cumulative_points))
        .collect();
    assert_eq!(md2, vec![(3, 4), (5, 4), (4, 2), (10, 0)]);

    assert_eq!(snapshot.summary.finished_matches, 5);
    assert_eq!(snapshot.summary.home_wins, 2);
    assert_eq!(snapshot.summary.draws, 2);
    assert_eq!(snapshot.summary.total_goals, Some(12));
    assert_eq!(snapshot.standings.len(), 4);
    assert_eq!(snapshot.scorers[0].player_name, "Harry Kane");
    assert_eq!(snapshot.scorers[0].team_name, "FC Bayern München");
}

#[test]
fn series_put_selected_teams_first() {
    let snapshot = snapshot_with(SelectionConfig::default());
    assert_eq!(snapshot.series.len(), 4);
    assert_eq!(snapshot.series[0].team, 4);
    assert!(snapshot.series[0].selected);
    assert_eq!(snapshot.series[0].points, vec![(1, 1), (2, 2), (3, 5)]);
    assert!(!snapshot.series[2].selected);

    let bayern = snapshot
        .series
        .iter()
        .find(|s| s.team == 5)
        .expect("bayern series");
    assert_eq!(bayern.points, vec![(1, 3), (2, 4)]);
}

#[test]
fn carry_forward_extends_chart_lines_only() {
    let snapshot = snapshot_with(SelectionConfig {
        carry_forward: true,
        ..SelectionConfig::default()
    });
    let bayern = snapshot
        .series
        .iter()
        .find(|s| s.team == 5)
        .expect("bayern series");
    assert_eq!(bayern.points, vec![(1, 3), (2, 4), (3, 4)]);
    assert!(!snapshot.rows.iter().any(|r| r.team == 5 && r.matchday == 3));
}

#[test]
fn top_n_follows_selection_config() {
    let snapshot = snapshot_with(SelectionConfig {
        top_n: 1,
        ..SelectionConfig::default()
    });
    assert_eq!(snapshot.default_selection, vec![4]);
}

#[test]
fn exports_workbook_and_json() {
    let snapshot = snapshot_with(SelectionConfig::default());

    let xlsx = temp_path("export.xlsx");
    let report = export::write_workbook(&xlsx, &snapshot).expect("workbook written");
    assert_eq!(report.rows, snapshot.rows.len());
    assert_eq!(report.scorers, 3);
    assert!(fs::metadata(&xlsx).map(|m| m.len() > 0).unwrap_or(false));
    let _ = fs::remove_file(&xlsx);

    let json = temp_path("snapshot.json");
    export::write_json(&json, &snapshot).expect("json written");
    let raw = fs::read_to_string(&json).expect("json readable");
    let back: DashboardSnapshot = serde_json::from_str(&raw).expect("json parses");
    assert_eq!(back.default_selection, snapshot.default_selection);
    assert_eq!(back.rows, snapshot.rows);
    let _ = fs::remove_file(&json);
}

#[test]
fn missing_season_is_an_error() {
    let conn = dataset::open_in_memory().expect("in-memory db");
    let dashboard = Dashboard::new(SelectionConfig::default());
    assert!(dashboard.load_input(&conn, None).is_err());
}
