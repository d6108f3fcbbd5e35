use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::SelectionConfig;
use crate::dataset::{self, ScorerRow, StandingRow, StoredMatch};
use crate::export::{ChartSeries, chart_series};
use crate::league_table::{TableEntry, ranked_table};
use crate::memo::StandingsMemo;
use crate::metrics::{SeasonSummary, TeamRecord, season_summary_with_goals, team_records};
use crate::standings::{
    CumulativeStandingsRow, Match, Team, TeamId, carry_forward, latest_matchday,
    select_default_teams_with,
};

/// Everything the display layer needs for one season, ready to serialise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub season: String,
    pub latest_matchday: Option<u32>,
    pub default_selection: Vec<TeamId>,
    pub rows: Vec<CumulativeStandingsRow>,
    pub series: Vec<ChartSeries>,
    pub table: Vec<TableEntry>,
    pub records: Vec<TeamRecord>,
    pub summary: SeasonSummary,
    pub teams: Vec<Team>,
    pub standings: Vec<StandingRow>,
    pub scorers: Vec<ScorerRow>,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotInput {
    pub season: String,
    pub matches: Vec<StoredMatch>,
    pub teams: HashMap<TeamId, Team>,
    pub standings: Vec<StandingRow>,
    pub scorers: Vec<ScorerRow>,
}

pub struct Dashboard {
    selection: SelectionConfig,
    memo: StandingsMemo,
}

impl Dashboard {
    pub fn new(selection: SelectionConfig) -> Self {
        Self {
            selection,
            memo: StandingsMemo::default(),
        }
    }

    pub fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    pub fn snapshot(&self, input: SnapshotInput) -> DashboardSnapshot {
        let tie_break = self.selection.tie_break;
        let matches: Vec<Match> = input.matches.iter().map(StoredMatch::as_match).collect();
        let rows = self.memo.get_or_compute(&matches, tie_break);

        let default_selection = select_default_teams_with(&rows, self.selection.top_n, tie_break);
        let table = ranked_table(&rows, &input.teams, None, tie_break);
        let series_rows = if self.selection.carry_forward {
            carry_forward(&rows, tie_break)
        } else {
            rows.to_vec()
        };
        let series = chart_series(&series_rows, &input.teams, &default_selection);

        let mut teams: Vec<Team> = input.teams.into_values().collect();
        teams.sort_by_key(|t| t.id);

        tracing::debug!(
            season = %input.season,
            matches = matches.len(),
            rows = rows.len(),
            selected = default_selection.len(),
            "built dashboard snapshot"
        );

        DashboardSnapshot {
            season: input.season,
            latest_matchday: latest_matchday(&rows),
            default_selection,
            rows: rows.to_vec(),
            series,
            table,
            records: team_records(&matches),
            summary: season_summary_with_goals(&input.matches),
            teams,
            standings: input.standings,
            scorers: input.scorers,
        }
    }

    /// Reads one season from the store. `season = None` picks the newest stored season.
    pub fn load_input(&self, conn: &Connection, season: Option<&str>) -> Result<SnapshotInput> {
        let season = match season {
            Some(s) => s.to_string(),
            None => dataset::latest_season(conn)?
                .ok_or_else(|| anyhow!("no matches stored; run import_football_data first"))?,
        };
        let matches = dataset::load_finished_stored_matches(conn, &season)
            .with_context(|| format!("load finished matches for season {season}"))?;
        let teams = dataset::load_teams(conn).context("load teams")?;
        let standings = dataset::load_standings(conn, &season).context("load standings")?;
        let scorers = dataset::load_top_scorers(conn, &season, self.selection.scorers_limit)
            .context("load scorers")?;
        tracing::info!(
            season = %season,
            matches = matches.len(),
            teams = teams.len(),
            "loaded season"
        );
        Ok(SnapshotInput {
            season,
            matches,
            teams,
            standings,
            scorers,
        })
    }
}
