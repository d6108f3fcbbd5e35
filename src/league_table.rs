use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::standings::{CumulativeStandingsRow, Team, TeamId, TieBreak, latest_matchday};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub position: u32,
    pub team: TeamId,
    pub name: String,
    pub points: u32,
    /// Number of matchdays on which the team recorded points so far.
    pub matchdays_played: u32,
}

/// Ranked table at `matchday` (latest when `None`), built from cumulative rows.
/// Teams without a row on that matchday are left out, matching the rows.
pub fn ranked_table(
    rows: &[CumulativeStandingsRow],
    teams: &HashMap<TeamId, Team>,
    matchday: Option<u32>,
    tie_break: TieBreak,
) -> Vec<TableEntry> {
    let Some(matchday) = matchday.or_else(|| latest_matchday(rows)) else {
        return Vec::new();
    };

    let mut played: HashMap<TeamId, u32> = HashMap::new();
    for row in rows.iter().filter(|r| r.matchday <= matchday) {
        *played.entry(row.team).or_insert(0) += 1;
    }

    let mut at: Vec<&CumulativeStandingsRow> =
        rows.iter().filter(|r| r.matchday == matchday).collect();
    at.sort_by(|a, b| {
        b.cumulative_points
            .cmp(&a.cumulative_points)
            .then_with(|| tie_break.compare(a, b))
    });

    at.into_iter()
        .enumerate()
        .map(|(idx, row)| TableEntry {
            position: idx as u32 + 1,
            team: row.team,
            name: team_name(teams, row.team),
            points: row.cumulative_points,
            matchdays_played: played.get(&row.team).copied().unwrap_or(0),
        })
        .collect()
}

pub fn team_name(teams: &HashMap<TeamId, Team>, id: TeamId) -> String {
    teams
        .get(&id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| format!("Team {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(matchday: u32, team: TeamId, cumulative_points: u32) -> CumulativeStandingsRow {
        CumulativeStandingsRow {
            matchday,
            team,
            cumulative_points,
        }
    }

    #[test]
    fn table_at_explicit_matchday() {
        let rows = vec![row(1, 2, 3), row(1, 1, 3), row(1, 3, 0), row(2, 1, 6)];
        let teams = HashMap::from([(
            1,
            Team {
                id: 1,
                name: "Union Berlin".to_string(),
            },
        )]);

        let table = ranked_table(&rows, &teams, Some(1), TieBreak::TeamIdAscending);
        let order: Vec<(u32, TeamId)> = table.iter().map(|e| (e.position, e.team)).collect();
        assert_eq!(order, vec![(1, 1), (2, 2), (3, 3)]);
        assert_eq!(table[0].name, "Union Berlin");
        assert_eq!(table[1].name, "Team 2");

        let latest = ranked_table(&rows, &teams, None, TieBreak::TeamIdAscending);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].matchdays_played, 2);
    }

    #[test]
    fn empty_rows_give_empty_table() {
        assert!(ranked_table(&[], &HashMap::new(), None, TieBreak::FirstSeen).is_empty());
    }
}
