use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::dataset::StoredMatch;
use crate::standings::{Match, Outcome, TeamId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team: TeamId,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    /// Finished matches whose outcome was missing or unrecognised.
    pub unresolved: u32,
    pub home_played: u32,
    pub home_won: u32,
    pub away_played: u32,
    pub away_won: u32,
}

impl TeamRecord {
    pub fn win_pct(&self) -> f64 {
        pct(self.won, self.played)
    }

    pub fn home_win_pct(&self) -> f64 {
        pct(self.home_won, self.home_played)
    }

    pub fn away_win_pct(&self) -> f64 {
        pct(self.away_won, self.away_played)
    }

    pub fn points(&self) -> u32 {
        self.won * crate::standings::WIN_POINTS + self.drawn * crate::standings::DRAW_POINTS
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub finished_matches: u32,
    pub matchdays: u32,
    pub home_wins: u32,
    pub away_wins: u32,
    pub draws: u32,
    pub unresolved: u32,
    pub total_goals: Option<u32>,
}

impl SeasonSummary {
    pub fn home_win_pct(&self) -> f64 {
        pct(self.home_wins, self.finished_matches)
    }

    pub fn away_win_pct(&self) -> f64 {
        pct(self.away_wins, self.finished_matches)
    }

    pub fn draw_pct(&self) -> f64 {
        pct(self.draws, self.finished_matches)
    }

    pub fn goals_per_match(&self) -> Option<f64> {
        let goals = self.total_goals?;
        if self.finished_matches == 0 {
            return None;
        }
        Some(goals as f64 / self.finished_matches as f64)
    }
}

/// Win/draw/loss records for every team with a finished match, sorted by team id.
pub fn team_records(matches: &[Match]) -> Vec<TeamRecord> {
    let mut records: HashMap<TeamId, TeamRecord> = HashMap::new();
    for m in matches.iter().filter(|m| m.is_finished()) {
        {
            let home = records.entry(m.home_team).or_insert_with(|| TeamRecord {
                team: m.home_team,
                ..TeamRecord::default()
            });
            home.played += 1;
            home.home_played += 1;
            match m.outcome {
                Some(Outcome::HomeWin) => {
                    home.won += 1;
                    home.home_won += 1;
                }
                Some(Outcome::AwayWin) => home.lost += 1,
                Some(Outcome::Draw) => home.drawn += 1,
                None => home.unresolved += 1,
            }
        }

        let away = records.entry(m.away_team).or_insert_with(|| TeamRecord {
            team: m.away_team,
            ..TeamRecord::default()
        });
        away.played += 1;
        away.away_played += 1;
        match m.outcome {
            Some(Outcome::AwayWin) => {
                away.won += 1;
                away.away_won += 1;
            }
            Some(Outcome::HomeWin) => away.lost += 1,
            Some(Outcome::Draw) => away.drawn += 1,
            None => away.unresolved += 1,
        }
    }

    let mut out: Vec<TeamRecord> = records.into_values().collect();
    out.sort_by_key(|r| r.team);
    out
}

pub fn season_summary(matches: &[Match]) -> SeasonSummary {
    let mut summary = SeasonSummary::default();
    let mut matchdays = BTreeSet::new();
    for m in matches.iter().filter(|m| m.is_finished()) {
        summary.finished_matches += 1;
        matchdays.insert(m.matchday);
        match m.outcome {
            Some(Outcome::HomeWin) => summary.home_wins += 1,
            Some(Outcome::AwayWin) => summary.away_wins += 1,
            Some(Outcome::Draw) => summary.draws += 1,
            None => summary.unresolved += 1,
        }
    }
    summary.matchdays = matchdays.len() as u32;
    summary
}

/// Same as [`season_summary`] but also totals goals when every finished
/// match carries a full-time score.
pub fn season_summary_with_goals(stored: &[StoredMatch]) -> SeasonSummary {
    let matches: Vec<Match> = stored.iter().map(StoredMatch::as_match).collect();
    let mut summary = season_summary(&matches);

    let mut total = 0u32;
    let mut complete = true;
    for m in stored.iter().filter(|m| m.as_match().is_finished()) {
        let goals = match (m.home_goals, m.away_goals) {
            (Some(h), Some(a)) => u32::try_from(h)
                .ok()
                .zip(u32::try_from(a).ok())
                .and_then(|(h, a)| h.checked_add(a))
                .and_then(|sum| total.checked_add(sum)),
            _ => None,
        };
        match goals {
            Some(next) => total = next,
            None => {
                complete = false;
                break;
            }
        }
    }
    if complete && summary.finished_matches > 0 {
        summary.total_goals = Some(total);
    }
    summary
}

fn pct(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
