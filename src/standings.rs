use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

pub type TeamId = u32;

pub const DEFAULT_TOP_N: usize = 4;
pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
}

impl Outcome {
    /// Accepts both the dashboard spelling (`HOME_WIN`) and football-data's
    /// `winner` spelling (`HOME_TEAM`). Anything else is unrecognised.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HOME_WIN" | "HOME_TEAM" | "H" => Some(Outcome::HomeWin),
            "AWAY_WIN" | "AWAY_TEAM" | "A" => Some(Outcome::AwayWin),
            "DRAW" | "D" => Some(Outcome::Draw),
            _ => None,
        }
    }

    pub fn from_goals(home_goals: i32, away_goals: i32) -> Self {
        match home_goals.cmp(&away_goals) {
            Ordering::Greater => Outcome::HomeWin,
            Ordering::Less => Outcome::AwayWin,
            Ordering::Equal => Outcome::Draw,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::HomeWin => "HOME_WIN",
            Outcome::AwayWin => "AWAY_WIN",
            Outcome::Draw => "DRAW",
        }
    }

    /// (home points, away points).
    pub fn points(self) -> (u32, u32) {
        match self {
            Outcome::HomeWin => (WIN_POINTS, 0),
            Outcome::AwayWin => (0, WIN_POINTS),
            Outcome::Draw => (DRAW_POINTS, DRAW_POINTS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Timed,
    InPlay,
    Paused,
    Finished,
    Postponed,
    Suspended,
    Cancelled,
    Awarded,
    Unknown,
}

impl MatchStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => MatchStatus::Scheduled,
            "TIMED" => MatchStatus::Timed,
            "IN_PLAY" | "LIVE" => MatchStatus::InPlay,
            "PAUSED" => MatchStatus::Paused,
            "FINISHED" => MatchStatus::Finished,
            "POSTPONED" => MatchStatus::Postponed,
            "SUSPENDED" => MatchStatus::Suspended,
            "CANCELLED" | "CANCELED" => MatchStatus::Cancelled,
            "AWARDED" => MatchStatus::Awarded,
            _ => MatchStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::Timed => "TIMED",
            MatchStatus::InPlay => "IN_PLAY",
            MatchStatus::Paused => "PAUSED",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Postponed => "POSTPONED",
            MatchStatus::Suspended => "SUSPENDED",
            MatchStatus::Cancelled => "CANCELLED",
            MatchStatus::Awarded => "AWARDED",
            MatchStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub id: u64,
    pub matchday: u32,
    pub home_team: TeamId,
    pub away_team: TeamId,
    /// `None` covers both a missing and an unrecognised outcome value.
    pub outcome: Option<Outcome>,
    pub status: MatchStatus,
}

impl Match {
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Home entry first. Unknown outcomes score nothing for either side.
    pub fn points_entries(&self) -> [MatchPointsEntry; 2] {
        let (home, away) = self.outcome.map(Outcome::points).unwrap_or((0, 0));
        [
            MatchPointsEntry {
                matchday: self.matchday,
                team: self.home_team,
                points: home,
            },
            MatchPointsEntry {
                matchday: self.matchday,
                team: self.away_team,
                points: away,
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPointsEntry {
    pub matchday: u32,
    pub team: TeamId,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CumulativeStandingsRow {
    pub matchday: u32,
    pub team: TeamId,
    pub cumulative_points: u32,
}

/// Secondary ordering applied when two teams hold the same points on the
/// same matchday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    TeamIdAscending,
    /// Keep the order in which teams first appear in the input.
    FirstSeen,
}

impl TieBreak {
    pub fn compare(self, a: &CumulativeStandingsRow, b: &CumulativeStandingsRow) -> Ordering {
        match self {
            TieBreak::TeamIdAscending => a.team.cmp(&b.team),
            TieBreak::FirstSeen => Ordering::Equal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TieBreak::TeamIdAscending => "team_id_ascending",
            TieBreak::FirstSeen => "first_seen",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "team_id_ascending" | "team_id" => Some(TieBreak::TeamIdAscending),
            "first_seen" | "insertion" => Some(TieBreak::FirstSeen),
            _ => None,
        }
    }
}

/// Accepts the same spellings as [`TieBreak::parse`], so config files, env
/// vars and CLI flags agree.
impl<'de> Deserialize<'de> for TieBreak {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        TieBreak::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown tie_break `{raw}`; expected team_id_ascending or first_seen"
            ))
        })
    }
}

/// Two entries per finished match, in input order. Other statuses are skipped.
pub fn match_points(matches: &[Match]) -> Vec<MatchPointsEntry> {
    matches
        .iter()
        .filter(|m| m.is_finished())
        .flat_map(Match::points_entries)
        .collect()
}

pub fn compute_cumulative_standings(matches: &[Match]) -> Vec<CumulativeStandingsRow> {
    compute_cumulative_standings_with(matches, TieBreak::default())
}

pub fn compute_cumulative_standings_with(
    matches: &[Match],
    tie_break: TieBreak,
) -> Vec<CumulativeStandingsRow> {
    compute_cumulative_standings_by(matches, |a, b| tie_break.compare(a, b))
}

/// Running points per team, one row per (team, matchday the team has an
/// entry for). Sorted by matchday ascending, points descending, then
/// `tie_break`. Rows that still compare equal keep first-seen team order.
pub fn compute_cumulative_standings_by<F>(
    matches: &[Match],
    mut tie_break: F,
) -> Vec<CumulativeStandingsRow>
where
    F: FnMut(&CumulativeStandingsRow, &CumulativeStandingsRow) -> Ordering,
{
    let mut order: Vec<TeamId> = Vec::new();
    let mut per_team: HashMap<TeamId, BTreeMap<u32, u32>> = HashMap::new();
    for entry in match_points(matches) {
        let by_matchday = per_team.entry(entry.team).or_insert_with(|| {
            order.push(entry.team);
            BTreeMap::new()
        });
        *by_matchday.entry(entry.matchday).or_insert(0) += entry.points;
    }

    let mut rows = Vec::with_capacity(per_team.values().map(BTreeMap::len).sum());
    for team in &order {
        let Some(by_matchday) = per_team.get(team) else {
            continue;
        };
        let mut running = 0u32;
        for (matchday, points) in by_matchday {
            running = running.saturating_add(*points);
            rows.push(CumulativeStandingsRow {
                matchday: *matchday,
                team: *team,
                cumulative_points: running,
            });
        }
    }

    rows.sort_by(|a, b| {
        a.matchday
            .cmp(&b.matchday)
            .then_with(|| b.cumulative_points.cmp(&a.cumulative_points))
            .then_with(|| tie_break(a, b))
    });
    rows
}

pub fn latest_matchday(rows: &[CumulativeStandingsRow]) -> Option<u32> {
    rows.iter().map(|r| r.matchday).max()
}

pub fn select_default_teams(rows: &[CumulativeStandingsRow], n: usize) -> Vec<TeamId> {
    select_default_teams_with(rows, n, TieBreak::default())
}

pub fn select_default_teams_with(
    rows: &[CumulativeStandingsRow],
    n: usize,
    tie_break: TieBreak,
) -> Vec<TeamId> {
    select_default_teams_by(rows, n, |a, b| tie_break.compare(a, b))
}

/// Top `n` teams at the latest matchday present in `rows`, best first.
pub fn select_default_teams_by<F>(
    rows: &[CumulativeStandingsRow],
    n: usize,
    mut tie_break: F,
) -> Vec<TeamId>
where
    F: FnMut(&CumulativeStandingsRow, &CumulativeStandingsRow) -> Ordering,
{
    let Some(latest) = latest_matchday(rows) else {
        return Vec::new();
    };
    let mut at_latest: Vec<&CumulativeStandingsRow> =
        rows.iter().filter(|r| r.matchday == latest).collect();
    at_latest.sort_by(|a, b| {
        b.cumulative_points
            .cmp(&a.cumulative_points)
            .then_with(|| tie_break(a, b))
    });
    at_latest.into_iter().take(n).map(|r| r.team).collect()
}

/// Extends `rows` so that every team appears on every later matchday present
/// in the input, holding its last known total. Used for chart lines only.
pub fn carry_forward(
    rows: &[CumulativeStandingsRow],
    tie_break: TieBreak,
) -> Vec<CumulativeStandingsRow> {
    let matchdays: BTreeSet<u32> = rows.iter().map(|r| r.matchday).collect();
    let mut order: Vec<TeamId> = Vec::new();
    let mut per_team: HashMap<TeamId, BTreeMap<u32, u32>> = HashMap::new();
    for row in rows {
        per_team
            .entry(row.team)
            .or_insert_with(|| {
                order.push(row.team);
                BTreeMap::new()
            })
            .insert(row.matchday, row.cumulative_points);
    }

    let mut out = Vec::with_capacity(order.len() * matchdays.len());
    for team in &order {
        let Some(known) = per_team.get(team) else {
            continue;
        };
        let mut last: Option<u32> = None;
        for matchday in &matchdays {
            if let Some(points) = known.get(matchday) {
                last = Some(*points);
            }
            if let Some(points) = last {
                out.push(CumulativeStandingsRow {
                    matchday: *matchday,
                    team: *team,
                    cumulative_points: points,
                });
            }
        }
    }

    out.sort_by(|a, b| {
        a.matchday
            .cmp(&b.matchday)
            .then_with(|| b.cumulative_points.cmp(&a.cumulative_points))
            .then_with(|| tie_break.compare(a, b))
    });
    out
}
