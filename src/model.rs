use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    Upcoming,
    Toss,
    InProgress,
    Break,
    Complete,
}

/// What the scoreboard groups a match under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayStatus {
    Live,
    Completed,
    Upcoming,
}

/// Lifecycle phase used by the worker to pick which checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Upcoming,
    InProgress,
    Complete,
}

impl MatchState {
    pub fn from_upstream(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return MatchState::Upcoming;
        }
        if lowered.contains("complete")
            || lowered.contains("result")
            || lowered.contains("abandon")
            || lowered.contains("no result")
            || lowered.contains("cancel")
        {
            MatchState::Complete
        } else if lowered == "toss" {
            MatchState::Toss
        } else if lowered.contains("break")
            || lowered.contains("stumps")
            || lowered.contains("lunch")
            || lowered.contains("tea")
            || lowered.contains("drink")
            || lowered.contains("rain")
            || lowered.contains("delay")
        {
            MatchState::Break
        } else if lowered.contains("progress") || lowered == "live" {
            MatchState::InProgress
        } else {
            MatchState::Upcoming
        }
    }

    pub fn display_status(self) -> DisplayStatus {
        match self {
            MatchState::Upcoming => DisplayStatus::Upcoming,
            MatchState::Toss | MatchState::InProgress | MatchState::Break => DisplayStatus::Live,
            MatchState::Complete => DisplayStatus::Completed,
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            MatchState::Upcoming | MatchState::Toss => Phase::Upcoming,
            MatchState::InProgress | MatchState::Break => Phase::InProgress,
            MatchState::Complete => Phase::Complete,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchState::Upcoming => "Upcoming",
            MatchState::Toss => "Toss",
            MatchState::InProgress => "Live",
            MatchState::Break => "Break",
            MatchState::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchFormat {
    T20,
    Odi,
    Test,
    T10,
    Other,
}

impl MatchFormat {
    pub fn from_upstream(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "t20" | "t20i" => MatchFormat::T20,
            "odi" | "lista" | "list a" => MatchFormat::Odi,
            "test" | "first-class" => MatchFormat::Test,
            "t10" => MatchFormat::T10,
            _ => MatchFormat::Other,
        }
    }

    /// Overs per innings, `None` for formats without an overs limit.
    pub fn max_overs(self) -> Option<u32> {
        match self {
            MatchFormat::T20 => Some(20),
            MatchFormat::Odi => Some(50),
            MatchFormat::T10 => Some(10),
            MatchFormat::Test | MatchFormat::Other => None,
        }
    }
}

/// Overs in base-6 notation: `18.2` is 18 completed overs and 2 balls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Overs {
    completed: u32,
    balls: u8,
}

impl Overs {
    pub fn new(completed: u32, balls: u32) -> Self {
        Self {
            completed: completed + balls / 6,
            balls: (balls % 6) as u8,
        }
    }

    pub fn from_decimal(raw: f64) -> Self {
        if !raw.is_finite() || raw <= 0.0 {
            return Self::default();
        }
        let tenths = (raw * 10.0).round() as u64;
        let completed = (tenths / 10) as u32;
        let balls = (tenths % 10) as u32;
        Self::new(completed, balls)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.split_once('.') {
            Some((whole, balls)) => {
                let whole = whole.parse::<u32>().ok()?;
                let balls = if balls.is_empty() {
                    0
                } else {
                    balls.parse::<u32>().ok()?
                };
                Some(Self::new(whole, balls))
            }
            None => trimmed.parse::<u32>().ok().map(|whole| Self::new(whole, 0)),
        }
    }

    pub fn completed(self) -> u32 {
        self.completed
    }

    pub fn balls(self) -> u8 {
        self.balls
    }

    pub fn total_balls(self) -> u32 {
        self.completed * 6 + self.balls as u32
    }

    /// Overs as a true fraction (18.3 -> 18.5), for rate arithmetic.
    pub fn as_fraction(self) -> f64 {
        self.total_balls() as f64 / 6.0
    }
}

impl fmt::Display for Overs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.balls == 0 {
            write!(f, "{}", self.completed)
        } else {
            write!(f, "{}.{}", self.completed, self.balls)
        }
    }
}

/// Formats an upstream decimal overs value, carrying a sixth ball into the next over.
pub fn format_overs(raw: f64) -> String {
    Overs::from_decimal(raw).to_string()
}

pub fn run_rate(runs: u32, overs: Overs) -> f64 {
    let fraction = overs.as_fraction();
    if fraction <= 0.0 {
        return 0.0;
    }
    let rate = runs as f64 / fraction;
    (rate * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: u64,
    pub name: String,
    pub short_name: String,
    pub image_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InningsScore {
    pub runs: u32,
    pub wickets: u32,
    pub overs: Overs,
}

impl fmt::Display for InningsScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} ov)", self.runs, self.wickets, self.overs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: String,
    pub series: String,
    pub description: String,
    pub format: MatchFormat,
    pub state: MatchState,
    pub status_text: String,
    pub team1: TeamRef,
    pub team2: TeamRef,
    pub team1_score: Option<InningsScore>,
    pub team2_score: Option<InningsScore>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl MatchSnapshot {
    pub fn team1_runs(&self) -> u32 {
        self.team1_score.map(|s| s.runs).unwrap_or(0)
    }

    pub fn team2_runs(&self) -> u32 {
        self.team2_score.map(|s| s.runs).unwrap_or(0)
    }

    pub fn display_status(&self) -> DisplayStatus {
        self.state.display_status()
    }

    pub fn title(&self) -> String {
        let home = if self.team1.short_name.is_empty() {
            &self.team1.name
        } else {
            &self.team1.short_name
        };
        let away = if self.team2.short_name.is_empty() {
            &self.team2.name
        } else {
            &self.team2.short_name
        };
        format!("{home} v {away}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: u64,
    pub name: String,
    pub image_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterLine {
    pub player: PlayerRef,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: f64,
    pub is_captain: bool,
    pub is_keeper: bool,
    pub dismissal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlerLine {
    pub player: PlayerRef,
    pub overs: Overs,
    pub maidens: u32,
    pub runs: u32,
    pub wickets: u32,
    pub economy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerplayBlock {
    pub label: String,
    pub to_over: u32,
    pub runs: u32,
    pub wickets: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Innings {
    pub number: u32,
    pub batting_team: TeamRef,
    pub bowling_team: TeamRef,
    pub runs: u32,
    pub wickets: u32,
    pub overs: Overs,
    pub batters: Vec<BatterLine>,
    pub bowlers: Vec<BowlerLine>,
    pub powerplays: Vec<PowerplayBlock>,
}

impl Innings {
    pub fn score(&self) -> InningsScore {
        InningsScore {
            runs: self.runs,
            wickets: self.wickets,
            overs: self.overs,
        }
    }

    pub fn captain(&self) -> Option<&PlayerRef> {
        self.batters
            .iter()
            .find(|b| b.is_captain)
            .map(|b| &b.player)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toss {
    pub winner_id: Option<u64>,
    pub winner_name: String,
    pub decision: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub match_id: String,
    pub state: MatchState,
    pub status_text: String,
    pub format: MatchFormat,
    pub innings: Vec<Innings>,
    pub toss: Option<Toss>,
    pub players_of_match: Vec<PlayerRef>,
}

impl Scorecard {
    pub fn innings(&self, number: u32) -> Option<&Innings> {
        self.innings.iter().find(|inn| inn.number == number)
    }

    pub fn latest_score_for(&self, team_id: u64) -> Option<InningsScore> {
        self.innings
            .iter()
            .filter(|inn| inn.batting_team.id == team_id)
            .max_by_key(|inn| inn.number)
            .map(Innings::score)
    }

    /// Every player listed on either side of any innings, de-duplicated by id.
    pub fn players(&self) -> Vec<PlayerRef> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for inn in &self.innings {
            let batters = inn.batters.iter().map(|b| &b.player);
            let bowlers = inn.bowlers.iter().map(|b| &b.player);
            for player in batters.chain(bowlers) {
                if seen.insert(player.id) {
                    out.push(player.clone());
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadPlayer {
    pub player: PlayerRef,
    pub role: Option<String>,
    pub captain: bool,
    pub keeper: bool,
    pub substitute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSquad {
    pub team: TeamRef,
    pub players: Vec<SquadPlayer>,
}

impl TeamSquad {
    pub fn playing_xi(&self) -> Vec<&SquadPlayer> {
        self.players.iter().filter(|p| !p.substitute).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub match_id: String,
    pub state: MatchState,
    pub format: MatchFormat,
    pub toss: Option<Toss>,
    pub teams: Vec<TeamSquad>,
    pub venue: Option<String>,
    pub start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: u64,
    pub name: String,
    pub role: Option<String>,
    pub team: Option<String>,
    pub image_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    Live,
    Recent,
    Upcoming,
}

impl ListingKind {
    pub fn path(self) -> &'static str {
        match self {
            ListingKind::Live => "matches/v1/live",
            ListingKind::Recent => "matches/v1/recent",
            ListingKind::Upcoming => "matches/v1/upcoming",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixth_ball_carries_into_next_over() {
        assert_eq!(format_overs(5.6), "6");
        assert_eq!(format_overs(18.2), "18.2");
        assert_eq!(format_overs(20.0), "20");
        assert_eq!(Overs::parse("19.6"), Some(Overs::new(20, 0)));
    }

    #[test]
    fn run_rate_uses_true_overs() {
        assert_eq!(run_rate(54, Overs::new(6, 0)), 9.0);
        assert_eq!(run_rate(37, Overs::new(4, 3)), 8.22);
        assert_eq!(run_rate(10, Overs::default()), 0.0);
    }

    #[test]
    fn upstream_states_collapse() {
        assert_eq!(MatchState::from_upstream("In Progress"), MatchState::InProgress);
        assert_eq!(MatchState::from_upstream("Innings Break"), MatchState::Break);
        assert_eq!(MatchState::from_upstream("Toss"), MatchState::Toss);
        assert_eq!(MatchState::from_upstream("Complete"), MatchState::Complete);
        assert_eq!(MatchState::from_upstream("Preview"), MatchState::Upcoming);
        assert_eq!(MatchState::Toss.display_status(), DisplayStatus::Live);
        assert_eq!(MatchState::Toss.phase(), Phase::Upcoming);
        assert_eq!(MatchState::Break.phase(), Phase::InProgress);
    }
}
