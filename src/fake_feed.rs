use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cricket_api::{ApiError, MatchApi};
use crate::model::{
    BatterLine, BowlerLine, Innings, InningsScore, ListingKind, MatchFormat, MatchInfo,
    MatchSnapshot, MatchState, Overs, PlayerProfile, PlayerRef, PowerplayBlock, Scorecard,
    SquadPlayer, TeamRef, TeamSquad, Toss,
};

pub const LIVE_MATCH_ID: &str = "sim-1001";
pub const UPCOMING_MATCH_ID: &str = "sim-1002";
pub const FINISHED_MATCH_ID: &str = "sim-0999";

const BALLS_PER_INNINGS: u32 = 120;
const PRE_START_POLLS: u32 = 2;
const STALE_CHANCE: f64 = 0.2;

const HOME_NAMES: [&str; 11] = [
    "Rohan Mehta", "Arjun Rao", "Vikram Singh", "Karan Patel", "Dev Sharma", "Nikhil Iyer",
    "Sameer Khan", "Aditya Nair", "Rahul Das", "Manish Gupta", "Yash Verma",
];
const AWAY_NAMES: [&str; 11] = [
    "Liam Carter", "Noah Walsh", "Ethan Brooks", "Mason Reid", "Lucas Hart", "Oliver Grant",
    "Jack Turner", "Henry Cole", "Samuel Price", "Owen Fraser", "Leo Barnes",
];

#[derive(Debug, Clone)]
struct SimBatter {
    player: PlayerRef,
    runs: u32,
    balls: u32,
    fours: u32,
    sixes: u32,
    out: Option<String>,
}

#[derive(Debug, Clone)]
struct SimBowler {
    player: PlayerRef,
    balls: u32,
    maidens: u32,
    runs: u32,
    wickets: u32,
}

#[derive(Debug, Clone)]
struct SimInnings {
    number: u32,
    batting: usize,
    runs: u32,
    wickets: u32,
    balls: u32,
    batters: Vec<SimBatter>,
    bowlers: Vec<SimBowler>,
    striker: usize,
    non_striker: usize,
    next_in: usize,
    pp_runs: u32,
    pp_wickets: u32,
}

struct SimState {
    rng: StdRng,
    polls: u32,
    balls_per_poll: u32,
    stale: bool,
    teams: [TeamRef; 2],
    squads: [Vec<PlayerRef>; 2],
    innings: Vec<SimInnings>,
    state: MatchState,
    status: String,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    upcoming_start: DateTime<Utc>,
    last_listing: Option<MatchSnapshot>,
}

/// Deterministic stand-in for the upstream API: one scripted T20 that advances a
/// few balls per poll, one upcoming fixture and one finished match. Listings are
/// sometimes served stale to exercise reconciliation.
pub struct SimulatedApi {
    state: Mutex<SimState>,
}

impl SimulatedApi {
    pub fn new(seed: u64) -> Self {
        Self::with_pace(seed, 6, true)
    }

    /// `balls_per_poll` balls are bowled on each advancing call; `stale` enables
    /// out-of-order live listings.
    pub fn with_pace(seed: u64, balls_per_poll: u32, stale: bool) -> Self {
        let now = Utc::now();
        let teams = [team(1, "Mumbai Mariners", "MUM"), team(2, "London Lions", "LON")];
        let squads = [squad(&teams[0], &HOME_NAMES), squad(&teams[1], &AWAY_NAMES)];
        Self {
            state: Mutex::new(SimState {
                rng: StdRng::seed_from_u64(seed),
                polls: 0,
                balls_per_poll: balls_per_poll.max(1),
                stale,
                teams,
                squads,
                innings: Vec::new(),
                state: MatchState::Toss,
                status: "Mumbai Mariners opt to bat".to_string(),
                start: now + ChronoDuration::minutes(5),
                end: None,
                upcoming_start: now + ChronoDuration::minutes(45),
                last_listing: None,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SimState>, ApiError> {
        self.state
            .lock()
            .map_err(|_| ApiError::Transport("simulation lock poisoned".to_string()))
    }

    /// Bowls `balls` deliveries immediately.
    pub fn advance(&self, balls: u32) {
        if let Ok(mut sim) = self.state.lock() {
            sim.start_if_due();
            for _ in 0..balls {
                if !sim.bowl() {
                    break;
                }
            }
        }
    }

    /// Plays the match to its result.
    pub fn finish(&self) {
        self.advance(2 * BALLS_PER_INNINGS + 1);
    }
}

impl SimState {
    fn poll(&mut self) {
        self.polls += 1;
        if self.polls <= PRE_START_POLLS {
            return;
        }
        self.start_if_due();
        for _ in 0..self.balls_per_poll {
            if !self.bowl() {
                break;
            }
        }
    }

    fn start_if_due(&mut self) {
        if self.state == MatchState::Toss {
            self.state = MatchState::InProgress;
            self.start = Utc::now();
            self.status = "Mumbai Mariners opt to bat".to_string();
            let innings = self.new_innings(1, 0);
            self.innings.push(innings);
        }
    }

    fn new_innings(&self, number: u32, batting: usize) -> SimInnings {
        let bowling = 1 - batting;
        SimInnings {
            number,
            batting,
            runs: 0,
            wickets: 0,
            balls: 0,
            batters: self.squads[batting]
                .iter()
                .take(2)
                .map(new_batter)
                .collect(),
            bowlers: self.squads[bowling]
                .iter()
                .rev()
                .take(5)
                .map(|p| SimBowler {
                    player: p.clone(),
                    balls: 0,
                    maidens: 0,
                    runs: 0,
                    wickets: 0,
                })
                .collect(),
            striker: 0,
            non_striker: 1,
            next_in: 2,
            pp_runs: 0,
            pp_wickets: 0,
        }
    }

    /// Bowls one delivery. Returns `false` once the match is over.
    fn bowl(&mut self) -> bool {
        if self.state != MatchState::InProgress {
            return false;
        }
        let target = self.innings.first().map(|inn| inn.runs + 1);
        let roll = self.rng.gen_range(0..100u32);
        let Some(inn) = self.innings.last_mut() else {
            return false;
        };

        let bowler_idx = (inn.balls / 6) as usize % inn.bowlers.len();
        let in_powerplay = inn.balls < 36;
        inn.balls += 1;
        inn.bowlers[bowler_idx].balls += 1;

        let outcome = match roll {
            0..=34 => Some(0),
            35..=64 => Some(1),
            65..=74 => Some(2),
            75..=76 => Some(3),
            77..=88 => Some(4),
            89..=94 => Some(6),
            _ => None,
        };

        match outcome {
            Some(runs) => {
                let batter = &mut inn.batters[inn.striker];
                batter.runs += runs;
                batter.balls += 1;
                if runs == 4 {
                    batter.fours += 1;
                }
                if runs == 6 {
                    batter.sixes += 1;
                }
                inn.runs += runs;
                inn.bowlers[bowler_idx].runs += runs;
                if in_powerplay {
                    inn.pp_runs += runs;
                }
                if runs % 2 == 1 {
                    std::mem::swap(&mut inn.striker, &mut inn.non_striker);
                }
            }
            None => {
                let bowler_name = inn.bowlers[bowler_idx].player.name.clone();
                let batter = &mut inn.batters[inn.striker];
                batter.balls += 1;
                batter.out = Some(format!("b {bowler_name}"));
                inn.wickets += 1;
                inn.bowlers[bowler_idx].wickets += 1;
                if in_powerplay {
                    inn.pp_wickets += 1;
                }
                if inn.wickets < 10 {
                    let next = self.squads[inn.batting][inn.next_in].clone();
                    inn.batters.push(new_batter(&next));
                    inn.striker = inn.batters.len() - 1;
                    inn.next_in += 1;
                }
            }
        }
        if inn.balls % 6 == 0 {
            std::mem::swap(&mut inn.striker, &mut inn.non_striker);
        }

        let chased = inn.number == 2 && target.is_some_and(|t| inn.runs >= t);
        let over = inn.wickets >= 10 || inn.balls >= BALLS_PER_INNINGS || chased;
        if !over {
            return true;
        }

        if inn.number == 1 {
            let batting = 1 - inn.batting;
            let next = self.new_innings(2, batting);
            self.innings.push(next);
            let first_runs = self.innings[0].runs;
            self.status = format!(
                "{} need {} runs",
                self.teams[batting].name,
                first_runs + 1
            );
            true
        } else {
            self.complete();
            false
        }
    }

    fn complete(&mut self) {
        let (first, second) = (&self.innings[0], &self.innings[1]);
        self.status = if second.runs > first.runs {
            format!(
                "{} won by {} wkts",
                self.teams[second.batting].name,
                10 - second.wickets
            )
        } else if second.runs == first.runs {
            "Match tied".to_string()
        } else {
            format!(
                "{} won by {} runs",
                self.teams[first.batting].name,
                first.runs - second.runs
            )
        };
        self.state = MatchState::Complete;
        self.end = Some(Utc::now());
    }

    fn live_snapshot(&self) -> MatchSnapshot {
        let score_for = |team_idx: usize| {
            self.innings
                .iter()
                .filter(|inn| inn.batting == team_idx)
                .last()
                .map(|inn| InningsScore {
                    runs: inn.runs,
                    wickets: inn.wickets,
                    overs: Overs::new(0, inn.balls),
                })
        };
        MatchSnapshot {
            match_id: LIVE_MATCH_ID.to_string(),
            series: "Simulated Premier League".to_string(),
            description: "Final".to_string(),
            format: MatchFormat::T20,
            state: self.state,
            status_text: self.status.clone(),
            team1: self.teams[0].clone(),
            team2: self.teams[1].clone(),
            team1_score: score_for(0),
            team2_score: score_for(1),
            start: Some(self.start),
            end: self.end,
        }
    }

    fn upcoming_snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            match_id: UPCOMING_MATCH_ID.to_string(),
            series: "Simulated Premier League".to_string(),
            description: "Exhibition".to_string(),
            format: MatchFormat::T20,
            state: MatchState::Upcoming,
            status_text: format!("Match starts at {}", self.upcoming_start.format("%H:%M UTC")),
            team1: self.teams[1].clone(),
            team2: self.teams[0].clone(),
            team1_score: None,
            team2_score: None,
            start: Some(self.upcoming_start),
            end: None,
        }
    }

    fn finished_snapshot(&self) -> MatchSnapshot {
        let start = self.start - ChronoDuration::hours(6);
        MatchSnapshot {
            match_id: FINISHED_MATCH_ID.to_string(),
            series: "Simulated Premier League".to_string(),
            description: "Semi-final".to_string(),
            format: MatchFormat::T20,
            state: MatchState::Complete,
            status_text: "London Lions won by 12 runs".to_string(),
            team1: self.teams[1].clone(),
            team2: self.teams[0].clone(),
            team1_score: Some(InningsScore {
                runs: 171,
                wickets: 6,
                overs: Overs::new(20, 0),
            }),
            team2_score: Some(InningsScore {
                runs: 159,
                wickets: 9,
                overs: Overs::new(20, 0),
            }),
            start: Some(start),
            end: Some(start + ChronoDuration::hours(3)),
        }
    }

    fn scorecard(&self) -> Scorecard {
        Scorecard {
            match_id: LIVE_MATCH_ID.to_string(),
            state: self.state,
            status_text: self.status.clone(),
            format: MatchFormat::T20,
            innings: self.innings.iter().map(|inn| self.to_innings(inn)).collect(),
            toss: Some(self.toss()),
            players_of_match: Vec::new(),
        }
    }

    fn to_innings(&self, inn: &SimInnings) -> Innings {
        let captain_id = self.squads[inn.batting].first().map(|p| p.id);
        Innings {
            number: inn.number,
            batting_team: self.teams[inn.batting].clone(),
            bowling_team: self.teams[1 - inn.batting].clone(),
            runs: inn.runs,
            wickets: inn.wickets,
            overs: Overs::new(0, inn.balls),
            batters: inn
                .batters
                .iter()
                .map(|b| BatterLine {
                    player: b.player.clone(),
                    runs: b.runs,
                    balls: b.balls,
                    fours: b.fours,
                    sixes: b.sixes,
                    strike_rate: if b.balls == 0 {
                        0.0
                    } else {
                        (b.runs as f64 * 10_000.0 / b.balls as f64).round() / 100.0
                    },
                    is_captain: Some(b.player.id) == captain_id,
                    is_keeper: false,
                    dismissal: b.out.clone(),
                })
                .collect(),
            bowlers: inn
                .bowlers
                .iter()
                .filter(|b| b.balls > 0)
                .map(|b| {
                    let overs = Overs::new(0, b.balls);
                    BowlerLine {
                        player: b.player.clone(),
                        overs,
                        maidens: b.maidens,
                        runs: b.runs,
                        wickets: b.wickets,
                        economy: crate::model::run_rate(b.runs, overs),
                    }
                })
                .collect(),
            powerplays: vec![PowerplayBlock {
                label: "mandatory".to_string(),
                to_over: 6,
                runs: inn.pp_runs,
                wickets: inn.pp_wickets,
            }],
        }
    }

    fn toss(&self) -> Toss {
        Toss {
            winner_id: Some(self.teams[0].id),
            winner_name: self.teams[0].name.clone(),
            decision: "Batting".to_string(),
        }
    }

    fn top_scorer(&self) -> Option<PlayerRef> {
        self.innings
            .iter()
            .flat_map(|inn| inn.batters.iter())
            .max_by_key(|b| (b.runs, std::cmp::Reverse(b.balls)))
            .map(|b| b.player.clone())
    }
}

fn team(id: u64, name: &str, short: &str) -> TeamRef {
    TeamRef {
        id,
        name: name.to_string(),
        short_name: short.to_string(),
        image_id: Some(770_000 + id),
    }
}

fn squad(team: &TeamRef, names: &[&str]) -> Vec<PlayerRef> {
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| PlayerRef {
            id: team.id * 100 + idx as u64 + 1,
            name: (*name).to_string(),
            image_id: None,
        })
        .collect()
}

fn new_batter(player: &PlayerRef) -> SimBatter {
    SimBatter {
        player: player.clone(),
        runs: 0,
        balls: 0,
        fours: 0,
        sixes: 0,
        out: None,
    }
}

impl MatchApi for SimulatedApi {
    fn fetch_listing(&self, kind: ListingKind) -> Result<Vec<MatchSnapshot>, ApiError> {
        let mut sim = self.lock()?;
        match kind {
            ListingKind::Live => {
                let previous = sim.last_listing.clone();
                sim.poll();
                let fresh = sim.live_snapshot();
                sim.last_listing = Some(fresh.clone());
                let stale_roll = sim.rng.gen_bool(STALE_CHANCE);
                let shown = match previous {
                    Some(prev) if sim.stale && stale_roll && prev.state == fresh.state => prev,
                    _ => fresh,
                };
                Ok(vec![shown])
            }
            ListingKind::Recent => {
                let mut out = vec![sim.finished_snapshot()];
                if sim.state == MatchState::Complete {
                    out.insert(0, sim.live_snapshot());
                }
                Ok(out)
            }
            ListingKind::Upcoming => Ok(vec![sim.upcoming_snapshot()]),
        }
    }

    fn fetch_scorecard(&self, match_id: &str) -> Result<Scorecard, ApiError> {
        let mut sim = self.lock()?;
        match match_id {
            LIVE_MATCH_ID => {
                sim.poll();
                if sim.innings.is_empty() {
                    return Err(ApiError::NotAvailable(format!("scorecard {match_id}")));
                }
                Ok(sim.scorecard())
            }
            _ => Err(ApiError::NotAvailable(format!("scorecard {match_id}"))),
        }
    }

    fn fetch_match_info(&self, match_id: &str) -> Result<MatchInfo, ApiError> {
        let sim = self.lock()?;
        let (state, toss, start, home, away) = match match_id {
            LIVE_MATCH_ID => (sim.state, Some(sim.toss()), sim.start, 0, 1),
            UPCOMING_MATCH_ID => (MatchState::Upcoming, None, sim.upcoming_start, 1, 0),
            _ => return Err(ApiError::NotAvailable(format!("match info {match_id}"))),
        };
        let teams = [home, away]
            .into_iter()
            .map(|idx| TeamSquad {
                team: sim.teams[idx].clone(),
                players: sim.squads[idx]
                    .iter()
                    .enumerate()
                    .map(|(n, p)| SquadPlayer {
                        player: p.clone(),
                        role: Some(if n < 6 { "Batter" } else { "Bowler" }.to_string()),
                        captain: n == 0,
                        keeper: n == 5,
                        substitute: false,
                    })
                    .collect(),
            })
            .collect();
        Ok(MatchInfo {
            match_id: match_id.to_string(),
            state,
            format: MatchFormat::T20,
            toss,
            teams,
            venue: Some("Simulated Oval, Nowhere".to_string()),
            start: Some(start),
        })
    }

    fn fetch_commentary(&self, match_id: &str) -> Result<Vec<String>, ApiError> {
        let sim = self.lock()?;
        if match_id != LIVE_MATCH_ID || sim.state != MatchState::Complete {
            return Ok(Vec::new());
        }
        let mut lines = vec![sim.status.clone()];
        if let Some(player) = sim.top_scorer() {
            lines.push(format!("{} is named Player of the Match", player.name));
        }
        Ok(lines)
    }

    fn fetch_player(&self, player_id: u64) -> Result<PlayerProfile, ApiError> {
        let sim = self.lock()?;
        // Every player numbered x07 has no profile, to exercise the degraded path.
        if player_id % 100 == 7 {
            return Err(ApiError::Transport(format!("profile {player_id} timed out")));
        }
        let player = sim
            .squads
            .iter()
            .flatten()
            .find(|p| p.id == player_id)
            .ok_or_else(|| ApiError::NotAvailable(format!("player {player_id}")))?;
        let team = sim.teams.iter().find(|t| t.id == player_id / 100);
        Ok(PlayerProfile {
            id: player.id,
            name: player.name.clone(),
            role: None,
            team: team.map(|t| t.name.clone()),
            image_id: Some(500_000 + player.id),
        })
    }
}
