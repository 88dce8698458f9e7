use std::cmp::Reverse;
use std::collections::HashSet;

use crate::config::DetectorConfig;
use crate::event_store::PlayerWatermarks;
use crate::events::{
    BatterCard, BowlerCard, EventPayload, EventType, InningsBreakPayload, InningsEndPayload,
    LineupEntry, MatchEndPayload, MilestonePayload, PlayerCard, PlayingXiPayload,
    PowerplayEndPayload, TeamCard, TeamLineup, TeamResult, TossPayload,
};
use crate::model::{
    BatterLine, BowlerLine, Innings, MatchInfo, MatchState, Overs, PlayerRef, Scorecard, TeamRef,
    Toss, run_rate,
};

const TOP_N: usize = 2;
const PLAYING_XI_MIN: usize = 11;
const PLAYING_XI_MAX: usize = 12;

/// Per-match detection state: last known runs per batter and the events already
/// settled in the store.
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    match_id: String,
    config: DetectorConfig,
    last_known: PlayerWatermarks,
    emitted: HashSet<(u64, u32)>,
    settled: HashSet<(EventType, String)>,
}

impl MilestoneTracker {
    pub fn new(match_id: impl Into<String>, config: DetectorConfig) -> Self {
        Self {
            match_id: match_id.into(),
            config,
            last_known: PlayerWatermarks::new(),
            emitted: HashSet::new(),
            settled: HashSet::new(),
        }
    }

    /// Resumes from watermarks persisted by an earlier run.
    pub fn with_watermarks(mut self, marks: PlayerWatermarks) -> Self {
        self.last_known = marks;
        self
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn watermarks(&self) -> &PlayerWatermarks {
        &self.last_known
    }

    /// Records that `event` is durably stored, so later scans stop offering it.
    pub fn settle(&mut self, event: &EventPayload) {
        self.settled.insert((event.event_type(), event.dedup_key()));
    }

    pub fn is_settled(&self, event_type: EventType, dedup_key: &str) -> bool {
        self.settled.contains(&(event_type, dedup_key.to_string()))
    }

    /// Candidate events for this scorecard. Milestones are reported on the poll that
    /// crosses them; innings-level events keep being offered until settled.
    pub fn scan(&mut self, card: &Scorecard) -> Vec<EventPayload> {
        let mut out = Vec::new();

        for innings in &card.innings {
            self.scan_batters(innings, &mut out);
        }

        for innings in &card.innings {
            let key = innings.number.to_string();
            if !self.is_settled(EventType::PowerplayEnd, &key)
                && let Some(event) = detect_powerplay_end(card, innings, self.config.powerplay_overs)
            {
                out.push(event);
            }
            if !self.is_settled(EventType::InningsEnd, &key)
                && let Some(event) = detect_innings_end(card, innings)
            {
                out.push(event);
            }
        }

        if !self.is_settled(EventType::InningsBreak, "")
            && let Some(event) = detect_innings_break(card)
        {
            out.push(event);
        }

        out
    }

    fn scan_batters(&mut self, innings: &Innings, out: &mut Vec<EventPayload>) {
        for batter in &innings.batters {
            let key = (innings.number, batter.player.id);
            let last = self.last_known.get(&key).copied().unwrap_or(0);
            for threshold in &self.config.thresholds {
                if batter.runs >= *threshold
                    && last < *threshold
                    && self.emitted.insert((batter.player.id, *threshold))
                {
                    out.push(milestone_event(innings, batter, *threshold));
                }
            }
            self.last_known.insert(key, last.max(batter.runs));
        }
    }
}

fn milestone_event(innings: &Innings, batter: &BatterLine, threshold: u32) -> EventPayload {
    EventPayload::Milestone(MilestonePayload {
        innings: innings.number,
        threshold,
        player: PlayerCard::from(&batter.player),
        team: TeamCard::from(&innings.batting_team),
        runs: batter.runs,
        balls: batter.balls,
        fours: batter.fours,
        sixes: batter.sixes,
        strike_rate: batter.strike_rate,
    })
}

/// An innings is over once all out, out of overs, followed by another innings, or
/// the match has finished.
pub fn innings_ended(card: &Scorecard, innings: &Innings) -> bool {
    if innings.wickets >= 10 {
        return true;
    }
    if let Some(max) = card.format.max_overs()
        && innings.overs >= Overs::new(max, 0)
    {
        return true;
    }
    if card.innings.iter().any(|other| other.number > innings.number) {
        return true;
    }
    card.state == MatchState::Complete
}

pub fn detect_powerplay_end(
    card: &Scorecard,
    innings: &Innings,
    default_overs: u32,
) -> Option<EventPayload> {
    let block = innings
        .powerplays
        .iter()
        .find(|pp| pp.label.eq_ignore_ascii_case("mandatory"))
        .or_else(|| innings.powerplays.first())?;
    let window = if block.to_over > 0 {
        block.to_over
    } else {
        default_overs
    };
    let closed = innings.overs >= Overs::new(window, 0) || innings_ended(card, innings);
    if !closed {
        return None;
    }
    Some(EventPayload::PowerplayEnd(PowerplayEndPayload {
        innings: innings.number,
        batting_team: TeamCard::from(&innings.batting_team),
        overs: window,
        runs: block.runs,
        wickets: block.wickets,
        run_rate: run_rate(block.runs, Overs::new(window, 0)),
    }))
}

pub fn detect_innings_end(card: &Scorecard, innings: &Innings) -> Option<EventPayload> {
    if !innings_ended(card, innings) {
        return None;
    }
    Some(EventPayload::InningsEnd(InningsEndPayload {
        innings: innings.number,
        batting_team: TeamCard::from(&innings.batting_team),
        bowling_team: TeamCard::from(&innings.bowling_team),
        runs: innings.runs,
        wickets: innings.wickets,
        overs: innings.overs.to_string(),
        top_batters: top_batters(innings, TOP_N)
            .into_iter()
            .map(|b| BatterCard {
                player: PlayerCard::from(&b.player),
                runs: b.runs,
                balls: b.balls,
                strike_rate: b.strike_rate,
            })
            .collect(),
        top_bowlers: top_bowlers(innings, TOP_N)
            .into_iter()
            .map(|b| BowlerCard {
                player: PlayerCard::from(&b.player),
                wickets: b.wickets,
                runs: b.runs,
                overs: b.overs.to_string(),
                economy: b.economy,
            })
            .collect(),
    }))
}

/// Target is set once the first innings is over and the chase has begun.
pub fn detect_innings_break(card: &Scorecard) -> Option<EventPayload> {
    let first = card.innings(1)?;
    let second = card.innings(2)?;
    if !innings_ended(card, first) {
        return None;
    }
    Some(EventPayload::InningsBreak(InningsBreakPayload {
        chasing_team: TeamCard::from(&second.batting_team),
        defending_team: TeamCard::from(&first.batting_team),
        captain: second.captain().map(PlayerCard::from),
        first_innings_runs: first.runs,
        first_innings_wickets: first.wickets,
        first_innings_overs: first.overs.to_string(),
        target: first.runs + 1,
    }))
}

/// Highest scorers first; fewer balls faced wins a tie.
pub fn top_batters(innings: &Innings, n: usize) -> Vec<&BatterLine> {
    let mut batters = innings.batters.iter().collect::<Vec<_>>();
    batters.sort_by_key(|b| (Reverse(b.runs), b.balls));
    batters.truncate(n);
    batters
}

/// Most wickets first; fewer runs conceded wins a tie.
pub fn top_bowlers(innings: &Innings, n: usize) -> Vec<&BowlerLine> {
    let mut bowlers = innings.bowlers.iter().collect::<Vec<_>>();
    bowlers.sort_by_key(|b| (Reverse(b.wickets), b.runs));
    bowlers.truncate(n);
    bowlers
}

pub fn detect_toss(info: &MatchInfo) -> Option<EventPayload> {
    let teams = info.teams.iter().map(|squad| &squad.team).collect::<Vec<_>>();
    Some(toss_event(info.toss.as_ref()?, &teams))
}

/// Toss from the scorecard header, with team details taken from the first innings.
pub fn detect_card_toss(card: &Scorecard) -> Option<EventPayload> {
    let teams = card
        .innings
        .iter()
        .take(1)
        .flat_map(|inn| [&inn.batting_team, &inn.bowling_team])
        .collect::<Vec<_>>();
    Some(toss_event(card.toss.as_ref()?, &teams))
}

fn toss_event(toss: &Toss, teams: &[&TeamRef]) -> EventPayload {
    let winner_ref = teams
        .iter()
        .copied()
        .find(|team| {
            toss.winner_id.is_some_and(|id| id == team.id)
                || team.name.eq_ignore_ascii_case(&toss.winner_name)
        });
    let winner = winner_ref.map(TeamCard::from).unwrap_or_else(|| TeamCard {
        id: toss.winner_id.unwrap_or(0),
        name: toss.winner_name.clone(),
        short_name: String::new(),
        image_id: None,
        flag_url: None,
    });
    let opponent = teams
        .iter()
        .copied()
        .find(|team| team.id != winner.id && !team.name.eq_ignore_ascii_case(&winner.name))
        .map(TeamCard::from);

    let decision = normalize_decision(&toss.decision);
    let summary = if decision.is_empty() {
        format!("{} won the toss", winner.name)
    } else {
        format!("{} won the toss and elected to {decision}", winner.name)
    };
    EventPayload::Toss(TossPayload {
        winner,
        decision,
        opponent,
        summary,
    })
}

fn normalize_decision(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    if lowered.starts_with("bat") {
        "bat".to_string()
    } else if lowered.starts_with("bowl") || lowered.starts_with("field") {
        "bowl".to_string()
    } else {
        lowered
    }
}

/// Both sides must list a starting line-up (substitutes excluded).
pub fn detect_playing_xi(info: &MatchInfo) -> Option<EventPayload> {
    if info.teams.len() < 2 {
        return None;
    }
    let mut teams = Vec::with_capacity(info.teams.len());
    for squad in &info.teams {
        let xi = squad.playing_xi();
        if !(PLAYING_XI_MIN..=PLAYING_XI_MAX).contains(&xi.len()) {
            return None;
        }
        teams.push(TeamLineup {
            team: TeamCard::from(&squad.team),
            players: xi
                .into_iter()
                .map(|entry| LineupEntry {
                    player: PlayerCard {
                        role: entry.role.clone(),
                        ..PlayerCard::from(&entry.player)
                    },
                    captain: entry.captain,
                    keeper: entry.keeper,
                })
                .collect(),
        });
    }
    Some(EventPayload::PlayingXi(PlayingXiPayload { teams }))
}

/// Builds the result event for a completed match. Teams come from `info` when
/// available, otherwise from the first innings.
pub fn detect_match_end(
    card: &Scorecard,
    info: Option<&MatchInfo>,
    commentary: &[String],
) -> Option<EventPayload> {
    if card.state != MatchState::Complete {
        return None;
    }
    let (team1, team2) = match info.filter(|i| i.teams.len() >= 2) {
        Some(info) => (info.teams[0].team.clone(), info.teams[1].team.clone()),
        None => {
            let first = card.innings.first()?;
            (first.batting_team.clone(), first.bowling_team.clone())
        }
    };

    let player_of_match = card
        .players_of_match
        .first()
        .cloned()
        .or_else(|| resolve_player_of_match(commentary, &card.players()))
        .map(|p| PlayerCard::from(&p));

    Some(EventPayload::MatchEnd(MatchEndPayload {
        result: card.status_text.clone(),
        team1: team_result(card, &team1),
        team2: team_result(card, &team2),
        player_of_match,
    }))
}

fn team_result(card: &Scorecard, team: &TeamRef) -> TeamResult {
    let lines = card
        .innings
        .iter()
        .filter(|inn| inn.batting_team.id == team.id && team.id != 0)
        .map(|inn| {
            if inn.wickets >= 10 {
                inn.runs.to_string()
            } else {
                format!("{}/{}", inn.runs, inn.wickets)
            }
        })
        .collect::<Vec<_>>();
    TeamResult {
        team: TeamCard::from(team),
        score: if lines.is_empty() {
            None
        } else {
            Some(lines.join(" & "))
        },
    }
}

/// Finds the player named in a "player of the match" commentary line. Full names
/// win; a surname counts only when it identifies a single player.
pub fn resolve_player_of_match(commentary: &[String], players: &[PlayerRef]) -> Option<PlayerRef> {
    for text in commentary {
        let lowered = text.to_ascii_lowercase();
        if !lowered.contains("player of the match") {
            continue;
        }
        let by_full_name = players
            .iter()
            .filter(|p| !p.name.is_empty() && lowered.contains(&p.name.to_ascii_lowercase()))
            .max_by_key(|p| p.name.len());
        if let Some(player) = by_full_name {
            return Some(player.clone());
        }
        let by_surname = players
            .iter()
            .filter(|p| {
                p.name
                    .split_whitespace()
                    .last()
                    .filter(|s| s.len() >= 3)
                    .is_some_and(|s| contains_word(&lowered, &s.to_ascii_lowercase()))
            })
            .collect::<Vec<_>>();
        if let [only] = by_surname.as_slice() {
            return Some((*only).clone());
        }
    }
    None
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}
