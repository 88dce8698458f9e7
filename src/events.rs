use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::model::{PlayerRef, TeamRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PlayingXi,
    Toss,
    PowerplayEnd,
    Milestone,
    InningsEnd,
    InningsBreak,
    MatchEnd,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::PlayingXi,
        EventType::Toss,
        EventType::PowerplayEnd,
        EventType::Milestone,
        EventType::InningsEnd,
        EventType::InningsBreak,
        EventType::MatchEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::PlayingXi => "PLAYING_XI",
            EventType::Toss => "TOSS",
            EventType::PowerplayEnd => "POWERPLAY_END",
            EventType::Milestone => "MILESTONE",
            EventType::InningsEnd => "INNINGS_END",
            EventType::InningsBreak => "INNINGS_BREAK",
            EventType::MatchEnd => "MATCH_END",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let wanted = raw.trim().to_ascii_uppercase();
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| anyhow!("unknown event type {raw}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamCard {
    pub id: u64,
    pub name: String,
    pub short_name: String,
    pub image_id: Option<u64>,
    pub flag_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCard {
    pub id: u64,
    pub name: String,
    pub role: Option<String>,
    pub image_id: Option<u64>,
    pub image_url: Option<String>,
}

impl From<&TeamRef> for TeamCard {
    fn from(team: &TeamRef) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            short_name: team.short_name.clone(),
            image_id: team.image_id,
            flag_url: None,
        }
    }
}

impl From<&PlayerRef> for PlayerCard {
    fn from(player: &PlayerRef) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            role: None,
            image_id: player.image_id,
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupEntry {
    pub player: PlayerCard,
    pub captain: bool,
    pub keeper: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamLineup {
    pub team: TeamCard,
    pub players: Vec<LineupEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayingXiPayload {
    pub teams: Vec<TeamLineup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TossPayload {
    pub winner: TeamCard,
    pub decision: String,
    pub opponent: Option<TeamCard>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerplayEndPayload {
    pub innings: u32,
    pub batting_team: TeamCard,
    pub overs: u32,
    pub runs: u32,
    pub wickets: u32,
    pub run_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestonePayload {
    pub innings: u32,
    pub threshold: u32,
    pub player: PlayerCard,
    pub team: TeamCard,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterCard {
    pub player: PlayerCard,
    pub runs: u32,
    pub balls: u32,
    pub strike_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlerCard {
    pub player: PlayerCard,
    pub wickets: u32,
    pub runs: u32,
    pub overs: String,
    pub economy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsEndPayload {
    pub innings: u32,
    pub batting_team: TeamCard,
    pub bowling_team: TeamCard,
    pub runs: u32,
    pub wickets: u32,
    pub overs: String,
    pub top_batters: Vec<BatterCard>,
    pub top_bowlers: Vec<BowlerCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsBreakPayload {
    pub chasing_team: TeamCard,
    pub defending_team: TeamCard,
    pub captain: Option<PlayerCard>,
    pub first_innings_runs: u32,
    pub first_innings_wickets: u32,
    pub first_innings_overs: String,
    pub target: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResult {
    pub team: TeamCard,
    pub score: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEndPayload {
    pub result: String,
    pub team1: TeamResult,
    pub team2: TeamResult,
    pub player_of_match: Option<PlayerCard>,
}

/// One milestone, discriminated by `event_type` with the per-type body under `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event_type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum EventPayload {
    PlayingXi(PlayingXiPayload),
    Toss(TossPayload),
    PowerplayEnd(PowerplayEndPayload),
    Milestone(MilestonePayload),
    InningsEnd(InningsEndPayload),
    InningsBreak(InningsBreakPayload),
    MatchEnd(MatchEndPayload),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::PlayingXi(_) => EventType::PlayingXi,
            EventPayload::Toss(_) => EventType::Toss,
            EventPayload::PowerplayEnd(_) => EventType::PowerplayEnd,
            EventPayload::Milestone(_) => EventType::Milestone,
            EventPayload::InningsEnd(_) => EventType::InningsEnd,
            EventPayload::InningsBreak(_) => EventType::InningsBreak,
            EventPayload::MatchEnd(_) => EventType::MatchEnd,
        }
    }

    /// Distinguishes events of the same type within one match. Empty for types that
    /// occur once per match.
    pub fn dedup_key(&self) -> String {
        match self {
            EventPayload::Milestone(m) => milestone_key(m.player.id, m.threshold),
            EventPayload::PowerplayEnd(p) => p.innings.to_string(),
            EventPayload::InningsEnd(i) => i.innings.to_string(),
            _ => String::new(),
        }
    }

    /// Splits into the stored `(event_type, payload)` columns.
    pub fn to_parts(&self) -> Result<(EventType, String)> {
        let mut tagged = serde_json::to_value(self).context("serialize event payload")?;
        let body = tagged
            .get_mut("payload")
            .map(Value::take)
            .unwrap_or(Value::Null);
        let body = serde_json::to_string(&body).context("serialize event body")?;
        Ok((self.event_type(), body))
    }

    pub fn from_parts(event_type: EventType, payload: &str) -> Result<Self> {
        let body: Value = serde_json::from_str(payload)
            .with_context(|| format!("parse {event_type} payload"))?;
        serde_json::from_value(json!({ "event_type": event_type, "payload": body }))
            .with_context(|| format!("decode {event_type} payload"))
    }

    pub fn players_mut(&mut self) -> Vec<&mut PlayerCard> {
        match self {
            EventPayload::PlayingXi(p) => p
                .teams
                .iter_mut()
                .flat_map(|t| t.players.iter_mut().map(|e| &mut e.player))
                .collect(),
            EventPayload::Toss(_) | EventPayload::PowerplayEnd(_) => Vec::new(),
            EventPayload::Milestone(m) => vec![&mut m.player],
            EventPayload::InningsEnd(i) => i
                .top_batters
                .iter_mut()
                .map(|b| &mut b.player)
                .chain(i.top_bowlers.iter_mut().map(|b| &mut b.player))
                .collect(),
            EventPayload::InningsBreak(b) => b.captain.iter_mut().collect(),
            EventPayload::MatchEnd(m) => m.player_of_match.iter_mut().collect(),
        }
    }

    pub fn teams_mut(&mut self) -> Vec<&mut TeamCard> {
        match self {
            EventPayload::PlayingXi(p) => p.teams.iter_mut().map(|t| &mut t.team).collect(),
            EventPayload::Toss(t) => std::iter::once(&mut t.winner)
                .chain(t.opponent.iter_mut())
                .collect(),
            EventPayload::PowerplayEnd(p) => vec![&mut p.batting_team],
            EventPayload::Milestone(m) => vec![&mut m.team],
            EventPayload::InningsEnd(i) => vec![&mut i.batting_team, &mut i.bowling_team],
            EventPayload::InningsBreak(b) => vec![&mut b.chasing_team, &mut b.defending_team],
            EventPayload::MatchEnd(m) => vec![&mut m.team1.team, &mut m.team2.team],
        }
    }

    /// One-line description for logs and the dump binary.
    pub fn summary(&self) -> String {
        match self {
            EventPayload::PlayingXi(p) => {
                let sides = p
                    .teams
                    .iter()
                    .map(|t| format!("{} ({})", t.team.short_name, t.players.len()))
                    .collect::<Vec<_>>();
                format!("playing XI: {}", sides.join(" / "))
            }
            EventPayload::Toss(t) => t.summary.clone(),
            EventPayload::PowerplayEnd(p) => format!(
                "powerplay {} inns {}: {}/{} in {} ov",
                p.batting_team.short_name, p.innings, p.runs, p.wickets, p.overs
            ),
            EventPayload::Milestone(m) => format!(
                "{} reaches {} ({} off {})",
                m.player.name, m.threshold, m.runs, m.balls
            ),
            EventPayload::InningsEnd(i) => format!(
                "innings {} over: {} {}/{} ({} ov)",
                i.innings, i.batting_team.short_name, i.runs, i.wickets, i.overs
            ),
            EventPayload::InningsBreak(b) => {
                format!("{} need {} to win", b.chasing_team.short_name, b.target)
            }
            EventPayload::MatchEnd(m) => m.result.clone(),
        }
    }
}

pub fn milestone_key(player_id: u64, threshold: u32) -> String {
    format!("{player_id}:{threshold}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    pub match_id: String,
    #[serde(flatten)]
    pub event: EventPayload,
    pub created_at: DateTime<Utc>,
}
