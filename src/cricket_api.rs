use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::model::{
    BatterLine, BowlerLine, DisplayStatus, Innings, InningsScore, ListingKind, MatchFormat,
    MatchInfo, MatchSnapshot, MatchState, Overs, PlayerProfile, PlayerRef, PowerplayBlock,
    Scorecard, SquadPlayer, TeamRef, TeamSquad, Toss,
};

const LIVE_TTL: Duration = Duration::from_secs(15);
const RECENT_TTL: Duration = Duration::from_secs(60);
const UPCOMING_TTL: Duration = Duration::from_secs(600);
const SCORECARD_TTL: Duration = Duration::from_secs(10);
const INFO_TTL: Duration = Duration::from_secs(30);
const PROFILE_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("upstream returned {0}: {1}")]
    Status(u16, String),

    /// The resource exists in principle but has no data yet (pre-match scorecard etc).
    #[error("not available yet: {0}")]
    NotAvailable(String),

    #[error("unexpected payload: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn is_not_available(&self) -> bool {
        matches!(self, ApiError::NotAvailable(_))
    }
}

/// Which slice of the listing the scoreboard wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Currently live plus recently completed matches; small payload for the fast cadence.
    LiveOnly,
    /// Live, completed and upcoming.
    Full,
}

#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub live: Vec<MatchSnapshot>,
    pub completed: Vec<MatchSnapshot>,
    /// `None` when the mode did not ask for upcoming fixtures.
    pub upcoming: Option<Vec<MatchSnapshot>>,
    pub warnings: Vec<String>,
}

pub trait MatchApi: Send + Sync {
    fn fetch_listing(&self, kind: ListingKind) -> Result<Vec<MatchSnapshot>, ApiError>;
    fn fetch_scorecard(&self, match_id: &str) -> Result<Scorecard, ApiError>;
    fn fetch_match_info(&self, match_id: &str) -> Result<MatchInfo, ApiError>;
    fn fetch_commentary(&self, match_id: &str) -> Result<Vec<String>, ApiError>;
    fn fetch_player(&self, player_id: u64) -> Result<PlayerProfile, ApiError>;

    fn fetch_feed(
        &self,
        mode: FeedMode,
        now: DateTime<Utc>,
        recent_window: ChronoDuration,
    ) -> Result<Feed, ApiError> {
        let mut feed = Feed::default();
        let mut seen = HashSet::new();

        for snapshot in self.fetch_listing(ListingKind::Live)? {
            if !seen.insert(snapshot.match_id.clone()) {
                continue;
            }
            match snapshot.display_status() {
                DisplayStatus::Live => feed.live.push(snapshot),
                DisplayStatus::Completed => feed.completed.push(snapshot),
                DisplayStatus::Upcoming => {}
            }
        }

        match self.fetch_listing(ListingKind::Recent) {
            Ok(recent) => {
                for snapshot in recent {
                    if snapshot.display_status() != DisplayStatus::Completed {
                        continue;
                    }
                    if mode == FeedMode::LiveOnly && !finished_within(&snapshot, now, recent_window)
                    {
                        continue;
                    }
                    if seen.insert(snapshot.match_id.clone()) {
                        feed.completed.push(snapshot);
                    }
                }
            }
            Err(err) => feed.warnings.push(format!("recent listing: {err}")),
        }

        if mode == FeedMode::Full {
            match self.fetch_listing(ListingKind::Upcoming) {
                Ok(upcoming) => {
                    let items = upcoming
                        .into_iter()
                        .filter(|s| s.display_status() == DisplayStatus::Upcoming)
                        .filter(|s| seen.insert(s.match_id.clone()))
                        .collect::<Vec<_>>();
                    feed.upcoming = Some(items);
                }
                Err(err) => feed.warnings.push(format!("upcoming listing: {err}")),
            }
        }

        Ok(feed)
    }
}

fn finished_within(snapshot: &MatchSnapshot, now: DateTime<Utc>, window: ChronoDuration) -> bool {
    match snapshot.end.or(snapshot.start) {
        Some(at) => now.signed_duration_since(at) <= window,
        None => false,
    }
}

/// HTTP implementation against the RapidAPI-hosted cricket data service.
pub struct CricApiClient {
    config: ApiConfig,
}

impl CricApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    fn get(&self, path: &str, max_age: Duration) -> Result<String, ApiError> {
        let client = http_client().map_err(|err| ApiError::Transport(err.to_string()))?;
        let url = format!("{}/{}", self.config.base_url, path.trim_start_matches('/'));
        let mut headers: Vec<(&str, &str)> = Vec::new();
        if let Some(key) = self.config.api_key.as_deref() {
            headers.push(("x-rapidapi-key", key));
            headers.push(("x-rapidapi-host", self.config.api_host.as_str()));
        }
        fetch_json_cached(client, &url, &headers, max_age)
    }
}

impl MatchApi for CricApiClient {
    fn fetch_listing(&self, kind: ListingKind) -> Result<Vec<MatchSnapshot>, ApiError> {
        let ttl = match kind {
            ListingKind::Live => LIVE_TTL,
            ListingKind::Recent => RECENT_TTL,
            ListingKind::Upcoming => UPCOMING_TTL,
        };
        match self.get(kind.path(), ttl) {
            Ok(body) => parse_listing_json(&body),
            Err(ApiError::NotAvailable(_)) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn fetch_scorecard(&self, match_id: &str) -> Result<Scorecard, ApiError> {
        let body = self.get(&format!("mcenter/v1/{match_id}/hscard"), SCORECARD_TTL)?;
        parse_scorecard_json(&body, match_id)
    }

    fn fetch_match_info(&self, match_id: &str) -> Result<MatchInfo, ApiError> {
        let body = self.get(&format!("mcenter/v1/{match_id}"), INFO_TTL)?;
        parse_match_info_json(&body, match_id)
    }

    fn fetch_commentary(&self, match_id: &str) -> Result<Vec<String>, ApiError> {
        let body = self.get(&format!("mcenter/v1/{match_id}/comm"), SCORECARD_TTL)?;
        parse_commentary_json(&body)
    }

    fn fetch_player(&self, player_id: u64) -> Result<PlayerProfile, ApiError> {
        let body = self.get(&format!("stats/v1/player/{player_id}"), PROFILE_TTL)?;
        parse_player_json(&body, player_id)
    }
}

fn parse_root(raw: &str) -> Result<Option<Value>, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|err| ApiError::Parse(err.to_string()))
}

pub fn parse_listing_json(raw: &str) -> Result<Vec<MatchSnapshot>, ApiError> {
    let Some(root) = parse_root(raw)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for group in array(root.get("typeMatches")) {
        for series in array(group.get("seriesMatches")) {
            // Ad slots share the array with real series wrappers.
            let Some(wrapper) = series.get("seriesAdWrapper") else {
                continue;
            };
            let series_name = pick_string(wrapper, &["seriesName", "seriesname"]).unwrap_or_default();
            for entry in array(wrapper.get("matches")) {
                if let Some(snapshot) = parse_listing_match(entry, &series_name)
                    && seen.insert(snapshot.match_id.clone())
                {
                    out.push(snapshot);
                }
            }
        }
    }

    Ok(out)
}

fn parse_listing_match(entry: &Value, series_name: &str) -> Option<MatchSnapshot> {
    let info = entry.get("matchInfo")?;
    let match_id = pick_id_string(info, &["matchId", "matchid", "id"])?;
    let team1 = parse_team(info.get("team1")?);
    let team2 = parse_team(info.get("team2")?);
    let score = entry.get("matchScore");

    Some(MatchSnapshot {
        match_id,
        series: pick_string(info, &["seriesName", "seriesname"])
            .unwrap_or_else(|| series_name.to_string()),
        description: pick_string(info, &["matchDesc", "matchdesc"]).unwrap_or_default(),
        format: MatchFormat::from_upstream(
            &pick_string(info, &["matchFormat", "matchformat"]).unwrap_or_default(),
        ),
        state: MatchState::from_upstream(&pick_string(info, &["state"]).unwrap_or_default()),
        status_text: pick_string(info, &["status"]).unwrap_or_default(),
        team1,
        team2,
        team1_score: score.and_then(|s| s.get("team1Score")).and_then(parse_team_score),
        team2_score: score.and_then(|s| s.get("team2Score")).and_then(parse_team_score),
        start: pick_timestamp(info, &["startDate", "startdate", "matchStartTimestamp"]),
        end: pick_timestamp(info, &["endDate", "enddate", "matchCompleteTimestamp"]),
    })
}

/// Normalizes a team object regardless of which endpoint produced it.
fn parse_team(value: &Value) -> TeamRef {
    TeamRef {
        id: pick_u64(value, &["teamId", "teamid", "id"]).unwrap_or(0),
        name: pick_string(value, &["teamName", "teamname", "name"]).unwrap_or_default(),
        short_name: pick_string(value, &["teamSName", "teamsname", "shortName", "shortname"])
            .unwrap_or_default(),
        image_id: pick_u64(value, &["imageId", "imageid"]),
    }
}

/// Picks the most recent innings (`inngs2` over `inngs1`) of a listing score block.
fn parse_team_score(value: &Value) -> Option<InningsScore> {
    let innings = value
        .get("inngs2")
        .filter(|v| v.is_object())
        .or_else(|| value.get("inngs1"))?;
    let runs = pick_u64(innings, &["runs"])? as u32;
    Some(InningsScore {
        runs,
        wickets: pick_u64(innings, &["wickets"]).unwrap_or(0) as u32,
        overs: pick_overs(innings, &["overs"]).unwrap_or_default(),
    })
}

pub fn parse_scorecard_json(raw: &str, match_id: &str) -> Result<Scorecard, ApiError> {
    let Some(root) = parse_root(raw)? else {
        return Err(ApiError::NotAvailable(format!("scorecard {match_id}")));
    };
    let header = root.get("matchHeader").unwrap_or(&Value::Null);

    let complete_flag = pick_bool(&root, &["isMatchComplete", "ismatchcomplete"])
        .or_else(|| pick_bool(header, &["complete"]))
        .unwrap_or(false);
    let state = if complete_flag {
        MatchState::Complete
    } else {
        MatchState::from_upstream(
            &pick_string(header, &["state"])
                .or_else(|| pick_string(&root, &["state"]))
                .unwrap_or_default(),
        )
    };
    let status_text = pick_string(header, &["status"])
        .or_else(|| pick_string(&root, &["status"]))
        .unwrap_or_default();
    let format = MatchFormat::from_upstream(
        &pick_string(header, &["matchFormat", "matchformat"])
            .or_else(|| pick_string(&root, &["matchFormat", "matchformat"]))
            .unwrap_or_default(),
    );

    let header_teams = [header.get("team1"), header.get("team2")]
        .into_iter()
        .flatten()
        .map(parse_team)
        .collect::<Vec<_>>();

    let innings_rows = root
        .get("scoreCard")
        .or_else(|| root.get("scorecard"))
        .map(|v| array(Some(v)))
        .unwrap_or_default();
    let mut innings = innings_rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| parse_innings(row, idx as u32 + 1, &header_teams))
        .collect::<Vec<_>>();
    innings.sort_by_key(|inn| inn.number);

    let toss = header
        .get("tossResults")
        .or_else(|| root.get("tossResults"))
        .and_then(parse_toss);

    let players_of_match = array(
        header
            .get("playersOfTheMatch")
            .or_else(|| root.get("playersOfTheMatch")),
    )
    .into_iter()
    .filter_map(parse_player_ref)
    .collect();

    Ok(Scorecard {
        match_id: match_id.to_string(),
        state,
        status_text,
        format,
        innings,
        toss,
        players_of_match,
    })
}

fn parse_innings(row: &Value, fallback_number: u32, header_teams: &[TeamRef]) -> Option<Innings> {
    let number = pick_u64(row, &["inningsId", "inningsid"])
        .map(|n| n as u32)
        .unwrap_or(fallback_number);

    let bat_details = row.get("batTeamDetails").unwrap_or(row);
    let batting_team = TeamRef {
        id: pick_u64(bat_details, &["batTeamId", "batteamid", "teamId", "teamid"]).unwrap_or(0),
        name: pick_string(bat_details, &["batTeamName", "batteamname"]).unwrap_or_default(),
        short_name: pick_string(bat_details, &["batTeamShortName", "batteamsname"])
            .unwrap_or_default(),
        image_id: None,
    };
    let batting_team = fill_team_from_header(batting_team, header_teams);

    let bowl_details = row.get("bowlTeamDetails").unwrap_or(&Value::Null);
    let bowling_team = TeamRef {
        id: pick_u64(bowl_details, &["bowlTeamId", "bowlteamid"]).unwrap_or(0),
        name: pick_string(bowl_details, &["bowlTeamName", "bowlteamname"]).unwrap_or_default(),
        short_name: pick_string(bowl_details, &["bowlTeamShortName", "bowlteamsname"])
            .unwrap_or_default(),
        image_id: None,
    };
    let bowling_team = if bowling_team.id == 0 && bowling_team.name.is_empty() {
        header_teams
            .iter()
            .find(|t| !same_team(t, &batting_team))
            .cloned()
            .unwrap_or_default()
    } else {
        fill_team_from_header(bowling_team, header_teams)
    };

    let batters = rows(bat_details.get("batsmenData").or_else(|| row.get("batsman")))
        .into_iter()
        .filter_map(parse_batter)
        .collect::<Vec<_>>();
    let bowlers = rows(bowl_details.get("bowlersData").or_else(|| row.get("bowler")))
        .into_iter()
        .filter_map(parse_bowler)
        .collect::<Vec<_>>();

    let score = row.get("scoreDetails").unwrap_or(row);
    let runs = pick_u64(score, &["runs", "score"]).unwrap_or(0) as u32;
    let wickets = pick_u64(score, &["wickets"]).unwrap_or(0) as u32;
    let overs = pick_overs(score, &["overs"]).unwrap_or_default();

    let powerplays = rows(
        row.get("ppData")
            .or_else(|| row.get("pp").and_then(|pp| pp.get("powerplay"))),
    )
    .into_iter()
    .filter_map(parse_powerplay)
    .collect::<Vec<_>>();

    if batting_team.id == 0 && batting_team.name.is_empty() && batters.is_empty() {
        return None;
    }

    Some(Innings {
        number,
        batting_team,
        bowling_team,
        runs,
        wickets,
        overs,
        batters,
        bowlers,
        powerplays,
    })
}

fn same_team(a: &TeamRef, b: &TeamRef) -> bool {
    (a.id != 0 && a.id == b.id)
        || (!a.name.is_empty() && a.name.eq_ignore_ascii_case(&b.name))
        || (!a.short_name.is_empty() && a.short_name.eq_ignore_ascii_case(&b.short_name))
}

fn fill_team_from_header(team: TeamRef, header_teams: &[TeamRef]) -> TeamRef {
    let Some(known) = header_teams.iter().find(|t| same_team(t, &team)) else {
        return team;
    };
    TeamRef {
        id: if team.id == 0 { known.id } else { team.id },
        name: if team.name.is_empty() {
            known.name.clone()
        } else {
            team.name
        },
        short_name: if team.short_name.is_empty() {
            known.short_name.clone()
        } else {
            team.short_name
        },
        image_id: team.image_id.or(known.image_id),
    }
}

fn parse_batter(value: &Value) -> Option<BatterLine> {
    let id = pick_u64(value, &["batId", "batid", "id"])?;
    let name = pick_string(value, &["batName", "batname", "name"]).unwrap_or_default();
    let runs = pick_u64(value, &["runs"]).unwrap_or(0) as u32;
    let balls = pick_u64(value, &["balls"]).unwrap_or(0) as u32;
    let strike_rate = pick_f64(value, &["strikeRate", "strkrate", "strikerate"])
        .unwrap_or_else(|| {
            if balls == 0 {
                0.0
            } else {
                runs as f64 * 100.0 / balls as f64
            }
        });
    Some(BatterLine {
        player: PlayerRef {
            id,
            name,
            image_id: pick_u64(value, &["faceImageId", "faceimageid", "imageId"]),
        },
        runs,
        balls,
        fours: pick_u64(value, &["fours"]).unwrap_or(0) as u32,
        sixes: pick_u64(value, &["sixes"]).unwrap_or(0) as u32,
        strike_rate,
        is_captain: pick_bool(value, &["isCaptain", "iscaptain"]).unwrap_or(false),
        is_keeper: pick_bool(value, &["isKeeper", "iskeeper"]).unwrap_or(false),
        dismissal: pick_string(value, &["outDesc", "outdec", "outdesc"]).filter(|s| !s.is_empty()),
    })
}

fn parse_bowler(value: &Value) -> Option<BowlerLine> {
    let id = pick_u64(value, &["bowlerId", "bowlerid", "id"])?;
    Some(BowlerLine {
        player: PlayerRef {
            id,
            name: pick_string(value, &["bowlName", "bowlname", "name"]).unwrap_or_default(),
            image_id: pick_u64(value, &["faceImageId", "faceimageid", "imageId"]),
        },
        overs: pick_overs(value, &["overs"]).unwrap_or_default(),
        maidens: pick_u64(value, &["maidens"]).unwrap_or(0) as u32,
        runs: pick_u64(value, &["runs"]).unwrap_or(0) as u32,
        wickets: pick_u64(value, &["wickets"]).unwrap_or(0) as u32,
        economy: pick_f64(value, &["economy"]).unwrap_or(0.0),
    })
}

fn parse_powerplay(value: &Value) -> Option<PowerplayBlock> {
    let to_over = pick_f64(value, &["ppOversTo", "ovrto"])?;
    Some(PowerplayBlock {
        label: pick_string(value, &["ppType", "pptype"]).unwrap_or_else(|| "mandatory".to_string()),
        to_over: to_over.round() as u32,
        runs: pick_u64(value, &["runsScored", "run", "runs"]).unwrap_or(0) as u32,
        wickets: pick_u64(value, &["wicketsFallen", "wickets"]).unwrap_or(0) as u32,
    })
}

fn parse_toss(value: &Value) -> Option<Toss> {
    let winner_name = pick_string(value, &["tossWinnerName", "tosswinnername"])?;
    if winner_name.is_empty() {
        return None;
    }
    Some(Toss {
        winner_id: pick_u64(value, &["tossWinnerId", "tosswinnerid"]),
        winner_name,
        decision: pick_string(value, &["decision"]).unwrap_or_default(),
    })
}

fn parse_player_ref(value: &Value) -> Option<PlayerRef> {
    let id = pick_u64(value, &["id", "playerId", "playerid"])?;
    Some(PlayerRef {
        id,
        name: pick_string(value, &["name", "fullName", "fullname"]).unwrap_or_default(),
        image_id: pick_u64(value, &["faceImageId", "faceimageid", "imageId"]),
    })
}

pub fn parse_match_info_json(raw: &str, match_id: &str) -> Result<MatchInfo, ApiError> {
    let Some(root) = parse_root(raw)? else {
        return Err(ApiError::NotAvailable(format!("match info {match_id}")));
    };
    let info = root.get("matchInfo").unwrap_or(&root);

    let teams = [info.get("team1"), info.get("team2")]
        .into_iter()
        .flatten()
        .map(|team| TeamSquad {
            team: parse_team(team),
            players: array(team.get("playerDetails").or_else(|| team.get("players")))
                .into_iter()
                .filter_map(parse_squad_player)
                .collect(),
        })
        .collect::<Vec<_>>();

    let venue = info
        .get("venue")
        .or_else(|| root.get("venueInfo"))
        .and_then(|v| {
            let ground = pick_string(v, &["name", "ground"])?;
            Some(match pick_string(v, &["city"]) {
                Some(city) if !city.is_empty() => format!("{ground}, {city}"),
                _ => ground,
            })
        });

    Ok(MatchInfo {
        match_id: match_id.to_string(),
        state: MatchState::from_upstream(&pick_string(info, &["state"]).unwrap_or_default()),
        format: MatchFormat::from_upstream(
            &pick_string(info, &["matchFormat", "matchformat"]).unwrap_or_default(),
        ),
        toss: info.get("tossResults").and_then(parse_toss),
        teams,
        venue,
        start: pick_timestamp(info, &["matchStartTimestamp", "startDate", "startdate"]),
    })
}

fn parse_squad_player(value: &Value) -> Option<SquadPlayer> {
    let player = parse_player_ref(value)?;
    Some(SquadPlayer {
        player,
        role: pick_string(value, &["role"]).filter(|s| !s.is_empty()),
        captain: pick_bool(value, &["captain", "isCaptain"]).unwrap_or(false),
        keeper: pick_bool(value, &["keeper", "isKeeper"]).unwrap_or(false),
        substitute: pick_bool(value, &["substitute", "isSubstitute"]).unwrap_or(false),
    })
}

pub fn parse_commentary_json(raw: &str) -> Result<Vec<String>, ApiError> {
    let Some(root) = parse_root(raw)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for entry in array(root.get("commentaryList")) {
        if let Some(text) = pick_string(entry, &["commText", "commtxt"]) {
            out.push(text);
        }
    }
    for entry in array(root.get("comwrapper")) {
        if let Some(text) = entry
            .get("commentary")
            .and_then(|c| pick_string(c, &["commtxt", "commText"]))
        {
            out.push(text);
        }
    }
    Ok(out)
}

pub fn parse_player_json(raw: &str, player_id: u64) -> Result<PlayerProfile, ApiError> {
    let Some(root) = parse_root(raw)? else {
        return Err(ApiError::NotAvailable(format!("player {player_id}")));
    };
    let name = pick_string(&root, &["name", "fullName"]).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::Parse(format!("player {player_id} has no name")));
    }
    Ok(PlayerProfile {
        id: pick_u64(&root, &["id"]).unwrap_or(player_id),
        name,
        role: pick_string(&root, &["role"]).filter(|s| !s.is_empty()),
        team: pick_string(&root, &["intlTeam", "teamName"]).filter(|s| !s.is_empty()),
        image_id: pick_u64(&root, &["faceImageId", "faceimageid", "imageId"]),
    })
}

fn array(value: Option<&Value>) -> Vec<&Value> {
    value
        .and_then(|v| v.as_array())
        .map(|list| list.iter().collect())
        .unwrap_or_default()
}

/// Row collections arrive either as arrays or as `{"bat_1": {..}, "bat_2": {..}}` maps.
fn rows(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(Value::Object(map)) => {
            let mut keyed = map
                .iter()
                .map(|(key, v)| (trailing_number(key), key.as_str(), v))
                .collect::<Vec<_>>();
            keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
            keyed.into_iter().map(|(_, _, v)| v).collect()
        }
        _ => Vec::new(),
    }
}

fn trailing_number(key: &str) -> u64 {
    let digits = key
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>();
    digits.chars().rev().collect::<String>().parse().unwrap_or(u64::MAX)
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(*key) {
            Some(Value::String(s)) => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn pick_id_string(value: &Value, keys: &[&str]) -> Option<String> {
    pick_string(value, keys).filter(|s| !s.is_empty())
}

fn pick_u64(value: &Value, keys: &[&str]) -> Option<u64> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(num) = v.as_u64() {
                return Some(num);
            }
            if let Some(num) = v.as_f64()
                && num >= 0.0
            {
                return Some(num as u64);
            }
            if let Some(s) = v.as_str()
                && let Ok(num) = s.trim().parse::<u64>()
            {
                return Some(num);
            }
        }
    }
    None
}

fn pick_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(num) = v.as_f64() {
                return Some(num);
            }
            if let Some(s) = v.as_str()
                && let Ok(num) = s.trim().parse::<f64>()
            {
                return Some(num);
            }
        }
    }
    None
}

fn pick_bool(value: &Value, keys: &[&str]) -> Option<bool> {
    for key in keys {
        match value.get(*key) {
            Some(Value::Bool(b)) => return Some(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => return Some(true),
                "false" | "0" | "no" => return Some(false),
                _ => {}
            },
            Some(Value::Number(n)) => return Some(n.as_u64().unwrap_or(0) != 0),
            _ => {}
        }
    }
    None
}

fn pick_overs(value: &Value, keys: &[&str]) -> Option<Overs> {
    for key in keys {
        match value.get(*key) {
            Some(Value::Number(n)) => return n.as_f64().map(Overs::from_decimal),
            Some(Value::String(s)) => {
                if let Some(overs) = Overs::parse(s) {
                    return Some(overs);
                }
            }
            _ => {}
        }
    }
    None
}

/// Upstream timestamps are epoch milliseconds, as numbers or numeric strings.
fn pick_timestamp(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    let millis = pick_u64(value, keys)?;
    if millis == 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_rows_follow_numeric_suffix() {
        let value: Value = serde_json::json!({
            "bat_10": {"id": 10},
            "bat_2": {"id": 2},
            "bat_1": {"id": 1}
        });
        let ids = rows(Some(&value))
            .into_iter()
            .filter_map(|v| pick_u64(v, &["id"]))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 10]);
    }

    #[test]
    fn team_ids_normalize_across_casings() {
        let a = parse_team(&serde_json::json!({"teamId": 7, "teamName": "India", "teamSName": "IND"}));
        let b = parse_team(&serde_json::json!({"teamid": "7", "teamname": "India", "teamsname": "IND"}));
        assert_eq!(a, b);
    }

    #[test]
    fn numeric_strings_parse() {
        let value = serde_json::json!({"runs": "52", "strkrate": "173.33", "overs": "18.2"});
        assert_eq!(pick_u64(&value, &["runs"]), Some(52));
        assert_eq!(pick_f64(&value, &["strkrate"]), Some(173.33));
        assert_eq!(pick_overs(&value, &["overs"]), Some(Overs::new(18, 2)));
    }
}
