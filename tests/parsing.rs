use std::fs;
use std::path::PathBuf;

use chrono::DateTime;

use cricket_pulse::cricket_api::{
    ApiError, parse_commentary_json, parse_listing_json, parse_match_info_json,
    parse_player_json, parse_scorecard_json,
};
use cricket_pulse::model::{MatchFormat, MatchState, Overs};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_live_listing_fixture() {
    let raw = read_fixture("listing_live.json");
    let rows = parse_listing_json(&raw).expect("fixture should parse");
    let ids = rows.iter().map(|r| r.match_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["90101", "90102", "90201"]);

    let live = &rows[0];
    assert_eq!(live.state, MatchState::InProgress);
    assert_eq!(live.format, MatchFormat::T20);
    assert_eq!(live.series, "Tri-Series 2026");
    assert_eq!(live.team1.id, 2);
    assert_eq!(live.team1.short_name, "IND");
    assert_eq!(live.team1.image_id, Some(719031));
    let first = live.team1_score.expect("team1 score");
    assert_eq!((first.runs, first.wickets), (182, 6));
    assert_eq!(first.overs, Overs::new(20, 0));
    assert_eq!(live.team2_score.map(|s| s.overs), Some(Overs::new(16, 4)));
    assert_eq!(live.start, DateTime::from_timestamp_millis(1_781_000_000_000));

    assert_eq!(rows[1].state, MatchState::Complete);
    // Stumps is a break, and the latest innings wins.
    assert_eq!(rows[2].state, MatchState::Break);
    assert_eq!(rows[2].team2_runs(), 80);
}

#[test]
fn parses_lowercase_listing_fixture() {
    let raw = read_fixture("listing_upcoming.json");
    let rows = parse_listing_json(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].match_id, "91001");
    assert_eq!(rows[0].state, MatchState::Upcoming);
    assert_eq!(rows[0].series, "City Super League");
    assert_eq!(rows[0].team1.id, 51);
    assert_eq!(rows[0].team1.image_id, Some(860001));
    assert_eq!(rows[0].team2.short_name, "VV");
    assert!(rows[0].team1_score.is_none());
    assert!(rows[0].start.is_some());
    assert_eq!(rows[1].match_id, "91002");
    assert_eq!(rows[1].state, MatchState::Toss);
}

#[test]
fn listing_null_is_empty() {
    assert!(parse_listing_json("null").expect("null should parse").is_empty());
    assert!(parse_listing_json("").expect("empty should parse").is_empty());
    assert!(parse_listing_json("{}").expect("object should parse").is_empty());
}

#[test]
fn malformed_listing_is_a_parse_error() {
    let err = parse_listing_json("{not json").expect_err("should fail");
    assert!(matches!(err, ApiError::Parse(_)));
}

#[test]
fn parses_keyed_row_scorecard() {
    let raw = read_fixture("scorecard_classic.json");
    let card = parse_scorecard_json(&raw, "90101").expect("fixture should parse");
    assert_eq!(card.match_id, "90101");
    assert_eq!(card.state, MatchState::InProgress);
    assert_eq!(card.format, MatchFormat::T20);
    assert_eq!(card.innings.len(), 2);

    let first = card.innings(1).expect("first innings");
    assert_eq!(first.batting_team.id, 2);
    assert_eq!(first.batting_team.short_name, "IND");
    assert_eq!(first.bowling_team.id, 4);
    assert_eq!((first.runs, first.wickets), (182, 6));
    assert_eq!(first.overs, Overs::new(20, 0));
    let batter_ids = first.batters.iter().map(|b| b.player.id).collect::<Vec<_>>();
    assert_eq!(batter_ids, vec![1001, 1002, 1003, 1004, 1010]);
    assert_eq!(first.captain().map(|p| p.id), Some(1001));
    assert!(first.batters[3].is_keeper);
    assert_eq!(first.batters[4].dismissal, None);
    assert_eq!(first.bowlers.len(), 4);
    assert_eq!(first.powerplays.len(), 1);
    assert_eq!(first.powerplays[0].to_over, 6);
    assert_eq!(first.powerplays[0].runs, 58);

    let second = card.innings(2).expect("second innings");
    assert_eq!(second.overs, Overs::new(16, 4));
    assert_eq!(second.bowlers[1].overs, Overs::new(3, 4));

    let toss = card.toss.as_ref().expect("toss");
    assert_eq!(toss.winner_id, Some(2));
    assert_eq!(toss.winner_name, "India");
    assert!(card.players_of_match.is_empty());
}

#[test]
fn parses_array_row_scorecard() {
    let raw = read_fixture("scorecard_compact.json");
    let card = parse_scorecard_json(&raw, "91001").expect("fixture should parse");
    assert_eq!(card.state, MatchState::Complete);
    assert_eq!(card.status_text, "Valley Vipers won by 7 wkts");

    let first = &card.innings[0];
    assert_eq!(first.batting_team.id, 51);
    assert_eq!(first.batting_team.name, "Harbour Hawks");
    assert_eq!(first.bowling_team.id, 52);
    assert_eq!((first.runs, first.wickets), (148, 10));
    assert_eq!(first.overs, Overs::new(19, 4));
    assert_eq!(first.batters[0].runs, 63);
    assert_eq!(first.batters[0].strike_rate, 153.66);
    assert!(first.batters[0].is_captain);
    assert_eq!(first.batters[0].dismissal.as_deref(), Some("c Ray b Moss"));
    assert_eq!(first.powerplays[0].runs, 44);
    assert_eq!(first.powerplays[0].wickets, 2);

    let second = &card.innings[1];
    assert_eq!(second.batting_team.id, 52);
    assert_eq!(second.overs, Overs::new(17, 2));
    assert_eq!(second.batters[0].runs, 101);
}

#[test]
fn empty_scorecard_is_not_available() {
    let err = parse_scorecard_json("null", "1").expect_err("should fail");
    assert!(err.is_not_available());
}

#[test]
fn parses_match_info_fixture() {
    let raw = read_fixture("match_info.json");
    let info = parse_match_info_json(&raw, "90101").expect("fixture should parse");
    assert_eq!(info.state, MatchState::Toss);
    assert_eq!(info.teams.len(), 2);
    assert_eq!(info.teams[0].team.name, "India");
    assert_eq!(info.teams[0].players.len(), 12);
    assert_eq!(info.teams[0].playing_xi().len(), 11);
    assert_eq!(info.teams[1].players.len(), 13);
    assert_eq!(info.teams[1].playing_xi().len(), 11);
    assert!(info.teams[0].players[0].captain);
    assert_eq!(info.teams[0].players[0].player.image_id, Some(10001));
    assert_eq!(info.teams[0].players[1].player.image_id, None);
    assert_eq!(info.venue.as_deref(), Some("Wankhede Stadium, Mumbai"));
    assert_eq!(
        info.toss.as_ref().map(|t| t.decision.as_str()),
        Some("Batting")
    );
}

#[test]
fn prematch_info_without_lineups() {
    let raw = read_fixture("match_info_prematch.json");
    let info = parse_match_info_json(&raw, "91001").expect("fixture should parse");
    assert_eq!(info.state, MatchState::Upcoming);
    assert!(info.toss.is_none());
    assert!(info.teams.iter().all(|t| t.players.is_empty()));
}

#[test]
fn parses_both_commentary_shapes() {
    let lines = parse_commentary_json(&read_fixture("commentary.json")).expect("should parse");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("Player of the Match"));

    let lines =
        parse_commentary_json(&read_fixture("commentary_compact.json")).expect("should parse");
    assert_eq!(lines, vec!["Reed named player of the match", "Thanks for joining us"]);
}

#[test]
fn parses_player_fixture() {
    let profile = parse_player_json(&read_fixture("player.json"), 1003).expect("should parse");
    assert_eq!(profile.id, 1003);
    assert_eq!(profile.name, "Virat Kohli");
    assert_eq!(profile.image_id, Some(332891));
    assert_eq!(profile.team.as_deref(), Some("India"));
}

#[test]
fn nameless_player_is_rejected() {
    let err = parse_player_json(r#"{"id": 5}"#, 5).expect_err("should fail");
    assert!(matches!(err, ApiError::Parse(_)));
}
