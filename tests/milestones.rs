use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use cricket_pulse::config::DetectorConfig;
use cricket_pulse::cricket_api::{parse_commentary_json, parse_match_info_json, parse_scorecard_json};
use cricket_pulse::event_store::EventStore;
use cricket_pulse::events::{EventPayload, EventType};
use cricket_pulse::fake_feed::SimulatedApi;
use cricket_pulse::images::ImageResolver;
use cricket_pulse::milestones::{
    MilestoneTracker, detect_innings_break, detect_match_end, detect_playing_xi,
    detect_powerplay_end, detect_toss, innings_ended, top_batters, top_bowlers,
};
use cricket_pulse::model::{
    BatterLine, BowlerLine, Innings, MatchFormat, MatchState, Overs, PlayerRef, PowerplayBlock,
    Scorecard, TeamRef,
};
use cricket_pulse::monitor::EventSink;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn team(id: u64, name: &str, short: &str) -> TeamRef {
    TeamRef {
        id,
        name: name.to_string(),
        short_name: short.to_string(),
        image_id: Some(9_000 + id),
    }
}

fn batter(id: u64, name: &str, runs: u32, balls: u32) -> BatterLine {
    BatterLine {
        player: PlayerRef {
            id,
            name: name.to_string(),
            image_id: Some(id * 10),
        },
        runs,
        balls,
        fours: runs / 10,
        sixes: 0,
        strike_rate: if balls == 0 { 0.0 } else { runs as f64 * 100.0 / balls as f64 },
        is_captain: false,
        is_keeper: false,
        dismissal: None,
    }
}

fn bowler(id: u64, name: &str, wickets: u32, runs: u32) -> BowlerLine {
    BowlerLine {
        player: PlayerRef {
            id,
            name: name.to_string(),
            image_id: Some(id * 10),
        },
        overs: Overs::new(4, 0),
        maidens: 0,
        runs,
        wickets,
        economy: runs as f64 / 4.0,
    }
}

fn innings(number: u32, runs: u32, wickets: u32, overs: Overs, batters: Vec<BatterLine>) -> Innings {
    let (bat, bowl) = if number % 2 == 1 {
        (team(1, "Mumbai Mariners", "MUM"), team(2, "London Lions", "LON"))
    } else {
        (team(2, "London Lions", "LON"), team(1, "Mumbai Mariners", "MUM"))
    };
    Innings {
        number,
        batting_team: bat,
        bowling_team: bowl,
        runs,
        wickets,
        overs,
        batters,
        bowlers: vec![bowler(number as u64 * 1_000 + 1, "Seamer", 1, 30)],
        powerplays: vec![PowerplayBlock {
            label: "mandatory".to_string(),
            to_over: 6,
            runs: 48,
            wickets: 1,
        }],
    }
}

fn card(state: MatchState, innings: Vec<Innings>) -> Scorecard {
    Scorecard {
        match_id: "m1".to_string(),
        state,
        status_text: String::new(),
        format: MatchFormat::T20,
        innings,
        toss: None,
        players_of_match: Vec::new(),
    }
}

fn one_batter_card(runs: u32, balls: u32) -> Scorecard {
    card(
        MatchState::InProgress,
        vec![innings(1, runs + 20, 1, Overs::new(12, 3), vec![batter(101, "Rohan Mehta", runs, balls)])],
    )
}

fn sink(store: Arc<EventStore>) -> EventSink {
    EventSink::new(store, ImageResolver::new("https://img.test", "/api/image"), None)
}

fn milestones(events: &[EventPayload]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            EventPayload::Milestone(m) => Some(m.threshold),
            _ => None,
        })
        .collect()
}

#[test]
fn fifty_is_stored_once() {
    let store = Arc::new(EventStore::open_in_memory().expect("store"));
    let sink = sink(store.clone());
    let api = SimulatedApi::new(1);
    let mut tracker = MilestoneTracker::new("m1", DetectorConfig::default());

    assert!(milestones(&tracker.scan(&one_batter_card(45, 38))).is_empty());

    let events = tracker.scan(&one_batter_card(52, 41));
    assert_eq!(milestones(&events), vec![50]);
    for event in events {
        sink.record(&api, "m1", event.clone()).expect("record");
        tracker.settle(&event);
    }

    // Same snapshot again, then a fresh tracker replaying the crossing.
    assert!(milestones(&tracker.scan(&one_batter_card(52, 41))).is_empty());
    let mut replay = MilestoneTracker::new("m1", DetectorConfig::default());
    replay.scan(&one_batter_card(45, 38));
    for event in replay.scan(&one_batter_card(52, 41)) {
        sink.record(&api, "m1", event).expect("record");
    }

    assert_eq!(store.count("m1", EventType::Milestone).expect("count"), 1);
    let stored = store.events_for_match("m1").expect("events");
    let EventPayload::Milestone(m) = &stored[0].event else {
        panic!("expected a milestone");
    };
    assert_eq!(m.player.id, 101);
    assert_eq!(m.runs, 52);
    assert_eq!(m.player.image_url.as_deref(), Some("https://img.test/c1010/i.jpg"));
    assert_eq!(m.team.flag_url.as_deref(), Some("https://img.test/c9001/i.jpg"));
}

#[test]
fn big_jump_crosses_every_threshold() {
    let mut tracker = MilestoneTracker::new("m1", DetectorConfig::default());
    tracker.scan(&one_batter_card(40, 30));
    let events = tracker.scan(&one_batter_card(110, 70));
    assert_eq!(milestones(&events), vec![50, 100]);
}

#[test]
fn restored_watermarks_suppress_old_crossings() {
    let store = EventStore::open_in_memory().expect("store");
    let mut tracker = MilestoneTracker::new("m1", DetectorConfig::default());
    tracker.scan(&one_batter_card(61, 44));
    store
        .save_watermarks("m1", tracker.watermarks())
        .expect("save watermarks");

    let marks = store.load_watermarks("m1").expect("load watermarks");
    assert_eq!(marks.get(&(1, 101)), Some(&61));
    let mut resumed = MilestoneTracker::new("m1", DetectorConfig::default()).with_watermarks(marks);
    assert!(milestones(&resumed.scan(&one_batter_card(63, 46))).is_empty());

    store.clear_watermarks("m1").expect("clear");
    assert!(store.load_watermarks("m1").expect("load").is_empty());
}

#[test]
fn first_sighting_above_threshold_still_counts() {
    let mut tracker = MilestoneTracker::new("m1", DetectorConfig::default());
    assert_eq!(milestones(&tracker.scan(&one_batter_card(57, 40))), vec![50]);
}

#[test]
fn innings_end_is_stored_once_under_repeated_snapshots() {
    let store = Arc::new(EventStore::open_in_memory().expect("store"));
    let sink = sink(store.clone());
    let api = SimulatedApi::new(1);
    let mut tracker = MilestoneTracker::new("m1", DetectorConfig::default());
    let all_out = card(
        MatchState::InProgress,
        vec![innings(1, 133, 10, Overs::new(18, 4), vec![batter(101, "Rohan Mehta", 33, 30)])],
    );

    for _ in 0..4 {
        for event in tracker.scan(&all_out) {
            sink.record(&api, "m1", event.clone()).expect("record");
            tracker.settle(&event);
        }
    }
    assert!(tracker.is_settled(EventType::InningsEnd, "1"));
    assert!(tracker.scan(&all_out).is_empty());
    assert_eq!(store.count("m1", EventType::InningsEnd).expect("count"), 1);
    assert_eq!(store.count("m1", EventType::PowerplayEnd).expect("count"), 1);
}

#[test]
fn unsettled_innings_event_is_offered_again() {
    let mut tracker = MilestoneTracker::new("m1", DetectorConfig::default());
    let finished = card(
        MatchState::InProgress,
        vec![innings(1, 170, 6, Overs::new(20, 0), Vec::new())],
    );
    let offered = |events: Vec<EventPayload>| {
        events
            .iter()
            .filter(|e| e.event_type() == EventType::InningsEnd)
            .count()
    };
    assert_eq!(offered(tracker.scan(&finished)), 1);
    assert_eq!(offered(tracker.scan(&finished)), 1);
}

#[test]
fn powerplay_waits_for_the_window() {
    let early = card(
        MatchState::InProgress,
        vec![innings(1, 45, 1, Overs::new(5, 5), Vec::new())],
    );
    assert!(detect_powerplay_end(&early, &early.innings[0], 6).is_none());

    let done = card(
        MatchState::InProgress,
        vec![innings(1, 52, 1, Overs::new(6, 0), Vec::new())],
    );
    let Some(EventPayload::PowerplayEnd(pp)) = detect_powerplay_end(&done, &done.innings[0], 6)
    else {
        panic!("powerplay should close at six overs");
    };
    assert_eq!((pp.overs, pp.runs, pp.wickets), (6, 48, 1));
    assert_eq!(pp.run_rate, 8.0);
}

#[test]
fn innings_break_sets_target_and_chasing_captain() {
    let mut chasers = innings(2, 4, 0, Overs::new(0, 3), vec![batter(201, "Liam Carter", 4, 3)]);
    chasers.batters[0].is_captain = true;
    let snapshot = card(
        MatchState::InProgress,
        vec![innings(1, 160, 7, Overs::new(20, 0), Vec::new()), chasers],
    );
    assert!(innings_ended(&snapshot, &snapshot.innings[0]));
    assert!(!innings_ended(&snapshot, &snapshot.innings[1]));

    let Some(EventPayload::InningsBreak(b)) = detect_innings_break(&snapshot) else {
        panic!("expected an innings break");
    };
    assert_eq!(b.target, 161);
    assert_eq!(b.chasing_team.id, 2);
    assert_eq!(b.defending_team.id, 1);
    assert_eq!(b.captain.map(|c| c.id), Some(201));
    assert_eq!(b.first_innings_overs, "20");
}

#[test]
fn no_break_before_the_chase_starts() {
    let snapshot = card(
        MatchState::Break,
        vec![innings(1, 160, 7, Overs::new(20, 0), Vec::new())],
    );
    assert!(detect_innings_break(&snapshot).is_none());
}

#[test]
fn top_performers_break_ties() {
    let mut inns = innings(
        1,
        180,
        6,
        Overs::new(20, 0),
        vec![
            batter(1, "Slow", 40, 35),
            batter(2, "Quick", 40, 22),
            batter(3, "Top", 71, 44),
        ],
    );
    inns.bowlers = vec![
        bowler(11, "Costly", 3, 30),
        bowler(12, "Tidy", 3, 24),
        bowler(13, "Wicketless", 0, 12),
    ];
    let bats = top_batters(&inns, 2).iter().map(|b| b.player.id).collect::<Vec<_>>();
    assert_eq!(bats, vec![3, 2]);
    let bowls = top_bowlers(&inns, 2).iter().map(|b| b.player.id).collect::<Vec<_>>();
    assert_eq!(bowls, vec![12, 11]);
}

#[test]
fn toss_and_playing_xi_from_match_info() {
    let info = parse_match_info_json(&read_fixture("match_info.json"), "90101").expect("parse");

    let Some(EventPayload::Toss(toss)) = detect_toss(&info) else {
        panic!("expected a toss event");
    };
    assert_eq!(toss.winner.id, 2);
    assert_eq!(toss.decision, "bat");
    assert_eq!(toss.opponent.map(|t| t.name), Some("Australia".to_string()));
    assert_eq!(toss.summary, "India won the toss and elected to bat");

    let Some(EventPayload::PlayingXi(xi)) = detect_playing_xi(&info) else {
        panic!("expected a playing XI event");
    };
    assert_eq!(xi.teams.len(), 2);
    assert!(xi.teams.iter().all(|t| t.players.len() == 11));
    assert!(xi.teams[0].players[0].captain);
    assert_eq!(xi.teams[0].players[0].player.role.as_deref(), Some("Batsman"));
}

#[test]
fn no_playing_xi_without_lineups() {
    let info =
        parse_match_info_json(&read_fixture("match_info_prematch.json"), "91001").expect("parse");
    assert!(detect_playing_xi(&info).is_none());
    assert!(detect_toss(&info).is_none());
}

#[test]
fn match_end_names_player_from_commentary() {
    let card = parse_scorecard_json(&read_fixture("scorecard_compact.json"), "91001").expect("parse");
    let commentary = parse_commentary_json(&read_fixture("commentary.json")).expect("parse");

    let Some(EventPayload::MatchEnd(end)) = detect_match_end(&card, None, &commentary) else {
        panic!("expected a match end event");
    };
    assert_eq!(end.result, "Valley Vipers won by 7 wkts");
    assert_eq!(end.team1.team.id, 51);
    assert_eq!(end.team1.score.as_deref(), Some("148"));
    assert_eq!(end.team2.score.as_deref(), Some("149/3"));
    assert_eq!(end.player_of_match.map(|p| p.id), Some(5204));

    let surname_only =
        parse_commentary_json(&read_fixture("commentary_compact.json")).expect("parse");
    let Some(EventPayload::MatchEnd(end)) = detect_match_end(&card, None, &surname_only) else {
        panic!("expected a match end event");
    };
    assert_eq!(end.player_of_match.map(|p| p.name), Some("Gus Reed".to_string()));
}

#[test]
fn no_match_end_while_in_progress() {
    let card = parse_scorecard_json(&read_fixture("scorecard_classic.json"), "90101").expect("parse");
    assert!(detect_match_end(&card, None, &[]).is_none());
}

#[test]
fn failed_profile_lookup_leaves_only_that_image_empty() {
    let store = Arc::new(EventStore::open_in_memory().expect("store"));
    let sink = sink(store.clone());
    let api = SimulatedApi::new(1);
    let mut tracker = MilestoneTracker::new("m1", DetectorConfig::default());

    let mut unlucky = batter(107, "Omar Siddiqui", 41, 33);
    unlucky.player.image_id = None;
    let mut lucky = batter(102, "Kiran Rao", 30, 25);
    lucky.player.image_id = None;
    let all_out = card(
        MatchState::InProgress,
        vec![innings(1, 140, 10, Overs::new(19, 1), vec![unlucky, lucky])],
    );

    for event in tracker.scan(&all_out) {
        if event.event_type() == EventType::InningsEnd {
            assert!(sink.record(&api, "m1", event).expect("record"));
        }
    }

    let stored = store.events_for_match("m1").expect("events");
    let EventPayload::InningsEnd(end) = &stored[0].event else {
        panic!("expected the innings end");
    };
    let ids = end.top_batters.iter().map(|b| b.player.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![107, 102]);
    assert_eq!(end.top_batters[0].player.image_url, None);
    assert_eq!(
        end.top_batters[1].player.image_url.as_deref(),
        Some("https://img.test/c500102/i.jpg")
    );
    assert_eq!(
        end.top_bowlers[0].player.image_url.as_deref(),
        Some("https://img.test/c10010/i.jpg")
    );
}
