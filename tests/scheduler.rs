use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};

use cricket_pulse::config::DetectorConfig;
use cricket_pulse::cricket_api::{ApiError, MatchApi};
use cricket_pulse::event_store::EventStore;
use cricket_pulse::events::{EventPayload, EventType};
use cricket_pulse::fake_feed::{LIVE_MATCH_ID, SimulatedApi, UPCOMING_MATCH_ID};
use cricket_pulse::images::ImageResolver;
use cricket_pulse::model::{ListingKind, MatchInfo, MatchSnapshot, PlayerProfile, Scorecard};
use cricket_pulse::monitor::{EventSink, MatchMonitor, PollOutcome};
use cricket_pulse::scheduler::{Scheduler, SchedulerSettings};
use cricket_pulse::task::CancelToken;

fn sink() -> EventSink {
    let store = EventStore::open_in_memory().expect("in-memory store");
    EventSink::new(
        Arc::new(store),
        ImageResolver::new("https://img.test", "/api/image"),
        None,
    )
}

fn settings(poll: Duration) -> SchedulerSettings {
    SchedulerSettings {
        live_poll_interval: poll,
        playing_xi_lead: ChronoDuration::minutes(60),
        toss_lead: ChronoDuration::minutes(30),
        detector: DetectorConfig::default(),
    }
}

/// Ticks until the simulated match leaves the toss and gets a monitor.
fn tick_until_started(scheduler: &mut Scheduler<SimulatedApi>) {
    for _ in 0..6 {
        let report = scheduler.tick(Utc::now());
        if report.started.iter().any(|id| id == LIVE_MATCH_ID) {
            return;
        }
    }
    panic!("live match never started");
}

/// Simulated feed whose first `failures` match-info requests fail.
struct FlakyInfoApi {
    inner: SimulatedApi,
    failures: usize,
    info_calls: AtomicUsize,
}

impl FlakyInfoApi {
    fn new(inner: SimulatedApi, failures: usize) -> Self {
        Self {
            inner,
            failures,
            info_calls: AtomicUsize::new(0),
        }
    }

    fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }
}

impl MatchApi for FlakyInfoApi {
    fn fetch_listing(&self, kind: ListingKind) -> Result<Vec<MatchSnapshot>, ApiError> {
        self.inner.fetch_listing(kind)
    }

    fn fetch_scorecard(&self, match_id: &str) -> Result<Scorecard, ApiError> {
        self.inner.fetch_scorecard(match_id)
    }

    fn fetch_match_info(&self, match_id: &str) -> Result<MatchInfo, ApiError> {
        let call = self.info_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ApiError::Transport("upstream returned 503".to_string()));
        }
        self.inner.fetch_match_info(match_id)
    }

    fn fetch_commentary(&self, match_id: &str) -> Result<Vec<String>, ApiError> {
        self.inner.fetch_commentary(match_id)
    }

    fn fetch_player(&self, player_id: u64) -> Result<PlayerProfile, ApiError> {
        self.inner.fetch_player(player_id)
    }
}

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(20);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn toss_window_runs_prematch_checks_once() {
    let sink = sink();
    let api = Arc::new(SimulatedApi::with_pace(3, 1, false));
    let mut scheduler = Scheduler::new(api, sink.clone(), settings(Duration::from_secs(3600)));

    let first = scheduler.tick(Utc::now());
    assert!(first.started.is_empty());
    // Live match at the toss plus the fixture inside its line-up window.
    assert_eq!(first.prematch_checks, 2);
    scheduler.tick(Utc::now());

    let store = sink.store();
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::Toss).expect("count"), 1);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::PlayingXi).expect("count"), 1);
    assert_eq!(store.count(UPCOMING_MATCH_ID, EventType::PlayingXi).expect("count"), 1);
    assert_eq!(store.count(UPCOMING_MATCH_ID, EventType::Toss).expect("count"), 0);
    scheduler.shutdown();
}

#[test]
fn one_monitor_per_live_match() {
    let api = Arc::new(SimulatedApi::with_pace(3, 1, false));
    let mut scheduler = Scheduler::new(api, sink(), settings(Duration::from_secs(3600)));

    tick_until_started(&mut scheduler);
    for _ in 0..3 {
        let report = scheduler.tick(Utc::now());
        assert!(report.started.is_empty());
        assert_eq!(report.active, 1);
    }
    assert_eq!(scheduler.active_monitors(), vec![LIVE_MATCH_ID.to_string()]);
    scheduler.shutdown();
}

#[test]
fn finished_match_is_recorded_once_and_not_restarted() {
    let sink = sink();
    let api = Arc::new(SimulatedApi::with_pace(5, 12, false));
    let mut scheduler = Scheduler::new(api.clone(), sink.clone(), settings(Duration::from_millis(5)));

    tick_until_started(&mut scheduler);
    api.finish();
    assert!(wait_for(|| scheduler.is_complete(LIVE_MATCH_ID)));
    assert!(wait_for(|| scheduler.active_monitors().is_empty()));

    for _ in 0..3 {
        let report = scheduler.tick(Utc::now());
        assert!(report.started.is_empty());
    }
    assert!(scheduler.is_complete(LIVE_MATCH_ID));

    let store = sink.store();
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::MatchEnd).expect("count"), 1);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::InningsEnd).expect("count"), 2);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::InningsBreak).expect("count"), 1);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::PowerplayEnd).expect("count"), 2);
    assert!(store.load_watermarks(LIVE_MATCH_ID).expect("watermarks").is_empty());
    scheduler.shutdown();
}

#[test]
fn run_returns_once_cancelled() {
    let api = Arc::new(SimulatedApi::with_pace(3, 1, false));
    let mut scheduler = Scheduler::new(api, sink(), settings(Duration::from_secs(3600)));
    let token = CancelToken::new();
    token.cancel();
    let started = Instant::now();
    scheduler.run(Duration::from_secs(3600), &token);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn monitor_waits_for_scorecard_then_reports_result() {
    let sink = sink();
    let api = Arc::new(SimulatedApi::with_pace(9, 6, false));
    let mut monitor = MatchMonitor::new(
        LIVE_MATCH_ID,
        api.clone(),
        sink.clone(),
        DetectorConfig::default(),
    );

    // Still at the toss: line-ups and toss are stored, no scorecard yet.
    assert_eq!(monitor.poll_once().expect("poll"), PollOutcome::Continue);
    let store = sink.store();
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::Toss).expect("count"), 1);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::PlayingXi).expect("count"), 1);

    api.finish();
    assert_eq!(monitor.poll_once().expect("poll"), PollOutcome::Complete);

    let events = store.events_for_match(LIVE_MATCH_ID).expect("events");
    let last = events.last().expect("at least one event");
    let EventPayload::MatchEnd(end) = &last.event else {
        panic!("result should be the last event");
    };
    assert!(end.player_of_match.is_some());
    assert_eq!(end.team1.team.short_name, "MUM");
    assert!(end.team1.score.is_some() && end.team2.score.is_some());

    // A restarted monitor finds the result already stored.
    let mut again = MatchMonitor::new(LIVE_MATCH_ID, api, sink.clone(), DetectorConfig::default());
    assert_eq!(again.poll_once().expect("poll"), PollOutcome::Complete);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::MatchEnd).expect("count"), 1);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::Toss).expect("count"), 1);
}

#[test]
fn failed_match_info_is_retried_on_the_next_poll() {
    let sink = sink();
    let api = Arc::new(FlakyInfoApi::new(SimulatedApi::with_pace(9, 1, false), 1));
    api.inner.advance(6);
    let mut monitor = MatchMonitor::new(
        LIVE_MATCH_ID,
        api.clone(),
        sink.clone(),
        DetectorConfig::default(),
    );
    let store = sink.store();

    // Match info fails: the toss still comes off the scorecard header.
    assert_eq!(monitor.poll_once().expect("poll"), PollOutcome::Continue);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::Toss).expect("count"), 1);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::PlayingXi).expect("count"), 0);

    monitor.poll_once().expect("poll");
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::PlayingXi).expect("count"), 1);
    assert_eq!(api.info_calls(), 2);

    for _ in 0..3 {
        monitor.poll_once().expect("poll");
    }
    assert_eq!(api.info_calls(), 2);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::Toss).expect("count"), 1);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::PlayingXi).expect("count"), 1);
}

#[test]
fn toss_is_read_from_scorecard_when_match_info_is_down() {
    let sink = sink();
    let api = Arc::new(FlakyInfoApi::new(SimulatedApi::with_pace(9, 1, false), usize::MAX));
    api.inner.advance(6);
    let mut monitor = MatchMonitor::new(LIVE_MATCH_ID, api, sink.clone(), DetectorConfig::default());

    for _ in 0..3 {
        assert_eq!(monitor.poll_once().expect("poll"), PollOutcome::Continue);
    }
    let store = sink.store();
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::Toss).expect("count"), 1);
    assert_eq!(store.count(LIVE_MATCH_ID, EventType::PlayingXi).expect("count"), 0);

    let events = store.events_for_match(LIVE_MATCH_ID).expect("events");
    let toss = events
        .iter()
        .find_map(|e| match &e.event {
            EventPayload::Toss(toss) => Some(toss),
            _ => None,
        })
        .expect("toss event");
    assert_eq!(toss.winner.short_name, "MUM");
    assert_eq!(toss.decision, "bat");
    assert_eq!(toss.opponent.as_ref().map(|t| t.short_name.as_str()), Some("LON"));
}
