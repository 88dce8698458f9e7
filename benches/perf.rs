use std::collections::HashMap;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use cricket_pulse::config::DetectorConfig;
use cricket_pulse::cricket_api::{parse_listing_json, parse_scorecard_json};
use cricket_pulse::milestones::MilestoneTracker;
use cricket_pulse::model::{InningsScore, MatchFormat, MatchSnapshot, MatchState, Overs, TeamRef};
use cricket_pulse::reconcile::reconcile;

fn live_board(size: usize, runs: u32) -> Vec<MatchSnapshot> {
    (0..size)
        .map(|idx| MatchSnapshot {
            match_id: format!("m{idx}"),
            series: "Bench Series".to_string(),
            description: format!("Match {idx}"),
            format: MatchFormat::T20,
            state: MatchState::InProgress,
            status_text: String::new(),
            team1: TeamRef {
                id: 1,
                name: "Home".to_string(),
                short_name: "HOM".to_string(),
                image_id: None,
            },
            team2: TeamRef {
                id: 2,
                name: "Away".to_string(),
                short_name: "AWY".to_string(),
                image_id: None,
            },
            team1_score: Some(InningsScore {
                runs: runs + idx as u32,
                wickets: 3,
                overs: Overs::new(15, 2),
            }),
            team2_score: None,
            start: None,
            end: None,
        })
        .collect()
}

fn bench_reconcile(c: &mut Criterion) {
    let previous = live_board(40, 150);
    let stale = live_board(40, 148);
    let mut marks = HashMap::new();
    reconcile(&[], previous.clone(), &mut marks);

    c.bench_function("reconcile_stale_board", |b| {
        b.iter(|| {
            let out = reconcile(black_box(&previous), black_box(stale.clone()), &mut marks);
            black_box(out.len());
        })
    });
}

fn bench_listing_parse(c: &mut Criterion) {
    c.bench_function("listing_parse", |b| {
        b.iter(|| {
            let rows = parse_listing_json(black_box(LISTING_JSON)).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_scorecard_parse(c: &mut Criterion) {
    c.bench_function("scorecard_parse", |b| {
        b.iter(|| {
            let card = parse_scorecard_json(black_box(SCORECARD_JSON), "90101").unwrap();
            black_box(card.innings.len());
        })
    });
}

fn bench_tracker_scan(c: &mut Criterion) {
    let card = parse_scorecard_json(SCORECARD_JSON, "90101").expect("valid fixture json");
    c.bench_function("tracker_scan", |b| {
        b.iter(|| {
            let mut tracker = MilestoneTracker::new("90101", DetectorConfig::default());
            let events = tracker.scan(black_box(&card));
            black_box(events.len());
        })
    });
}

criterion_group!(
    perf,
    bench_reconcile,
    bench_listing_parse,
    bench_scorecard_parse,
    bench_tracker_scan
);
criterion_main!(perf);

static LISTING_JSON: &str = include_str!("../tests/fixtures/listing_live.json");
static SCORECARD_JSON: &str = include_str!("../tests/fixtures/scorecard_classic.json");
