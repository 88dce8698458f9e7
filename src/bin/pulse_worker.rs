use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tracing::info;

use cricket_pulse::config::{WorkerConfig, load_dotenv};
use cricket_pulse::cricket_api::{CricApiClient, MatchApi};
use cricket_pulse::event_store::EventStore;
use cricket_pulse::fake_feed::SimulatedApi;
use cricket_pulse::images::{ImageResolver, build_profile_pool};
use cricket_pulse::logging::init_tracing;
use cricket_pulse::monitor::EventSink;
use cricket_pulse::scheduler::{Scheduler, SchedulerSettings};
use cricket_pulse::task::CancelToken;

fn main() -> Result<()> {
    load_dotenv();
    init_tracing();

    let simulate = has_flag("--simulate");
    let once = has_flag("--once");
    let mut config = WorkerConfig::from_env();
    if let Some(path) = parse_db_path_arg() {
        config.db_path = Some(path);
    }
    let db_path = config
        .db_path
        .clone()
        .ok_or_else(|| anyhow!("no events database path; set EVENTS_DB or pass --db"))?;

    let api: Arc<dyn MatchApi> = if simulate {
        config.live_poll_interval = config.live_poll_interval.min(Duration::from_secs(2));
        config.discovery_interval = config.discovery_interval.min(Duration::from_secs(5));
        Arc::new(SimulatedApi::with_pace(7, 12, false))
    } else {
        if config.api.api_key.is_none() {
            return Err(anyhow!("CRICKET_API_KEY is not set (use --simulate for the offline feed)"));
        }
        Arc::new(CricApiClient::new(config.api.clone()))
    };

    let store = EventStore::open(&db_path)
        .with_context(|| format!("open events db {}", db_path.display()))?;
    let pool = build_profile_pool(config.profile_parallelism).map(Arc::new);
    let sink = EventSink::new(
        Arc::new(store),
        ImageResolver::from_config(&config.api),
        pool,
    );

    info!(
        db = %db_path.display(),
        discovery_secs = config.discovery_interval.as_secs(),
        live_secs = config.live_poll_interval.as_secs(),
        thresholds = ?config.detector.thresholds,
        simulate,
        "worker starting"
    );

    let mut scheduler = Scheduler::new(api, sink, SchedulerSettings::from_config(&config));
    if once {
        let report = scheduler.tick(Utc::now());
        println!(
            "Tick: started={:?} prematch_checks={} active={} errors={}",
            report.started,
            report.prematch_checks,
            report.active,
            report.errors.len()
        );
        scheduler.shutdown();
        return Ok(());
    }

    let token = CancelToken::new();
    scheduler.run(config.discovery_interval, &token);
    Ok(())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
