use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use cricket_pulse::config::{default_events_db_path, load_dotenv};
use cricket_pulse::event_store::EventStore;
use cricket_pulse::logging::init_tracing;

const DEFAULT_LIMIT: usize = 50;

/// Prints stored events as JSON lines, oldest first, for the poster renderer.
fn main() -> Result<()> {
    load_dotenv();
    init_tracing();

    let db_path = arg_value("--db")
        .map(PathBuf::from)
        .or_else(|| std::env::var("EVENTS_DB").ok().map(PathBuf::from))
        .or_else(default_events_db_path)
        .ok_or_else(|| anyhow!("no events database path; pass --db"))?;
    if !db_path.exists() {
        return Err(anyhow!("events database not found at {}", db_path.display()));
    }
    let limit = match arg_value("--limit") {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid --limit {raw}"))?,
        None => DEFAULT_LIMIT,
    };

    let store = EventStore::open(&db_path)?;
    let mut events = match arg_value("--match") {
        Some(match_id) => store.events_for_match(&match_id)?,
        None => {
            let mut recent = store.recent(limit)?;
            recent.reverse();
            recent
        }
    };
    if events.len() > limit {
        events.drain(..events.len() - limit);
    }

    for event in &events {
        let line = serde_json::to_string(event).context("serialize event")?;
        println!("{line}");
    }
    eprintln!("{} event(s) from {}", events.len(), db_path.display());
    Ok(())
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
