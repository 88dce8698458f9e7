use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::MatchSnapshot;
use crate::reconcile::Watermark;

const CACHE_VERSION: u32 = 1;

/// What the scoreboard needs to come back up showing the last known board.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BoardCache {
    pub version: u32,
    #[serde(default)]
    pub saved_at: u64,
    #[serde(default)]
    pub watermarks: HashMap<String, Watermark>,
    #[serde(default)]
    pub live: Vec<MatchSnapshot>,
    #[serde(default)]
    pub completed: Vec<MatchSnapshot>,
    #[serde(default)]
    pub upcoming: Vec<MatchSnapshot>,
}

impl BoardCache {
    pub fn new(
        watermarks: HashMap<String, Watermark>,
        live: Vec<MatchSnapshot>,
        completed: Vec<MatchSnapshot>,
        upcoming: Vec<MatchSnapshot>,
    ) -> Self {
        Self {
            version: CACHE_VERSION,
            saved_at: now_secs(),
            watermarks,
            live,
            completed,
            upcoming,
        }
    }
}

/// Missing, unreadable or outdated files load as `None`.
pub fn load(path: &Path) -> Option<BoardCache> {
    let raw = fs::read_to_string(path).ok()?;
    let cache = serde_json::from_str::<BoardCache>(&raw).ok()?;
    if cache.version != CACHE_VERSION {
        return None;
    }
    Some(cache)
}

pub fn save(path: &Path, cache: &BoardCache) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize scoreboard cache")?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
