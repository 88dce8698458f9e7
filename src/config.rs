use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use crate::http_cache::app_cache_dir;

const DEFAULT_API_BASE: &str = "https://cricbuzz-cricket.p.rapidapi.com";
const DEFAULT_API_HOST: &str = "cricbuzz-cricket.p.rapidapi.com";
const DEFAULT_IMAGE_CDN: &str = "https://static.cricbuzz.com/a/img/v1/i1";
const DEFAULT_IMAGE_PROXY: &str = "/api/image";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_host: String,
    pub image_cdn_base: String,
    pub image_proxy_prefix: String,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: opt_env("CRICKET_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: opt_env("CRICKET_API_KEY"),
            api_host: opt_env("CRICKET_API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            image_cdn_base: opt_env("IMAGE_CDN_BASE")
                .unwrap_or_else(|| DEFAULT_IMAGE_CDN.to_string())
                .trim_end_matches('/')
                .to_string(),
            image_proxy_prefix: opt_env("IMAGE_PROXY_PREFIX")
                .unwrap_or_else(|| DEFAULT_IMAGE_PROXY.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            api_key: None,
            api_host: DEFAULT_API_HOST.to_string(),
            image_cdn_base: DEFAULT_IMAGE_CDN.to_string(),
            image_proxy_prefix: DEFAULT_IMAGE_PROXY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub thresholds: Vec<u32>,
    pub powerplay_overs: u32,
}

impl DetectorConfig {
    pub fn from_env() -> Self {
        let thresholds = opt_env("MILESTONE_THRESHOLDS")
            .map(|raw| parse_thresholds(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec![50, 100]);
        Self {
            thresholds,
            powerplay_overs: env_u64("POWERPLAY_OVERS", 6, 1, 20) as u32,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![50, 100],
            powerplay_overs: 6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub api: ApiConfig,
    pub detector: DetectorConfig,
    pub db_path: Option<PathBuf>,
    pub discovery_interval: Duration,
    pub live_poll_interval: Duration,
    pub playing_xi_lead: ChronoDuration,
    pub toss_lead: ChronoDuration,
    pub profile_parallelism: usize,
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            detector: DetectorConfig::from_env(),
            db_path: opt_env("EVENTS_DB")
                .map(PathBuf::from)
                .or_else(default_events_db_path),
            discovery_interval: Duration::from_secs(env_u64("DISCOVERY_POLL_SECS", 60, 15, 3600)),
            live_poll_interval: Duration::from_secs(env_u64("LIVE_POLL_SECS", 20, 5, 600)),
            playing_xi_lead: ChronoDuration::minutes(env_u64("PLAYING_XI_LEAD_MINS", 60, 1, 600) as i64),
            toss_lead: ChronoDuration::minutes(env_u64("TOSS_LEAD_MINS", 30, 1, 600) as i64),
            profile_parallelism: env_u64("PROFILE_PARALLELISM", 4, 2, 16) as usize,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreboardConfig {
    pub api: ApiConfig,
    pub fast_interval: Duration,
    pub full_interval: Duration,
    pub recent_window: ChronoDuration,
    pub cache_path: Option<PathBuf>,
}

impl ScoreboardConfig {
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            fast_interval: Duration::from_secs(env_u64("SCOREBOARD_FAST_SECS", 20, 5, 600)),
            full_interval: Duration::from_secs(env_u64("SCOREBOARD_FULL_SECS", 900, 60, 86_400)),
            recent_window: ChronoDuration::hours(env_u64("RECENT_WINDOW_HOURS", 6, 1, 72) as i64),
            cache_path: app_cache_dir().map(|dir| dir.join("scoreboard.json")),
        }
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn default_events_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("events.sqlite"))
}

pub fn parse_thresholds(raw: &str) -> Vec<u32> {
    let mut out = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter(|t| *t > 0)
        .collect::<Vec<_>>();
    out.sort_unstable();
    out.dedup();
    out
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        if val.trim().is_empty() {
            None
        } else {
            Some(val.trim().to_string())
        }
    })
}

fn env_u64(key: &str, default: u64, min: u64, max: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<u64>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}
