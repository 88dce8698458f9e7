use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::warn;

use crate::config::ApiConfig;
use crate::cricket_api::MatchApi;
use crate::events::EventPayload;

/// Turns upstream image ids into fetchable references.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    cdn_base: String,
    proxy_prefix: String,
}

impl ImageResolver {
    pub fn new(cdn_base: impl Into<String>, proxy_prefix: impl Into<String>) -> Self {
        Self {
            cdn_base: cdn_base.into().trim_end_matches('/').to_string(),
            proxy_prefix: proxy_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(&config.image_cdn_base, &config.image_proxy_prefix)
    }

    /// Same-origin path; keeps the API key off the client.
    pub fn proxy_path(&self, image_id: u64) -> String {
        format!("{}/{image_id}", self.proxy_prefix)
    }

    /// Directly fetchable URL, used in persisted payloads.
    pub fn cdn_url(&self, image_id: u64) -> String {
        format!("{}/c{image_id}/i.jpg", self.cdn_base)
    }
}

pub fn build_profile_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("profile-{i}"))
        .build()
        .ok()
}

fn with_pool<T>(pool: Option<&rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool {
        pool.install(action)
    } else {
        action()
    }
}

struct ProfileBits {
    image_id: Option<u64>,
    role: Option<String>,
}

/// Fills image URLs for every team and player in `payload`. Players without an
/// image id are looked up in parallel; a failed lookup leaves that player's image
/// empty and is only logged.
pub fn enrich_payload<A>(
    payload: &mut EventPayload,
    api: &A,
    resolver: &ImageResolver,
    pool: Option<&rayon::ThreadPool>,
) where
    A: MatchApi + ?Sized,
{
    for team in payload.teams_mut() {
        team.flag_url = team.image_id.map(|id| resolver.cdn_url(id));
    }

    let missing = payload
        .players_mut()
        .into_iter()
        .filter(|p| p.image_id.is_none() && p.id != 0)
        .map(|p| p.id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    let fetched: HashMap<u64, ProfileBits> = if missing.is_empty() {
        HashMap::new()
    } else {
        with_pool(pool, || {
            missing
                .par_iter()
                .filter_map(|id| match api.fetch_player(*id) {
                    Ok(profile) => Some((
                        *id,
                        ProfileBits {
                            image_id: profile.image_id,
                            role: profile.role,
                        },
                    )),
                    Err(err) => {
                        warn!(player_id = id, error = %err, "player profile lookup failed");
                        None
                    }
                })
                .collect()
        })
    };

    for player in payload.players_mut() {
        if let Some(bits) = fetched.get(&player.id) {
            player.image_id = player.image_id.or(bits.image_id);
            if player.role.is_none() {
                player.role = bits.role.clone();
            }
        }
        player.image_url = player.image_id.map(|id| resolver.cdn_url(id));
    }
}
