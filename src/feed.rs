use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::config::ScoreboardConfig;
use crate::cricket_api::{FeedMode, MatchApi};
use crate::model::MatchSnapshot;
use crate::poll_gate::PollGate;
use crate::reconcile::ReconcileBoard;
use crate::state::{Delta, ProviderCommand, merge_completed};
use crate::watermark_store::{self, BoardCache};

const IDLE_SLEEP: Duration = Duration::from_millis(200);

/// Scoreboard data source: fetches, reconciles and turns results into deltas.
/// Keeps its own last-known lists so a failed fetch never blanks the board.
pub struct ScoreboardProvider<A: MatchApi + ?Sized> {
    api: Arc<A>,
    board: ReconcileBoard,
    completed: Vec<MatchSnapshot>,
    upcoming: Vec<MatchSnapshot>,
    recent_window: ChronoDuration,
    cache_path: Option<PathBuf>,
}

impl<A: MatchApi + ?Sized> ScoreboardProvider<A> {
    pub fn new(api: Arc<A>, recent_window: ChronoDuration, cache_path: Option<PathBuf>) -> Self {
        Self {
            api,
            board: ReconcileBoard::new(),
            completed: Vec::new(),
            upcoming: Vec::new(),
            recent_window,
            cache_path,
        }
    }

    /// Restores the last saved board. Returns the deltas that show it.
    pub fn restore(&mut self) -> Vec<Delta> {
        let Some(cache) = self.cache_path.as_deref().and_then(watermark_store::load) else {
            return Vec::new();
        };
        self.board = ReconcileBoard::with_state(cache.live.clone(), cache.watermarks);
        self.completed = cache.completed.clone();
        self.upcoming = cache.upcoming.clone();
        vec![
            Delta::SetLive(cache.live),
            Delta::SetCompleted(cache.completed),
            Delta::SetUpcoming(cache.upcoming),
            Delta::Log("[INFO] Restored last known scoreboard".to_string()),
        ]
    }

    pub fn poll(&mut self, mode: FeedMode, now: DateTime<Utc>) -> Vec<Delta> {
        let feed = match self.api.fetch_feed(mode, now, self.recent_window) {
            Ok(feed) => feed,
            Err(err) => return vec![Delta::FetchFailed(err.to_string())],
        };

        let mut deltas = Vec::new();
        let live = self.board.apply(feed.live, &feed.completed).to_vec();
        deltas.push(Delta::SetLive(live));

        match mode {
            FeedMode::Full => {
                self.completed = feed.completed.clone();
                deltas.push(Delta::SetCompleted(feed.completed));
            }
            FeedMode::LiveOnly => {
                merge_completed(&mut self.completed, feed.completed.clone());
                deltas.push(Delta::MergeCompleted(feed.completed));
            }
        }
        if let Some(upcoming) = feed.upcoming {
            self.upcoming = upcoming.clone();
            deltas.push(Delta::SetUpcoming(upcoming));
        }
        for warning in feed.warnings {
            deltas.push(Delta::Log(format!("[WARN] {warning}")));
        }
        if let Err(err) = self.save() {
            deltas.push(Delta::Log(format!("[WARN] Scoreboard cache not saved: {err}")));
        }
        deltas.push(Delta::FetchOk(now));
        deltas
    }

    pub fn board(&self) -> &ReconcileBoard {
        &self.board
    }

    fn save(&self) -> anyhow::Result<()> {
        let Some(path) = self.cache_path.as_deref() else {
            return Ok(());
        };
        let cache = BoardCache::new(
            self.board.watermarks().clone(),
            self.board.live().to_vec(),
            self.completed.clone(),
            self.upcoming.clone(),
        );
        watermark_store::save(path, &cache)
    }
}

pub fn spawn_provider<A>(
    api: Arc<A>,
    config: ScoreboardConfig,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) where
    A: MatchApi + ?Sized + 'static,
{
    thread::spawn(move || {
        let mut provider = ScoreboardProvider::new(api, config.recent_window, config.cache_path);
        for delta in provider.restore() {
            let _ = tx.send(delta);
        }
        let mut gate = PollGate::new(config.fast_interval, config.full_interval);

        loop {
            loop {
                match cmd_rx.try_recv() {
                    Ok(ProviderCommand::Refresh) => {
                        gate.request_full();
                        let _ = tx.send(Delta::Log("[INFO] Refresh requested".to_string()));
                    }
                    Ok(ProviderCommand::SetVisible(visible)) => {
                        if visible != gate.is_visible() {
                            let msg = if visible {
                                "[INFO] Board visible, catching up"
                            } else {
                                "[INFO] Board hidden, polling paused"
                            };
                            let _ = tx.send(Delta::Log(msg.to_string()));
                        }
                        gate.set_visible(visible);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }

            if let Some(mode) = gate.due(Instant::now()) {
                for delta in provider.poll(mode, Utc::now()) {
                    if tx.send(delta).is_err() {
                        return;
                    }
                }
            }

            thread::sleep(IDLE_SLEEP);
        }
    });
}
