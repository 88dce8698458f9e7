use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};

use crate::config::{DetectorConfig, WorkerConfig};
use crate::cricket_api::MatchApi;
use crate::model::{ListingKind, MatchSnapshot, MatchState, Phase};
use crate::monitor::{EventSink, MatchMonitor, PollOutcome, check_prematch};
use crate::task::{CancelToken, RecurringTask, TaskControl};

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub live_poll_interval: Duration,
    pub playing_xi_lead: ChronoDuration,
    pub toss_lead: ChronoDuration,
    pub detector: DetectorConfig,
}

impl SchedulerSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            live_poll_interval: config.live_poll_interval,
            playing_xi_lead: config.playing_xi_lead,
            toss_lead: config.toss_lead,
            detector: config.detector.clone(),
        }
    }
}

struct TrackedMatch {
    handle: Option<RecurringTask>,
    completed: Arc<AtomicBool>,
    is_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub started: Vec<String>,
    pub finished: Vec<String>,
    pub prematch_checks: usize,
    pub active: usize,
    pub errors: Vec<String>,
}

/// Discovers matches and owns one monitor per in-progress match. Only `tick`
/// mutates the set of monitors.
pub struct Scheduler<A: MatchApi + ?Sized + 'static> {
    api: Arc<A>,
    sink: EventSink,
    settings: SchedulerSettings,
    tracked: HashMap<String, TrackedMatch>,
}

impl<A: MatchApi + ?Sized + 'static> Scheduler<A> {
    pub fn new(api: Arc<A>, sink: EventSink, settings: SchedulerSettings) -> Self {
        Self {
            api,
            sink,
            settings,
            tracked: HashMap::new(),
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport {
            finished: self.reap(),
            ..TickReport::default()
        };

        let mut seen = HashSet::new();
        let mut snapshots = Vec::new();
        for kind in [ListingKind::Live, ListingKind::Upcoming] {
            match self.api.fetch_listing(kind) {
                Ok(list) => snapshots.extend(
                    list.into_iter()
                        .filter(|s| seen.insert(s.match_id.clone())),
                ),
                Err(err) => {
                    warn!(listing = kind.path(), error = %err, "listing fetch failed");
                    report.errors.push(format!("{}: {err}", kind.path()));
                }
            }
        }

        for snapshot in &snapshots {
            match snapshot.state.phase() {
                Phase::Upcoming => {
                    if self.prematch(snapshot, now, &mut report.errors) {
                        report.prematch_checks += 1;
                    }
                }
                Phase::InProgress => match self.start_monitor(&snapshot.match_id) {
                    Ok(true) => report.started.push(snapshot.match_id.clone()),
                    Ok(false) => {}
                    Err(err) => {
                        warn!(match_id = %snapshot.match_id, error = %err, "could not start monitor");
                        report.errors.push(format!("{}: {err}", snapshot.match_id));
                    }
                },
                Phase::Complete => {}
            }
        }

        report.active = self.active_monitors().len();
        report
    }

    /// Runs the pre-match checks whose window has opened. Returns whether any ran.
    fn prematch(&self, snapshot: &MatchSnapshot, now: DateTime<Utc>, errors: &mut Vec<String>) -> bool {
        let at_toss = snapshot.state == MatchState::Toss;
        let until_start = snapshot.start.map(|start| start.signed_duration_since(now));
        let want_xi = at_toss || until_start.is_some_and(|d| d <= self.settings.playing_xi_lead);
        let want_toss = at_toss || until_start.is_some_and(|d| d <= self.settings.toss_lead);
        if !want_xi && !want_toss {
            return false;
        }
        debug!(match_id = %snapshot.match_id, want_xi, want_toss, "pre-match window open");
        if let Err(err) = check_prematch(
            self.api.as_ref(),
            &self.sink,
            &snapshot.match_id,
            want_xi,
            want_toss,
        ) {
            warn!(match_id = %snapshot.match_id, error = %err, "pre-match checks failed");
            errors.push(format!("{}: {err}", snapshot.match_id));
        }
        true
    }

    /// Starts a monitor unless the match already has one or has completed.
    fn start_monitor(&mut self, match_id: &str) -> Result<bool> {
        if let Some(tracked) = self.tracked.get(match_id)
            && (tracked.is_complete || tracked.handle.is_some())
        {
            return Ok(false);
        }

        let completed = Arc::new(AtomicBool::new(false));
        let flag = completed.clone();
        let mut monitor = MatchMonitor::new(
            match_id,
            self.api.clone(),
            self.sink.clone(),
            self.settings.detector.clone(),
        );
        let handle = RecurringTask::spawn(
            format!("monitor-{match_id}"),
            self.settings.live_poll_interval,
            move || match monitor.poll_once() {
                Ok(PollOutcome::Continue) => TaskControl::Continue,
                Ok(PollOutcome::Complete) => {
                    info!(match_id = monitor.match_id(), "match complete, stopping monitor");
                    flag.store(true, Ordering::SeqCst);
                    TaskControl::Stop
                }
                Err(err) => {
                    warn!(match_id = monitor.match_id(), error = %err, "poll failed");
                    TaskControl::Continue
                }
            },
        )?;
        info!(match_id, "monitor started");
        self.tracked.insert(
            match_id.to_string(),
            TrackedMatch {
                handle: Some(handle),
                completed,
                is_complete: false,
            },
        );
        Ok(true)
    }

    /// Drops handles of monitors whose thread has exited.
    fn reap(&mut self) -> Vec<String> {
        let mut finished = Vec::new();
        for (match_id, tracked) in &mut self.tracked {
            let done = tracked.handle.as_ref().is_some_and(RecurringTask::is_finished);
            if !done {
                continue;
            }
            tracked.handle = None;
            tracked.is_complete = tracked.completed.load(Ordering::SeqCst);
            finished.push(match_id.clone());
        }
        finished
    }

    pub fn active_monitors(&self) -> Vec<String> {
        let mut ids = self
            .tracked
            .iter()
            .filter(|(_, t)| t.handle.as_ref().is_some_and(|h| !h.is_finished()))
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn is_complete(&self, match_id: &str) -> bool {
        self.tracked
            .get(match_id)
            .is_some_and(|t| t.is_complete || t.completed.load(Ordering::SeqCst))
    }

    /// Ticks every `interval` until `token` is cancelled, then stops all monitors.
    pub fn run(&mut self, interval: Duration, token: &CancelToken) {
        loop {
            let report = self.tick(Utc::now());
            debug!(
                active = report.active,
                started = report.started.len(),
                finished = report.finished.len(),
                prematch = report.prematch_checks,
                "discovery tick"
            );
            if !token.sleep(interval) {
                break;
            }
        }
        self.shutdown();
    }

    pub fn shutdown(&mut self) {
        for (_, tracked) in self.tracked.iter_mut() {
            if let Some(handle) = tracked.handle.take() {
                handle.join();
            }
        }
    }
}
