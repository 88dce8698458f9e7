use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::config::DetectorConfig;
use crate::cricket_api::{ApiError, MatchApi};
use crate::event_store::EventStore;
use crate::events::{EventPayload, EventType};
use crate::images::{ImageResolver, enrich_payload};
use crate::milestones::{
    MilestoneTracker, detect_card_toss, detect_match_end, detect_playing_xi, detect_toss,
};
use crate::model::{MatchInfo, MatchState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Continue,
    Complete,
}

/// Writes detected events: skips what the store already holds, fills image
/// references, then inserts.
#[derive(Clone)]
pub struct EventSink {
    store: Arc<EventStore>,
    resolver: ImageResolver,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl EventSink {
    pub fn new(
        store: Arc<EventStore>,
        resolver: ImageResolver,
        pool: Option<Arc<rayon::ThreadPool>>,
    ) -> Self {
        Self {
            store,
            resolver,
            pool,
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn has(&self, match_id: &str, event_type: EventType, dedup_key: &str) -> Result<bool> {
        self.store.exists(match_id, event_type, dedup_key)
    }

    /// Returns whether a new row was written.
    pub fn record<A>(&self, api: &A, match_id: &str, mut event: EventPayload) -> Result<bool>
    where
        A: MatchApi + ?Sized,
    {
        let event_type = event.event_type();
        let dedup_key = event.dedup_key();
        if self.store.exists(match_id, event_type, &dedup_key)? {
            debug!(match_id, %event_type, dedup_key = %dedup_key, "event already stored");
            return Ok(false);
        }
        enrich_payload(&mut event, api, &self.resolver, self.pool.as_deref());
        let inserted = self.store.insert_if_absent(match_id, &event)?;
        if inserted {
            info!(match_id, %event_type, "{}", event.summary());
        }
        Ok(inserted)
    }
}

/// Playing-XI and toss checks for one match. Each is skipped when already stored.
/// Returns the match info when it had to be fetched.
pub fn check_prematch<A>(
    api: &A,
    sink: &EventSink,
    match_id: &str,
    want_xi: bool,
    want_toss: bool,
) -> Result<Option<MatchInfo>>
where
    A: MatchApi + ?Sized,
{
    let want_xi = want_xi && !sink.has(match_id, EventType::PlayingXi, "")?;
    let want_toss = want_toss && !sink.has(match_id, EventType::Toss, "")?;
    if !want_xi && !want_toss {
        return Ok(None);
    }

    let info = match api.fetch_match_info(match_id) {
        Ok(info) => info,
        Err(ApiError::NotAvailable(_)) => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("match info {match_id}")),
    };

    if want_xi && let Some(event) = detect_playing_xi(&info) {
        sink.record(api, match_id, event)?;
    }
    if want_toss && let Some(event) = detect_toss(&info) {
        sink.record(api, match_id, event)?;
    }
    Ok(Some(info))
}

/// Fast-cadence poller for one in-progress match.
pub struct MatchMonitor<A: MatchApi + ?Sized> {
    api: Arc<A>,
    sink: EventSink,
    tracker: MilestoneTracker,
    info: Option<MatchInfo>,
    prematch_pending: bool,
    toss_recorded: bool,
}

impl<A: MatchApi + ?Sized> MatchMonitor<A> {
    pub fn new(match_id: &str, api: Arc<A>, sink: EventSink, detector: DetectorConfig) -> Self {
        let marks = match sink.store().load_watermarks(match_id) {
            Ok(marks) => marks,
            Err(err) => {
                warn!(match_id, error = %err, "could not load player watermarks");
                Default::default()
            }
        };
        if !marks.is_empty() {
            debug!(match_id, players = marks.len(), "resuming from stored watermarks");
        }
        Self {
            api,
            sink,
            tracker: MilestoneTracker::new(match_id, detector).with_watermarks(marks),
            info: None,
            prematch_pending: true,
            toss_recorded: false,
        }
    }

    pub fn match_id(&self) -> &str {
        self.tracker.match_id()
    }

    pub fn poll_once(&mut self) -> Result<PollOutcome> {
        let owned_id = self.tracker.match_id().to_string();
        let match_id = owned_id.as_str();

        // Toss and line-ups are checked on every poll until both are stored.
        if self.prematch_pending {
            match check_prematch(self.api.as_ref(), &self.sink, match_id, true, true) {
                Ok(info) => {
                    self.info = info.or(self.info.take());
                    self.prematch_pending = !self.prematch_stored(match_id);
                }
                Err(err) => {
                    warn!(match_id, error = %err, "pre-match checks failed, retrying next poll")
                }
            }
        }

        let card = match self.api.fetch_scorecard(match_id) {
            Ok(card) => card,
            Err(ApiError::NotAvailable(_)) => {
                debug!(match_id, "scorecard not available yet");
                return Ok(PollOutcome::Continue);
            }
            Err(err) => return Err(err).with_context(|| format!("scorecard {match_id}")),
        };

        if !self.toss_recorded
            && let Some(event) = detect_card_toss(&card)
        {
            match self.sink.record(self.api.as_ref(), match_id, event) {
                Ok(_) => self.toss_recorded = true,
                Err(err) => error!(match_id, error = %err, "failed to store toss"),
            }
        }

        for event in self.tracker.scan(&card) {
            self.store_event(match_id, event);
        }

        if let Err(err) = self
            .sink
            .store()
            .save_watermarks(match_id, self.tracker.watermarks())
        {
            warn!(match_id, error = %err, "could not persist player watermarks");
        }

        if card.state != MatchState::Complete {
            return Ok(PollOutcome::Continue);
        }

        let commentary = match self.api.fetch_commentary(match_id) {
            Ok(lines) => lines,
            Err(err) => {
                debug!(match_id, error = %err, "commentary unavailable");
                Vec::new()
            }
        };
        if self.info.is_none() {
            self.info = self.api.fetch_match_info(match_id).ok();
        }
        match detect_match_end(&card, self.info.as_ref(), &commentary) {
            Some(event) => self.store_event(match_id, event),
            None => warn!(match_id, "match complete but result could not be built"),
        }
        if let Err(err) = self.sink.store().clear_watermarks(match_id) {
            warn!(match_id, error = %err, "could not clear player watermarks");
        }
        Ok(PollOutcome::Complete)
    }

    fn prematch_stored(&self, match_id: &str) -> bool {
        let stored = |event_type| self.sink.has(match_id, event_type, "").unwrap_or(false);
        stored(EventType::Toss) && stored(EventType::PlayingXi)
    }

    fn store_event(&mut self, match_id: &str, event: EventPayload) {
        match self.sink.record(self.api.as_ref(), match_id, event.clone()) {
            Ok(_) => self.tracker.settle(&event),
            Err(err) => error!(
                match_id,
                event_type = %event.event_type(),
                error = %err,
                "failed to store event"
            ),
        }
    }
}
