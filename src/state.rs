use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::model::MatchSnapshot;

const MAX_LOGS: usize = 200;
const MAX_COMPLETED: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardView {
    Live,
    Completed,
    Upcoming,
}

impl BoardView {
    pub fn label(self) -> &'static str {
        match self {
            BoardView::Live => "Live",
            BoardView::Completed => "Results",
            BoardView::Upcoming => "Upcoming",
        }
    }

    fn next(self) -> Self {
        match self {
            BoardView::Live => BoardView::Completed,
            BoardView::Completed => BoardView::Upcoming,
            BoardView::Upcoming => BoardView::Live,
        }
    }
}

#[derive(Debug)]
pub struct AppState {
    pub view: BoardView,
    pub live: Vec<MatchSnapshot>,
    pub completed: Vec<MatchSnapshot>,
    pub upcoming: Vec<MatchSnapshot>,
    pub selected: usize,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub loading: bool,
    pub visible: bool,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            view: BoardView::Live,
            live: Vec::new(),
            completed: Vec::new(),
            upcoming: Vec::new(),
            selected: 0,
            error: None,
            last_updated: None,
            loading: true,
            visible: true,
            help_overlay: false,
            logs: VecDeque::new(),
        }
    }

    pub fn current(&self) -> &[MatchSnapshot] {
        match self.view {
            BoardView::Live => &self.live,
            BoardView::Completed => &self.completed,
            BoardView::Upcoming => &self.upcoming,
        }
    }

    pub fn selected_match(&self) -> Option<&MatchSnapshot> {
        self.current().get(self.selected)
    }

    pub fn selected_match_id(&self) -> Option<String> {
        self.selected_match().map(|m| m.match_id.clone())
    }

    pub fn select_next(&mut self) {
        let len = self.current().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn cycle_view(&mut self) {
        self.view = self.view.next();
        self.selected = 0;
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Keeps the cursor on the same match after a list is replaced.
    fn restore_selection(&mut self, selected_id: Option<String>) {
        let list = self.current();
        self.selected = selected_id
            .and_then(|id| list.iter().position(|m| m.match_id == id))
            .unwrap_or(self.selected)
            .min(list.len().saturating_sub(1));
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetLive(Vec<MatchSnapshot>),
    SetCompleted(Vec<MatchSnapshot>),
    /// Newly completed matches from a live-only fetch; merged, not replaced.
    MergeCompleted(Vec<MatchSnapshot>),
    SetUpcoming(Vec<MatchSnapshot>),
    FetchOk(DateTime<Utc>),
    FetchFailed(String),
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    Refresh,
    SetVisible(bool),
}

/// Upserts `fresh` into `existing`, newest first, capped.
pub fn merge_completed(existing: &mut Vec<MatchSnapshot>, fresh: Vec<MatchSnapshot>) {
    for snapshot in fresh.into_iter().rev() {
        existing.retain(|m| m.match_id != snapshot.match_id);
        existing.insert(0, snapshot);
    }
    existing.truncate(MAX_COMPLETED);
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    let selected_id = state.selected_match_id();
    match delta {
        Delta::SetLive(live) => {
            let live_ids = live.iter().map(|m| m.match_id.as_str()).collect::<Vec<_>>();
            state.completed.retain(|m| !live_ids.contains(&m.match_id.as_str()));
            state.live = live;
        }
        Delta::SetCompleted(mut completed) => {
            completed.truncate(MAX_COMPLETED);
            state.completed = completed;
        }
        Delta::MergeCompleted(fresh) => {
            let fresh_ids = fresh.iter().map(|m| m.match_id.clone()).collect::<Vec<_>>();
            state.live.retain(|m| !fresh_ids.contains(&m.match_id));
            merge_completed(&mut state.completed, fresh);
        }
        Delta::SetUpcoming(upcoming) => state.upcoming = upcoming,
        Delta::FetchOk(at) => {
            state.loading = false;
            state.error = None;
            state.last_updated = Some(at);
        }
        Delta::FetchFailed(msg) => {
            state.loading = false;
            state.push_log(format!("[WARN] Fetch failed: {msg}"));
            state.error = Some(msg);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
    state.restore_selection(selected_id);
}
