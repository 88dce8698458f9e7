use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{InningsScore, MatchSnapshot};

/// Highest runs displayed per side since the match last changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Watermark {
    pub team1: u32,
    pub team2: u32,
}

impl Watermark {
    pub fn of(snapshot: &MatchSnapshot) -> Self {
        Self {
            team1: snapshot.team1_runs(),
            team2: snapshot.team2_runs(),
        }
    }
}

/// Merges a fresh live listing into the previously displayed one so that, while a
/// match's state is unchanged, neither side's displayed runs ever decrease.
///
/// Matches missing from `fresh` are dropped. `watermarks` is updated in place for
/// every match in `fresh`.
pub fn reconcile(
    previous: &[MatchSnapshot],
    fresh: Vec<MatchSnapshot>,
    watermarks: &mut HashMap<String, Watermark>,
) -> Vec<MatchSnapshot> {
    let by_id = previous
        .iter()
        .map(|snapshot| (snapshot.match_id.as_str(), snapshot))
        .collect::<HashMap<_, _>>();

    let mut out = Vec::with_capacity(fresh.len());
    for snapshot in fresh {
        let Some(prev) = by_id.get(snapshot.match_id.as_str()).copied() else {
            watermarks.insert(snapshot.match_id.clone(), Watermark::of(&snapshot));
            out.push(snapshot);
            continue;
        };

        if prev.state != snapshot.state {
            watermarks.insert(snapshot.match_id.clone(), Watermark::of(&snapshot));
            out.push(snapshot);
            continue;
        }

        let mark = watermarks
            .get(&snapshot.match_id)
            .copied()
            .unwrap_or_else(|| Watermark::of(prev));
        let candidate1 = mark.team1.max(snapshot.team1_runs());
        let candidate2 = mark.team2.max(snapshot.team2_runs());

        if candidate1 > prev.team1_runs() || candidate2 > prev.team2_runs() {
            let merged = MatchSnapshot {
                team1_score: keep_higher(prev.team1_score, snapshot.team1_score),
                team2_score: keep_higher(prev.team2_score, snapshot.team2_score),
                ..snapshot
            };
            watermarks.insert(
                merged.match_id.clone(),
                Watermark {
                    team1: candidate1.max(merged.team1_runs()),
                    team2: candidate2.max(merged.team2_runs()),
                },
            );
            out.push(merged);
        } else {
            watermarks.insert(
                prev.match_id.clone(),
                Watermark {
                    team1: candidate1,
                    team2: candidate2,
                },
            );
            out.push(prev.clone());
        }
    }
    out
}

/// The fresh line unless it shows fewer runs than what is already on screen.
fn keep_higher(displayed: Option<InningsScore>, fresh: Option<InningsScore>) -> Option<InningsScore> {
    match (displayed, fresh) {
        (Some(d), Some(f)) if f.runs < d.runs => Some(d),
        (Some(d), None) => Some(d),
        (_, f) => f,
    }
}

/// Owns the displayed live list and its watermarks across polls.
#[derive(Debug, Clone, Default)]
pub struct ReconcileBoard {
    live: Vec<MatchSnapshot>,
    watermarks: HashMap<String, Watermark>,
}

impl ReconcileBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(live: Vec<MatchSnapshot>, watermarks: HashMap<String, Watermark>) -> Self {
        Self { live, watermarks }
    }

    /// Reconciles `fresh_live` and forgets watermarks of matches that left the live
    /// set as completed.
    pub fn apply(&mut self, fresh_live: Vec<MatchSnapshot>, completed: &[MatchSnapshot]) -> &[MatchSnapshot] {
        self.live = reconcile(&self.live, fresh_live, &mut self.watermarks);

        let live_ids = self
            .live
            .iter()
            .map(|s| s.match_id.as_str())
            .collect::<HashSet<_>>();
        let completed_ids = completed
            .iter()
            .map(|s| s.match_id.as_str())
            .collect::<HashSet<_>>();
        self.watermarks
            .retain(|id, _| live_ids.contains(id.as_str()) || !completed_ids.contains(id.as_str()));

        &self.live
    }

    pub fn live(&self) -> &[MatchSnapshot] {
        &self.live
    }

    pub fn watermarks(&self) -> &HashMap<String, Watermark> {
        &self.watermarks
    }
}
