use std::time::Duration;

use crate::{
    lane::{select_lane, Lane, LaneRng, SpawnHistory, ThreadLaneRng},
    Tuning,
};

/// Turns qualifying beats into obstacle spawns.
///
/// Two concerns live here: the wall-clock cooldown between spawns (a beat
/// that arrives inside the window is dropped, never queued) and the
/// lane-fairness constraint applied to the random lane draw.
#[derive(Debug)]
pub struct SpawnController<R = ThreadLaneRng> {
    rng: R,
    cooldown: Duration,
    history: SpawnHistory,
    last_spawn: Option<Duration>,
}

impl SpawnController<ThreadLaneRng> {
    pub fn new(tuning: &Tuning) -> Self {
        Self::with_rng(tuning, ThreadLaneRng)
    }
}

impl<R: LaneRng> SpawnController<R> {
    /// Builds a controller with an injected randomness source, for
    /// deterministic sequencing in tests.
    pub fn with_rng(tuning: &Tuning, rng: R) -> Self {
        Self {
            rng,
            cooldown: tuning.cooldown(),
            history: SpawnHistory::new(),
            last_spawn: None,
        }
    }

    pub fn history(&self) -> &SpawnHistory {
        &self.history
    }

    /// Clears the spawn history and reopens the cooldown window.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_spawn = None;
    }

    /// Handles a qualifying beat at wall-clock time `now`. Returns the lane
    /// to spawn in, or `None` while the cooldown still holds.
    pub fn on_beat(&mut self, now: Duration) -> Option<Lane> {
        if let Some(last) = self.last_spawn {
            if now.saturating_sub(last) <= self.cooldown {
                return None;
            }
        }

        let raw_draw = self.rng.draw_lane();
        let pick_last = self.rng.coin();
        let lane = select_lane(&self.history, raw_draw, pick_last);
        self.history.push(lane);
        self.last_spawn = Some(now);
        Some(lane)
    }
}
