use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{BeatDodgeError, Result};

/// One of the three travel lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lane {
    Left,
    Center,
    Right,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    /// Converts a raw index, rejecting anything outside `0..=2` at the API
    /// boundary.
    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            0 => Ok(Lane::Left),
            1 => Ok(Lane::Center),
            2 => Ok(Lane::Right),
            other => Err(BeatDodgeError::InvalidLane(other)),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Center => 1,
            Lane::Right => 2,
        }
    }

    /// Lateral centre of the lane for the given lane width.
    pub fn offset(self, lane_width: f32) -> f32 {
        (self.index() as f32 - 1.0) * lane_width
    }

    /// The neighbouring lane toward the left edge, if any.
    pub fn left(self) -> Option<Lane> {
        match self {
            Lane::Left => None,
            Lane::Center => Some(Lane::Left),
            Lane::Right => Some(Lane::Center),
        }
    }

    /// The neighbouring lane toward the right edge, if any.
    pub fn right(self) -> Option<Lane> {
        match self {
            Lane::Left => Some(Lane::Center),
            Lane::Center => Some(Lane::Right),
            Lane::Right => None,
        }
    }
}

/// The lanes of the two most recent spawns, newest last.
///
/// The representation is two slots, so the length bound holds structurally:
/// pushing a third lane evicts the oldest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnHistory {
    previous: Option<Lane>,
    last: Option<Lane>,
}

impl SpawnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, lane: Lane) {
        self.previous = self.last;
        self.last = Some(lane);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        usize::from(self.previous.is_some()) + usize::from(self.last.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    /// Lane of the most recent spawn.
    pub fn last(&self) -> Option<Lane> {
        self.last
    }

    /// Lane of the spawn before the most recent one.
    pub fn previous(&self) -> Option<Lane> {
        self.previous
    }
}

/// Applies the lane-fairness rule to a raw uniform draw.
///
/// When the last two spawns used two different lanes, drawing the remaining
/// third lane would leave the player exactly one safe lane and turn the dodge
/// into a forced move. That draw is remapped onto one of the two recent
/// lanes, picked by `pick_last`, which reintroduces ambiguity by repeating a
/// lane instead.
///
/// Pure function over its inputs; randomness stays with the caller so tests
/// can inject draws.
pub fn select_lane(history: &SpawnHistory, raw_draw: Lane, pick_last: bool) -> Lane {
    let (Some(last), Some(previous)) = (history.last(), history.previous()) else {
        return raw_draw;
    };
    if last == previous {
        return raw_draw;
    }
    let remaining = 3 - last.index() - previous.index();
    if raw_draw.index() != remaining {
        return raw_draw;
    }
    if pick_last {
        last
    } else {
        previous
    }
}

/// Randomness seam for lane selection.
pub trait LaneRng {
    /// Uniform draw over the three lanes.
    fn draw_lane(&mut self) -> Lane;
    /// Fair coin used when the fairness rule has to replace a draw.
    fn coin(&mut self) -> bool;
}

/// Default [`LaneRng`] backed by the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadLaneRng;

impl LaneRng for ThreadLaneRng {
    fn draw_lane(&mut self) -> Lane {
        Lane::ALL[rand::rng().random_range(0..3)]
    }

    fn coin(&mut self) -> bool {
        rand::rng().random()
    }
}
