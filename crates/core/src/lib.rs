//! Core library for Beat Dodge, a rhythm game where a craft hops between
//! three lanes to dodge obstacles spawned in time with the music.
//!
//! The crate owns the frame-driven game logic: the analysis feed that turns a
//! decoded track into per-frame frequency snapshots, the adaptive beat
//! detector, the spawn controller with its lane-fairness rule, and the game
//! state machine. Rendering, input and audio decoding stay with an external
//! collaborator that drives [`GameSession::tick`] once per frame and reacts
//! to the returned [`GameEvent`] values.

pub mod beat;
pub mod config;
pub mod error;
pub mod game;
pub mod lane;
pub mod spawn;
pub mod spectrum;
pub mod track;

pub use beat::{BeatDetector, BeatFrame};
pub use config::Tuning;
pub use error::{BeatDodgeError, Result};
pub use game::{FrameReport, GameEvent, GameSession, GameState, Obstacle};
pub use lane::{select_lane, Lane, LaneRng, SpawnHistory, ThreadLaneRng};
pub use spawn::SpawnController;
pub use spectrum::{AnalysisFeed, DecodedTrackSource, FrequencySample, SpectrumSource};
pub use track::{DecodeJob, DecodeState, DecodedTrack};
