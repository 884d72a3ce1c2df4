use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    beat::{BeatDetector, BeatFrame},
    lane::{Lane, LaneRng, SpawnHistory, ThreadLaneRng},
    spawn::SpawnController,
    FrequencySample, Tuning,
};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    /// No track loaded.
    Idle,
    /// A decoded track is driving the frame loop.
    Playing,
    /// The run ended on a collision or when the track ran out.
    GameOver,
}

/// A spawned obstacle travelling toward the player.
///
/// Depth is negative on the far side of the playfield and crosses zero at
/// the player's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub lane: Lane,
    pub depth: f32,
    pub passed: bool,
}

/// Discrete notifications for the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    StateChanged(GameState),
    /// Instantiate a visual obstacle in the given lane.
    SpawnRequested(Lane),
    ScoreChanged(u32),
    /// An obstacle slipped past the player without colliding; a good moment
    /// for celebratory feedback.
    ObstaclePassed(Lane),
}

/// Everything one frame produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Beat classification for the frame, absent outside `Playing`. The bass
    /// figure inside doubles as the intensity signal for visuals.
    pub beat: Option<BeatFrame>,
    pub events: Vec<GameEvent>,
}

/// Owner of all per-run state: score, obstacles, player lane, beat detector
/// and spawn controller.
///
/// Collaborators hold a reference to the session instead of sharing globals.
/// Everything runs synchronously on the frame clock the caller owns; the
/// session never blocks and keeps no threads of its own.
#[derive(Debug)]
pub struct GameSession<R = ThreadLaneRng> {
    tuning: Tuning,
    state: GameState,
    score: u32,
    player_lane: Lane,
    obstacles: Vec<Obstacle>,
    detector: BeatDetector,
    spawner: SpawnController<R>,
}

impl GameSession<ThreadLaneRng> {
    pub fn new(tuning: Tuning) -> Self {
        Self::with_rng(tuning, ThreadLaneRng)
    }
}

impl<R: LaneRng> GameSession<R> {
    /// Builds a session with an injected lane randomness source.
    pub fn with_rng(tuning: Tuning, rng: R) -> Self {
        let detector = BeatDetector::new(&tuning);
        let spawner = SpawnController::with_rng(&tuning, rng);
        Self {
            tuning,
            state: GameState::Idle,
            score: 0,
            player_lane: Lane::Center,
            obstacles: Vec::new(),
            detector,
            spawner,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn player_lane(&self) -> Lane {
        self.player_lane
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn spawn_history(&self) -> &SpawnHistory {
        self.spawner.history()
    }

    /// Running average of the beat detector, exposed so a fresh run can be
    /// verified as fully reset in one observation.
    pub fn running_average(&self) -> f32 {
        self.detector.running_average()
    }

    /// A new track finished decoding. Clears every piece of per-run state in
    /// one step before re-entering `Playing`; a partial reset would let a
    /// stale history or average leak into the new run.
    pub fn track_decoded(&mut self) -> Vec<GameEvent> {
        self.score = 0;
        self.obstacles.clear();
        self.player_lane = Lane::Center;
        self.detector.reset();
        self.spawner.reset();
        self.state = GameState::Playing;
        vec![
            GameEvent::StateChanged(GameState::Playing),
            GameEvent::ScoreChanged(0),
        ]
    }

    /// The collaborator could not decode the submitted track. The session
    /// returns to `Idle` and will accept a fresh track; nothing is retried.
    pub fn decode_failed(&mut self) -> Vec<GameEvent> {
        if self.state == GameState::Idle {
            return Vec::new();
        }
        self.state = GameState::Idle;
        vec![GameEvent::StateChanged(GameState::Idle)]
    }

    /// Playback ran past the end of the track.
    pub fn track_ended(&mut self) -> Vec<GameEvent> {
        self.game_over()
    }

    /// The collaborator reported a player impact.
    pub fn collision(&mut self) -> Vec<GameEvent> {
        self.game_over()
    }

    /// Moves the player one lane toward the left edge. Ignored outside
    /// `Playing` and at the edge lane.
    pub fn move_left(&mut self) {
        if self.state == GameState::Playing {
            if let Some(lane) = self.player_lane.left() {
                self.player_lane = lane;
            }
        }
    }

    /// Moves the player one lane toward the right edge. Ignored outside
    /// `Playing` and at the edge lane.
    pub fn move_right(&mut self) {
        if self.state == GameState::Playing {
            if let Some(lane) = self.player_lane.right() {
                self.player_lane = lane;
            }
        }
    }

    /// Places the player directly into a lane.
    pub fn set_player_lane(&mut self, lane: Lane) {
        if self.state == GameState::Playing {
            self.player_lane = lane;
        }
    }

    /// Runs one frame at wall-clock time `now` against the current frequency
    /// snapshot: beat classification, spawn decision, obstacle movement,
    /// impact and pass-through handling. Outside `Playing` the frame is
    /// inert.
    pub fn tick(&mut self, now: Duration, sample: &FrequencySample) -> FrameReport {
        let mut report = FrameReport::default();
        if self.state != GameState::Playing {
            return report;
        }

        let beat = self.detector.observe(sample);
        if beat.is_beat {
            if let Some(lane) = self.spawner.on_beat(now) {
                self.obstacles.push(Obstacle {
                    lane,
                    depth: self.tuning.spawn_depth,
                    passed: false,
                });
                report.events.push(GameEvent::SpawnRequested(lane));
            }
        }
        report.beat = Some(beat);

        self.advance_obstacles(&mut report.events);
        report
    }

    fn advance_obstacles(&mut self, events: &mut Vec<GameEvent>) {
        let player_x = self.player_lane.offset(self.tuning.lane_width);
        let mut collided = false;

        for obstacle in &mut self.obstacles {
            obstacle.depth += self.tuning.game_speed;

            if !obstacle.passed && obstacle.depth > self.tuning.impact_zone {
                obstacle.passed = true;
                events.push(GameEvent::ObstaclePassed(obstacle.lane));
            }

            if obstacle.depth.abs() < self.tuning.impact_zone {
                let lateral = (obstacle.lane.offset(self.tuning.lane_width) - player_x).abs();
                if lateral < self.tuning.impact_proximity {
                    collided = true;
                }
            }
        }

        let before = self.obstacles.len();
        let retire_depth = self.tuning.retire_depth;
        self.obstacles.retain(|obstacle| obstacle.depth <= retire_depth);
        let retired = before - self.obstacles.len();
        if retired > 0 {
            self.score += retired as u32 * self.tuning.pass_score;
            events.push(GameEvent::ScoreChanged(self.score));
        }

        if collided {
            events.extend(self.game_over());
        }
    }

    /// Idempotent: duplicate collision or end-of-track events in one frame
    /// change state at most once and never touch the score.
    fn game_over(&mut self) -> Vec<GameEvent> {
        if self.state != GameState::Playing {
            return Vec::new();
        }
        self.state = GameState::GameOver;
        vec![GameEvent::StateChanged(GameState::GameOver)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrequencySample;

    /// Replays scripted lane draws; the coin always picks the newer lane.
    struct Scripted {
        draws: Vec<Lane>,
        next: usize,
    }

    impl LaneRng for Scripted {
        fn draw_lane(&mut self) -> Lane {
            let lane = self.draws[self.next % self.draws.len()];
            self.next += 1;
            lane
        }

        fn coin(&mut self) -> bool {
            true
        }
    }

    fn session(draws: Vec<Lane>) -> GameSession<Scripted> {
        GameSession::with_rng(Tuning::default(), Scripted { draws, next: 0 })
    }

    fn loud() -> FrequencySample {
        let mut bins = vec![0u8; 256];
        bins[..10].fill(200);
        FrequencySample::from_bins(bins)
    }

    fn silent() -> FrequencySample {
        FrequencySample::silent(256)
    }

    fn at(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn ticks_are_inert_outside_playing() {
        let mut session = session(vec![Lane::Center]);
        let report = session.tick(at(0), &loud());
        assert!(report.beat.is_none());
        assert!(report.events.is_empty());
        assert!(session.obstacles().is_empty());
    }

    #[test]
    fn track_decoded_enters_playing_and_announces_score() {
        let mut session = session(vec![Lane::Center]);
        let events = session.track_decoded();
        assert_eq!(session.state(), GameState::Playing);
        assert_eq!(
            events,
            vec![
                GameEvent::StateChanged(GameState::Playing),
                GameEvent::ScoreChanged(0),
            ]
        );
    }

    #[test]
    fn new_track_resets_every_piece_of_run_state_at_once() {
        let mut session = session(vec![Lane::Left]);
        session.track_decoded();
        session.move_right();
        session.tick(at(0), &loud());
        // Run the spawned obstacle all the way off the playfield.
        for frame in 1..400 {
            session.tick(at(frame * 16), &silent());
        }
        assert!(session.score() > 0);
        assert!(!session.spawn_history().is_empty());
        assert!(session.running_average() > 0.0);

        session.track_decoded();
        assert_eq!(session.state(), GameState::Playing);
        assert_eq!(session.score(), 0);
        assert!(session.obstacles().is_empty());
        assert!(session.spawn_history().is_empty());
        assert_eq!(session.running_average(), 0.0);
        assert_eq!(session.player_lane(), Lane::Center);
    }

    #[test]
    fn game_over_is_idempotent() {
        let mut session = session(vec![Lane::Center]);
        session.track_decoded();
        let first = session.collision();
        assert_eq!(first, vec![GameEvent::StateChanged(GameState::GameOver)]);
        assert!(session.collision().is_empty());
        assert!(session.track_ended().is_empty());
        assert_eq!(session.state(), GameState::GameOver);
    }

    #[test]
    fn decode_failure_returns_to_idle() {
        let mut session = session(vec![Lane::Center]);
        session.track_decoded();
        let events = session.decode_failed();
        assert_eq!(events, vec![GameEvent::StateChanged(GameState::Idle)]);
        assert!(session.decode_failed().is_empty());
        // A fresh track is still accepted afterwards.
        session.track_decoded();
        assert_eq!(session.state(), GameState::Playing);
    }

    #[test]
    fn player_movement_is_clamped_and_gated() {
        let mut session = session(vec![Lane::Center]);
        session.move_left();
        assert_eq!(session.player_lane(), Lane::Center);

        session.track_decoded();
        session.move_left();
        session.move_left();
        assert_eq!(session.player_lane(), Lane::Left);
        session.move_right();
        session.move_right();
        session.move_right();
        assert_eq!(session.player_lane(), Lane::Right);
    }

    #[test]
    fn obstacle_in_players_lane_ends_the_run() {
        let mut session = session(vec![Lane::Center]);
        session.track_decoded();
        assert_eq!(
            session.tick(at(0), &loud()).events,
            vec![GameEvent::SpawnRequested(Lane::Center)]
        );

        let mut ended = false;
        for frame in 1..400 {
            let report = session.tick(at(frame * 16), &silent());
            if report
                .events
                .contains(&GameEvent::StateChanged(GameState::GameOver))
            {
                ended = true;
                break;
            }
        }
        assert!(ended);
        assert_eq!(session.state(), GameState::GameOver);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn dodged_obstacle_scores_on_exit() {
        let mut session = session(vec![Lane::Left]);
        session.track_decoded();
        session.tick(at(0), &loud());

        let mut passed = false;
        let mut scored = false;
        for frame in 1..400 {
            let report = session.tick(at(frame * 16), &silent());
            passed |= report.events.contains(&GameEvent::ObstaclePassed(Lane::Left));
            scored |= report.events.contains(&GameEvent::ScoreChanged(100));
        }
        assert!(passed);
        assert!(scored);
        assert_eq!(session.score(), 100);
        assert!(session.obstacles().is_empty());
        assert_eq!(session.state(), GameState::Playing);
    }

    #[test]
    fn three_beats_spawn_three_fair_lanes() {
        // Raw draws script lanes 0, 1 and then the forcing lane 2. The third
        // draw must be remapped onto one of the first two lanes.
        let mut session = session(vec![Lane::Left, Lane::Center, Lane::Right]);
        session.track_decoded();

        let mut spawned = Vec::new();
        for ms in [0u64, 450, 900] {
            let report = session.tick(at(ms), &loud());
            assert!(report.beat.map(|b| b.is_beat).unwrap_or(false));
            for event in report.events {
                if let GameEvent::SpawnRequested(lane) = event {
                    spawned.push(lane);
                }
            }
        }

        assert_eq!(spawned.len(), 3);
        assert_eq!(spawned[0], Lane::Left);
        assert_eq!(spawned[1], Lane::Center);
        assert_ne!(spawned[2], Lane::Right);
    }

    #[test]
    fn beat_inside_cooldown_spawns_nothing() {
        let mut session = session(vec![Lane::Left, Lane::Right]);
        session.track_decoded();
        assert_eq!(
            session.tick(at(0), &loud()).events,
            vec![GameEvent::SpawnRequested(Lane::Left)]
        );
        let report = session.tick(at(300), &loud());
        assert!(report.beat.map(|b| b.is_beat).unwrap_or(false));
        assert!(report.events.is_empty());
        assert_eq!(session.obstacles().len(), 1);
    }
}
