use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BeatDodgeError, Result};

/// Tuning knobs for the analysis and gameplay loops.
///
/// The defaults reproduce the shipped balance; every field can be overridden
/// from a JSON file so balance passes do not require a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// FFT window size used by the analysis feed. Half of this many bins are
    /// usable.
    pub fft_size: usize,
    /// Number of low bins averaged into the bass energy figure.
    pub bass_bins: usize,
    /// A frame is a beat when bass exceeds the running average times this.
    pub beat_ratio: f32,
    /// Absolute bass floor below which nothing counts as a beat.
    pub beat_floor: f32,
    /// Per-frame decay of the exponential running average.
    pub average_decay: f32,
    /// Minimum wall-clock gap between two spawns, in milliseconds.
    pub spawn_cooldown_ms: u64,
    /// Lateral distance between adjacent lane centres.
    pub lane_width: f32,
    /// Depth travelled by every obstacle per frame, toward the player.
    pub game_speed: f32,
    /// Depth at which new obstacles appear (far side of the playfield).
    pub spawn_depth: f32,
    /// Half-extent of the depth band around the player where collisions are
    /// possible. Obstacles deeper than this band count as passed.
    pub impact_zone: f32,
    /// Maximum lateral distance between obstacle and player that still
    /// registers as an impact.
    pub impact_proximity: f32,
    /// Depth past the player at which an obstacle leaves the playfield.
    pub retire_depth: f32,
    /// Points awarded for every obstacle that exits without colliding.
    pub pass_score: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            fft_size: 512,
            bass_bins: 10,
            beat_ratio: 1.2,
            beat_floor: 50.0,
            average_decay: 0.95,
            spawn_cooldown_ms: 400,
            lane_width: 4.0,
            game_speed: 0.4,
            spawn_depth: -90.0,
            impact_zone: 2.0,
            impact_proximity: 2.0,
            retire_depth: 12.0,
            pass_score: 100,
        }
    }
}

impl Tuning {
    /// Number of usable frequency bins produced per analysis window.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Spawn cooldown as a [`Duration`].
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.spawn_cooldown_ms)
    }

    /// Rejects tunings that would break the analysis or gameplay invariants.
    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 2 || self.fft_size % 2 != 0 {
            return Err(BeatDodgeError::msg("fft_size must be an even value >= 2"));
        }
        if self.bass_bins == 0 || self.bass_bins > self.bin_count() {
            return Err(BeatDodgeError::msg(format!(
                "bass_bins must be within 1..={}",
                self.bin_count()
            )));
        }
        if !(0.0..1.0).contains(&self.average_decay) {
            return Err(BeatDodgeError::msg("average_decay must be within [0, 1)"));
        }
        if self.game_speed <= 0.0 {
            return Err(BeatDodgeError::msg("game_speed must be positive"));
        }
        if self.spawn_depth >= -self.impact_zone {
            return Err(BeatDodgeError::msg(
                "spawn_depth must lie beyond the impact zone",
            ));
        }
        Ok(())
    }

    /// Parses and validates a tuning from its JSON representation.
    pub fn from_json(text: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serializes the tuning to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuning_is_valid() {
        assert!(Tuning::default().validate().is_ok());
        assert_eq!(Tuning::default().bin_count(), 256);
    }

    #[test]
    fn rejects_out_of_range_bass_bins() {
        let tuning = Tuning {
            bass_bins: 300,
            ..Tuning::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn json_round_trip_preserves_overrides() {
        let tuning = Tuning {
            spawn_cooldown_ms: 250,
            ..Tuning::default()
        };
        let text = tuning.to_json().unwrap();
        let parsed = Tuning::from_json(&text).unwrap();
        assert_eq!(parsed.spawn_cooldown_ms, 250);
        assert_eq!(parsed.cooldown(), Duration::from_millis(250));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let parsed = Tuning::from_json(r#"{"beat_floor": 40.0}"#).unwrap();
        assert_eq!(parsed.beat_floor, 40.0);
        assert_eq!(parsed.fft_size, 512);
    }
}
