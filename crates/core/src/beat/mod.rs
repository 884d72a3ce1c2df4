use crate::{FrequencySample, Tuning};

/// Per-frame output of the detector.
///
/// `bass` is the instantaneous bass energy and is published alongside the
/// classification so the rendering layer can scale visual intensity with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatFrame {
    pub is_beat: bool,
    pub bass: f32,
}

/// Adaptive beat classifier over the bass band.
///
/// A fixed threshold cannot work across user-supplied tracks, so the
/// detector self-normalizes: a frame is a beat when its bass energy exceeds
/// the exponential running average by the configured ratio and clears an
/// absolute floor that suppresses false positives during silence.
///
/// The running average starts at zero, which biases the first loud frame
/// toward registering as a beat. This cold-start behavior is inherited from
/// the original game and kept on purpose; changing it would shift the
/// observable timing of the first spawn.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    bass_bins: usize,
    ratio: f32,
    floor: f32,
    decay: f32,
    running_average: f32,
}

impl BeatDetector {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            bass_bins: tuning.bass_bins,
            ratio: tuning.beat_ratio,
            floor: tuning.beat_floor,
            decay: tuning.average_decay,
            running_average: 0.0,
        }
    }

    /// Current value of the exponential running average. Never negative.
    pub fn running_average(&self) -> f32 {
        self.running_average
    }

    /// Returns the average to its start-of-game value.
    pub fn reset(&mut self) {
        self.running_average = 0.0;
    }

    /// Classifies one frame and folds its bass energy into the running
    /// average. Classification happens against the pre-update average, so
    /// the outcome is a pure function of `(bass, running_average)`.
    pub fn observe(&mut self, sample: &FrequencySample) -> BeatFrame {
        let bass = sample.bass_energy(self.bass_bins);
        let is_beat = bass > self.running_average * self.ratio && bass > self.floor;
        self.running_average = self.running_average * self.decay + bass * (1.0 - self.decay);
        BeatFrame { is_beat, bass }
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(&Tuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_with_bass(level: u8) -> FrequencySample {
        let mut bins = vec![0u8; 256];
        bins[..10].fill(level);
        FrequencySample::from_bins(bins)
    }

    #[test]
    fn first_loud_frame_registers_as_beat() {
        let mut detector = BeatDetector::default();
        let frame = detector.observe(&sample_with_bass(120));
        assert!(frame.is_beat);
        assert_eq!(frame.bass, 120.0);
    }

    #[test]
    fn silence_never_beats() {
        let mut detector = BeatDetector::default();
        for _ in 0..100 {
            let frame = detector.observe(&FrequencySample::silent(256));
            assert!(!frame.is_beat);
        }
        assert_eq!(detector.running_average(), 0.0);
    }

    #[test]
    fn floor_suppresses_quiet_spikes() {
        let mut detector = BeatDetector::default();
        // 40 > 0 * 1.2 but sits below the absolute floor of 50.
        let frame = detector.observe(&sample_with_bass(40));
        assert!(!frame.is_beat);
    }

    #[test]
    fn steady_loudness_stops_reading_as_beats() {
        let mut detector = BeatDetector::default();
        let sample = sample_with_bass(200);
        detector.observe(&sample);
        for _ in 0..100 {
            detector.observe(&sample);
        }
        // Once the average has converged, 200 is no longer 1.2x above it.
        let frame = detector.observe(&sample);
        assert!(!frame.is_beat);
    }

    #[test]
    fn average_converges_to_constant_input() {
        let mut detector = BeatDetector::default();
        let sample = sample_with_bass(180);
        for _ in 0..300 {
            detector.observe(&sample);
            assert!(detector.running_average() >= 0.0);
        }
        assert!((detector.running_average() - 180.0).abs() < 1.0);
    }

    #[test]
    fn classification_is_deterministic_in_bass_and_average() {
        let mut detector = BeatDetector::default();
        let sample = sample_with_bass(200);
        detector.observe(&sample);
        let average = detector.running_average();

        let mut replay = BeatDetector::default();
        replay.observe(&sample);
        assert_eq!(replay.running_average(), average);

        let bass = 100.0;
        let expected = bass > average * 1.2 && bass > 50.0;
        let frame = replay.observe(&sample_with_bass(100));
        assert_eq!(frame.is_beat, expected);
    }

    #[test]
    fn reset_returns_to_cold_start() {
        let mut detector = BeatDetector::default();
        detector.observe(&sample_with_bass(200));
        assert!(detector.running_average() > 0.0);
        detector.reset();
        assert_eq!(detector.running_average(), 0.0);
        assert!(detector.observe(&sample_with_bass(120)).is_beat);
    }
}
