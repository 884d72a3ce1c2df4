use std::time::Duration;

use crate::{BeatDodgeError, Result};

/// Mono PCM handed over by the decoding collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl DecodedTrack {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(BeatDodgeError::msg("sample rate must be non-zero"));
        }
        if samples.is_empty() {
            return Err(BeatDodgeError::AudioDecode(
                "decoded track contains no samples".to_string(),
            ));
        }
        Ok(Self {
            sample_rate,
            samples,
        })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Lifecycle of the collaborator's asynchronous decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DecodeState {
    #[default]
    Pending,
    Resolved(DecodedTrack),
    Failed(String),
}

/// Single-completion handle for a decode in flight.
///
/// The decoding itself belongs to the collaborator; this type only pins down
/// the completion protocol. Game-state mutation never happens inside the
/// completion call — the caller routes the outcome through the session's
/// `track_decoded`/`decode_failed` events, so the same paths run in tests.
#[derive(Debug, Default)]
pub struct DecodeJob {
    state: DecodeState,
}

impl DecodeJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DecodeState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DecodeState::Pending)
    }

    /// Records a successful decode. Errors if the job already completed.
    pub fn resolve(&mut self, track: DecodedTrack) -> Result<()> {
        self.complete(DecodeState::Resolved(track))
    }

    /// Records a failed decode. Errors if the job already completed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.complete(DecodeState::Failed(reason.into()))
    }

    /// Consumes the job, yielding the decoded track or the decode error.
    pub fn into_result(self) -> Result<DecodedTrack> {
        match self.state {
            DecodeState::Resolved(track) => Ok(track),
            DecodeState::Failed(reason) => Err(BeatDodgeError::AudioDecode(reason)),
            DecodeState::Pending => Err(BeatDodgeError::msg("decode has not completed")),
        }
    }

    fn complete(&mut self, outcome: DecodeState) -> Result<()> {
        if !self.is_pending() {
            return Err(BeatDodgeError::msg("decode job already completed"));
        }
        self.state = outcome;
        Ok(())
    }
}
