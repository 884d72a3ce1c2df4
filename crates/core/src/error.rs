/// Result alias that carries the custom [`BeatDodgeError`] type.
pub type Result<T> = std::result::Result<T, BeatDodgeError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BeatDodgeError {
    /// Free-form error used where no dedicated variant applies.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors from tuning files.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// The collaborator failed to decode the user-supplied track. Fatal for
    /// this attempt only; the session stays in (or returns to) `Idle` and a
    /// fresh track can be submitted without restarting the process.
    #[error("audio decode failed: {0}")]
    AudioDecode(String),
    /// A lane index outside `0..=2` reached the API boundary.
    #[error("invalid lane index {0}, expected 0, 1 or 2")]
    InvalidLane(usize),
}

impl BeatDodgeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for BeatDodgeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BeatDodgeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
