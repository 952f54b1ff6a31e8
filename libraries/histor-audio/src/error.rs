/// Audio task errors
use crate::protocol::Envelope;
use thiserror::Error;

/// Result type for audio task operations
pub type Result<T> = std::result::Result<T, AudioTaskError>;

/// Audio task errors
#[derive(Debug, Error)]
pub enum AudioTaskError {
    /// Queue was full and the caller chose not to wait; the envelope is handed back
    #[error("Channel full, command {} not queued", .0.cmd)]
    ChannelFull(Box<Envelope>),

    /// The other end of the channel is gone
    #[error("Channel disconnected")]
    Disconnected,

    /// No reply within the configured deadline
    #[error("Timed out waiting for the decode thread")]
    Timeout,

    /// Round trip abandoned through the cancel token
    #[error("Round trip cancelled")]
    Cancelled,

    /// Command tag outside the known set
    #[error("Unknown command tag: {0}")]
    UnknownCommand(u8),

    /// Reply carried a different command than the request
    #[error("Wrong reply from message queue: expected command {expected}, got {actual}")]
    ProtocolMismatch {
        /// Command tag of the request
        expected: u8,
        /// Command tag of the reply
        actual: u8,
    },

    /// `wait_station_switch` called with no change-station request outstanding
    #[error("No station change pending")]
    NoStationChange,

    /// Decode thread could not be started
    #[error("Failed to spawn decode thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AudioTaskError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
