use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Candle fetch failed, timed out, returned malformed bars or not enough history.
    /// Aborts only the current tick or query.
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    /// Corrupted in-memory position model. Fatal.
    #[error("Invalid position state: {0}")]
    InvalidState(String),

    /// The sink rejected or timed out on a message. The transition that
    /// produced it is not rolled back.
    #[error("Notification delivery failed: {0}")]
    NotificationDeliveryFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors that must stop the process instead of skipping a tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
