use thiserror::Error;
use types::errors::PriceError;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Dial failed: {0}")]
    Dial(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Connection closed by venue")]
    Closed,

    #[error("Malformed event: {0}")]
    Malformed(String),

    #[error("Invalid price: {0}")]
    Price(#[from] PriceError),
}

impl FeedError {
    /// Errors that end the current connection, as opposed to dropping one
    /// event.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, FeedError::Read(_) | FeedError::Closed)
    }
}
