use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Bus transport error: {0}")]
    Transport(String),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unsupported bus URL: {0}")]
    UnsupportedUrl(String),

    #[error("Bus unreachable after {attempts} attempts: {last_error}")]
    Unreachable { attempts: u32, last_error: String },
}

impl From<redis::RedisError> for BusError {
    fn from(err: redis::RedisError) -> Self {
        BusError::Transport(err.to_string())
    }
}
