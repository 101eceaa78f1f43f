use thiserror::Error;

/// Failure of the underlying fetch. A resolved non-2xx response is not one of these.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    #[error("Invalid cache namespace name: {0:?}")]
    InvalidNamespace(String),
}

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(#[from] NetworkError),

    #[error("Cache store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Platform call failed: {0}")]
    Platform(String),

    #[error("Background task failed: {0}")]
    Background(String),
}

/// Maximum length for error details echoed back to the host page
const MAX_ERROR_DETAIL_LENGTH: usize = 200;

impl OfflineError {
    /// Shortened description, safe to put into a control-channel reply.
    pub fn detail(&self) -> String {
        let full = self.to_string();
        if full.len() <= MAX_ERROR_DETAIL_LENGTH {
            return full;
        }
        let mut end = MAX_ERROR_DETAIL_LENGTH;
        while !full.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &full[..end])
    }
}
