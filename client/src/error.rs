//! Unified error handling for the sync host.

/// Sync error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The transport could not reach the remote; retried on the next tick.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The remote answered with something that is not a quote array.
    #[error("Remote protocol error: {0}")]
    RemoteProtocol(String),

    #[error("Engine error: {0}")]
    Engine(#[from] quotesync_engine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether the failure is expected to clear up by itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::NetworkUnavailable(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if status.is_server_error() {
                return SyncError::NetworkUnavailable(err.to_string());
            }
            return SyncError::RemoteProtocol(err.to_string());
        }
        if err.is_decode() || err.is_body() {
            return SyncError::RemoteProtocol(err.to_string());
        }
        SyncError::NetworkUnavailable(err.to_string())
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
