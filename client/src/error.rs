use thiserror::Error;

pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Failures talking to annotation storage. The synchronizer logs these and
/// never hands them to the interaction loop.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("failed to read response body: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("floor plan id {0:?} is not a URL-safe token")]
    InvalidFloorPlanId(String),
    #[error("storage rejected the request: {0}")]
    Rejected(String),
    #[error("request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
