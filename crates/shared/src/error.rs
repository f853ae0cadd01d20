use thiserror::Error;

use crate::domain::ParticipantId;

/// Failure surfaced by the external realtime store. Nothing here is
/// retried; callers present the failure and move on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport failed: {0}")]
    Transport(String),
    #[error("store rejected the request with status {0}")]
    Rejected(u16),
    #[error("malformed store payload: {0}")]
    Payload(String),
}

/// Errors surfaced by the sync-layer operations.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("participant {0} is not in the last known snapshot")]
    NotFound(ParticipantId),
    #[error("selection must name at least one participant")]
    EmptySelection,
    #[error("realtime store request failed: {0}")]
    Store(#[from] StoreError),
}
