use crate::transport::TransportKind;

/// Failure of a single transport adapter.
///
/// Never surfaced to the game: the session logs it and carries on with the
/// remaining adapter.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("{0} transport is unavailable in this origin")]
    Unavailable(TransportKind),

    #[error("{0} transport is closed")]
    Closed(TransportKind),

    #[error("Shared store quota exceeded ({used} + {requested} > {quota} bytes)")]
    QuotaExceeded {
        used: usize,
        requested: usize,
        quota: usize,
    },

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Error returned by [`RoomSync`](crate::RoomSync) calls.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("Room session is closed")]
    SessionClosed,
}
