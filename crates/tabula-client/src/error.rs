//! Client error types.
//!
//! The propagation policy is asymmetric on purpose: [`ConnectError`] is
//! surfaced to the caller because nothing works without a connection, while
//! [`SendError`] is logged and swallowed at the publish boundary - callers
//! hold a best-effort contract and must not assume delivery confirmation.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by [`crate::ConnectionManager::connect`].
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No local identity is available; the connection cannot be attributed.
    #[error("no local identity available")]
    IdentityMissing,

    /// The transport could not be established.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Reasons an outbound frame was dropped.
///
/// Never returned to callers of `send`; logged at the boundary instead.
#[derive(Debug, Error)]
pub enum SendError {
    /// No transport is initialized, or it has already closed.
    #[error("transport not initialized")]
    TransportUnavailable,

    /// The outbound queue is full.
    #[error("outbound queue full")]
    QueueFull,

    /// The body failed to serialize.
    #[error(transparent)]
    Serialize(#[from] tabula_proto::ProtocolError),
}
