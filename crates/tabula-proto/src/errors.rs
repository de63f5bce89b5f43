//! Protocol error types.
//!
//! Decode failures carry the destination they arrived on so the dispatch
//! layer can log which topic produced the bad payload. Per the containment
//! policy, a [`ProtocolError`] never tears down a connection: the offending
//! message is dropped and everything else continues.

use thiserror::Error;

/// Errors produced while encoding or decoding frame bodies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A message body failed to parse as the payload type for its topic.
    #[error("malformed message on {destination}: {source}")]
    MalformedMessage {
        /// Destination the message arrived on.
        destination: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An outbound body failed to serialize.
    #[error("payload serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}
