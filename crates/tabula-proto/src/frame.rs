//! Destination-addressed frames.
//!
//! The transport carries [`Frame`] values in both directions. `Subscribe` and
//! `Unsubscribe` are client-to-broker control frames; `Send` carries a JSON
//! body and is used both for client publishes and broker deliveries.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A single unit of transport traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Register interest in a destination.
    Subscribe {
        /// Destination path to start receiving.
        destination: String,
    },

    /// Cancel a prior subscription.
    Unsubscribe {
        /// Destination path to stop receiving.
        destination: String,
    },

    /// Data frame carrying a JSON body.
    Send {
        /// Destination path the body is addressed to.
        destination: String,
        /// JSON-encoded payload.
        body: String,
    },
}

impl Frame {
    /// Build a `Send` frame by JSON-encoding `body`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Serialize` if the body cannot be encoded
    pub fn send_json<T: Serialize>(
        destination: impl Into<String>,
        body: &T,
    ) -> Result<Self, ProtocolError> {
        let body = serde_json::to_string(body).map_err(ProtocolError::Serialize)?;
        Ok(Self::Send { destination: destination.into(), body })
    }

    /// Destination path this frame is addressed to.
    #[must_use]
    pub fn destination(&self) -> &str {
        match self {
            Self::Subscribe { destination }
            | Self::Unsubscribe { destination }
            | Self::Send { destination, .. } => destination,
        }
    }

    /// Decode the body of a `Send` frame as `T`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MalformedMessage` if this is not a `Send` frame or
    ///   the body does not parse as `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        match self {
            Self::Send { destination, body } => {
                serde_json::from_str(body).map_err(|source| ProtocolError::MalformedMessage {
                    destination: destination.clone(),
                    source,
                })
            },
            // Control frames have no body; decoding the empty string yields
            // the same error shape as any other truncated payload.
            Self::Subscribe { destination } | Self::Unsubscribe { destination } => {
                serde_json::from_str("").map_err(|source| ProtocolError::MalformedMessage {
                    destination: destination.clone(),
                    source,
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_json_round_trips() {
        let frame = Frame::send_json("/topic/players", &vec!["alice", "bob"]).unwrap();
        assert_eq!(frame.destination(), "/topic/players");

        let names: Vec<String> = frame.decode().unwrap();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn decode_rejects_control_frames() {
        let frame = Frame::Subscribe { destination: "/topic/players".into() };
        let result: Result<Vec<String>, _> = frame.decode();
        assert!(matches!(result, Err(ProtocolError::MalformedMessage { .. })));
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let frame = Frame::Send { destination: "/topic/players".into(), body: "{not json".into() };
        let result: Result<Vec<String>, _> = frame.decode();
        assert!(matches!(result, Err(ProtocolError::MalformedMessage { .. })));
    }
}
