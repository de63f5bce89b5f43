//! Session events and actions.

use tabula_proto::payloads::game::{GameMeta, MoveCommand, MoveRecord};

/// Events the caller feeds into a [`crate::GameSession`].
///
/// The caller is responsible for:
/// - Fetching game metadata and move history (one-time load)
/// - Receiving live feed messages from the network
/// - Forwarding the local player's move intents
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The one-time historical load completed.
    HistoryLoaded {
        /// Game metadata.
        meta: GameMeta,
        /// Every prior move, in play order.
        moves: Vec<MoveRecord>,
    },

    /// A move arrived on the live feed.
    ///
    /// Safe to feed at any time; moves received before the historical load
    /// completes are buffered and applied after replay, in arrival order.
    MoveReceived(MoveRecord),

    /// The local player wants to submit a move.
    Submit {
        /// Source square in coordinate notation.
        from: String,
        /// Target square in coordinate notation.
        to: String,
    },
}

/// Actions a [`crate::GameSession`] produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Publish a move command to the server.
    ///
    /// Best effort: the session has already surrendered the turn and does
    /// not expect delivery confirmation.
    Publish {
        /// Command destination (unprefixed; the connection layer
        /// normalizes it into the outbound namespace).
        destination: String,
        /// Move body to serialize.
        command: MoveCommand,
    },
}
