//! Game metadata, move records, and the per-game live feed.

use serde::{Deserialize, Serialize};

use super::{UserId, lenient_user_id};

/// Metadata for one game, as returned by the history service.
///
/// Either color assignment may be absent while matchmaking is incomplete;
/// turn resolution degrades to a locked board in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMeta {
    /// Stable game identifier.
    pub game_id: String,

    /// Account playing white, if assigned.
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub white_user_id: Option<UserId>,

    /// Account playing black, if assigned.
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub black_user_id: Option<UserId>,
}

/// One accepted move, either from the history service or the live feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    /// Source square in coordinate notation (`a1`..`h8`).
    pub from_cell: String,

    /// Target square in coordinate notation.
    pub to_cell: String,

    /// Account that played the move. Absent on some historical records.
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub played_by: Option<UserId>,
}

impl MoveRecord {
    /// Convenience constructor for an anonymous move.
    #[must_use]
    pub fn new(from_cell: impl Into<String>, to_cell: impl Into<String>) -> Self {
        Self { from_cell: from_cell.into(), to_cell: to_cell.into(), played_by: None }
    }

    /// Attach the author to this record.
    #[must_use]
    pub fn by(mut self, player: UserId) -> Self {
        self.played_by = Some(player);
        self
    }
}

/// Notification on a per-game live topic, tagged by `type`.
///
/// Unrecognized types fail to decode and are dropped by the dispatch layer
/// like any other malformed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameMessage {
    /// The server accepted a move by either player.
    #[serde(rename = "MOVE_PLAYED")]
    MovePlayed {
        /// The accepted move.
        #[serde(rename = "move")]
        played: MoveRecord,
    },
}

/// Outbound body for submitting a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommand {
    /// Source square in coordinate notation.
    pub from: String,

    /// Target square in coordinate notation.
    pub to: String,
}
