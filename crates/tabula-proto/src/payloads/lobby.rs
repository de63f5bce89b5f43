//! Lobby presence and invite payloads.

use serde::{Deserialize, Serialize};

/// Usernames currently present in the lobby.
pub type PresenceList = Vec<String>;

/// An invitation from one player to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// Username of the inviting player.
    pub from: String,

    /// Username of the invited player.
    pub to: String,
}

/// Answer to an invitation.
///
/// `from` names the original inviter, `to` the player who answered - the
/// response travels back along the same addressing as the invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteResponse {
    /// Username of the original inviter.
    pub from: String,

    /// Username of the answering player.
    pub to: String,

    /// Whether the invitation was accepted.
    pub accepted: bool,
}

/// Notification that a game was created for two players.
///
/// Broadcast copies carry `from`/`to` so clients can filter for their own
/// games; personal-queue copies may omit them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCreated {
    /// Identifier of the freshly created game.
    pub game_id: String,

    /// Username of the player who initiated the pairing.
    #[serde(default)]
    pub from: Option<String>,

    /// Username of the other participant.
    #[serde(default)]
    pub to: Option<String>,
}

impl GameCreated {
    /// Whether `username` is one of the participants.
    #[must_use]
    pub fn involves(&self, username: &str) -> bool {
        self.from.as_deref() == Some(username) || self.to.as_deref() == Some(username)
    }
}
