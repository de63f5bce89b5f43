//! Destination namespaces and well-known topics.
//!
//! Every destination path starts with one of four namespace prefixes:
//!
//! | prefix   | direction | meaning                       |
//! |----------|-----------|-------------------------------|
//! | `/topic` | inbound   | broadcast to all subscribers  |
//! | `/queue` | inbound   | shared queue                  |
//! | `/user`  | inbound   | scoped to one user            |
//! | `/app`   | outbound  | command handled by the server |
//!
//! Callers publishing a command may pass a bare path like `invite` or
//! `/game/42/move`; [`normalize`] maps anything without a recognized prefix
//! into the outbound command namespace.

/// Inbound broadcast namespace.
pub const TOPIC_PREFIX: &str = "/topic";

/// Inbound shared-queue namespace.
pub const QUEUE_PREFIX: &str = "/queue";

/// Inbound user-scoped namespace.
pub const USER_PREFIX: &str = "/user";

/// Outbound command namespace.
pub const APP_PREFIX: &str = "/app";

/// Broadcast presence list for the lobby.
pub const PLAYERS_TOPIC: &str = "/topic/players";

/// Personal invite queue.
pub const INVITE_QUEUE: &str = "/user/queue/invite";

/// Broadcast invite topic, filtered client-side by addressee.
pub const INVITES_TOPIC: &str = "/topic/invites";

/// Broadcast invite-response topic, filtered client-side by addressee.
pub const INVITE_RESPONSE_TOPIC: &str = "/topic/invite.response";

/// Personal game-created queue (legacy alias).
pub const GAME_QUEUE: &str = "/user/queue/game";

/// Personal game-created queue.
pub const GAME_CREATED_QUEUE: &str = "/user/queue/game.created";

/// Broadcast game-created topic, filtered client-side by participant.
pub const GAME_CREATED_TOPIC: &str = "/topic/game.created";

/// Outbound invite command.
pub const INVITE_DESTINATION: &str = "/app/invite";

/// Outbound invite-response command.
pub const INVITE_RESPONSE_DESTINATION: &str = "/app/invite/response";

/// The fixed set of topics subscribed when a connection is established.
pub const WELL_KNOWN_TOPICS: [&str; 7] = [
    PLAYERS_TOPIC,
    INVITE_QUEUE,
    INVITES_TOPIC,
    INVITE_RESPONSE_TOPIC,
    GAME_QUEUE,
    GAME_CREATED_QUEUE,
    GAME_CREATED_TOPIC,
];

/// Live topic for one game's move feed.
#[must_use]
pub fn game_topic(game_id: &str) -> String {
    format!("{TOPIC_PREFIX}/game.{game_id}")
}

/// Command destination for submitting a move in one game.
///
/// Deliberately unprefixed; [`normalize`] maps it into the outbound command
/// namespace at publish time.
#[must_use]
pub fn move_destination(game_id: &str) -> String {
    format!("/game/{game_id}/move")
}

/// Map a destination into the outbound command namespace unless it already
/// carries a recognized prefix.
#[must_use]
pub fn normalize(destination: &str) -> String {
    const RECOGNIZED: [&str; 4] = [APP_PREFIX, TOPIC_PREFIX, QUEUE_PREFIX, USER_PREFIX];

    if RECOGNIZED.iter().any(|prefix| destination.starts_with(prefix)) {
        destination.to_string()
    } else if destination.starts_with('/') {
        format!("{APP_PREFIX}{destination}")
    } else {
        format!("{APP_PREFIX}/{destination}")
    }
}
