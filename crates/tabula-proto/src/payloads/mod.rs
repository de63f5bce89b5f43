//! Typed JSON bodies per topic.
//!
//! The payload type is determined by the destination a frame arrives on, so
//! bodies carry no discriminator of their own - except the per-game feed,
//! where [`game::GameMessage`] is tagged by a `type` field because several
//! notification kinds share one topic.
//!
//! User identifiers on the wire are inconsistent across upstream services:
//! some emit numbers, some numeric strings, some null. [`lenient_user_id`]
//! accepts all three and anything else decodes as absent, which downstream
//! turn resolution treats as an unknown author.

pub mod game;
pub mod lobby;

use serde::{Deserialize, Deserializer};

/// Stable numeric identifier for a player account.
pub type UserId = u64;

/// Decode an optional user id from a number, numeric string, or null.
///
/// Non-numeric values decode as `None` rather than failing the whole
/// payload; authorship is optional everywhere it appears.
///
/// # Errors
///
/// Fails only if the field is not valid JSON at all.
pub fn lenient_user_id<'de, D>(deserializer: D) -> Result<Option<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_user_id))
}

fn coerce_user_id(value: &serde_json::Value) -> Option<UserId> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
