//! Turn-ownership resolution.
//!
//! The server is authoritative for move legality and authorship, but the
//! client must render a usable turn indicator even when authorship metadata
//! is missing from a particular payload. The chain below always prefers an
//! explicit signal over an inferred one, and inference over outright
//! failure - except when neither player identity is resolvable, in which
//! case the board is locked (no local moves) rather than guessing wrong.
//!
//! # Resolution order (first match wins)
//!
//! 1. Empty history: the local player moves iff they are white; unknown
//!    white assignment locks the board.
//! 2. Last move carries an author: the local player moves iff someone else
//!    moved last.
//! 3. Parity fallback: an even number of moves means white to move; needs
//!    both color assignments, otherwise locked.

use tabula_proto::{
    UserId,
    payloads::game::{GameMeta, MoveRecord},
};

/// Derive initial turn ownership from game metadata and move history.
///
/// `local` is the local account id; `None` (identity unavailable) always
/// resolves to a locked board.
#[must_use]
pub fn resolve_initial_turn(
    meta: &GameMeta,
    history: &[MoveRecord],
    local: Option<UserId>,
) -> bool {
    let Some(local) = local else {
        return false;
    };

    let Some(last) = history.last() else {
        return meta.white_user_id.is_some_and(|white| white == local);
    };

    if let Some(author) = last.played_by {
        return author != local;
    }

    let white_to_move = history.len() % 2 == 0;
    match (meta.white_user_id, meta.black_user_id) {
        (Some(white), Some(black)) => {
            if white_to_move {
                local == white
            } else {
                local == black
            }
        },
        _ => false,
    }
}

/// Update turn ownership from one live move.
///
/// An explicit author is trusted: the local player moves next iff someone
/// else played. Without an author the flag is blindly toggled - a degraded
/// fallback that can desync if a duplicate or spurious message arrives. An
/// authored move with no local identity locks the board.
#[must_use]
pub fn on_live_move(current: bool, played_by: Option<UserId>, local: Option<UserId>) -> bool {
    match (played_by, local) {
        (Some(author), Some(local)) => author != local,
        (Some(_), None) => false,
        (None, _) => !current,
    }
}
