//! Per-game session state machine.
//!
//! Merges the one-time historical load with the incremental live feed and
//! keeps the derived turn flag consistent with both.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐  HistoryLoaded: replay, resolve turn,  ┌──────┐
//! │ Loading │────────────drain buffer───────────────>│ Live │
//! └─────────┘                                        └──────┘
//!      │                                                │
//!      │ MoveReceived: buffer                           │ MoveReceived: apply
//! ```
//!
//! The live subscription is opened without waiting for the historical load,
//! so a move notification can arrive while the load is still in flight.
//! Applying it immediately would corrupt the board (the replay would then
//! re-apply delivered moves on top). The session therefore buffers every
//! live move received while `Loading` and drains the buffer in arrival
//! order once replay finishes. Replay-before-live-apply is an invariant of
//! this machine, not optional hardening.

use std::collections::VecDeque;

use tabula_proto::{
    UserId,
    destination::move_destination,
    payloads::game::{GameMeta, MoveCommand, MoveRecord},
};

use crate::{
    board::Board,
    event::{SessionAction, SessionEvent},
    turn,
};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the historical load; live moves are buffered.
    Loading,
    /// History replayed; live moves apply immediately.
    Live,
}

/// State machine for one open game view.
///
/// Pure state machine: no I/O, no time. The caller feeds [`SessionEvent`]s
/// and executes the returned [`SessionAction`]s.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Game this session mirrors.
    game_id: String,
    /// Local account id. `None` keeps the board locked.
    local_user: Option<UserId>,
    /// Mirrored board state.
    board: Board,
    /// Move history: the historical load plus every applied live move.
    history: Vec<MoveRecord>,
    /// Game metadata, present once the load completed.
    meta: Option<GameMeta>,
    /// Whether the local player may currently submit a move.
    my_turn: bool,
    /// Current phase.
    phase: SessionPhase,
    /// Live moves received before the historical load completed.
    pending: VecDeque<MoveRecord>,
}

impl GameSession {
    /// Create a session for `game_id` with the board at the starting layout.
    #[must_use]
    pub fn new(game_id: impl Into<String>, local_user: Option<UserId>) -> Self {
        Self {
            game_id: game_id.into(),
            local_user,
            board: Board::starting_layout(),
            history: Vec::new(),
            meta: None,
            my_turn: false,
            phase: SessionPhase::Loading,
            pending: VecDeque::new(),
        }
    }

    /// Process an event and return actions for the caller to execute.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::HistoryLoaded { meta, moves } => {
                self.load_history(meta, moves);
                vec![]
            },
            SessionEvent::MoveReceived(record) => {
                match self.phase {
                    SessionPhase::Loading => self.pending.push_back(record),
                    SessionPhase::Live => self.apply_live(record),
                }
                vec![]
            },
            SessionEvent::Submit { from, to } => self.submit(from, to),
        }
    }

    fn load_history(&mut self, meta: GameMeta, moves: Vec<MoveRecord>) {
        self.board = Board::starting_layout();
        for record in &moves {
            self.apply_to_board(record);
        }
        self.my_turn = turn::resolve_initial_turn(&meta, &moves, self.local_user);
        self.history = moves;
        self.meta = Some(meta);
        self.phase = SessionPhase::Live;

        while let Some(record) = self.pending.pop_front() {
            self.apply_live(record);
        }
    }

    fn apply_live(&mut self, record: MoveRecord) {
        self.apply_to_board(&record);
        self.my_turn = turn::on_live_move(self.my_turn, record.played_by, self.local_user);
        self.history.push(record);
    }

    fn apply_to_board(&mut self, record: &MoveRecord) {
        if let Err(error) = self.board.apply_move(&record.from_cell, &record.to_cell) {
            tracing::warn!(game_id = %self.game_id, %error, "ignoring move");
        }
    }

    fn submit(&mut self, from: String, to: String) -> Vec<SessionAction> {
        if !self.my_turn {
            tracing::warn!(game_id = %self.game_id, "submit rejected: not this player's turn");
            return vec![];
        }

        // Turn is surrendered immediately, before any acknowledgment, so a
        // double-click cannot produce a second send.
        self.my_turn = false;

        vec![SessionAction::Publish {
            destination: move_destination(&self.game_id),
            command: MoveCommand { from, to },
        }]
    }

    /// Game this session mirrors.
    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Mirrored board state.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Whether the local player may currently submit a move.
    #[must_use]
    pub fn my_turn(&self) -> bool {
        self.my_turn
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Move history replayed so far, live moves included.
    #[must_use]
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    /// Game metadata. `None` until the historical load completes.
    #[must_use]
    pub fn meta(&self) -> Option<&GameMeta> {
        self.meta.as_ref()
    }
}
