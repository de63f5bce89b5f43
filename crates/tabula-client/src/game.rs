//! Game view driver.
//!
//! Wires one [`GameSession`] to the shared connection: performs the
//! historical load, keeps the live subscription pumped, and executes the
//! actions the session machine produces.
//!
//! The live subscription is opened before the historical load resolves, so
//! a move notification can arrive mid-load. Those messages are fed into the
//! session as they arrive; the machine buffers them until replay finishes
//! and then drains them in arrival order. History is always applied before
//! live traffic.

use tabula_core::{GameSession, SessionAction, SessionEvent};
use tabula_proto::payloads::game::{GameMessage, MoveRecord};
use thiserror::Error;

use crate::{
    connection::{ConnectionManager, GameSubscription},
    error::ConnectError,
    store::{GameStore, StoreError},
};

/// Errors surfaced by [`GameView::open`].
#[derive(Debug, Error)]
pub enum OpenError {
    /// The shared connection could not be established.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The historical load failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One open game, synchronized with the server.
pub struct GameView {
    connection: ConnectionManager,
    session: GameSession,
    subscription: GameSubscription,
}

impl GameView {
    /// Open a view on `game_id`.
    ///
    /// Connects the shared manager (taking one reference), opens the
    /// per-game subscription, then loads metadata and history concurrently
    /// while live messages queue through the session's buffer. Returns once
    /// history is replayed and any buffered live moves are applied.
    ///
    /// # Errors
    ///
    /// - [`OpenError::Connect`] if the connection cannot be established
    /// - [`OpenError::Store`] if either historical read fails
    pub async fn open<S>(
        connection: ConnectionManager,
        store: &S,
        game_id: &str,
    ) -> Result<Self, OpenError>
    where
        S: GameStore + ?Sized,
    {
        let mut session = GameSession::new(game_id, connection.local_user_id());

        connection.connect().await?;
        let mut subscription = connection.subscribe_game(game_id);

        let fetch =
            async { tokio::try_join!(store.fetch_game(game_id), store.fetch_moves(game_id)) };
        tokio::pin!(fetch);

        let (meta, moves) = loop {
            tokio::select! {
                result = &mut fetch => break result?,
                message = subscription.recv() => {
                    match message {
                        Some(GameMessage::MovePlayed { played }) => {
                            let actions = session.handle(SessionEvent::MoveReceived(played));
                            execute(&connection, actions);
                        },
                        // Route replaced underneath us; just finish the load.
                        None => break (&mut fetch).await?,
                    }
                },
            }
        };

        let actions = session.handle(SessionEvent::HistoryLoaded { meta, moves });
        execute(&connection, actions);

        Ok(Self { connection, session, subscription })
    }

    /// Wait for the next live move and apply it.
    ///
    /// Returns the applied record, or `None` if the subscription is gone.
    pub async fn next_move(&mut self) -> Option<MoveRecord> {
        match self.subscription.recv().await? {
            GameMessage::MovePlayed { played } => {
                let actions = self.session.handle(SessionEvent::MoveReceived(played.clone()));
                execute(&self.connection, actions);
                Some(played)
            },
        }
    }

    /// Submit a move for the local player.
    ///
    /// Ignored unless it is currently the local player's turn; otherwise
    /// the command is published and the turn is surrendered immediately,
    /// without waiting for the server's acknowledgment.
    pub fn submit(&mut self, from: &str, to: &str) {
        let actions =
            self.session.handle(SessionEvent::Submit { from: from.into(), to: to.into() });
        execute(&self.connection, actions);
    }

    /// The underlying session state.
    #[must_use]
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Whether the local player may currently submit a move.
    #[must_use]
    pub fn my_turn(&self) -> bool {
        self.session.my_turn()
    }

    /// Close the view: cancel exactly this game's subscription and release
    /// one connection reference. Lobby subscriptions and other views are
    /// unaffected.
    pub fn close(self) {
        self.subscription.cancel();
        self.connection.disconnect();
    }
}

fn execute(connection: &ConnectionManager, actions: Vec<SessionAction>) {
    for action in actions {
        match action {
            SessionAction::Publish { destination, command } => {
                connection.send(&destination, &command);
            },
        }
    }
}
