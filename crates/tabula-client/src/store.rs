//! Historical load boundary.
//!
//! A game view needs two reads at open time: the game's metadata and its
//! ordered move list. The HTTP client that answers them in production is an
//! external collaborator; this trait is its seam, and [`InMemoryStore`]
//! stands in for it in tests and embedders with their own persistence.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use tabula_proto::payloads::game::{GameMeta, MoveRecord};
use thiserror::Error;

/// Errors from the historical load.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The game does not exist.
    #[error("game {0} not found")]
    NotFound(String),

    /// The backing service failed.
    #[error("history request failed: {0}")]
    Request(String),
}

/// Read access to game metadata and move history.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Fetch one game's metadata.
    async fn fetch_game(&self, game_id: &str) -> Result<GameMeta, StoreError>;

    /// Fetch one game's moves, in play order.
    async fn fetch_moves(&self, game_id: &str) -> Result<Vec<MoveRecord>, StoreError>;
}

/// In-process store keyed by game id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    games: Mutex<HashMap<String, (GameMeta, Vec<MoveRecord>)>>,
}

impl InMemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a game and its history.
    pub fn insert(&self, meta: GameMeta, moves: Vec<MoveRecord>) {
        let mut games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        games.insert(meta.game_id.clone(), (meta, moves));
    }
}

#[async_trait]
impl GameStore for InMemoryStore {
    async fn fetch_game(&self, game_id: &str) -> Result<GameMeta, StoreError> {
        let games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        games
            .get(game_id)
            .map(|(meta, _)| meta.clone())
            .ok_or_else(|| StoreError::NotFound(game_id.to_string()))
    }

    async fn fetch_moves(&self, game_id: &str) -> Result<Vec<MoveRecord>, StoreError> {
        let games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        games
            .get(game_id)
            .map(|(_, moves)| moves.clone())
            .ok_or_else(|| StoreError::NotFound(game_id.to_string()))
    }
}
