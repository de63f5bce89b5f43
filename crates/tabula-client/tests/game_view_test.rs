//! End-to-end game view tests over the in-memory transport.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tabula_client::{
    BrokerEnd, ConnectionManager, ConnectionState, GameStore, GameView, InMemoryStore,
    MemoryConnector, StaticIdentity, StoreError, memory_link,
};
use tabula_proto::{
    Frame, destination,
    payloads::game::{GameMessage, GameMeta, MoveRecord},
};
use tokio::{sync::watch, time::timeout};

const TICK: Duration = Duration::from_millis(500);

fn manager(identity: StaticIdentity) -> (ConnectionManager, BrokerEnd) {
    let (link, broker) = memory_link();
    (ConnectionManager::new(MemoryConnector::single(link), identity), broker)
}

fn meta(white: u64, black: u64) -> GameMeta {
    GameMeta { game_id: "g1".into(), white_user_id: Some(white), black_user_id: Some(black) }
}

async fn deliver_move(broker: &BrokerEnd, game_id: &str, record: MoveRecord) {
    let frame = Frame::send_json(
        destination::game_topic(game_id),
        &GameMessage::MovePlayed { played: record },
    )
    .unwrap();
    broker.deliveries.send(frame).await.unwrap();
}

async fn await_subscribe(broker: &mut BrokerEnd, topic: &str) {
    loop {
        let frame = timeout(TICK, broker.sent.recv()).await.unwrap().unwrap();
        if matches!(&frame, Frame::Subscribe { destination } if destination == topic) {
            return;
        }
    }
}

async fn next_send(broker: &mut BrokerEnd) -> (String, String) {
    loop {
        let frame = timeout(TICK, broker.sent.recv()).await.unwrap().unwrap();
        if let Frame::Send { destination, body } = frame {
            return (destination, body);
        }
    }
}

#[tokio::test]
async fn open_replays_history_and_resolves_turn() {
    let (manager, _broker) = manager(StaticIdentity::new("alice", 7));
    let store = InMemoryStore::new();
    store.insert(meta(1, 7), vec![MoveRecord::new("e2", "e4").by(1)]);

    let view = GameView::open(manager, &store, "g1").await.unwrap();

    assert_eq!(view.session().board().piece_at_coord("e4"), Some('P'));
    assert_eq!(view.session().board().piece_at_coord("e2"), None);
    assert!(view.my_turn(), "opponent moved last");
}

#[tokio::test]
async fn submit_publishes_command_and_surrenders_turn() {
    let (manager, mut broker) = manager(StaticIdentity::new("alice", 7));
    let store = InMemoryStore::new();
    store.insert(meta(1, 7), vec![MoveRecord::new("e2", "e4").by(1)]);

    let mut view = GameView::open(manager, &store, "g1").await.unwrap();

    view.submit("e7", "e5");
    let (dest, body) = next_send(&mut broker).await;
    assert_eq!(dest, "/app/game/g1/move");
    assert_eq!(body, r#"{"from":"e7","to":"e5"}"#);
    assert!(!view.my_turn(), "turn surrendered without waiting for the server");

    // A second submit finds the turn gone and publishes nothing.
    view.submit("d7", "d5");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(broker.sent.try_recv().is_err());
}

/// A store whose move fetch blocks until the test opens the gate,
/// simulating a slow history service while live traffic arrives.
struct GatedStore {
    inner: InMemoryStore,
    gate: watch::Receiver<bool>,
}

#[async_trait]
impl GameStore for GatedStore {
    async fn fetch_game(&self, game_id: &str) -> Result<GameMeta, StoreError> {
        self.inner.fetch_game(game_id).await
    }

    async fn fetch_moves(&self, game_id: &str) -> Result<Vec<MoveRecord>, StoreError> {
        let mut gate = self.gate.clone();
        gate.wait_for(|open| *open)
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        self.inner.fetch_moves(game_id).await
    }
}

#[tokio::test]
async fn live_moves_during_load_are_applied_after_replay_in_order() {
    let (manager, mut broker) = manager(StaticIdentity::new("alice", 7));

    let inner = InMemoryStore::new();
    inner.insert(meta(7, 1), vec![MoveRecord::new("a2", "a3").by(7)]);
    let (open_gate, gate) = watch::channel(false);
    let store = Arc::new(GatedStore { inner, gate });

    let opening = tokio::spawn({
        let manager = manager.clone();
        let store = Arc::clone(&store);
        async move { GameView::open(manager, store.as_ref(), "g1").await }
    });

    // The live subscription is up while the history fetch is still blocked.
    await_subscribe(&mut broker, &destination::game_topic("g1")).await;
    deliver_move(&broker, "g1", MoveRecord::new("a3", "a4").by(1)).await;
    deliver_move(&broker, "g1", MoveRecord::new("a4", "a5").by(7)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    open_gate.send(true).unwrap();
    let view = opening.await.unwrap().unwrap();

    // History first (a2→a3), then the buffered feed in arrival order
    // (a3→a4, a4→a5). Any other order strands the pawn.
    let board = view.session().board();
    assert_eq!(board.piece_at_coord("a5"), Some('P'));
    assert_eq!(board.piece_at_coord("a4"), None);
    assert_eq!(board.piece_at_coord("a3"), None);
    assert_eq!(board.piece_at_coord("a2"), None);

    assert_eq!(view.session().history().len(), 3);
    assert!(!view.my_turn(), "local player authored the last buffered move");
}

#[tokio::test]
async fn close_releases_only_this_view() {
    let (manager, broker) = manager(StaticIdentity::new("alice", 7));
    let store = InMemoryStore::new();
    store.insert(meta(7, 1), vec![]);

    // The lobby holds its own reference to the shared connection.
    manager.connect().await.unwrap();
    let mut players = manager.players();

    let view = GameView::open(manager.clone(), &store, "g1").await.unwrap();
    view.close();

    assert_eq!(manager.state(), ConnectionState::Connected);

    broker
        .deliveries
        .send(Frame::send_json(destination::PLAYERS_TOPIC, &vec!["alice"]).unwrap())
        .await
        .unwrap();
    let list = timeout(TICK, players.recv()).await.unwrap().unwrap();
    assert_eq!(list, vec!["alice".to_string()]);
}

#[tokio::test]
async fn missing_user_id_keeps_the_board_locked() {
    let (manager, mut broker) = manager(StaticIdentity::anonymous_id("alice"));
    let store = InMemoryStore::new();
    store.insert(meta(7, 1), vec![]);

    let mut view = GameView::open(manager, &store, "g1").await.unwrap();
    assert!(!view.my_turn());

    view.submit("a2", "a3");
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok(frame) = broker.sent.try_recv() {
        assert!(
            !matches!(frame, Frame::Send { .. }),
            "locked board must not publish moves"
        );
    }
}
