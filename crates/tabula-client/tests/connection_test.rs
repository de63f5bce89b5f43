//! Integration tests for the shared connection over the in-memory transport.

use std::time::Duration;

use serde::Serialize;
use tabula_client::{
    BrokerEnd, ConnectError, ConnectionManager, ConnectionState, InviteEvent, MemoryConnector,
    StaticIdentity, memory_link,
};
use tabula_proto::{
    Frame, destination,
    payloads::{
        game::{GameMessage, MoveRecord},
        lobby::{GameCreated, Invite, InviteResponse},
    },
};
use tokio::time::timeout;

const TICK: Duration = Duration::from_millis(500);

fn manager_with_brokers(links: usize) -> (ConnectionManager, Vec<BrokerEnd>) {
    let mut transports = Vec::new();
    let mut brokers = Vec::new();
    for _ in 0..links {
        let (link, broker) = memory_link();
        transports.push(link);
        brokers.push(broker);
    }

    let manager =
        ConnectionManager::new(MemoryConnector::new(transports), StaticIdentity::new("alice", 7));
    (manager, brokers)
}

async fn deliver<T: Serialize>(broker: &BrokerEnd, dest: &str, body: &T) {
    broker.deliveries.send(Frame::send_json(dest, body).unwrap()).await.unwrap();
}

/// Next data frame the broker received, skipping control frames.
async fn next_send(broker: &mut BrokerEnd) -> (String, String) {
    loop {
        let frame = timeout(TICK, broker.sent.recv()).await.unwrap().unwrap();
        if let Frame::Send { destination, body } = frame {
            return (destination, body);
        }
    }
}

#[tokio::test]
async fn connect_requires_identity() {
    let (link, _broker) = memory_link();
    let manager =
        ConnectionManager::new(MemoryConnector::single(link), StaticIdentity::missing());

    let result = manager.connect().await;
    assert!(matches!(result, Err(ConnectError::IdentityMissing)));
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn redundant_connect_shares_one_transport() {
    let (manager, mut brokers) = manager_with_brokers(1);

    manager.connect().await.unwrap();
    // Second connect must reuse the transport; the connector would fail if
    // it were dialed again.
    manager.connect().await.unwrap();
    assert_eq!(manager.state(), ConnectionState::Connected);

    let broker = &mut brokers[0];
    let mut subscribed = Vec::new();
    while let Ok(frame) = broker.sent.try_recv() {
        if let Frame::Subscribe { destination } = frame {
            subscribed.push(destination);
        }
    }

    assert_eq!(subscribed.len(), destination::WELL_KNOWN_TOPICS.len());
    for topic in destination::WELL_KNOWN_TOPICS {
        assert!(subscribed.iter().any(|d| d == topic), "missing subscription for {topic}");
    }
}

#[tokio::test]
async fn send_normalizes_destination() {
    let (manager, mut brokers) = manager_with_brokers(1);
    manager.connect().await.unwrap();

    manager.send("invite", &Invite { from: "alice".into(), to: "bob".into() });

    let (dest, _body) = next_send(&mut brokers[0]).await;
    assert_eq!(dest, "/app/invite");
}

#[tokio::test]
async fn send_without_transport_is_swallowed() {
    let (manager, _brokers) = manager_with_brokers(0);

    // Best effort: dropped with a logged error, no panic, no state change.
    manager.send("invite", &Invite { from: "alice".into(), to: "bob".into() });
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    let result = manager.connect().await;
    assert!(matches!(result, Err(ConnectError::Transport(_))));
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn malformed_message_is_contained() {
    let (manager, mut brokers) = manager_with_brokers(1);
    let mut players = manager.players();
    let mut invites = manager.invites();
    manager.connect().await.unwrap();
    let broker = &mut brokers[0];

    broker
        .deliveries
        .send(Frame::Send {
            destination: destination::PLAYERS_TOPIC.into(),
            body: "{not json".into(),
        })
        .await
        .unwrap();
    deliver(broker, destination::PLAYERS_TOPIC, &vec!["alice", "bob"]).await;
    deliver(broker, destination::INVITE_QUEUE, &Invite { from: "bob".into(), to: "alice".into() })
        .await;

    // The bad frame was dropped; the frames behind it still flow.
    let list = timeout(TICK, players.recv()).await.unwrap().unwrap();
    assert_eq!(list, vec!["alice".to_string(), "bob".to_string()]);

    let event = timeout(TICK, invites.recv()).await.unwrap().unwrap();
    assert!(matches!(event, InviteEvent::Received(invite) if invite.from == "bob"));

    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn broadcast_invites_are_filtered_by_addressee() {
    let (manager, mut brokers) = manager_with_brokers(1);
    let mut invites = manager.invites();
    manager.connect().await.unwrap();
    let broker = &mut brokers[0];

    deliver(broker, destination::INVITES_TOPIC, &Invite {
        from: "carol".into(),
        to: "someone-else".into(),
    })
    .await;
    deliver(broker, destination::INVITES_TOPIC, &Invite { from: "bob".into(), to: "alice".into() })
        .await;

    let event = timeout(TICK, invites.recv()).await.unwrap().unwrap();
    assert!(matches!(event, InviteEvent::Received(invite) if invite.from == "bob"));
}

#[tokio::test]
async fn invite_responses_are_filtered_by_addressee() {
    let (manager, mut brokers) = manager_with_brokers(1);
    let mut invites = manager.invites();
    manager.connect().await.unwrap();
    let broker = &mut brokers[0];

    deliver(broker, destination::INVITE_RESPONSE_TOPIC, &InviteResponse {
        from: "someone-else".into(),
        to: "carol".into(),
        accepted: true,
    })
    .await;
    deliver(broker, destination::INVITE_RESPONSE_TOPIC, &InviteResponse {
        from: "alice".into(),
        to: "alice".into(),
        accepted: false,
    })
    .await;

    let event = timeout(TICK, invites.recv()).await.unwrap().unwrap();
    assert!(matches!(event, InviteEvent::Answered(answer) if !answer.accepted));
}

#[tokio::test]
async fn game_created_broadcast_is_filtered_to_participants() {
    let (manager, mut brokers) = manager_with_brokers(1);
    let mut created = manager.games_created();
    manager.connect().await.unwrap();
    let broker = &mut brokers[0];

    deliver(broker, destination::GAME_CREATED_TOPIC, &GameCreated {
        game_id: "other".into(),
        from: Some("carol".into()),
        to: Some("dave".into()),
    })
    .await;
    // Personal queue copies are unfiltered even without addressing.
    deliver(broker, destination::GAME_CREATED_QUEUE, &GameCreated {
        game_id: "mine".into(),
        from: None,
        to: None,
    })
    .await;

    let notice = timeout(TICK, created.recv()).await.unwrap().unwrap();
    assert_eq!(notice.game_id, "mine");
}

#[tokio::test]
async fn game_subscription_routes_and_cancels_independently() {
    let (manager, mut brokers) = manager_with_brokers(1);
    let mut players = manager.players();
    manager.connect().await.unwrap();
    let broker = &mut brokers[0];

    let mut subscription = manager.subscribe_game("g1");
    deliver(broker, &destination::game_topic("g1"), &GameMessage::MovePlayed {
        played: MoveRecord::new("a2", "a3"),
    })
    .await;

    let message = timeout(TICK, subscription.recv()).await.unwrap().unwrap();
    assert!(matches!(message, GameMessage::MovePlayed { played } if played.from_cell == "a2"));

    subscription.cancel();

    // The unsubscribe goes out, and lobby traffic keeps flowing.
    let unsubscribed = loop {
        match timeout(TICK, broker.sent.recv()).await.unwrap().unwrap() {
            Frame::Unsubscribe { destination } => break destination,
            _ => {},
        }
    };
    assert_eq!(unsubscribed, destination::game_topic("g1"));

    deliver(broker, destination::PLAYERS_TOPIC, &vec!["alice"]).await;
    let list = timeout(TICK, players.recv()).await.unwrap().unwrap();
    assert_eq!(list, vec!["alice".to_string()]);
}

#[tokio::test]
async fn disconnect_is_reference_counted() {
    let (manager, _brokers) = manager_with_brokers(1);

    manager.connect().await.unwrap();
    manager.connect().await.unwrap();

    manager.disconnect();
    assert_eq!(manager.state(), ConnectionState::Connected);

    manager.disconnect();
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // Further disconnects are no-ops.
    manager.disconnect();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn transport_failure_lands_in_disconnected() {
    let (manager, mut brokers) = manager_with_brokers(1);
    manager.connect().await.unwrap();

    drop(brokers.remove(0));

    let mut state = manager.state();
    for _ in 0..100 {
        state = manager.state();
        if state == ConnectionState::Disconnected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn lobby_helpers_attribute_the_local_user() {
    let (manager, mut brokers) = manager_with_brokers(1);
    manager.connect().await.unwrap();
    let broker = &mut brokers[0];

    manager.send_invite("bob");
    let (dest, body) = next_send(broker).await;
    assert_eq!(dest, "/app/invite");
    let invite: Invite = serde_json_from(&body);
    assert_eq!(invite, Invite { from: "alice".into(), to: "bob".into() });

    manager.answer_invite("bob", true);
    let (dest, body) = next_send(broker).await;
    assert_eq!(dest, "/app/invite/response");
    let answer: InviteResponse = serde_json_from(&body);
    assert_eq!(answer, InviteResponse { from: "bob".into(), to: "alice".into(), accepted: true });
}

fn serde_json_from<T: serde::de::DeserializeOwned>(body: &str) -> T {
    Frame::Send { destination: String::new(), body: body.to_string() }.decode().unwrap()
}
