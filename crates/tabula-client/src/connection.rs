//! Shared broker connection.
//!
//! One transport is shared process-wide across the lobby and every open
//! game view. [`ConnectionManager`] is a cheap handle around that shared
//! state: `connect()` is idempotent and reference-counted, so independent
//! views can call it redundantly without opening duplicate transports, and
//! `disconnect()` only tears the transport down once the last holder
//! releases it.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  connect   ┌────────────┐  ready   ┌───────────┐
//! │ Disconnected │───────────>│ Connecting │─────────>│ Connected │
//! └──────────────┘            └────────────┘          └───────────┘
//!        ↑                          │ dial error            │
//!        └──────────────────────────┴────────────────0 refs,│
//!                                             transport err ┘
//! ```
//!
//! No automatic reconnect: a transport error lands in `Disconnected` and
//! stays there until some caller decides to `connect()` again.
//!
//! # Dispatch
//!
//! A single task drains inbound frames. Each well-known topic decodes its
//! own payload type and forwards into a named broadcast channel; per-game
//! topics route into the subscription registry. A decode failure is logged
//! and drops that one message - it never tears down the connection or any
//! other subscription.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;
use tabula_proto::{
    Frame, ProtocolError, UserId, destination,
    payloads::{
        game::GameMessage,
        lobby::{GameCreated, Invite, InviteResponse, PresenceList},
    },
};
use tokio::sync::{broadcast, mpsc};

use crate::{
    error::{ConnectError, SendError},
    identity::IdentityProvider,
    transport::{Connector, TransportLink},
};

/// Capacity of each named broadcast channel.
const CHANNEL_CAPACITY: usize = 64;

/// Buffered live messages per game subscription.
const GAME_BUFFER: usize = 256;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// Dial in progress.
    Connecting,
    /// Transport up, dispatch running.
    Connected,
}

/// Invite traffic delivered on the invites channel.
#[derive(Debug, Clone)]
pub enum InviteEvent {
    /// Another player invited the local user.
    Received(Invite),

    /// Someone answered an invitation sent by the local user.
    Answered(InviteResponse),
}

/// Handle to the process-wide broker connection.
///
/// Clones share one underlying connection; pass clones into each view
/// instead of reaching for a global.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    connector: Arc<dyn Connector>,
    identity: Arc<dyn IdentityProvider>,
    inner: Mutex<Inner>,
    games: Mutex<HashMap<String, mpsc::Sender<GameMessage>>>,
    players: broadcast::Sender<PresenceList>,
    invites: broadcast::Sender<InviteEvent>,
    games_created: broadcast::Sender<GameCreated>,
}

struct Inner {
    state: ConnectionState,
    refs: usize,
    outgoing: Option<mpsc::Sender<Frame>>,
    username: Option<String>,
    dispatch: Option<tokio::task::JoinHandle<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionManager {
    /// Build a manager around a transport connector and identity lookup.
    #[must_use]
    pub fn new(
        connector: impl Connector + 'static,
        identity: impl IdentityProvider + 'static,
    ) -> Self {
        let (players, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (invites, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (games_created, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                connector: Arc::new(connector),
                identity: Arc::new(identity),
                inner: Mutex::new(Inner {
                    state: ConnectionState::Disconnected,
                    refs: 0,
                    outgoing: None,
                    username: None,
                    dispatch: None,
                }),
                games: Mutex::new(HashMap::new()),
                players,
                invites,
                games_created,
            }),
        }
    }

    /// Establish the transport and subscribe the well-known topic set.
    ///
    /// Idempotent: if a transport is already up (or being dialed) this only
    /// takes another reference. Each successful `connect()` is balanced by
    /// one [`ConnectionManager::disconnect`].
    ///
    /// # Errors
    ///
    /// - [`ConnectError::IdentityMissing`] if no local identity is present
    /// - [`ConnectError::Transport`] if the dial fails
    pub async fn connect(&self) -> Result<(), ConnectError> {
        let identity =
            self.shared.identity.identity().ok_or(ConnectError::IdentityMissing)?;

        {
            let mut inner = lock(&self.shared.inner);
            match inner.state {
                ConnectionState::Connected | ConnectionState::Connecting => {
                    inner.refs += 1;
                    return Ok(());
                },
                ConnectionState::Disconnected => inner.state = ConnectionState::Connecting,
            }
        }

        let link = match self.shared.connector.dial(&identity).await {
            Ok(link) => link,
            Err(error) => {
                let mut inner = lock(&self.shared.inner);
                inner.state = ConnectionState::Disconnected;
                inner.refs = 0;
                return Err(error.into());
            },
        };

        let TransportLink { outgoing, incoming } = link;

        // The dial resolving means the broker is ready for traffic; register
        // the fixed topic set before anything else goes out.
        for topic in destination::WELL_KNOWN_TOPICS {
            if let Err(error) =
                outgoing.try_send(Frame::Subscribe { destination: topic.to_string() })
            {
                tracing::error!(topic, %error, "subscribe dropped");
            }
        }

        let dispatch = tokio::spawn(dispatch_loop(
            Arc::clone(&self.shared),
            incoming,
            identity.username.clone(),
        ));

        let mut inner = lock(&self.shared.inner);
        inner.state = ConnectionState::Connected;
        inner.refs += 1;
        inner.outgoing = Some(outgoing);
        inner.username = Some(identity.username);
        inner.dispatch = Some(dispatch);

        tracing::debug!("connected");
        Ok(())
    }

    /// Release one reference; tear the transport down at zero.
    ///
    /// No-op when not connected. Safe to call repeatedly and safe to call
    /// when `connect()` never succeeded.
    pub fn disconnect(&self) {
        let mut inner = lock(&self.shared.inner);
        if inner.state == ConnectionState::Disconnected {
            return;
        }

        inner.refs = inner.refs.saturating_sub(1);
        if inner.refs > 0 {
            return;
        }

        inner.state = ConnectionState::Disconnected;
        inner.outgoing = None;
        inner.username = None;
        if let Some(dispatch) = inner.dispatch.take() {
            dispatch.abort();
        }
        tracing::debug!("disconnected");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        lock(&self.shared.inner).state
    }

    /// Local account id, if the identity store has one.
    #[must_use]
    pub fn local_user_id(&self) -> Option<UserId> {
        self.shared.identity.identity().and_then(|identity| identity.user_id)
    }

    /// Publish `body` to `destination`, best effort.
    ///
    /// The destination is normalized into the outbound command namespace
    /// unless it already carries a recognized prefix. Failures - transport
    /// not initialized, queue full, body unserializable - are logged and
    /// the send is dropped; there is no delivery confirmation.
    pub fn send<T: Serialize>(&self, destination: &str, body: &T) {
        if let Err(error) = self.try_publish(destination, body) {
            tracing::error!(destination, %error, "publish dropped");
        }
    }

    fn try_publish<T: Serialize>(&self, destination: &str, body: &T) -> Result<(), SendError> {
        let frame = Frame::send_json(destination::normalize(destination), body)?;
        self.try_send_frame(frame)
    }

    fn try_send_frame(&self, frame: Frame) -> Result<(), SendError> {
        let outgoing =
            lock(&self.shared.inner).outgoing.clone().ok_or(SendError::TransportUnavailable)?;

        outgoing.try_send(frame).map_err(|error| match error {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::TransportUnavailable,
        })
    }

    /// Open a live subscription for one game's move feed.
    ///
    /// The returned handle is independent of the main connection: dropping
    /// or cancelling it removes exactly this subscription and nothing else.
    /// Subscribing to the same game again replaces the earlier route.
    #[must_use]
    pub fn subscribe_game(&self, game_id: &str) -> GameSubscription {
        let topic = destination::game_topic(game_id);
        let (sender, receiver) = mpsc::channel(GAME_BUFFER);
        let route = sender.downgrade();
        lock(&self.shared.games).insert(topic.clone(), sender);

        if let Err(error) = self.try_send_frame(Frame::Subscribe { destination: topic.clone() }) {
            tracing::error!(%topic, %error, "subscribe dropped");
        }

        GameSubscription { topic, receiver, route, shared: Arc::clone(&self.shared) }
    }

    /// Invite another player, attributed to the local username.
    pub fn send_invite(&self, to: &str) {
        let Some(from) = lock(&self.shared.inner).username.clone() else {
            tracing::error!("invite dropped: not connected");
            return;
        };
        self.send(destination::INVITE_DESTINATION, &Invite { from, to: to.to_string() });
    }

    /// Answer an invitation from `inviter`.
    pub fn answer_invite(&self, inviter: &str, accepted: bool) {
        let Some(username) = lock(&self.shared.inner).username.clone() else {
            tracing::error!("invite response dropped: not connected");
            return;
        };
        self.send(destination::INVITE_RESPONSE_DESTINATION, &InviteResponse {
            from: inviter.to_string(),
            to: username,
            accepted,
        });
    }

    /// Lobby presence updates.
    #[must_use]
    pub fn players(&self) -> broadcast::Receiver<PresenceList> {
        self.shared.players.subscribe()
    }

    /// Invites and invite answers addressed to the local user.
    #[must_use]
    pub fn invites(&self) -> broadcast::Receiver<InviteEvent> {
        self.shared.invites.subscribe()
    }

    /// Game-created notifications involving the local user.
    #[must_use]
    pub fn games_created(&self) -> broadcast::Receiver<GameCreated> {
        self.shared.games_created.subscribe()
    }
}

/// Live move feed for one game.
///
/// Yields decoded [`GameMessage`]s in arrival order. Messages keep queueing
/// while the holder is busy (historical load in flight), so nothing is lost
/// before the first `recv`. Dropping the handle cancels the subscription.
pub struct GameSubscription {
    topic: String,
    receiver: mpsc::Receiver<GameMessage>,
    route: mpsc::WeakSender<GameMessage>,
    shared: Arc<Shared>,
}

impl GameSubscription {
    /// Next live message, `None` once this handle's route was replaced by a
    /// newer subscription for the same game.
    pub async fn recv(&mut self) -> Option<GameMessage> {
        self.receiver.recv().await
    }

    /// Topic this subscription listens on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Cancel the subscription. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl Drop for GameSubscription {
    fn drop(&mut self) {
        let mut games = lock(&self.shared.games);
        // Only remove the route if it is still ours; a newer subscription
        // for the same game must survive this handle's teardown.
        let ours = match self.route.upgrade() {
            Some(sender) => {
                games.get(&self.topic).is_some_and(|tx| tx.same_channel(&sender))
            },
            None => false,
        };
        if ours {
            games.remove(&self.topic);
        }
        drop(games);

        if ours {
            let outgoing = lock(&self.shared.inner).outgoing.clone();
            if let Some(outgoing) = outgoing {
                let _ = outgoing
                    .try_send(Frame::Unsubscribe { destination: self.topic.clone() });
            }
        }
    }
}

async fn dispatch_loop(shared: Arc<Shared>, mut incoming: mpsc::Receiver<Frame>, username: String) {
    while let Some(frame) = incoming.recv().await {
        if let Err(error) = route(&shared, &username, &frame) {
            tracing::warn!(destination = frame.destination(), %error, "dropping malformed message");
        }
    }

    // Transport gone. Flip to Disconnected; reconnecting is the caller's call.
    tracing::warn!("transport closed");
    let mut inner = lock(&shared.inner);
    inner.state = ConnectionState::Disconnected;
    inner.refs = 0;
    inner.outgoing = None;
    inner.username = None;
    inner.dispatch = None;
}

fn route(shared: &Shared, username: &str, frame: &Frame) -> Result<(), ProtocolError> {
    match frame.destination() {
        destination::PLAYERS_TOPIC => {
            let players: PresenceList = frame.decode()?;
            let _ = shared.players.send(players);
        },

        destination::INVITE_QUEUE => {
            let invite: Invite = frame.decode()?;
            let _ = shared.invites.send(InviteEvent::Received(invite));
        },

        destination::INVITES_TOPIC => {
            let invite: Invite = frame.decode()?;
            if invite.to == username {
                let _ = shared.invites.send(InviteEvent::Received(invite));
            }
        },

        destination::INVITE_RESPONSE_TOPIC => {
            let response: InviteResponse = frame.decode()?;
            if response.to == username {
                let _ = shared.invites.send(InviteEvent::Answered(response));
            }
        },

        destination::GAME_QUEUE | destination::GAME_CREATED_QUEUE => {
            let notice: GameCreated = frame.decode()?;
            let _ = shared.games_created.send(notice);
        },

        destination::GAME_CREATED_TOPIC => {
            let notice: GameCreated = frame.decode()?;
            if notice.involves(username) {
                let _ = shared.games_created.send(notice);
            }
        },

        game_topic => {
            let entry = lock(&shared.games).get(game_topic).cloned();
            if let Some(sender) = entry {
                let message: GameMessage = frame.decode()?;
                if let Err(error) = sender.try_send(message) {
                    tracing::warn!(destination = game_topic, %error, "dropping live game message");
                }
            } else {
                tracing::trace!(destination = game_topic, "no subscriber for destination");
            }
        },
    }

    Ok(())
}
