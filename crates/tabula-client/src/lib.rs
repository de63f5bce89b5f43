//! Client
//!
//! I/O-facing layer for the tabula board game client: the shared broker
//! connection with its topic subscriptions, and the driver that keeps one
//! game view synchronized with the server.
//!
//! # Architecture
//!
//! Protocol state lives in the pure machines of [`tabula_core`]; this crate
//! owns the seams where the outside world plugs in:
//!
//! - [`ConnectionManager`]: one transport shared process-wide across lobby
//!   and game views. Idempotent, reference-counted connect/disconnect; a
//!   dispatch task decodes each topic's traffic into its named channel.
//! - [`Connector`] / [`TransportLink`]: the transport boundary. Production
//!   supplies a real broker link; tests use [`memory_link`].
//! - [`IdentityProvider`]: local account lookup. A missing identity fails
//!   `connect()`; a missing numeric id merely locks turn resolution.
//! - [`GameStore`]: the one-time historical load boundary.
//! - [`GameView`]: wires a [`tabula_core::GameSession`] to a live
//!   subscription, pumping buffered moves through the session so history is
//!   always replayed before live traffic is applied.
//!
//! # Failure containment
//!
//! Only identity absence at connect time is surfaced to callers. Malformed
//! messages are dropped per-message, publishes are best-effort and logged
//! when dropped, and a transport failure flips the connection to
//! `Disconnected` without touching session state. Reconnection is the
//! caller's decision; nothing here retries.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connection;
mod error;
mod game;
mod identity;
mod store;
mod transport;

pub use connection::{ConnectionManager, ConnectionState, GameSubscription, InviteEvent};
pub use error::{ConnectError, SendError};
pub use game::{GameView, OpenError};
pub use identity::{Identity, IdentityProvider, StaticIdentity};
pub use store::{GameStore, InMemoryStore, StoreError};
pub use transport::{BrokerEnd, Connector, MemoryConnector, TransportLink, memory_link};
