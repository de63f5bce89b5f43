//! Transport boundary.
//!
//! Provides the frame-level link the [`crate::ConnectionManager`] drives.
//! This is a thin seam: frames are exchanged over channels, and an
//! implementation-specific task owns the actual socket. Protocol logic
//! never touches I/O directly.

use async_trait::async_trait;
use tabula_proto::Frame;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::identity::Identity;

/// Capacity of each direction of a link.
const LINK_CAPACITY: usize = 256;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The link closed underneath us.
    #[error("transport closed")]
    Closed,
}

/// Frame-level duplex link to the broker.
///
/// Handed out by a [`Connector`] once the transport is ready for traffic.
#[derive(Debug)]
pub struct TransportLink {
    /// Frames headed to the broker.
    pub outgoing: mpsc::Sender<Frame>,

    /// Frames delivered by the broker.
    pub incoming: mpsc::Receiver<Frame>,
}

/// Dial-out boundary for establishing transports.
///
/// Resolving successfully means the transport is ready: subscriptions sent
/// on the returned link will be honored by the broker.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a transport attributed to `identity`.
    ///
    /// # Errors
    ///
    /// - `TransportError::Connection` if the broker is unreachable
    async fn dial(&self, identity: &Identity) -> Result<TransportLink, TransportError>;
}

/// Far end of an in-memory link, impersonating the broker in tests.
#[derive(Debug)]
pub struct BrokerEnd {
    /// Frames the client sent.
    pub sent: mpsc::Receiver<Frame>,

    /// Inject frames as broker deliveries.
    pub deliveries: mpsc::Sender<Frame>,
}

/// Create a connected in-memory link pair.
#[must_use]
pub fn memory_link() -> (TransportLink, BrokerEnd) {
    let (outgoing_tx, outgoing_rx) = mpsc::channel(LINK_CAPACITY);
    let (incoming_tx, incoming_rx) = mpsc::channel(LINK_CAPACITY);

    (
        TransportLink { outgoing: outgoing_tx, incoming: incoming_rx },
        BrokerEnd { sent: outgoing_rx, deliveries: incoming_tx },
    )
}

/// Connector handing out pre-built links, in order.
///
/// Dialing with no link left fails, which doubles as an assertion that
/// redundant `connect()` calls never open a second transport.
pub struct MemoryConnector {
    links: std::sync::Mutex<Vec<TransportLink>>,
}

impl MemoryConnector {
    /// Connector that will hand out `links` front to back.
    #[must_use]
    pub fn new(mut links: Vec<TransportLink>) -> Self {
        links.reverse();
        Self { links: std::sync::Mutex::new(links) }
    }

    /// Connector with a single ready link.
    #[must_use]
    pub fn single(link: TransportLink) -> Self {
        Self::new(vec![link])
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn dial(&self, _identity: &Identity) -> Result<TransportLink, TransportError> {
        self.links
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop()
            .ok_or_else(|| TransportError::Connection("no link available".into()))
    }
}
