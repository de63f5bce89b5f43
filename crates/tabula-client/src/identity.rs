//! Local identity boundary.
//!
//! Credential storage is an external collaborator; this crate only needs to
//! ask "who is the local user right now". The username attributes the
//! connection and filters broadcast traffic; the numeric id feeds turn
//! resolution. The id can legitimately be absent (older sessions never
//! stored it) - that degrades the board to locked, it never fails a lookup.

use tabula_proto::UserId;

/// The local user's identity as known to the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Username the broker knows this client by.
    pub username: String,

    /// Numeric account id. `None` locks turn resolution.
    pub user_id: Option<UserId>,
}

/// Lookup for the local user's identity.
pub trait IdentityProvider: Send + Sync {
    /// Current identity, `None` if no session is present.
    fn identity(&self) -> Option<Identity>;
}

/// Fixed identity, for tests and embedders with their own session handling.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    identity: Option<Identity>,
}

impl StaticIdentity {
    /// An identity with both username and account id.
    #[must_use]
    pub fn new(username: impl Into<String>, user_id: UserId) -> Self {
        Self { identity: Some(Identity { username: username.into(), user_id: Some(user_id) }) }
    }

    /// An identity with a username but no stored account id.
    #[must_use]
    pub fn anonymous_id(username: impl Into<String>) -> Self {
        Self { identity: Some(Identity { username: username.into(), user_id: None }) }
    }

    /// No session at all; `connect()` will fail with `IdentityMissing`.
    #[must_use]
    pub fn missing() -> Self {
        Self { identity: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn identity(&self) -> Option<Identity> {
        self.identity.clone()
    }
}
