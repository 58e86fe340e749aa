use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A serialized live message, shared between every client queue it lands in.
pub type Frame = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    Connecting,
    Registered,
    /// Queue was full on the last broadcast; frames are being dropped.
    Draining,
    Closed,
}

impl ClientState {
    pub fn can_transition_to(self, next: ClientState) -> bool {
        use ClientState::*;
        matches!(
            (self, next),
            (Connecting, Registered)
                | (Connecting, Closed)
                | (Registered, Draining)
                | (Registered, Closed)
                | (Draining, Registered)
                | (Draining, Closed)
        )
    }
}

/// Receiving end handed to a connection task. The queue ends once the hub
/// unregisters or evicts the client.
pub struct Subscription {
    pub id: ClientId,
    receiver: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub(crate) fn new(id: ClientId, receiver: mpsc::Receiver<Frame>) -> Self {
        Self { id, receiver }
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use ClientState::*;
        assert!(Connecting.can_transition_to(Registered));
        assert!(Registered.can_transition_to(Draining));
        assert!(Draining.can_transition_to(Registered));
        assert!(Draining.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Registered));
        assert!(!Registered.can_transition_to(Connecting));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
    }
}
