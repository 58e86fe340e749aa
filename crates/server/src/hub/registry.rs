use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::client::{ClientId, ClientState, Frame, Subscription};

struct ClientSlot {
    tx: mpsc::Sender<Frame>,
    state: ClientState,
    consecutive_drops: u32,
    dropped: u64,
    delivered: u64,
}

impl ClientSlot {
    fn transition(&mut self, id: ClientId, next: ClientState) {
        if self.state == next {
            return;
        }
        if self.state.can_transition_to(next) {
            self.state = next;
        } else {
            tracing::warn!(client_id = %id, from = ?self.state, to = ?next, "ignored client state transition");
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub dropped: usize,
    pub evicted: Vec<ClientId>,
    pub disconnected: Vec<ClientId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub id: ClientId,
    pub state: ClientState,
    pub delivered: u64,
    pub dropped: u64,
    pub consecutive_drops: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubSnapshot {
    pub connected: usize,
    pub clients: Vec<ClientStats>,
}

/// Owned by the hub coordinator; every method runs to completion without
/// awaiting, so one slow client can never hold up the others.
pub struct ClientRegistry {
    clients: HashMap<ClientId, ClientSlot>,
    queue_capacity: usize,
    max_consecutive_drops: u32,
}

impl ClientRegistry {
    pub fn new(queue_capacity: usize, max_consecutive_drops: u32) -> Self {
        Self {
            clients: HashMap::new(),
            queue_capacity: queue_capacity.max(1),
            max_consecutive_drops: max_consecutive_drops.max(1),
        }
    }

    pub fn register(&mut self) -> Subscription {
        let id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut slot = ClientSlot {
            tx,
            state: ClientState::Connecting,
            consecutive_drops: 0,
            dropped: 0,
            delivered: 0,
        };
        slot.transition(id, ClientState::Registered);
        self.clients.insert(id, slot);
        Subscription::new(id, rx)
    }

    /// Removing an unknown id is a no-op.
    pub fn unregister(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    pub fn broadcast(&mut self, frame: &Frame) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();

        for (id, slot) in self.clients.iter_mut() {
            match slot.tx.try_send(Frame::clone(frame)) {
                Ok(()) => {
                    slot.delivered += 1;
                    slot.consecutive_drops = 0;
                    slot.transition(*id, ClientState::Registered);
                    outcome.delivered += 1;
                }
                Err(TrySendError::Full(_)) => {
                    slot.dropped += 1;
                    slot.consecutive_drops += 1;
                    outcome.dropped += 1;
                    if slot.consecutive_drops >= self.max_consecutive_drops {
                        slot.transition(*id, ClientState::Closed);
                        outcome.evicted.push(*id);
                    } else {
                        slot.transition(*id, ClientState::Draining);
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    slot.transition(*id, ClientState::Closed);
                    outcome.disconnected.push(*id);
                }
            }
        }

        for id in outcome.evicted.iter().chain(outcome.disconnected.iter()) {
            self.clients.remove(id);
        }

        outcome
    }

    pub fn snapshot(&self) -> HubSnapshot {
        let mut clients: Vec<ClientStats> = self
            .clients
            .iter()
            .map(|(id, slot)| ClientStats {
                id: *id,
                state: slot.state,
                delivered: slot.delivered,
                dropped: slot.dropped,
                consecutive_drops: slot.consecutive_drops,
            })
            .collect();
        clients.sort_by_key(|c| c.id);
        HubSnapshot {
            connected: clients.len(),
            clients,
        }
    }

    /// Drops every client sender so each connection drains and ends.
    pub fn close_all(&mut self) -> usize {
        let count = self.clients.len();
        self.clients.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
