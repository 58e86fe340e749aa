mod client;
mod registry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pulse_common::LiveMessage;
use pulse_workers::bridge::{LiveSink, SinkError};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::metrics::HubMetrics;

pub use client::{ClientId, ClientState, Frame, Subscription};
pub use registry::{BroadcastOutcome, ClientRegistry, ClientStats, HubSnapshot};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub client_queue_capacity: usize,
    pub max_consecutive_drops: u32,
    pub command_queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            client_queue_capacity: 256,
            max_consecutive_drops: 3,
            command_queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HubError {
    #[error("hub is closed")]
    Closed,
    #[error("encode: {0}")]
    Encode(String),
}

enum Command {
    Register { reply: oneshot::Sender<Subscription> },
    Unregister { id: ClientId },
    Broadcast { frame: Frame },
    Snapshot { reply: oneshot::Sender<HubSnapshot> },
}

/// Cloneable entry point to the hub coordinator task.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<Command>,
    closed: Arc<AtomicBool>,
}

impl HubHandle {
    pub async fn register(&self) -> Result<Subscription, HubError> {
        if self.is_closed() {
            return Err(HubError::Closed);
        }
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Register { reply })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn unregister(&self, id: ClientId) {
        // After shutdown the registry is already empty.
        let _ = self.tx.send(Command::Unregister { id }).await;
    }

    /// Serializes once; every client gets the same frame.
    pub async fn broadcast(&self, message: &LiveMessage) -> Result<(), HubError> {
        let text = message
            .to_json()
            .map_err(|e| HubError::Encode(e.to_string()))?;
        self.broadcast_frame(Frame::from(text)).await
    }

    pub async fn broadcast_frame(&self, frame: Frame) -> Result<(), HubError> {
        if self.is_closed() {
            return Err(HubError::Closed);
        }
        self.tx
            .send(Command::Broadcast { frame })
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Answered in command order, so every earlier command has been applied
    /// by the time this returns.
    pub async fn snapshot(&self) -> Result<HubSnapshot, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl LiveSink for HubHandle {
    async fn publish(&self, message: LiveMessage) -> Result<(), SinkError> {
        self.broadcast(&message).await.map_err(|e| match e {
            HubError::Closed => SinkError::Closed,
            HubError::Encode(e) => SinkError::Encode(e),
        })
    }
}

pub struct Hub {
    registry: ClientRegistry,
    commands: mpsc::Receiver<Command>,
    closed: Arc<AtomicBool>,
    metrics: Arc<HubMetrics>,
}

impl Hub {
    pub fn spawn(
        config: HubConfig,
        metrics: Arc<HubMetrics>,
        shutdown: watch::Receiver<bool>,
    ) -> (HubHandle, JoinHandle<()>) {
        let (tx, commands) = mpsc::channel(config.command_queue_capacity.max(1));
        let closed = Arc::new(AtomicBool::new(false));
        let hub = Hub {
            registry: ClientRegistry::new(config.client_queue_capacity, config.max_consecutive_drops),
            commands,
            closed: closed.clone(),
            metrics,
        };
        let task = tokio::spawn(hub.run(shutdown));
        (HubHandle { tx, closed }, task)
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("broadcast hub started");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        self.closed.store(true, Ordering::Release);
        self.commands.close();
        let closed = self.registry.close_all();
        self.metrics.set_clients_connected(0);
        tracing::info!(clients = closed, "broadcast hub stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register { reply } => {
                let subscription = self.registry.register();
                let id = subscription.id;
                if reply.send(subscription).is_err() {
                    // Caller went away before the reply; don't leak the slot.
                    self.registry.unregister(id);
                    return;
                }
                self.metrics.inc_clients_registered();
                tracing::info!(client_id = %id, clients = self.registry.len(), "client registered");
            }
            Command::Unregister { id } => {
                if self.registry.unregister(id) {
                    self.metrics.inc_clients_unregistered();
                    tracing::info!(client_id = %id, clients = self.registry.len(), "client unregistered");
                }
            }
            Command::Broadcast { frame } => {
                let outcome = self.registry.broadcast(&frame);
                self.metrics.inc_messages_broadcast();
                self.metrics.add_frames_delivered(outcome.delivered as u64);
                self.metrics.add_frames_dropped(outcome.dropped as u64);
                for id in &outcome.evicted {
                    self.metrics.inc_clients_evicted();
                    tracing::warn!(client_id = %id, "slow client evicted");
                }
                for id in &outcome.disconnected {
                    self.metrics.inc_clients_unregistered();
                    tracing::debug!(client_id = %id, "client queue closed, removed");
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
        }
        self.metrics.set_clients_connected(self.registry.len() as u64);
    }
}
