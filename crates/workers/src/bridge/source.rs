use async_nats::jetstream;
use async_nats::jetstream::consumer::PullConsumer;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BusError {
    #[error("event source closed")]
    Closed,
    #[error("bus error: {0}")]
    Transient(String),
}

pub enum Acker {
    Noop,
    JetStream(jetstream::Message),
}

/// One event pulled from a source. It must be acked once processed;
/// dropping it unacked leaves it for redelivery.
pub struct Delivery {
    pub payload: Vec<u8>,
    acker: Acker,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, acker: Acker) -> Self {
        Self { payload, acker }
    }

    pub async fn ack(self) -> Result<(), BusError> {
        match self.acker {
            Acker::Noop => Ok(()),
            Acker::JetStream(msg) => msg
                .ack()
                .await
                .map_err(|e| BusError::Transient(e.to_string())),
        }
    }
}

#[async_trait]
pub trait EventSource: Send {
    /// Returns the next batch of deliveries. An empty batch means nothing is
    /// pending right now; `BusError::Closed` means nothing ever will be.
    async fn next_batch(&mut self) -> Result<Vec<Delivery>, BusError>;
}

pub struct JetStreamSource {
    consumer: PullConsumer,
    batch_size: usize,
}

impl JetStreamSource {
    pub fn new(consumer: PullConsumer, batch_size: usize) -> Self {
        Self {
            consumer,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl EventSource for JetStreamSource {
    async fn next_batch(&mut self) -> Result<Vec<Delivery>, BusError> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(self.batch_size)
            .messages()
            .await
            .map_err(|e| BusError::Transient(e.to_string()))?;

        let mut batch = Vec::with_capacity(self.batch_size);
        while let Some(next) = messages.next().await {
            match next {
                Ok(msg) => {
                    let payload = msg.payload.to_vec();
                    batch.push(Delivery::new(payload, Acker::JetStream(msg)));
                }
                Err(e) => {
                    if batch.is_empty() {
                        return Err(BusError::Transient(e.to_string()));
                    }
                    tracing::warn!(error = %e, "fetch interrupted, keeping partial batch");
                    break;
                }
            }
        }
        Ok(batch)
    }
}

/// In-process source fed through an mpsc channel. Closing every sender ends
/// the stream once the buffered events are consumed.
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
    batch_size: usize,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>, batch_size: usize) -> Self {
        Self {
            rx,
            batch_size: batch_size.max(1),
        }
    }

    pub fn channel(capacity: usize, batch_size: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx, batch_size))
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next_batch(&mut self) -> Result<Vec<Delivery>, BusError> {
        let first = self.rx.recv().await.ok_or(BusError::Closed)?;
        let mut batch = vec![Delivery::new(first, Acker::Noop)];
        while batch.len() < self.batch_size {
            match self.rx.try_recv() {
                Ok(payload) => batch.push(Delivery::new(payload, Acker::Noop)),
                Err(_) => break,
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_source_batches_up_to_size() {
        let (tx, mut source) = ChannelSource::channel(16, 2);
        for i in 0..3u8 {
            tx.send(vec![i]).await.unwrap();
        }

        let first = source.next_batch().await.unwrap();
        assert_eq!(first.iter().map(|d| d.payload[0]).collect::<Vec<_>>(), vec![0, 1]);
        let second = source.next_batch().await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].payload, vec![2]);
    }

    #[tokio::test]
    async fn channel_source_reports_closed_after_drain() {
        let (tx, mut source) = ChannelSource::channel(4, 10);
        tx.send(b"x".to_vec()).await.unwrap();
        drop(tx);

        assert_eq!(source.next_batch().await.unwrap().len(), 1);
        assert!(matches!(source.next_batch().await, Err(BusError::Closed)));
    }

    #[tokio::test]
    async fn noop_ack_succeeds() {
        let d = Delivery::new(vec![1], Acker::Noop);
        assert!(d.ack().await.is_ok());
    }
}
