use std::sync::Arc;
use std::time::{Duration, Instant};

use pulse_common::retry::{retry_async_if, RetryConfig};
use pulse_common::{Alert, LiveMessage};
use serde::Deserialize;
use tokio::sync::watch;

use super::handler::{decode_alert, decode_metric};
use super::sink::{LiveSink, SinkError};
use super::source::{BusError, EventSource};
use crate::alert::Evaluator;
use crate::metrics::BridgeMetrics;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub batch_size: usize,
    pub idle_poll_ms: u64,
    pub persist_retry: RetryConfig,
    pub source_retry: RetryConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            idle_poll_ms: 100,
            persist_retry: RetryConfig::default(),
            source_retry: RetryConfig {
                max_attempts: u32::MAX,
                initial_delay_ms: 200,
                max_delay_ms: 10_000,
                backoff_factor: 2.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("broadcast hub closed")]
    HubClosed,
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Metrics,
    Alerts,
}

impl StreamKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Metrics => "metrics",
            Self::Alerts => "alerts",
        }
    }
}

/// Moves events from the bus into the hub: metric samples are broadcast and
/// evaluated, fired alerts are persisted then broadcast, and alerts produced
/// elsewhere are relayed as-is.
pub struct StreamBridge {
    evaluator: Arc<Evaluator>,
    store: Arc<dyn Store>,
    sink: Arc<dyn LiveSink>,
    config: BridgeConfig,
    metrics: Arc<BridgeMetrics>,
}

impl StreamBridge {
    pub fn new(
        evaluator: Arc<Evaluator>,
        store: Arc<dyn Store>,
        sink: Arc<dyn LiveSink>,
        config: BridgeConfig,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            evaluator,
            store,
            sink,
            config,
            metrics,
        }
    }

    /// Runs both stream pumps until shutdown is signalled, both sources close,
    /// or the hub goes away.
    pub async fn run<M, A>(
        &self,
        metric_source: M,
        alert_source: A,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), BridgeError>
    where
        M: EventSource,
        A: EventSource,
    {
        tracing::info!(batch_size = self.config.batch_size, "stream bridge started");
        let result = tokio::try_join!(
            self.pump(StreamKind::Metrics, metric_source, shutdown.clone()),
            self.pump(StreamKind::Alerts, alert_source, shutdown),
        );
        match &result {
            Ok(_) => tracing::info!("stream bridge stopped"),
            Err(e) => tracing::error!(error = %e, "stream bridge stopped"),
        }
        result.map(|_| ())
    }

    async fn pump<S: EventSource>(
        &self,
        kind: StreamKind,
        mut source: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), BridgeError> {
        let idle = Duration::from_millis(self.config.idle_poll_ms);
        let mut failures = 0u32;

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let batch = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                batch = source.next_batch() => batch,
            };

            let deliveries = match batch {
                Ok(deliveries) => {
                    failures = 0;
                    deliveries
                }
                Err(BusError::Closed) => {
                    tracing::info!(stream = kind.as_str(), "event source closed");
                    return Ok(());
                }
                Err(BusError::Transient(e)) => {
                    failures = failures.saturating_add(1);
                    self.metrics.inc_bus_errors();
                    let delay = self.config.source_retry.delay_for(failures);
                    tracing::warn!(
                        stream = kind.as_str(),
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "event source read failed"
                    );
                    if sleep_or_shutdown(&mut shutdown, delay).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            if deliveries.is_empty() {
                if sleep_or_shutdown(&mut shutdown, idle).await {
                    return Ok(());
                }
                continue;
            }

            for delivery in deliveries {
                // Whatever is left in the batch stays unacked and is redelivered.
                if *shutdown.borrow() {
                    return Ok(());
                }

                let start = Instant::now();
                match kind {
                    StreamKind::Metrics => self.handle_metric(&delivery.payload).await?,
                    StreamKind::Alerts => self.handle_external_alert(&delivery.payload).await?,
                }
                self.metrics.record_processing_latency(start);

                if let Err(e) = delivery.ack().await {
                    self.metrics.inc_ack_errors();
                    tracing::error!(stream = kind.as_str(), error = %e, "ack failed");
                }
            }
        }
    }

    async fn handle_metric(&self, payload: &[u8]) -> Result<(), BridgeError> {
        let sample = match decode_metric(payload) {
            Ok(sample) => sample,
            Err(e) => {
                self.metrics.inc_metrics_invalid();
                tracing::warn!(error = %e, "discarding metric event");
                return Ok(());
            }
        };

        // The evaluator is the one place samples are validated; a rejected
        // sample is never broadcast.
        let fired = match self.evaluator.evaluate(&sample) {
            Ok(fired) => fired,
            Err(e) => {
                self.metrics.inc_metrics_invalid();
                tracing::warn!(service = %sample.service_name, error = %e, "discarding metric event");
                return Ok(());
            }
        };
        self.metrics.inc_metrics_received();

        self.publish(LiveMessage::Metric(sample)).await?;
        self.metrics.add_alerts_fired(fired.len() as u64);

        for alert in fired {
            tracing::info!(
                alert_id = %alert.id,
                rule_id = alert.rule_id.as_deref().unwrap_or_default(),
                service = %alert.service_name,
                severity = %alert.severity,
                value = alert.value,
                "alert fired"
            );
            self.persist(&alert).await;
            self.publish(LiveMessage::Alert(alert)).await?;
        }

        Ok(())
    }

    async fn handle_external_alert(&self, payload: &[u8]) -> Result<(), BridgeError> {
        let alert = match decode_alert(payload) {
            Ok(alert) => alert,
            Err(e) => {
                self.metrics.inc_external_alerts_invalid();
                tracing::warn!(error = %e, "discarding alert event");
                return Ok(());
            }
        };
        tracing::debug!(alert_id = %alert.id, service = %alert.service_name, "relaying external alert");
        self.publish(LiveMessage::Alert(alert)).await?;
        self.metrics.inc_external_alerts_forwarded();
        Ok(())
    }

    async fn persist(&self, alert: &Alert) {
        let store = &self.store;
        let result = retry_async_if(&self.config.persist_retry, StoreError::is_transient, || {
            store.put_alert(alert)
        })
        .await;

        match result {
            Ok(()) => self.metrics.inc_alerts_persisted(),
            Err(e) => {
                self.metrics.inc_alerts_persist_failed();
                tracing::error!(alert_id = %alert.id, error = %e, "alert could not be persisted");
            }
        }
    }

    async fn publish(&self, message: LiveMessage) -> Result<(), BridgeError> {
        match self.sink.publish(message).await {
            Ok(()) => Ok(()),
            Err(SinkError::Closed) => Err(BridgeError::HubClosed),
            Err(SinkError::Encode(e)) => {
                tracing::error!(error = %e, "live message could not be encoded");
                Ok(())
            }
        }
    }
}

/// Returns true when shutdown fired before the delay elapsed.
async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown.changed() => true,
    }
}
