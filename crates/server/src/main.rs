use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pulse_common::nats_config::StreamConfig;
use pulse_common::retry::retry_async;
use pulse_common::{Clock, SystemClock};
use pulse_server::config::{self, ServerConfig};
use pulse_server::hub::Hub;
use pulse_server::metrics::HubMetrics;
use pulse_server::rest::{self, AppState};
use pulse_server::shutdown::wait_for_shutdown;
use pulse_workers::alert::Evaluator;
use pulse_workers::bridge::{
    connect_jetstream, create_pull_consumer, ensure_stream, JetStreamSource, StreamBridge,
};
use pulse_workers::metrics::BridgeMetrics;
use pulse_workers::store::{create_pool, migrator, InMemoryStore, PgStore, Store};
use tokio::sync::watch;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "pulse-server", version, about = "Live metrics and alert distribution hub")]
struct Args {
    /// YAML configuration file; defaults apply when omitted.
    #[arg(long, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_store(cfg: &ServerConfig) -> Result<Arc<dyn Store>, BoxError> {
    let Some(url) = cfg.database_url.as_deref() else {
        tracing::warn!("no database configured, alert history is kept in memory");
        return Ok(Arc::new(InMemoryStore::new()));
    };

    let pool = retry_async(&cfg.startup_retry, || {
        create_pool(url, cfg.database_max_connections)
    })
    .await?;
    let applied = migrator::run_migrations(&pool).await?;
    tracing::info!(applied = applied.len(), "database ready");
    Ok(Arc::new(PgStore::new(pool)))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    init_tracing(cfg.log_json);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = open_store(&cfg).await?;
    let rules = retry_async(&cfg.startup_retry, || store.get_rules()).await?;
    tracing::info!(rules = rules.len(), "rules loaded");
    let evaluator = Arc::new(Evaluator::new(rules, clock.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let hub_metrics = HubMetrics::new();
    let bridge_metrics = BridgeMetrics::new();
    let (hub, hub_task) = Hub::spawn(cfg.hub.clone(), hub_metrics.clone(), shutdown_rx.clone());

    let js = retry_async(&cfg.startup_retry, || connect_jetstream(&cfg.nats_url)).await?;
    let metrics_stream = StreamConfig::metrics();
    let alerts_stream = StreamConfig::alerts();
    ensure_stream(&js, &metrics_stream).await?;
    ensure_stream(&js, &alerts_stream).await?;
    let metric_source = JetStreamSource::new(
        create_pull_consumer(&js, &metrics_stream).await?,
        cfg.bridge.batch_size,
    );
    let alert_source = JetStreamSource::new(
        create_pull_consumer(&js, &alerts_stream).await?,
        cfg.bridge.batch_size,
    );
    tracing::info!(nats_url = %cfg.nats_url, "bus connected");

    let bridge = StreamBridge::new(
        evaluator.clone(),
        store.clone(),
        Arc::new(hub.clone()),
        cfg.bridge.clone(),
        bridge_metrics.clone(),
    );
    let bridge_shutdown = shutdown_rx.clone();
    let mut bridge_task = tokio::spawn(async move {
        bridge.run(metric_source, alert_source, bridge_shutdown).await
    });

    let state = AppState {
        hub,
        evaluator,
        store,
        clock,
        hub_metrics,
        bridge_metrics,
        api_token: cfg.api_token.as_deref().map(Arc::from),
    };
    let app = rest::router(state);
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr).await?;
    tracing::info!(addr = %cfg.listen_addr, "http server listening");

    let mut server_shutdown = shutdown_rx.clone();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let bridge_result = tokio::select! {
        _ = wait_for_shutdown() => None,
        result = &mut bridge_task => Some(result),
    };

    let _ = shutdown_tx.send(true);

    let bridge_result = match bridge_result {
        Some(result) => result,
        None => bridge_task.await,
    };
    if let Err(e) = hub_task.await {
        tracing::error!(error = %e, "hub task panicked");
    }
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "http server failed"),
        Err(e) => tracing::error!(error = %e, "http server task panicked"),
    }

    match bridge_result {
        Ok(Ok(())) => {
            tracing::info!("shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => Err(e.into()),
        Err(e) => Err(e.into()),
    }
}
