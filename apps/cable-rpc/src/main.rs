use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cable_rpc::broadcast::{
    Broadcaster, EmbeddedBroadcastAdapter, HttpBroadcastAdapter, LocalPubSub, NodeEvent,
};
use cable_rpc::config::{BroadcastAdapterKind, Config};
use cable_rpc::server::Server;
use cable_rpc::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing, env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let broadcaster = build_broadcaster(&config);
    let server = Server::new(cable_rpc::chat::application(), broadcaster);

    tracing::info!(adapter = ?config.broadcast_adapter, "cable-rpc configured");

    let state = AppState {
        server: Arc::new(server),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(cable_rpc::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "cable-rpc listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

fn build_broadcaster(config: &Config) -> Broadcaster {
    match config.broadcast_adapter {
        BroadcastAdapterKind::Http => {
            let mut adapter =
                HttpBroadcastAdapter::new(&config.broadcast_url, config.broadcast_timeout)
                    .expect("failed to build broadcast HTTP client");
            if let Some(secret) = &config.broadcast_secret {
                adapter = adapter.with_secret(secret);
            }
            tracing::info!(url = %config.broadcast_url, "broadcasting over HTTP");
            Broadcaster::new(adapter)
        }
        BroadcastAdapterKind::Embedded => {
            let hub = LocalPubSub::new();
            tokio::spawn(log_node_events(hub.clone()));
            tracing::info!("broadcasting to the in-process node");
            Broadcaster::new(EmbeddedBroadcastAdapter::new(hub))
        }
    }
}

/// Without a co-located proxy, the only consumer of the in-process node is
/// the log.
async fn log_node_events(hub: LocalPubSub) {
    let mut rx = hub.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => match event.as_ref() {
                NodeEvent::Stream(msg) => {
                    tracing::info!(stream = %msg.stream, data = %msg.data, "broadcast")
                }
                NodeEvent::Disconnect(msg) => {
                    tracing::info!(identifier = %msg.identifier, "remote disconnect")
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "node event log lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
