mod api;
mod auth;
mod config;
mod error;
mod registry;
mod signaling;

use std::sync::Arc;

use auth::{HttpAccountDirectory, SessionAuthGate};
use config::Config;
use registry::{FileRoomStore, MemoryRoomStore, RoomRegistry, RoomStore};
use signaling::{PresenceTracker, SignalingRelay};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interview_signaling=info,warp=info".into()),
        )
        .init();

    let config = Config::from_env();

    // File-backed store when configured, in-memory fallback otherwise.
    let store: Arc<dyn RoomStore> = match &config.store.path {
        Some(path) => match FileRoomStore::open(path).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(
                    path = %path,
                    error = %e,
                    "Failed to open room store, falling back to in-memory (data resets on restart)"
                );
                Arc::new(MemoryRoomStore::new())
            }
        },
        None => Arc::new(MemoryRoomStore::new()),
    };
    tracing::info!(store = store.backend(), "Room store ready");

    let directory = match HttpAccountDirectory::new(&config.directory) {
        Ok(directory) => Arc::new(directory),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create account directory client");
            return;
        }
    };

    let registry = RoomRegistry::new(store);
    let gate = SessionAuthGate::new(directory);
    let presence = PresenceTracker::new(registry.clone());
    let relay = SignalingRelay::new(
        registry.clone(),
        presence,
        config.relay.broadcast_peer_left,
    );

    let routes = api::routes::routes(registry, gate, relay);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        directory = %config.directory.base_url,
        "Interview signaling server listening"
    );
    warp::serve(routes).run(config.bind_address()).await;
}
