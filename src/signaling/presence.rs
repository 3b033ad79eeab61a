use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::registry::{Role, RoomRegistry};

/// Ephemeral association of one live connection with a room seat.
#[derive(Debug, Clone)]
pub struct Binding {
    pub room_id: String,
    pub identity_id: String,
    pub role: Role,
}

/// Maps live connections to (room, identity, role) and keeps the room
/// records' active flags in step. Bindings exist only while the connection
/// does; participation history lives in the registry.
pub struct PresenceTracker {
    registry: Arc<RoomRegistry>,
    bindings: RwLock<HashMap<String, Binding>>,
}

impl PresenceTracker {
    pub fn new(registry: Arc<RoomRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            bindings: RwLock::new(HashMap::new()),
        })
    }

    /// Bind a connection to an identity's seat.
    ///
    /// Rebinding the same identity (reconnect) drops the stale connection's
    /// binding and moves the bound reference; the seat record itself is
    /// reused, never duplicated. A connection that was already bound to a
    /// different seat releases that seat first.
    pub async fn bind(
        &self,
        room_id: &str,
        identity_id: &str,
        connection_id: &str,
        role: Role,
    ) -> Result<()> {
        let previous = {
            let mut bindings = self.bindings.write().await;

            let previous = bindings
                .remove(connection_id)
                .filter(|b| !(b.room_id == room_id && b.identity_id == identity_id));

            let stale: Option<String> = bindings
                .iter()
                .find(|(conn, b)| {
                    b.room_id == room_id
                        && b.identity_id == identity_id
                        && conn.as_str() != connection_id
                })
                .map(|(conn, _)| conn.clone());
            if let Some(stale_conn) = stale {
                bindings.remove(&stale_conn);
                tracing::info!(
                    room_id = %room_id,
                    identity = %identity_id,
                    stale_connection = %stale_conn,
                    connection_id = %connection_id,
                    "Identity rebound to new connection"
                );
            }

            bindings.insert(
                connection_id.to_string(),
                Binding {
                    room_id: room_id.to_string(),
                    identity_id: identity_id.to_string(),
                    role,
                },
            );

            previous
        };

        if let Some(previous) = previous {
            self.registry
                .mark_disconnected(&previous.room_id, &previous.identity_id)
                .await?;
            tracing::info!(
                room_id = %previous.room_id,
                identity = %previous.identity_id,
                connection_id = %connection_id,
                "Connection moved to a new seat, old seat released"
            );
        }

        self.registry
            .mark_connected(room_id, identity_id, connection_id)
            .await
    }

    /// Tear down a connection's binding. No-op for connections that never
    /// bound (disconnect before join).
    pub async fn unbind(&self, connection_id: &str) -> Result<Option<Binding>> {
        let binding = {
            let mut bindings = self.bindings.write().await;
            bindings.remove(connection_id)
        };

        if let Some(ref binding) = binding {
            self.registry
                .mark_disconnected(&binding.room_id, &binding.identity_id)
                .await?;
            tracing::info!(
                room_id = %binding.room_id,
                identity = %binding.identity_id,
                connection_id = %connection_id,
                "Connection unbound"
            );
        }

        Ok(binding)
    }

    pub async fn binding_of(&self, connection_id: &str) -> Option<Binding> {
        let bindings = self.bindings.read().await;
        bindings.get(connection_id).cloned()
    }

    /// Connection currently bound for an identity in a room, if any.
    pub async fn resolve(&self, room_id: &str, identity_id: &str) -> Option<String> {
        let bindings = self.bindings.read().await;
        bindings
            .iter()
            .find(|(_, b)| b.room_id == room_id && b.identity_id == identity_id)
            .map(|(conn, _)| conn.clone())
    }

    /// All currently bound connections of a room.
    pub async fn connections_in(&self, room_id: &str) -> Vec<(String, Binding)> {
        let bindings = self.bindings.read().await;
        bindings
            .iter()
            .filter(|(_, b)| b.room_id == room_id)
            .map(|(conn, b)| (conn.clone(), b.clone()))
            .collect()
    }
}
