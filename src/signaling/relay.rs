use std::collections::HashMap;
use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::{mpsc, RwLock};
use warp::ws::Message;

use super::message::SignalMessage;
use super::presence::PresenceTracker;
use crate::error::{Result, SignalError};
use crate::registry::RoomRegistry;

/// Routes signaling frames between the connections of a room.
///
/// Each connection moves Unbound -> Bound (join-room) -> Unbound
/// (disconnect). The relay owns the per-connection outbound senders;
/// addressing goes through the presence tracker. Delivery is fire and
/// forget: a frame addressed to a connection that is gone is dropped
/// without telling the sender.
pub struct SignalingRelay {
    registry: Arc<RoomRegistry>,
    presence: Arc<PresenceTracker>,
    senders: RwLock<HashMap<String, mpsc::UnboundedSender<Message>>>,
    broadcast_peer_left: bool,
}

impl SignalingRelay {
    pub fn new(
        registry: Arc<RoomRegistry>,
        presence: Arc<PresenceTracker>,
        broadcast_peer_left: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            presence,
            senders: RwLock::new(HashMap::new()),
            broadcast_peer_left,
        })
    }

    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }

    fn generate_connection_id() -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        format!("conn-{}", suffix)
    }

    /// Accept a new socket: allocate its connection id, register the
    /// outbound channel and queue the connection-ready frame so the client
    /// learns how peers address it.
    pub async fn register_connection(&self) -> (String, mpsc::UnboundedReceiver<Message>) {
        let connection_id = Self::generate_connection_id();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut senders = self.senders.write().await;
            senders.insert(connection_id.clone(), tx);
        }

        self.send_to(
            &connection_id,
            &SignalMessage::ConnectionReady {
                connection_id: connection_id.clone(),
            },
        )
        .await;

        tracing::info!(connection_id = %connection_id, "Signaling connection registered");
        (connection_id, rx)
    }

    /// Dispatch one inbound frame. Join failures are reported back to the
    /// sender; relay misses are not.
    pub async fn handle_message(&self, connection_id: &str, message: SignalMessage) {
        let result = match message {
            SignalMessage::JoinRoom {
                room_id,
                identity_id,
            } => self.on_join(connection_id, &room_id, &identity_id).await,
            SignalMessage::Offer { target, sdp, .. } => {
                self.forward(
                    &target,
                    SignalMessage::Offer {
                        target: target.clone(),
                        sdp,
                        from: Some(connection_id.to_string()),
                    },
                )
                .await
            }
            SignalMessage::Answer { target, sdp, .. } => {
                self.forward(
                    &target,
                    SignalMessage::Answer {
                        target: target.clone(),
                        sdp,
                        from: Some(connection_id.to_string()),
                    },
                )
                .await
            }
            SignalMessage::IceCandidate {
                target, candidate, ..
            } => {
                self.forward(
                    &target,
                    SignalMessage::IceCandidate {
                        target: target.clone(),
                        candidate,
                        from: Some(connection_id.to_string()),
                    },
                )
                .await
            }
            SignalMessage::Telemetry { frame } => self.on_telemetry(connection_id, frame).await,
            other => Err(SignalError::InvalidSignalingMessage(format!(
                "server-to-client frame received from client: {:?}",
                other
            ))),
        };

        if let Err(e) = result {
            self.send_error(connection_id, &e).await;
        }
    }

    /// Report a rejected or malformed frame back to its sender.
    pub async fn send_error(&self, connection_id: &str, error: &SignalError) {
        tracing::warn!(
            connection_id = %connection_id,
            error = %error,
            "Signaling frame rejected"
        );
        self.send_to(
            connection_id,
            &SignalMessage::Error {
                message: error.to_string(),
            },
        )
        .await;
    }

    /// Bind a connection to a seat it already holds (REST join/create came
    /// first), then announce it to the rest of the room.
    async fn on_join(&self, connection_id: &str, room_id: &str, identity_id: &str) -> Result<()> {
        let room = self.registry.find_room(room_id).await?;
        let role = room
            .role_of(identity_id)
            .ok_or_else(|| SignalError::Unauthorized(room_id.to_string()))?;

        self.presence
            .bind(room_id, identity_id, connection_id, role)
            .await?;

        // Best-effort broadcast to everyone else already bound; one dead
        // peer must not abort the join.
        let announcement = SignalMessage::UserJoined {
            identity_id: identity_id.to_string(),
            connection_id: connection_id.to_string(),
        };
        for (peer_conn, _) in self.presence.connections_in(room_id).await {
            if peer_conn != connection_id {
                self.send_to(&peer_conn, &announcement).await;
            }
        }

        tracing::info!(
            room_id = %room_id,
            identity = %identity_id,
            connection_id = %connection_id,
            role = ?role,
            "Connection bound to room"
        );
        Ok(())
    }

    /// Unicast passthrough. An unbound target is a transient miss: dropped,
    /// debug-logged, never reported to the sender.
    async fn forward(&self, target: &str, message: SignalMessage) -> Result<()> {
        if !self.send_to(target, &message).await {
            tracing::debug!(target = %target, "Transient relay miss, frame dropped");
        }
        Ok(())
    }

    /// Forward an analysis frame to the room's interviewer connection.
    async fn on_telemetry(&self, connection_id: &str, frame: serde_json::Value) -> Result<()> {
        let binding = self
            .presence
            .binding_of(connection_id)
            .await
            .ok_or_else(|| {
                SignalError::InvalidSignalingMessage("telemetry before join-room".into())
            })?;

        let room = self.registry.find_room(&binding.room_id).await?;
        let interviewer_conn = self
            .presence
            .resolve(&binding.room_id, &room.interviewer.identity.id)
            .await;

        match interviewer_conn {
            Some(conn) if conn != connection_id => {
                self.forward(&conn, SignalMessage::Telemetry { frame }).await
            }
            _ => {
                tracing::debug!(
                    room_id = %binding.room_id,
                    "No interviewer connection for telemetry, frame dropped"
                );
                Ok(())
            }
        }
    }

    /// Connection closed: drop the sender, unbind presence, and (only when
    /// configured) tell the remaining members.
    pub async fn on_disconnect(&self, connection_id: &str) {
        {
            let mut senders = self.senders.write().await;
            senders.remove(connection_id);
        }

        let binding = match self.presence.unbind(connection_id).await {
            Ok(binding) => binding,
            Err(e) => {
                tracing::error!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to unbind connection"
                );
                None
            }
        };

        if let Some(binding) = binding {
            if self.broadcast_peer_left {
                let notice = SignalMessage::PeerLeft {
                    identity_id: binding.identity_id.clone(),
                };
                for (peer_conn, _) in self.presence.connections_in(&binding.room_id).await {
                    self.send_to(&peer_conn, &notice).await;
                }
            }
        }

        tracing::info!(connection_id = %connection_id, "Signaling connection closed");
    }

    /// Serialize and enqueue one frame. Returns false when the connection
    /// is unknown or its channel is closed.
    async fn send_to(&self, connection_id: &str, message: &SignalMessage) -> bool {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize signaling frame");
                return false;
            }
        };

        let senders = self.senders.read().await;
        match senders.get(connection_id) {
            Some(tx) => tx.send(Message::text(text)).is_ok(),
            None => false,
        }
    }
}
