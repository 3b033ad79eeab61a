use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use warp::ws::WebSocket;

use crate::error::SignalError;
use crate::signaling::{SignalMessage, SignalingRelay};

pub async fn handle_signaling_socket(websocket: WebSocket, relay: Arc<SignalingRelay>) {
    tracing::info!("New signaling WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (connection_id, mut rx) = relay.register_connection().await;

    // Spawn task to send messages to client
    let sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(message) => {
                if message.is_close() {
                    break;
                }
                if let Ok(text) = message.to_str() {
                    match serde_json::from_str::<SignalMessage>(text) {
                        Ok(frame) => relay.handle_message(&connection_id, frame).await,
                        Err(e) => {
                            tracing::warn!(
                                connection_id = %connection_id,
                                error = %e,
                                raw_message = %text,
                                "Failed to parse signaling frame"
                            );
                            relay
                                .send_error(
                                    &connection_id,
                                    &SignalError::InvalidSignalingMessage(e.to_string()),
                                )
                                .await;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    relay.on_disconnect(&connection_id).await;
    sender_task.abort();
    tracing::info!(connection_id = %connection_id, "Signaling WebSocket connection closed");
}
