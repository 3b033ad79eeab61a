use std::convert::Infallible;
use std::sync::Arc;

use serde::Deserialize;
use warp::http::StatusCode;
use warp::Filter;

use super::websocket;
use crate::auth::SessionAuthGate;
use crate::error::SignalError;
use crate::registry::RoomRegistry;
use crate::signaling::SignalingRelay;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: String,
    pub secret: String,
}

/// All routes: REST control plane plus the signaling WebSocket.
pub fn routes(
    registry: Arc<RoomRegistry>,
    gate: Arc<SessionAuthGate>,
    relay: Arc<SignalingRelay>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    create_room_route(registry.clone(), gate.clone())
        .or(join_room_route(registry.clone(), gate.clone()))
        .or(list_rooms_route(registry.clone(), gate))
        .or(health_route(registry))
        .or(signaling_route(relay))
}

fn create_room_route(
    registry: Arc<RoomRegistry>,
    gate: Arc<SessionAuthGate>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "rooms" / "create")
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .and(with_arc(registry))
        .and(with_arc(gate))
        .and_then(handle_create_room)
}

fn join_room_route(
    registry: Arc<RoomRegistry>,
    gate: Arc<SessionAuthGate>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "rooms" / "join")
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .and(with_arc(registry))
        .and(with_arc(gate))
        .and_then(handle_join_room)
}

fn list_rooms_route(
    registry: Arc<RoomRegistry>,
    gate: Arc<SessionAuthGate>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "rooms" / "active")
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_arc(registry))
        .and(with_arc(gate))
        .and_then(handle_list_rooms)
}

fn health_route(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "health")
        .and(warp::get())
        .and(with_arc(registry))
        .map(|registry: Arc<RoomRegistry>| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "Interview Signaling Server",
                "version": env!("CARGO_PKG_VERSION"),
                "store": registry.store_backend(),
            }))
        })
}

fn signaling_route(
    relay: Arc<SignalingRelay>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::ws())
        .and(with_arc(relay))
        .map(|ws: warp::ws::Ws, relay: Arc<SignalingRelay>| {
            ws.on_upgrade(move |websocket| websocket::handle_signaling_socket(websocket, relay))
        })
}

fn with_arc<T: Send + Sync>(
    value: Arc<T>,
) -> impl Filter<Extract = (Arc<T>,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

async fn handle_create_room(
    auth: Option<String>,
    body: CreateRoomRequest,
    registry: Arc<RoomRegistry>,
    gate: Arc<SessionAuthGate>,
) -> Result<impl warp::Reply, Infallible> {
    let identity = match gate.authorize(auth.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => return Ok(error_reply(e)),
    };

    match registry.create_room(identity, body.secret).await {
        Ok(room) => Ok(reply(
            StatusCode::CREATED,
            serde_json::json!({
                "message": "Room created successfully",
                "room": room,
            }),
        )),
        Err(e) => Ok(error_reply(e)),
    }
}

async fn handle_join_room(
    auth: Option<String>,
    body: JoinRoomRequest,
    registry: Arc<RoomRegistry>,
    gate: Arc<SessionAuthGate>,
) -> Result<impl warp::Reply, Infallible> {
    let identity = match gate.authorize(auth.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => return Ok(error_reply(e)),
    };

    match registry.join_room(&body.room_id, &body.secret, identity).await {
        Ok(room) => Ok(reply(
            StatusCode::OK,
            serde_json::json!({
                "message": "Joined room successfully",
                "room": room,
            }),
        )),
        Err(e) => Ok(error_reply(e)),
    }
}

async fn handle_list_rooms(
    auth: Option<String>,
    registry: Arc<RoomRegistry>,
    gate: Arc<SessionAuthGate>,
) -> Result<impl warp::Reply, Infallible> {
    if let Err(e) = gate.authorize(auth.as_deref()).await {
        return Ok(error_reply(e));
    }

    match registry.list_active().await {
        Ok(rooms) => Ok(reply(
            StatusCode::OK,
            serde_json::json!({ "rooms": rooms }),
        )),
        Err(e) => Ok(error_reply(e)),
    }
}

fn reply(status: StatusCode, body: serde_json::Value) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn error_reply(error: SignalError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(error = %error, "Request failed");
    }
    reply(status, serde_json::json!({ "message": error.to_string() }))
}
