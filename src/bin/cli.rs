// Signaling server CLI validation tool
// Exercises the REST control plane and the signaling WebSocket against a running server

use clap::{Parser, Subcommand};
use colored::*;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser)]
#[command(name = "interview-cli")]
#[command(about = "Interview signaling server validation tool", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:5000)
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Create a room as interviewer
    CreateRoom {
        /// Session token issued by the account directory
        #[arg(short, long)]
        token: String,

        /// Room secret to protect the session with
        #[arg(long)]
        secret: String,
    },

    /// Join an existing room
    JoinRoom {
        /// Session token issued by the account directory
        #[arg(short, long)]
        token: String,

        /// 6-digit room id
        #[arg(short, long)]
        room_id: String,

        /// Room secret
        #[arg(long)]
        secret: String,
    },

    /// List active rooms
    ListRooms {
        /// Session token issued by the account directory
        #[arg(short, long)]
        token: String,
    },

    /// Open a signaling connection, bind to a room, and print frames
    Connect {
        /// 6-digit room id (must be joined over REST first)
        #[arg(short, long)]
        room_id: String,

        /// Identity id holding a seat in the room
        #[arg(short, long)]
        identity_id: String,

        /// Keep printing frames until Ctrl+C
        #[arg(short, long)]
        keep_alive: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::CreateRoom { token, secret } => {
            create_room(&cli.server, token, secret).await;
        }
        Commands::JoinRoom {
            token,
            room_id,
            secret,
        } => {
            join_room(&cli.server, token, room_id, secret).await;
        }
        Commands::ListRooms { token } => {
            list_rooms(&cli.server, token).await;
        }
        Commands::Connect {
            room_id,
            identity_id,
            keep_alive,
        } => {
            connect_signaling(&cli.server, room_id, identity_id, *keep_alive).await;
        }
    }
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/api/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Store: {}", body["store"].as_str().unwrap_or("unknown"));
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn create_room(server: &str, token: &str, secret: &str) {
    println!("{}", "Creating room...".cyan());

    let url = format!("http://{}/api/rooms/create", server);
    let client = reqwest::Client::new();

    match client
        .post(&url)
        .bearer_auth(token)
        .json(&json!({ "secret": secret }))
        .send()
        .await
    {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.json::<serde_json::Value>().await.unwrap_or_default();
            if status.is_success() {
                println!("{} Room created", "✓".green());
                println!("  Room ID: {}", body["room"]["roomId"].as_str().unwrap_or("?"));
                println!(
                    "  Interviewer: {}",
                    body["room"]["interviewer"]["identity"]["email"]
                        .as_str()
                        .unwrap_or("?")
                );
            } else {
                println!(
                    "{} Create failed ({}): {}",
                    "✗".red(),
                    status,
                    body["message"].as_str().unwrap_or("unknown error")
                );
            }
        }
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn join_room(server: &str, token: &str, room_id: &str, secret: &str) {
    println!("{}", "Joining room...".cyan());
    println!("  Room ID: {}", room_id);

    let url = format!("http://{}/api/rooms/join", server);
    let client = reqwest::Client::new();

    match client
        .post(&url)
        .bearer_auth(token)
        .json(&json!({ "roomId": room_id, "secret": secret }))
        .send()
        .await
    {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.json::<serde_json::Value>().await.unwrap_or_default();
            if status.is_success() {
                let participants = body["room"]["participants"]
                    .as_array()
                    .map(|p| p.len())
                    .unwrap_or(0);
                println!("{} Joined room {}", "✓".green(), room_id);
                println!("  Participants on record: {}", participants);
            } else {
                println!(
                    "{} Join failed ({}): {}",
                    "✗".red(),
                    status,
                    body["message"].as_str().unwrap_or("unknown error")
                );
            }
        }
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn list_rooms(server: &str, token: &str) {
    println!("{}", "Listing active rooms...".cyan());

    let url = format!("http://{}/api/rooms/active", server);
    let client = reqwest::Client::new();

    match client.get(&url).bearer_auth(token).send().await {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.json::<serde_json::Value>().await.unwrap_or_default();
            if status.is_success() {
                let rooms = body["rooms"].as_array().cloned().unwrap_or_default();
                println!("{} {} active room(s)", "✓".green(), rooms.len());
                for room in rooms {
                    println!(
                        "  {}  participants={}  interviewer_active={}",
                        room["roomId"].as_str().unwrap_or("?"),
                        room["participantCount"],
                        room["interviewerActive"]
                    );
                }
            } else {
                println!(
                    "{} List failed ({}): {}",
                    "✗".red(),
                    status,
                    body["message"].as_str().unwrap_or("unknown error")
                );
            }
        }
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn connect_signaling(server: &str, room_id: &str, identity_id: &str, keep_alive: bool) {
    println!("{}", "Opening signaling connection...".cyan());

    let url = format!("ws://{}/ws", server);
    let (ws_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} WebSocket connection failed: {}", "✗".red(), e);
            return;
        }
    };
    println!("{} WebSocket connection established", "✓".green());

    let (mut write, mut read) = ws_stream.split();

    // First frame is connection-ready with our address
    match timeout(Duration::from_secs(2), read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
            println!(
                "  Connection ID: {}",
                frame["connectionId"].as_str().unwrap_or("?")
            );
        }
        _ => {
            println!("{} Did not receive connection-ready", "✗".red());
            return;
        }
    }

    let join = json!({
        "type": "join-room",
        "roomId": room_id,
        "identityId": identity_id,
    });
    if write.send(Message::Text(join.to_string())).await.is_err() {
        println!("{} Failed to send join-room frame", "✗".red());
        return;
    }
    println!("{} Bound to room {}", "✓".green(), room_id);

    if !keep_alive {
        return;
    }

    println!("{}", "Listening for frames (Ctrl+C to exit)...".cyan());
    while let Some(result) = read.next().await {
        match result {
            Ok(Message::Text(text)) => println!("  {} {}", "<-".blue(), text),
            Ok(Message::Close(_)) => {
                println!("{} Server closed the connection", "✗".yellow());
                break;
            }
            Ok(_) => {}
            Err(e) => {
                println!("{} WebSocket error: {}", "✗".red(), e);
                break;
            }
        }
    }
}
