use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::room::Room;
use crate::error::{Result, SignalError};

/// Storage contract for room records.
///
/// Both backends must behave identically so the registry never cares which
/// one it was handed: the in-memory store is the test/fallback backend, the
/// file store survives a restart.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert a new room. Fails with `Conflict` if an active room with the
    /// same id already exists.
    async fn insert(&self, room: Room) -> Result<()>;

    async fn find(&self, room_id: &str) -> Result<Option<Room>>;

    /// Replace the stored record for `room.room_id`. Fails with
    /// `RoomNotFound` if there is nothing to replace.
    async fn update(&self, room: Room) -> Result<()>;

    async fn contains_active(&self, room_id: &str) -> Result<bool>;

    async fn list_active(&self) -> Result<Vec<Room>>;

    /// Short backend label for the health endpoint.
    fn backend(&self) -> &'static str;
}

/// In-memory room store. Data is lost on restart.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<String, Room>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn insert(&self, room: Room) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        if rooms.get(&room.room_id).map(|r| r.is_active).unwrap_or(false) {
            return Err(SignalError::RoomAlreadyExists(room.room_id));
        }
        rooms.insert(room.room_id.clone(), room);
        Ok(())
    }

    async fn find(&self, room_id: &str) -> Result<Option<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(room_id).cloned())
    }

    async fn update(&self, room: Room) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        if !rooms.contains_key(&room.room_id) {
            return Err(SignalError::RoomNotFound(room.room_id));
        }
        rooms.insert(room.room_id.clone(), room);
        Ok(())
    }

    async fn contains_active(&self, room_id: &str) -> Result<bool> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(room_id).map(|r| r.is_active).unwrap_or(false))
    }

    async fn list_active(&self) -> Result<Vec<Room>> {
        let rooms = self.rooms.read().await;
        let mut active: Vec<Room> = rooms.values().filter(|r| r.is_active).cloned().collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(active)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// File-backed room store: a JSON snapshot rewritten after every mutation
/// and reloaded on startup.
pub struct FileRoomStore {
    path: PathBuf,
    rooms: RwLock<HashMap<String, Room>>,
}

impl FileRoomStore {
    /// Open the store at `path`, loading any existing snapshot.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rooms = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let loaded: Vec<Room> = serde_json::from_slice(&bytes)?;
                tracing::info!(
                    path = %path.display(),
                    rooms = loaded.len(),
                    "Loaded room store snapshot"
                );
                loaded.into_iter().map(|r| (r.room_id.clone(), r)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(SignalError::store(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            path,
            rooms: RwLock::new(rooms),
        })
    }

    /// Rewrite the snapshot from the given map. Caller holds the write lock.
    async fn persist(&self, rooms: &HashMap<String, Room>) -> Result<()> {
        let mut snapshot: Vec<&Room> = rooms.values().collect();
        snapshot.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            SignalError::store(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl RoomStore for FileRoomStore {
    async fn insert(&self, room: Room) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        if rooms.get(&room.room_id).map(|r| r.is_active).unwrap_or(false) {
            return Err(SignalError::RoomAlreadyExists(room.room_id));
        }
        rooms.insert(room.room_id.clone(), room);
        self.persist(&rooms).await
    }

    async fn find(&self, room_id: &str) -> Result<Option<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(room_id).cloned())
    }

    async fn update(&self, room: Room) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        if !rooms.contains_key(&room.room_id) {
            return Err(SignalError::RoomNotFound(room.room_id));
        }
        rooms.insert(room.room_id.clone(), room);
        self.persist(&rooms).await
    }

    async fn contains_active(&self, room_id: &str) -> Result<bool> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(room_id).map(|r| r.is_active).unwrap_or(false))
    }

    async fn list_active(&self) -> Result<Vec<Room>> {
        let rooms = self.rooms.read().await;
        let mut active: Vec<Room> = rooms.values().filter(|r| r.is_active).cloned().collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(active)
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
