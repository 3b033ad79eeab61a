mod room;
mod store;

pub use room::{is_valid_room_id, Identity, Role, Room, RoomSummary, Seat};
pub use store::{FileRoomStore, MemoryRoomStore, RoomStore};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, SignalError};

/// Default number of random id candidates tried before giving up with
/// `Conflict`. Bounds worst-case create latency as the id space fills.
pub const DEFAULT_ID_RETRY_BUDGET: u32 = 50;

/// Owns room records behind an injected [`RoomStore`] and serializes all
/// mutations per room id. Operations on different rooms never contend; two
/// simultaneous joins on the same room are applied one after the other so
/// neither append is lost.
pub struct RoomRegistry {
    store: Arc<dyn RoomStore>,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    id_retry_budget: u32,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn RoomStore>) -> Arc<Self> {
        Self::with_retry_budget(store, DEFAULT_ID_RETRY_BUDGET)
    }

    pub fn with_retry_budget(store: Arc<dyn RoomStore>, id_retry_budget: u32) -> Arc<Self> {
        Arc::new(Self {
            store,
            locks: RwLock::new(HashMap::new()),
            id_retry_budget,
        })
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Generate a random 6-digit room id candidate
    fn generate_room_id() -> String {
        let mut rng = rand::thread_rng();
        format!("{:06}", rng.gen_range(100000..=999999))
    }

    /// Mutation lock for one room id. The map lock is held only long enough
    /// to fetch or create the room's own lock.
    async fn room_lock(&self, room_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.write().await;
        locks
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create a room owned by `owner` as interviewer.
    pub async fn create_room(&self, owner: Identity, secret: String) -> Result<Room> {
        let candidates: Vec<String> = (0..self.id_retry_budget)
            .map(|_| Self::generate_room_id())
            .collect();
        self.create_room_from_candidates(owner, secret, candidates)
            .await
    }

    async fn create_room_from_candidates(
        &self,
        owner: Identity,
        secret: String,
        candidates: Vec<String>,
    ) -> Result<Room> {
        for candidate in candidates {
            let lock = self.room_lock(&candidate).await;
            let _guard = lock.lock().await;

            // Unique among *currently active* rooms only; archived ids may
            // be reissued.
            if self.store.contains_active(&candidate).await? {
                tracing::debug!(room_id = %candidate, "Room id collision, retrying");
                continue;
            }

            let room = Room::new(candidate, secret.clone(), owner.clone());
            self.store.insert(room.clone()).await?;
            tracing::info!(
                room_id = %room.room_id,
                interviewer = %room.interviewer.identity.id,
                "Room created"
            );
            return Ok(room);
        }

        tracing::warn!(
            budget = self.id_retry_budget,
            "Room id generation exhausted retry budget"
        );
        Err(SignalError::Conflict(self.id_retry_budget))
    }

    pub async fn find_room(&self, room_id: &str) -> Result<Room> {
        if !is_valid_room_id(room_id) {
            return Err(SignalError::Validation(room_id.to_string()));
        }
        self.store
            .find(room_id)
            .await?
            .ok_or_else(|| SignalError::RoomNotFound(room_id.to_string()))
    }

    /// Join `identity` to a room, gated by the shared secret.
    ///
    /// A wrong secret leaves the room byte-for-byte unchanged. A returning
    /// identity is reactivated in place; a new one is appended to the
    /// participant history.
    pub async fn join_room(
        &self,
        room_id: &str,
        supplied_secret: &str,
        identity: Identity,
    ) -> Result<Room> {
        if !is_valid_room_id(room_id) {
            return Err(SignalError::Validation(room_id.to_string()));
        }

        let lock = self.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let mut room = self
            .store
            .find(room_id)
            .await?
            .ok_or_else(|| SignalError::RoomNotFound(room_id.to_string()))?;

        // Exact compare, before any mutation
        if room.secret != supplied_secret {
            tracing::warn!(room_id = %room_id, identity = %identity.id, "Room secret mismatch");
            return Err(SignalError::Unauthorized(room_id.to_string()));
        }

        match room.seat_mut(&identity.id) {
            Some(seat) => {
                seat.active = true;
                tracing::info!(
                    room_id = %room_id,
                    identity = %identity.id,
                    "Returning identity reactivated"
                );
            }
            None => {
                room.participants.push(Seat::new(identity.clone(), Utc::now()));
                tracing::info!(
                    room_id = %room_id,
                    identity = %identity.id,
                    participants = room.participants.len(),
                    "Identity joined room"
                );
            }
        }

        self.store.update(room.clone()).await?;
        Ok(room)
    }

    pub async fn list_active(&self) -> Result<Vec<RoomSummary>> {
        let rooms = self.store.list_active().await?;
        Ok(rooms.iter().map(Room::summary).collect())
    }

    /// Bind a live connection to an identity's seat. Used by the presence
    /// tracker only; callers must already know the identity holds a seat.
    pub async fn mark_connected(
        &self,
        room_id: &str,
        identity_id: &str,
        connection_id: &str,
    ) -> Result<()> {
        let lock = self.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let mut room = self
            .store
            .find(room_id)
            .await?
            .ok_or_else(|| SignalError::RoomNotFound(room_id.to_string()))?;

        let seat = room.seat_mut(identity_id).ok_or_else(|| {
            SignalError::internal(format!(
                "identity {} has no seat in room {}",
                identity_id, room_id
            ))
        })?;
        seat.active = true;
        seat.connection_id = Some(connection_id.to_string());

        self.store.update(room).await
    }

    /// Flip an identity's seat inactive and clear its bound connection.
    /// Other seats are untouched.
    pub async fn mark_disconnected(&self, room_id: &str, identity_id: &str) -> Result<()> {
        let lock = self.room_lock(room_id).await;
        let _guard = lock.lock().await;

        let mut room = match self.store.find(room_id).await? {
            Some(room) => room,
            // Room already archived; nothing to flip.
            None => return Ok(()),
        };

        if let Some(seat) = room.seat_mut(identity_id) {
            seat.active = false;
            seat.connection_id = None;
            self.store.update(room).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            first_name: "Test".to_string(),
            last_name: id.to_string(),
        }
    }

    fn registry() -> Arc<RoomRegistry> {
        RoomRegistry::new(Arc::new(MemoryRoomStore::new()))
    }

    #[tokio::test]
    async fn test_create_room_id_format() {
        let registry = registry();
        let room = registry
            .create_room(identity("host"), "abc123".into())
            .await
            .unwrap();

        assert!(is_valid_room_id(&room.room_id));
        assert_eq!(room.secret, "abc123");
        assert!(room.is_active);
        assert!(room.interviewer.active);
        assert!(room.participants.is_empty());
    }

    #[tokio::test]
    async fn test_create_room_ids_unique_among_active() {
        let registry = registry();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..20 {
            let room = registry
                .create_room(identity("host"), "s".into())
                .await
                .unwrap();
            assert!(seen.insert(room.room_id), "duplicate active room id issued");
        }
    }

    #[tokio::test]
    async fn test_create_room_conflict_when_budget_exhausted() {
        let store = Arc::new(MemoryRoomStore::new());
        let registry = RoomRegistry::with_retry_budget(store, 1);

        // Occupy the only candidate we are going to offer.
        registry
            .create_room_from_candidates(identity("host"), "s".into(), vec!["482913".into()])
            .await
            .unwrap();

        let err = registry
            .create_room_from_candidates(identity("other"), "s".into(), vec!["482913".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::Conflict(1)));
    }

    #[tokio::test]
    async fn test_archived_id_can_be_reissued() {
        let registry = registry();
        let room = registry
            .create_room(identity("host"), "s".into())
            .await
            .unwrap();
        let id = room.room_id.clone();

        // Archive it behind the registry's back, as a reaper would.
        let mut archived = registry.find_room(&id).await.unwrap();
        archived.is_active = false;
        registry.store.update(archived).await.unwrap();

        registry
            .create_room_from_candidates(identity("host2"), "s2".into(), vec![id.clone()])
            .await
            .unwrap();
        let reissued = registry.find_room(&id).await.unwrap();
        assert_eq!(reissued.secret, "s2");
    }

    #[tokio::test]
    async fn test_join_room_appends_new_identity() {
        let registry = registry();
        let room = registry
            .create_room(identity("host"), "abc123".into())
            .await
            .unwrap();

        let joined = registry
            .join_room(&room.room_id, "abc123", identity("p1"))
            .await
            .unwrap();
        assert_eq!(joined.participants.len(), 1);
        assert_eq!(joined.participants[0].identity.id, "p1");
        assert!(joined.participants[0].active);
    }

    #[tokio::test]
    async fn test_join_room_reactivates_returning_identity() {
        let registry = registry();
        let room = registry
            .create_room(identity("host"), "abc123".into())
            .await
            .unwrap();

        registry
            .join_room(&room.room_id, "abc123", identity("p1"))
            .await
            .unwrap();
        registry
            .mark_disconnected(&room.room_id, "p1")
            .await
            .unwrap();

        let rejoined = registry
            .join_room(&room.room_id, "abc123", identity("p1"))
            .await
            .unwrap();
        assert_eq!(rejoined.participants.len(), 1, "duplicate record appended");
        assert!(rejoined.participants[0].active);
    }

    #[tokio::test]
    async fn test_join_room_wrong_secret_leaves_state_unchanged() {
        let registry = registry();
        let room = registry
            .create_room(identity("host"), "abc123".into())
            .await
            .unwrap();

        let before = registry.find_room(&room.room_id).await.unwrap();
        let err = registry
            .join_room(&room.room_id, "wrong", identity("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::Unauthorized(_)));

        let after = registry.find_room(&room.room_id).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let registry = registry();
        let err = registry
            .join_room("999999", "s", identity("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn test_join_malformed_room_id() {
        let registry = registry();
        for bad in ["12345", "1234567", "12345a", ""] {
            let err = registry
                .join_room(bad, "s", identity("p1"))
                .await
                .unwrap_err();
            assert!(matches!(err, SignalError::Validation(_)), "id {:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_concurrent_joins_both_land() {
        let registry = registry();
        let room = registry
            .create_room(identity("host"), "abc123".into())
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            registry.join_room(&room.room_id, "abc123", identity("p1")),
            registry.join_room(&room.room_id, "abc123", identity("p2")),
        );
        a.unwrap();
        b.unwrap();

        let after = registry.find_room(&room.room_id).await.unwrap();
        let ids: Vec<&str> = after
            .participants
            .iter()
            .map(|p| p.identity.id.as_str())
            .collect();
        assert_eq!(after.participants.len(), 2, "lost update on concurrent join");
        assert!(ids.contains(&"p1") && ids.contains(&"p2"));
    }

    #[tokio::test]
    async fn test_mark_connected_and_disconnected() {
        let registry = registry();
        let room = registry
            .create_room(identity("host"), "abc123".into())
            .await
            .unwrap();
        registry
            .join_room(&room.room_id, "abc123", identity("p1"))
            .await
            .unwrap();

        registry
            .mark_connected(&room.room_id, "p1", "conn-1")
            .await
            .unwrap();
        let bound = registry.find_room(&room.room_id).await.unwrap();
        assert_eq!(
            bound.participants[0].connection_id.as_deref(),
            Some("conn-1")
        );

        registry
            .mark_disconnected(&room.room_id, "p1")
            .await
            .unwrap();
        let after = registry.find_room(&room.room_id).await.unwrap();
        assert!(!after.participants[0].active);
        assert!(after.participants[0].connection_id.is_none());
        // Interviewer untouched
        assert!(after.interviewer.active);
    }

    #[tokio::test]
    async fn test_list_active_summaries() {
        let registry = registry();
        registry
            .create_room(identity("a"), "s".into())
            .await
            .unwrap();
        registry
            .create_room(identity("b"), "s".into())
            .await
            .unwrap();

        let summaries = registry.list_active().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.is_active));
    }
}
