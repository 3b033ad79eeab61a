use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity resolved by the account directory for a valid session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Interviewer,
    Participant,
}

/// One seat in a room: the interviewer slot or one participant record.
///
/// Records are history, not presence. A participant who disconnects keeps
/// their record with `active = false`; reconnecting reactivates the same
/// record instead of appending a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub identity: Identity,
    pub joined_at: DateTime<Utc>,
    pub active: bool,
    pub connection_id: Option<String>,
}

impl Seat {
    pub fn new(identity: Identity, joined_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            joined_at,
            active: true,
            connection_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub interviewer: Seat,
    pub participants: Vec<Seat>,
}

impl Room {
    pub fn new(room_id: String, secret: String, owner: Identity) -> Self {
        let now = Utc::now();
        Self {
            room_id,
            secret,
            created_at: now,
            is_active: true,
            interviewer: Seat::new(owner, now),
            participants: Vec::new(),
        }
    }

    /// Look up the seat (interviewer or participant) held by an identity.
    pub fn seat(&self, identity_id: &str) -> Option<&Seat> {
        if self.interviewer.identity.id == identity_id {
            return Some(&self.interviewer);
        }
        self.participants
            .iter()
            .find(|p| p.identity.id == identity_id)
    }

    pub fn seat_mut(&mut self, identity_id: &str) -> Option<&mut Seat> {
        if self.interviewer.identity.id == identity_id {
            return Some(&mut self.interviewer);
        }
        self.participants
            .iter_mut()
            .find(|p| p.identity.id == identity_id)
    }

    pub fn role_of(&self, identity_id: &str) -> Option<Role> {
        if self.interviewer.identity.id == identity_id {
            Some(Role::Interviewer)
        } else if self.participants.iter().any(|p| p.identity.id == identity_id) {
            Some(Role::Participant)
        } else {
            None
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            created_at: self.created_at,
            is_active: self.is_active,
            participant_count: self.participants.len(),
            interviewer_active: self.interviewer.active,
        }
    }
}

/// Listing view of a room, without the secret or seat details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub participant_count: usize,
    pub interviewer_active: bool,
}

/// True when `id` is exactly six ASCII digits.
pub fn is_valid_room_id(id: &str) -> bool {
    id.len() == 6 && id.bytes().all(|b| b.is_ascii_digit())
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

    #[test]
    fn test_room_id_validation() {
        assert!(is_valid_room_id("482913"));
        assert!(is_valid_room_id("000000"));
        assert!(!is_valid_room_id("48291"));
        assert!(!is_valid_room_id("4829131"));
        assert!(!is_valid_room_id("48291a"));
        assert!(!is_valid_room_id(""));
        assert!(!is_valid_room_id("４８２９１３")); // full-width digits are not ASCII
    }

    #[test]
    fn test_role_of() {
        let mut room = Room::new("482913".into(), "abc123".into(), identity("host"));
        room.participants
            .push(Seat::new(identity("p1"), Utc::now()));

        assert_eq!(room.role_of("host"), Some(Role::Interviewer));
        assert_eq!(room.role_of("p1"), Some(Role::Participant));
        assert_eq!(room.role_of("stranger"), None);
    }

    #[test]
    fn test_seat_lookup_prefers_interviewer_slot() {
        let room = Room::new("482913".into(), "abc123".into(), identity("host"));
        let seat = room.seat("host").unwrap();
        assert!(seat.active);
        assert!(seat.connection_id.is_none());
    }

    #[test]
    fn test_summary_counts_history_not_presence() {
        let mut room = Room::new("482913".into(), "abc123".into(), identity("host"));
        let mut gone = Seat::new(identity("p1"), Utc::now());
        gone.active = false;
        room.participants.push(gone);

        let summary = room.summary();
        assert_eq!(summary.participant_count, 1);
        assert!(summary.interviewer_active);
    }
}
