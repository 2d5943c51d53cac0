use crate::types::account::AccountId;
use crate::types::callbacks::{GamePlayed, PersonaUpdate, RosterEntry};
use crate::types::persona::{PersonaState, Relationship};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Live attributes of a friend, as last reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FriendState {
    pub persona_name: String,
    pub persona_state: PersonaState,
    pub relationship: Relationship,
    pub avatar_hash: Option<Vec<u8>>,
    pub game: Option<GamePlayed>,
}

/// Attribute of a [`Friend`] that observers may want to re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FriendField {
    Avatar,
    GamePlayed,
    GamePlayedName,
    PersonaName,
    PersonaState,
    Relationship,
    Visible,
}

impl FriendField {
    pub const ALL: [FriendField; 7] = [
        FriendField::Avatar,
        FriendField::GamePlayed,
        FriendField::GamePlayedName,
        FriendField::PersonaName,
        FriendField::PersonaState,
        FriendField::Relationship,
        FriendField::Visible,
    ];
}

/// A roster member.
///
/// Instances are shared (`Arc<Friend>`) with the presentation layer and are
/// refreshed in place; the roster never swaps an instance for a new one
/// while the identity stays listed. Equality and hashing only look at the
/// identity.
pub struct Friend {
    id: AccountId,
    state: RwLock<FriendState>,
    // Owned locally (search filtering), never derived from the network.
    visible: AtomicBool,
}

impl Friend {
    pub fn new(id: AccountId) -> Self {
        Self::with_state(id, FriendState::default())
    }

    pub fn with_state(id: AccountId, state: FriendState) -> Self {
        Self {
            id,
            state: RwLock::new(state),
            visible: AtomicBool::new(true),
        }
    }

    pub fn from_entry(entry: &RosterEntry) -> Self {
        Self::with_state(
            entry.account_id,
            FriendState {
                relationship: entry.relationship,
                ..Default::default()
            },
        )
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn snapshot(&self) -> FriendState {
        self.state
            .read()
            .expect("RwLock should not be poisoned")
            .clone()
    }

    pub fn persona_name(&self) -> String {
        self.read(|s| s.persona_name.clone())
    }

    pub fn persona_state(&self) -> PersonaState {
        self.read(|s| s.persona_state)
    }

    pub fn relationship(&self) -> Relationship {
        self.read(|s| s.relationship)
    }

    pub fn avatar_hash(&self) -> Option<Vec<u8>> {
        self.read(|s| s.avatar_hash.clone())
    }

    pub fn game_played_id(&self) -> Option<u64> {
        self.read(|s| s.game.as_ref().map(|g| g.id))
    }

    pub fn game_played_name(&self) -> Option<String> {
        self.read(|s| s.game.as_ref().map(|g| g.name.clone()))
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Returns true when the flag actually flipped.
    pub fn set_visible(&self, visible: bool) -> bool {
        self.visible.swap(visible, Ordering::Relaxed) != visible
    }

    pub fn set_relationship(&self, relationship: Relationship) {
        self.write(|s| s.relationship = relationship);
    }

    /// Refresh presence attributes from a persona update. Identity, visibility
    /// and relationship are left untouched.
    pub fn apply_persona(&self, update: &PersonaUpdate) {
        debug_assert_eq!(update.account_id, self.id);
        self.write(|s| {
            s.persona_name = update.persona_name.clone();
            s.persona_state = update.state;
            s.avatar_hash = update.avatar_hash.clone();
            s.game = update.game.clone();
        });
    }

    fn read<R>(&self, f: impl FnOnce(&FriendState) -> R) -> R {
        f(&self.state.read().expect("RwLock should not be poisoned"))
    }

    fn write(&self, f: impl FnOnce(&mut FriendState)) {
        f(&mut self.state.write().expect("RwLock should not be poisoned"))
    }
}

impl PartialEq for Friend {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Friend {}

impl Hash for Friend {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Friend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Friend")
            .field("id", &self.id)
            .field("state", &self.snapshot())
            .field("visible", &self.is_visible())
            .finish()
    }
}
