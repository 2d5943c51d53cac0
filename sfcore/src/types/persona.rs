use serde::{Deserialize, Serialize};
use std::fmt;

/// Online status shown to other accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PersonaState {
    #[default]
    Offline,
    Online,
    Busy,
    Away,
    Snooze,
    LookingToTrade,
    LookingToPlay,
    Invisible,
}

impl PersonaState {
    pub const ALL: [PersonaState; 8] = [
        PersonaState::Offline,
        PersonaState::Online,
        PersonaState::Busy,
        PersonaState::Away,
        PersonaState::Snooze,
        PersonaState::LookingToTrade,
        PersonaState::LookingToPlay,
        PersonaState::Invisible,
    ];

    pub fn code(&self) -> i32 {
        match self {
            PersonaState::Offline => 0,
            PersonaState::Online => 1,
            PersonaState::Busy => 2,
            PersonaState::Away => 3,
            PersonaState::Snooze => 4,
            PersonaState::LookingToTrade => 5,
            PersonaState::LookingToPlay => 6,
            PersonaState::Invisible => 7,
        }
    }

    /// Human readable label for presentation layers.
    pub fn display_name(&self) -> &'static str {
        match self {
            PersonaState::Offline => "Offline",
            PersonaState::Online => "Online",
            PersonaState::Busy => "Busy",
            PersonaState::Away => "Away",
            PersonaState::Snooze => "Snooze",
            PersonaState::LookingToTrade => "Looking to trade",
            PersonaState::LookingToPlay => "Looking to play",
            PersonaState::Invisible => "Invisible",
        }
    }
}

impl TryFrom<i32> for PersonaState {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        PersonaState::ALL
            .iter()
            .copied()
            .find(|s| s.code() == code)
            .ok_or(code)
    }
}

impl fmt::Display for PersonaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Relationship between the logged-in account and another account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Relationship {
    #[default]
    None,
    Blocked,
    RequestRecipient,
    Friend,
    RequestInitiator,
    Ignored,
    IgnoredFriend,
}

impl Relationship {
    pub fn is_none(&self) -> bool {
        matches!(self, Relationship::None)
    }
}

impl From<i32> for Relationship {
    fn from(code: i32) -> Self {
        match code {
            1 => Relationship::Blocked,
            2 => Relationship::RequestRecipient,
            3 => Relationship::Friend,
            4 => Relationship::RequestInitiator,
            5 => Relationship::Ignored,
            6 => Relationship::IgnoredFriend,
            _ => Relationship::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChatEntryType {
    #[default]
    ChatMsg,
    Typing,
    Emote,
    LeftConversation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_state_codes_are_stable() {
        for state in PersonaState::ALL {
            assert_eq!(PersonaState::try_from(state.code()), Ok(state));
        }
        assert_eq!(PersonaState::try_from(42), Err(42));
    }

    #[test]
    fn unknown_relationship_codes_map_to_none() {
        assert_eq!(Relationship::from(3), Relationship::Friend);
        assert!(Relationship::from(99).is_none());
    }
}
