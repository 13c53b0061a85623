//! Role kinds and the person slot each one occupies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The role a record plays for a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Player,
    Coach,
    Parent,
    User,
}

impl RoleKind {
    /// Every role kind, in slot column order.
    pub const ALL: [RoleKind; 4] = [Self::Player, Self::Coach, Self::Parent, Self::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Coach => "coach",
            Self::Parent => "parent",
            Self::User => "user",
        }
    }

    /// Name of the back-reference column on `persons` reserved for this role.
    pub fn slot(&self) -> &'static str {
        match self {
            Self::Player => "player_id",
            Self::Coach => "coach_id",
            Self::Parent => "parent_id",
            Self::User => "user_id",
        }
    }

    /// Name of the unique constraint guarding [`Self::slot`].
    pub fn slot_constraint(&self) -> &'static str {
        match self {
            Self::Player => "uq_persons_player_id",
            Self::Coach => "uq_persons_coach_id",
            Self::Parent => "uq_persons_parent_id",
            Self::User => "uq_persons_user_id",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" => Ok(Self::Player),
            "coach" => Ok(Self::Coach),
            "parent" => Ok(Self::Parent),
            "user" => Ok(Self::User),
            other => Err(CoreError::Validation(format!(
                "Unknown role '{other}'. Must be one of: player, coach, parent, user"
            ))),
        }
    }
}

/// What a reconciliation targets: the person itself or one of its roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Person,
    Role(RoleKind),
}

impl RecordKind {
    /// The slot a record of this kind binds through. Persons have none.
    pub fn slot(&self) -> Option<&'static str> {
        match self {
            Self::Person => None,
            Self::Role(kind) => Some(kind.slot()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_has_a_distinct_slot() {
        let mut slots: Vec<_> = RoleKind::ALL.iter().map(RoleKind::slot).collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), RoleKind::ALL.len());
    }

    #[test]
    fn slot_names() {
        assert_eq!(RoleKind::Player.slot(), "player_id");
        assert_eq!(RoleKind::Coach.slot(), "coach_id");
        assert_eq!(RoleKind::Parent.slot(), "parent_id");
        assert_eq!(RoleKind::User.slot(), "user_id");
        assert_eq!(RecordKind::Person.slot(), None);
    }

    #[test]
    fn parse_round_trips_display() {
        for kind in RoleKind::ALL {
            assert_eq!(kind.to_string().parse::<RoleKind>().unwrap(), kind);
        }
        assert_eq!(" Coach ".parse::<RoleKind>().unwrap(), RoleKind::Coach);
        assert!("referee".parse::<RoleKind>().is_err());
    }
}
