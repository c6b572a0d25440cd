//! Playable characters: a static table mapping each player state to a pose
//! name plus the colours the canvas renderer uses for it.

use crate::game::PlayerState;

pub struct Character {
    pub id: &'static str,
    pub name: &'static str,
    pub body_color: &'static str,
    pub accent_color: &'static str,
    /// Pose names for idle, chopping and hit, in that order.
    poses: [&'static str; 3],
}

impl Character {
    pub fn pose_for(&self, state: PlayerState) -> &'static str {
        match state {
            PlayerState::Idle => self.poses[0],
            PlayerState::Chopping => self.poses[1],
            PlayerState::Hit => self.poses[2],
        }
    }
}

pub static CHARACTERS: [Character; 3] = [
    Character {
        id: "lumberjack",
        name: "Lumberjack",
        body_color: "#c0392b",
        accent_color: "#2c3e50",
        poses: ["stand", "swing", "knocked"],
    },
    Character {
        id: "ranger",
        name: "Ranger",
        body_color: "#27ae60",
        accent_color: "#6e4b2a",
        poses: ["ready", "strike", "stunned"],
    },
    Character {
        id: "beaver",
        name: "Beaver",
        body_color: "#8e5b34",
        accent_color: "#f5d76e",
        poses: ["sit", "gnaw", "dizzy"],
    },
];

/// Looks up a character; unknown ids get the first one.
pub fn character(id: Option<&str>) -> &'static Character {
    id.and_then(|id| CHARACTERS.iter().find(|c| c.id.eq_ignore_ascii_case(id)))
        .unwrap_or(&CHARACTERS[0])
}
