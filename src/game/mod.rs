//! Deterministic game core: one round's state snapshot, the closed command set
//! that transforms it, and the state machine that dispatches commands.
//!
//! Snapshots are never mutated in place. Every command returns either the very
//! same `Rc<GameState>` (no-op) or a freshly built one.

use serde::Serialize;

pub mod commands;
pub mod machine;
pub mod tree;

pub use commands::{Command, CommandContext, Transition};
pub use machine::{GameStateMachine, Notification};
pub use tree::{
    BranchGenerator, BranchSide, FixedRandom, PlayerSide, RandomSource, SequenceRandom,
    TreeSegment, add_new_segment_to_tree, branch_for_sample, check_collision,
};

// --- Board geometry ----------------------------------------------------------

/// Logical board size in game pixels (9:16).
pub const BOARD_WIDTH: f64 = 540.0;
pub const BOARD_HEIGHT: f64 = 960.0;
/// Horizontal centre of the trunk; pointer clicks split left/right here.
pub const TRUNK_CENTER_X: f64 = 270.0;
/// Where the bottom segment sits; fly-offs start here.
pub const TRUNK_BASE: Point = Point { x: TRUNK_CENTER_X, y: 760.0 };
pub const SEGMENT_HEIGHT: f64 = 100.0;

// --- Round rules -------------------------------------------------------------

pub const SEGMENT_COUNT: usize = 8;
pub const MAX_TIME: f64 = 10.0; // seconds
pub const CHOP_TIME_BONUS: f64 = 0.25; // seconds added per successful chop
pub const LOW_TIME_THRESHOLD: f64 = 3.0; // seconds; crossing it fires a timer warning
pub const TICK_INTERVAL_MS: i32 = 100;
pub const PLAYER_POSE_RESET_MS: i32 = 150;

/// Canonical opening trunk, bottom first.
pub const INITIAL_SEGMENTS: [TreeSegment; SEGMENT_COUNT] = [
    TreeSegment::new(BranchSide::None),
    TreeSegment::new(BranchSide::Right),
    TreeSegment::new(BranchSide::None),
    TreeSegment::new(BranchSide::Left),
    TreeSegment::new(BranchSide::None),
    TreeSegment::new(BranchSide::Right),
    TreeSegment::new(BranchSide::None),
    TreeSegment::new(BranchSide::Left),
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Transient pose of the player, independent of `game_over`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Idle,
    Chopping,
    Hit,
}

/// A chopped segment flying off screen.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimatedSegment {
    pub branch_side: BranchSide,
    pub animation_id: String,
    pub start_time: f64, // ms, same clock as the frame loop
    pub direction: PlayerSide,
    pub start_position: Point,
}

/// Snapshot of one round.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub player_side: PlayerSide,
    pub player_state: PlayerState,
    pub score: u32,
    pub game_over: bool,
    pub show_debug: bool,
    pub tree_segments: Vec<TreeSegment>,
    pub animated_segments: Vec<AnimatedSegment>,
    pub time_remaining: f64,
    pub max_time: f64,
}

impl GameState {
    pub fn initial() -> Self {
        Self {
            player_side: PlayerSide::Left,
            player_state: PlayerState::Idle,
            score: 0,
            game_over: false,
            show_debug: false,
            tree_segments: INITIAL_SEGMENTS.to_vec(),
            animated_segments: Vec::new(),
            time_remaining: MAX_TIME,
            max_time: MAX_TIME,
        }
    }

    /// Remaining time as a fraction of `max_time`, for the timer bar.
    pub fn time_fraction(&self) -> f64 {
        if self.max_time <= 0.0 {
            return 0.0;
        }
        (self.time_remaining / self.max_time).clamp(0.0, 1.0)
    }

    pub fn is_low_time(&self) -> bool {
        self.time_remaining <= LOW_TIME_THRESHOLD
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}
