//! The closed set of state transitions.
//!
//! Each command is a pure function of the current snapshot plus a small
//! context (generator, clock reading, animation-id counter). No-ops hand back
//! the same `Rc` so callers can detect them with `Rc::ptr_eq`.

use std::rc::Rc;

use super::tree::{BranchGenerator, PlayerSide, add_new_segment_to_tree, check_collision};
use super::{
    AnimatedSegment, CHOP_TIME_BONUS, GameState, LOW_TIME_THRESHOLD, PlayerState, TRUNK_BASE,
};
use crate::events::DomainEvent;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Chop(PlayerSide),
    /// Elapsed seconds since the previous tick.
    Tick(f64),
    Reset,
    ToggleDebug,
    /// Clears the transient chopping pose back to idle.
    ResetPlayerState,
    /// Drops a finished fly-off animation from the snapshot.
    RemoveAnimatedSegment(String),
}

/// Everything a command may read or advance besides the snapshot.
pub struct CommandContext<'a> {
    pub generator: &'a mut BranchGenerator,
    pub now_ms: f64,
    pub next_animation_id: &'a mut u64,
}

impl CommandContext<'_> {
    fn allocate_animation_id(&mut self) -> String {
        let id = *self.next_animation_id;
        *self.next_animation_id += 1;
        format!("flyoff-{id}")
    }
}

/// Result of executing a command.
#[derive(Clone, Debug)]
pub struct Transition {
    pub state: Rc<GameState>,
    pub events: Vec<DomainEvent>,
}

impl Transition {
    fn unchanged(state: &Rc<GameState>) -> Self {
        Self { state: state.clone(), events: Vec::new() }
    }

    fn changed(state: GameState, events: Vec<DomainEvent>) -> Self {
        Self { state: Rc::new(state), events }
    }
}

impl Command {
    pub fn execute(&self, state: &Rc<GameState>, ctx: &mut CommandContext<'_>) -> Transition {
        match self {
            Command::Chop(side) => chop(state, *side, ctx),
            Command::Tick(dt) => tick(state, *dt),
            Command::Reset => Transition::changed(GameState::initial(), vec![DomainEvent::Reset]),
            Command::ToggleDebug => {
                let enabled = !state.show_debug;
                let next = GameState { show_debug: enabled, ..(**state).clone() };
                Transition::changed(next, vec![DomainEvent::DebugToggle { enabled }])
            }
            Command::ResetPlayerState => reset_player_state(state),
            Command::RemoveAnimatedSegment(id) => remove_animated_segment(state, id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Chop(_) => "chop",
            Command::Tick(_) => "tick",
            Command::Reset => "reset",
            Command::ToggleDebug => "toggleDebug",
            Command::ResetPlayerState => "resetPlayerState",
            Command::RemoveAnimatedSegment(_) => "removeAnimatedSegment",
        }
    }
}

fn chop(state: &Rc<GameState>, side: PlayerSide, ctx: &mut CommandContext<'_>) -> Transition {
    if state.game_over {
        return Transition::unchanged(state);
    }

    if check_collision(side, &state.tree_segments) {
        let next = GameState {
            player_side: side,
            player_state: PlayerState::Hit,
            game_over: true,
            ..(**state).clone()
        };
        let events = vec![DomainEvent::Hit { side }, DomainEvent::GameOver { score: state.score }];
        return Transition::changed(next, events);
    }

    let mut animated_segments = state.animated_segments.clone();
    if let Some(bottom) = state.tree_segments.first() {
        animated_segments.push(AnimatedSegment {
            branch_side: bottom.branch_side,
            animation_id: ctx.allocate_animation_id(),
            start_time: ctx.now_ms,
            direction: side.opposite(),
            start_position: TRUNK_BASE,
        });
    }

    let score = state.score + 1;
    let next = GameState {
        player_side: side,
        player_state: PlayerState::Chopping,
        score,
        tree_segments: add_new_segment_to_tree(&state.tree_segments, ctx.generator),
        animated_segments,
        time_remaining: (state.time_remaining + CHOP_TIME_BONUS).min(state.max_time),
        ..(**state).clone()
    };
    Transition::changed(next, vec![DomainEvent::Chop { side, score }])
}

fn tick(state: &Rc<GameState>, dt: f64) -> Transition {
    if state.game_over || !dt.is_finite() || dt <= 0.0 {
        return Transition::unchanged(state);
    }

    let before = state.time_remaining;
    let time_remaining = (before - dt).max(0.0);
    let mut events = Vec::new();
    if before > LOW_TIME_THRESHOLD && time_remaining <= LOW_TIME_THRESHOLD {
        events.push(DomainEvent::TimerWarning { time_remaining });
    }

    let mut next = GameState { time_remaining, ..(**state).clone() };
    if time_remaining <= 0.0 {
        next.game_over = true;
        next.player_state = PlayerState::Hit;
        events.push(DomainEvent::GameOver { score: state.score });
    }
    Transition::changed(next, events)
}

fn reset_player_state(state: &Rc<GameState>) -> Transition {
    let keep_hit = state.game_over && state.player_state == PlayerState::Hit;
    if state.player_state == PlayerState::Idle || keep_hit {
        return Transition::unchanged(state);
    }
    let next = GameState { player_state: PlayerState::Idle, ..(**state).clone() };
    Transition::changed(next, Vec::new())
}

fn remove_animated_segment(state: &Rc<GameState>, id: &str) -> Transition {
    if !state.animated_segments.iter().any(|a| a.animation_id == id) {
        return Transition::unchanged(state);
    }
    let mut next = (**state).clone();
    next.animated_segments.retain(|a| a.animation_id != id);
    Transition::changed(next, Vec::new())
}
