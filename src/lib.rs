//! Timber Chop core crate.
//!
//! A one-button lumberjack arcade game: chop the trunk from the left or the
//! right, never from under a branch, and keep the countdown alive. Gameplay is
//! a pure command pipeline in [`game`]; everything that touches the page lives
//! in [`web`] and is reached through `start_game()`.

use wasm_bindgen::prelude::*;

pub mod animation;
pub mod audio;
pub mod characters;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod input;
pub mod schedule;
pub mod storage;
pub mod viewport;
pub mod web;

pub use error::{AudioError, StorageError, WebError};
pub use events::{DomainEvent, EventBus};
pub use game::{Command, GameState, GameStateMachine, PlayerSide, PlayerState};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    web::start().map_err(JsValue::from)
}

/// Current snapshot as JSON (camelCase keys), `null` before the game starts.
#[wasm_bindgen]
pub fn game_state_json() -> Result<String, JsValue> {
    let Some(state) = web::snapshot() else {
        return Ok("null".to_owned());
    };
    serde_json::to_string(&*state).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn high_score() -> u32 {
    web::best_score()
}
