//! Keyboard and pointer contracts, as pure mappings to commands.

use crate::game::{Command, PlayerSide, TRUNK_CENTER_X};
use crate::viewport::{ViewportScaling, is_on_board, screen_to_game};

/// `ArrowLeft`/`ArrowRight` chop, `r` resets a finished round, `?` toggles the
/// debug overlay. Everything else is ignored.
pub fn command_for_key(key: &str, game_over: bool) -> Option<Command> {
    match key {
        "ArrowLeft" => Some(Command::Chop(PlayerSide::Left)),
        "ArrowRight" => Some(Command::Chop(PlayerSide::Right)),
        "r" | "R" if game_over => Some(Command::Reset),
        "?" => Some(Command::ToggleDebug),
        _ => None,
    }
}

/// Left of the trunk centre chops left; the centre line itself counts as right.
pub fn side_for_game_x(x: f64) -> PlayerSide {
    if x < TRUNK_CENTER_X {
        PlayerSide::Left
    } else {
        PlayerSide::Right
    }
}

/// Maps a click in screen space to a chop, or `None` when it misses the board.
pub fn command_for_click(
    screen_x: f64,
    screen_y: f64,
    scaling: &ViewportScaling,
) -> Option<Command> {
    let (x, y) = screen_to_game(screen_x, screen_y, scaling);
    is_on_board(x, y).then(|| Command::Chop(side_for_game_x(x)))
}
