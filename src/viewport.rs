//! Viewport scaling and screen/game coordinate mapping.
//!
//! The game is laid out on a fixed 540×960 logical board. `compute_scaling`
//! derives a uniform scale plus centring offsets for any viewport; it is a pure
//! function of its inputs so it can be recomputed on every resize.

use serde::Serialize;

use crate::game::{BOARD_HEIGHT, BOARD_WIDTH};

pub const DEFAULT_MIN_SCALE: f64 = 0.25;
pub const DEFAULT_MAX_SCALE: f64 = 3.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalingStrategy {
    FitToWidth,
    FitToHeight,
    /// Fit whichever axis keeps the whole board visible.
    #[default]
    FitToScreen,
}

impl ScalingStrategy {
    /// Parses the query-parameter spelling (`fit-to-width`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fit-to-width" => Some(ScalingStrategy::FitToWidth),
            "fit-to-height" => Some(ScalingStrategy::FitToHeight),
            "fit-to-screen" => Some(ScalingStrategy::FitToScreen),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingOptions {
    pub strategy: ScalingStrategy,
    pub min_scale: f64,
    pub max_scale: f64,
    pub maintain_aspect_ratio: bool,
}

impl Default for ScalingOptions {
    fn default() -> Self {
        Self {
            strategy: ScalingStrategy::FitToScreen,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            maintain_aspect_ratio: true,
        }
    }
}

impl ScalingOptions {
    /// Replaces unusable bounds with defaults and orders min/max.
    pub fn normalized(self) -> Self {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        let mut min_scale = if usable(self.min_scale) { self.min_scale } else { DEFAULT_MIN_SCALE };
        let mut max_scale = if usable(self.max_scale) { self.max_scale } else { DEFAULT_MAX_SCALE };
        if min_scale > max_scale {
            std::mem::swap(&mut min_scale, &mut max_scale);
        }
        Self { min_scale, max_scale, ..self }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportScaling {
    pub scale: f64,
    pub container_width: f64,
    pub container_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub actual_game_width: f64,
    pub actual_game_height: f64,
}

/// Scale factor and centring offsets for the board inside a viewport.
pub fn compute_scaling(
    viewport_width: f64,
    viewport_height: f64,
    options: ScalingOptions,
) -> ViewportScaling {
    let options = options.normalized();
    let vw = if viewport_width.is_finite() { viewport_width.max(0.0) } else { 0.0 };
    let vh = if viewport_height.is_finite() { viewport_height.max(0.0) } else { 0.0 };
    let board_aspect = BOARD_WIDTH / BOARD_HEIGHT;

    let fit_width = || (vw / BOARD_WIDTH, vw, vw / board_aspect);
    let fit_height = || (vh / BOARD_HEIGHT, vh * board_aspect, vh);

    let (raw_scale, container_width, container_height) = if !options.maintain_aspect_ratio {
        ((vw / BOARD_WIDTH).min(vh / BOARD_HEIGHT), vw, vh)
    } else {
        match options.strategy {
            ScalingStrategy::FitToWidth => fit_width(),
            ScalingStrategy::FitToHeight => fit_height(),
            ScalingStrategy::FitToScreen => {
                // A zero-height viewport counts as infinitely wide.
                let viewport_aspect = if vh > 0.0 { vw / vh } else { f64::INFINITY };
                if viewport_aspect > board_aspect {
                    fit_height()
                } else {
                    fit_width()
                }
            }
        }
    };

    let scale = raw_scale.max(options.min_scale).min(options.max_scale);
    let actual_game_width = BOARD_WIDTH * scale;
    let actual_game_height = BOARD_HEIGHT * scale;
    ViewportScaling {
        scale,
        container_width,
        container_height,
        offset_x: ((vw - actual_game_width) / 2.0).max(0.0),
        offset_y: ((vh - actual_game_height) / 2.0).max(0.0),
        actual_game_width,
        actual_game_height,
    }
}

pub fn screen_to_game(x: f64, y: f64, scaling: &ViewportScaling) -> (f64, f64) {
    (
        (x - scaling.offset_x) / scaling.scale,
        (y - scaling.offset_y) / scaling.scale,
    )
}

pub fn game_to_screen(x: f64, y: f64, scaling: &ViewportScaling) -> (f64, f64) {
    (
        x * scaling.scale + scaling.offset_x,
        y * scaling.scale + scaling.offset_y,
    )
}

/// True when a game-space point lies on the board.
pub fn is_on_board(x: f64, y: f64) -> bool {
    (0.0..=BOARD_WIDTH).contains(&x) && (0.0..=BOARD_HEIGHT).contains(&y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(strategy: ScalingStrategy) -> ScalingOptions {
        ScalingOptions { strategy, min_scale: 0.01, max_scale: 10.0, maintain_aspect_ratio: true }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn wide_viewport_fits_height_and_centres_horizontally() {
        let s = compute_scaling(1920.0, 1080.0, opts(ScalingStrategy::FitToScreen));
        assert!(close(s.scale, 1080.0 / 960.0));
        assert!(close(s.actual_game_height, 1080.0));
        assert!(close(s.offset_y, 0.0));
        assert!(close(s.offset_x, (1920.0 - 540.0 * s.scale) / 2.0));
        assert!(close(s.container_width, 1080.0 * 540.0 / 960.0));
    }

    #[test]
    fn tall_viewport_fits_width() {
        let s = compute_scaling(360.0, 800.0, opts(ScalingStrategy::FitToScreen));
        assert!(close(s.scale, 360.0 / 540.0));
        assert!(close(s.offset_x, 0.0));
        assert!(close(s.offset_y, (800.0 - 640.0) / 2.0));
        assert!(close(s.container_height, 640.0));
    }

    #[test]
    fn explicit_strategies_follow_their_axis() {
        let w = compute_scaling(1080.0, 1000.0, opts(ScalingStrategy::FitToWidth));
        assert!(close(w.scale, 2.0));
        assert!(close(w.container_height, 1920.0));
        assert!(close(w.offset_y, 0.0), "overflow never produces negative offsets");

        let h = compute_scaling(300.0, 480.0, opts(ScalingStrategy::FitToHeight));
        assert!(close(h.scale, 0.5));
        assert!(close(h.container_width, 270.0));
    }

    #[test]
    fn without_aspect_lock_container_fills_viewport() {
        let o = ScalingOptions { maintain_aspect_ratio: false, ..opts(ScalingStrategy::FitToWidth) };
        let s = compute_scaling(1000.0, 960.0, o);
        assert!(close(s.scale, 1.0));
        assert_eq!((s.container_width, s.container_height), (1000.0, 960.0));
        assert!(close(s.offset_x, 230.0));
    }

    #[test]
    fn scale_is_clamped() {
        let o = ScalingOptions { min_scale: 0.5, max_scale: 1.5, ..ScalingOptions::default() };
        assert!(close(compute_scaling(4000.0, 4000.0, o).scale, 1.5));
        assert!(close(compute_scaling(10.0, 10.0, o).scale, 0.5));
    }

    #[test]
    fn fit_to_screen_never_exceeds_viewport_or_bounds() {
        let o = ScalingOptions { min_scale: 0.05, max_scale: 2.0, ..ScalingOptions::default() };
        for w in (100..3000).step_by(137) {
            for h in (100..3000).step_by(151) {
                let (w, h) = (w as f64, h as f64);
                let s = compute_scaling(w, h, o);
                assert!(s.scale >= o.min_scale && s.scale <= o.max_scale);
                assert!(s.actual_game_width <= w + 1e-9, "{w}x{h}");
                assert!(s.actual_game_height <= h + 1e-9, "{w}x{h}");
                assert!(s.offset_x >= 0.0 && s.offset_y >= 0.0);
            }
        }
    }

    #[test]
    fn bad_options_are_normalized() {
        let o = ScalingOptions { min_scale: 4.0, max_scale: 1.0, ..ScalingOptions::default() }.normalized();
        assert_eq!((o.min_scale, o.max_scale), (1.0, 4.0));
        let o = ScalingOptions { min_scale: f64::NAN, max_scale: -2.0, ..ScalingOptions::default() }.normalized();
        assert_eq!((o.min_scale, o.max_scale), (DEFAULT_MIN_SCALE, DEFAULT_MAX_SCALE));
    }

    #[test]
    fn degenerate_viewport_uses_min_scale() {
        let s = compute_scaling(0.0, 0.0, ScalingOptions::default());
        assert_eq!(s.scale, DEFAULT_MIN_SCALE);
        assert_eq!((s.offset_x, s.offset_y), (0.0, 0.0));
    }

    #[test]
    fn coordinate_round_trip() {
        for (vw, vh) in [(1920.0, 1080.0), (375.0, 812.0), (777.7, 333.3)] {
            for strategy in [ScalingStrategy::FitToWidth, ScalingStrategy::FitToHeight, ScalingStrategy::FitToScreen] {
                let s = compute_scaling(vw, vh, opts(strategy));
                for (x, y) in [(0.0, 0.0), (270.0, 480.0), (539.9, 959.1), (-12.5, 1200.0)] {
                    let (sx, sy) = game_to_screen(x, y, &s);
                    let (gx, gy) = screen_to_game(sx, sy, &s);
                    assert!((gx - x).abs() < 1e-9 && (gy - y).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!(ScalingStrategy::parse("fit-to-width"), Some(ScalingStrategy::FitToWidth));
        assert_eq!(ScalingStrategy::parse(" FIT-TO-HEIGHT "), Some(ScalingStrategy::FitToHeight));
        assert_eq!(ScalingStrategy::parse("stretch"), None);
    }

    #[test]
    fn board_bounds() {
        assert!(is_on_board(0.0, 0.0));
        assert!(is_on_board(540.0, 960.0));
        assert!(!is_on_board(-0.1, 10.0));
        assert!(!is_on_board(10.0, 960.5));
    }
}
