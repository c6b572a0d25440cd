// Canvas renderer. Draws in game coordinates: the canvas backing store is the
// logical board size and CSS scales it to the computed viewport size.

use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::animation::ActiveFlyOff;
use crate::characters::Character;
use crate::game::{
    BOARD_HEIGHT, BOARD_WIDTH, BranchSide, GameState, PlayerSide, PlayerState, SEGMENT_HEIGHT,
    TRUNK_BASE, TRUNK_CENTER_X,
};
use crate::viewport::ViewportScaling;

const TRUNK_WIDTH: f64 = 120.0;
const BRANCH_LENGTH: f64 = 150.0;
const BRANCH_THICKNESS: f64 = 30.0;
const PLAYER_WIDTH: f64 = 70.0;
const PLAYER_HEIGHT: f64 = 120.0;
const PLAYER_GAP: f64 = 60.0; // from trunk edge to player
const GROUND_Y: f64 = TRUNK_BASE.y + SEGMENT_HEIGHT / 2.0;

/// Everything one frame needs.
pub struct RenderFrame<'a> {
    pub state: &'a GameState,
    pub fly_offs: &'a [ActiveFlyOff],
    pub character: &'static Character,
    pub high_score: u32,
    pub scaling: &'a ViewportScaling,
}

pub struct Renderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        canvas.set_width(BOARD_WIDTH as u32);
        canvas.set_height(BOARD_HEIGHT as u32);
        Self { canvas, ctx }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn draw(&self, frame: &RenderFrame<'_>) {
        self.draw_backdrop();
        self.draw_trunk(&frame.state.tree_segments);
        for fly in frame.fly_offs {
            self.draw_fly_off(fly);
        }
        self.draw_player(frame.state, frame.character);
        self.draw_hud(frame.state);
        if frame.state.show_debug {
            self.draw_debug(frame);
        }
        if frame.state.game_over {
            self.draw_game_over(frame.state.score, frame.high_score);
        }
    }

    fn draw_backdrop(&self) {
        let ctx = &self.ctx;
        ctx.set_fill_style_str("#8fd3f4");
        ctx.fill_rect(0.0, 0.0, BOARD_WIDTH, BOARD_HEIGHT);
        ctx.set_fill_style_str("#5d8a3a");
        ctx.fill_rect(0.0, GROUND_Y, BOARD_WIDTH, BOARD_HEIGHT - GROUND_Y);
        // Stump below the bottom segment
        ctx.set_fill_style_str("#6b4423");
        ctx.fill_rect(TRUNK_CENTER_X - TRUNK_WIDTH / 2.0 - 10.0, GROUND_Y, TRUNK_WIDTH + 20.0, 24.0);
    }

    fn draw_trunk(&self, segments: &[crate::game::TreeSegment]) {
        for (i, seg) in segments.iter().enumerate() {
            let cy = TRUNK_BASE.y - i as f64 * SEGMENT_HEIGHT;
            self.draw_segment(TRUNK_CENTER_X, cy, seg.branch_side, i % 2 == 0);
        }
    }

    /// One trunk slice centred on (cx, cy), with its branch if any.
    fn draw_segment(&self, cx: f64, cy: f64, branch: BranchSide, light: bool) {
        let ctx = &self.ctx;
        let left = cx - TRUNK_WIDTH / 2.0;
        let top = cy - SEGMENT_HEIGHT / 2.0;
        ctx.set_fill_style_str(if light { "#8b5a2b" } else { "#7a4e25" });
        ctx.fill_rect(left, top, TRUNK_WIDTH, SEGMENT_HEIGHT);
        ctx.set_stroke_style_str("rgba(0,0,0,0.25)");
        ctx.set_line_width(2.0);
        ctx.stroke_rect(left, top, TRUNK_WIDTH, SEGMENT_HEIGHT);

        let branch_x = match branch {
            BranchSide::Left => Some(left - BRANCH_LENGTH),
            BranchSide::Right => Some(left + TRUNK_WIDTH),
            BranchSide::None => None,
        };
        if let Some(bx) = branch_x {
            ctx.set_fill_style_str("#6b4423");
            ctx.fill_rect(bx, cy - BRANCH_THICKNESS / 2.0, BRANCH_LENGTH, BRANCH_THICKNESS);
            // Leaf tuft at the tip
            let tip = if branch == BranchSide::Left { bx } else { bx + BRANCH_LENGTH - 40.0 };
            ctx.set_fill_style_str("#3f8f3a");
            ctx.fill_rect(tip, cy - BRANCH_THICKNESS, 40.0, BRANCH_THICKNESS * 2.0);
        }
    }

    fn draw_fly_off(&self, fly: &ActiveFlyOff) {
        let ctx = &self.ctx;
        ctx.save();
        if ctx.translate(fly.pose.x, fly.pose.y).is_ok()
            && ctx.rotate(fly.pose.rotation_deg.to_radians()).is_ok()
        {
            self.draw_segment(0.0, 0.0, fly.branch_side, true);
        }
        ctx.restore();
    }

    fn draw_player(&self, state: &GameState, character: &Character) {
        let ctx = &self.ctx;
        let offset = TRUNK_WIDTH / 2.0 + PLAYER_GAP + PLAYER_WIDTH / 2.0;
        let cx = match state.player_side {
            PlayerSide::Left => TRUNK_CENTER_X - offset,
            PlayerSide::Right => TRUNK_CENTER_X + offset,
        };
        let top = GROUND_Y - PLAYER_HEIGHT;
        ctx.set_fill_style_str(character.body_color);
        ctx.fill_rect(cx - PLAYER_WIDTH / 2.0, top, PLAYER_WIDTH, PLAYER_HEIGHT);

        // Axe: raised when idle, swung towards the trunk when chopping.
        let toward_trunk = -state.player_side.sign();
        ctx.set_fill_style_str(character.accent_color);
        match state.player_state {
            PlayerState::Idle => {
                ctx.fill_rect(cx + toward_trunk * 20.0 - 5.0, top - 40.0, 10.0, 50.0);
            }
            PlayerState::Chopping => {
                let ax = if toward_trunk < 0.0 { cx - PLAYER_WIDTH / 2.0 - 50.0 } else { cx + PLAYER_WIDTH / 2.0 };
                ctx.fill_rect(ax, top + 50.0, 50.0, 10.0);
            }
            PlayerState::Hit => {
                ctx.set_stroke_style_str("#ffffff");
                ctx.set_line_width(6.0);
                ctx.begin_path();
                ctx.move_to(cx - 20.0, top + 20.0);
                ctx.line_to(cx + 20.0, top + 60.0);
                ctx.move_to(cx + 20.0, top + 20.0);
                ctx.line_to(cx - 20.0, top + 60.0);
                ctx.stroke();
            }
        }
    }

    fn draw_hud(&self, state: &GameState) {
        let ctx = &self.ctx;
        // Timer bar
        let (bar_x, bar_y, bar_w, bar_h) = (120.0, 40.0, 300.0, 24.0);
        ctx.set_fill_style_str("rgba(0,0,0,0.35)");
        ctx.fill_rect(bar_x, bar_y, bar_w, bar_h);
        ctx.set_fill_style_str(if state.is_low_time() { "#e74c3c" } else { "#f1c40f" });
        ctx.fill_rect(bar_x, bar_y, bar_w * state.time_fraction(), bar_h);
        ctx.set_stroke_style_str("#222");
        ctx.set_line_width(2.0);
        ctx.stroke_rect(bar_x, bar_y, bar_w, bar_h);

        // Score
        ctx.set_font("bold 64px 'Fira Code', monospace");
        ctx.set_text_align("center");
        ctx.set_line_width(6.0);
        ctx.set_stroke_style_str("#000000");
        ctx.set_fill_style_str("#ffffff");
        let score = state.score.to_string();
        ctx.stroke_text(&score, TRUNK_CENTER_X, 140.0).ok();
        ctx.fill_text(&score, TRUNK_CENTER_X, 140.0).ok();
    }

    fn draw_debug(&self, frame: &RenderFrame<'_>) {
        let ctx = &self.ctx;
        let s = frame.scaling;
        let lines = [
            format!("scale {:.3}  offset {:.0},{:.0}", s.scale, s.offset_x, s.offset_y),
            format!("board {:.0}x{:.0}", s.actual_game_width, s.actual_game_height),
            format!("time {:.2}/{:.0}", frame.state.time_remaining, frame.state.max_time),
            format!("segments {}  fly-offs {}", frame.state.tree_segments.len(), frame.fly_offs.len()),
            format!("{} pose: {}", frame.character.name, frame.character.pose_for(frame.state.player_state)),
        ];
        ctx.set_fill_style_str("rgba(0,0,0,0.55)");
        ctx.fill_rect(8.0, 180.0, 300.0, 24.0 * lines.len() as f64 + 12.0);
        ctx.set_font("16px 'Fira Code', monospace");
        ctx.set_text_align("left");
        ctx.set_fill_style_str("#9effa0");
        for (i, line) in lines.iter().enumerate() {
            ctx.fill_text(line, 16.0, 204.0 + 24.0 * i as f64).ok();
        }
    }

    fn draw_game_over(&self, score: u32, best: u32) {
        let ctx = &self.ctx;
        ctx.set_fill_style_str("rgba(0,0,0,0.55)");
        ctx.fill_rect(0.0, 0.0, BOARD_WIDTH, BOARD_HEIGHT);
        let cx = BOARD_WIDTH / 2.0;
        let cy = BOARD_HEIGHT / 2.0;
        ctx.set_text_align("center");
        ctx.set_font("64px 'Fira Code', monospace");
        ctx.set_line_width(6.0);
        ctx.set_stroke_style_str("#000000");
        ctx.set_fill_style_str("#ffffff");
        ctx.stroke_text("GAME OVER", cx, cy).ok();
        ctx.fill_text("GAME OVER", cx, cy).ok();
        ctx.set_font("24px 'Fira Code', monospace");
        ctx.fill_text(&format!("Score {score}   Best {best}"), cx, cy + 56.0).ok();
        ctx.set_font("20px 'Fira Code', monospace");
        ctx.fill_text("Press R to try again", cx, cy + 96.0).ok();
    }
}
