//! Browser glue: owns the live game in a thread-local, wires DOM events and
//! browser timers into commands, and redraws after every transition.

pub mod console;
pub mod platform;
pub mod render;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{Level, debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, UrlSearchParams, window};

use crate::animation::FlyOffTracker;
use crate::audio::SoundBridge;
use crate::characters::{Character, character};
use crate::clock::{Clock, PerformanceClock};
use crate::config::GameConfig;
use crate::error::WebError;
use crate::events::EventBus;
use crate::game::{
    BOARD_HEIGHT, BOARD_WIDTH, BranchGenerator, Command, GameState, GameStateMachine,
    PLAYER_POSE_RESET_MS, PlayerState, TICK_INTERVAL_MS,
};
use crate::input::{command_for_click, command_for_key};
use crate::schedule::{Debounce, TickTimer};
use crate::storage::{HighScore, LocalStorage, MemoryStorage};
use crate::viewport::{ScalingOptions, ViewportScaling, compute_scaling};

use platform::{HtmlAudioSink, IntervalScheduler, RafScheduler, clear_timeout, set_timeout};
use render::{RenderFrame, Renderer};

pub const CANVAS_ID: &str = "tc-board-canvas";
const SOUND_BASE_PATH: &str = "sounds";

struct App {
    machine: GameStateMachine,
    clock: Rc<dyn Clock>,
    // Held for its subscriptions.
    _sounds: SoundBridge,
    high_score: HighScore,
    tick: TickTimer<IntervalScheduler>,
    fly_offs: FlyOffTracker<RafScheduler>,
    // Ids the tracker expired during a frame, dispatched once the frame is done.
    expired: Rc<RefCell<Vec<String>>>,
    pose_reset: Debounce<i32>,
    scaling: ViewportScaling,
    options: ScalingOptions,
    character: &'static Character,
    renderer: Renderer,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

/// Runs `f` on the live app. Returns `None` before `start_game` or when the app
/// is already borrowed further up the stack.
fn with_app<R>(f: impl FnOnce(&mut App) -> R) -> Option<R> {
    APP.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            warn!("re-entrant app access skipped");
            return None;
        };
        slot.as_mut().map(f)
    })
}

impl App {
    fn dispatch(&mut self, command: Command) {
        let chop = matches!(command, Command::Chop(_));
        let before = self.machine.state();
        let state = self.machine.dispatch(command);
        if Rc::ptr_eq(&before, &state) {
            return;
        }
        if self.high_score.record(state.score) {
            debug!(best = state.score, "new high score");
        }
        let now = self.clock.now_ms();
        self.tick.sync(&state, now);
        self.fly_offs.sync(&state.animated_segments);
        if chop && state.player_state == PlayerState::Chopping {
            self.pose_reset.rearm(clear_timeout, || {
                set_timeout(PLAYER_POSE_RESET_MS, || {
                    with_app(|app| {
                        app.pose_reset.fired();
                        app.dispatch(Command::ResetPlayerState);
                    });
                })
            });
        }
        self.render();
    }

    fn on_tick(&mut self) {
        let now = self.clock.now_ms();
        if let Some(tick) = self.tick.on_interval(now) {
            self.dispatch(tick);
        }
    }

    fn on_frame(&mut self) {
        let now = self.clock.now_ms();
        self.fly_offs.frame(now);
        let expired: Vec<String> = self.expired.borrow_mut().drain(..).collect();
        for id in expired {
            self.dispatch(Command::RemoveAnimatedSegment(id));
        }
        self.render();
    }

    fn resize(&mut self) -> Result<(), WebError> {
        let win = window().ok_or(WebError::NoWindow)?;
        let width = win.inner_width()?.as_f64().unwrap_or(BOARD_WIDTH);
        let height = win.inner_height()?.as_f64().unwrap_or(BOARD_HEIGHT);
        self.scaling = compute_scaling(width, height, self.options);
        let style = self.renderer.canvas().style();
        style.set_property("left", &format!("{}px", self.scaling.offset_x))?;
        style.set_property("top", &format!("{}px", self.scaling.offset_y))?;
        style.set_property("width", &format!("{}px", self.scaling.actual_game_width))?;
        style.set_property("height", &format!("{}px", self.scaling.actual_game_height))?;
        debug!(scale = self.scaling.scale, width, height, "viewport resized");
        self.render();
        Ok(())
    }

    fn render(&self) {
        let state = self.machine.state();
        let fly_offs = self.fly_offs.poses(self.clock.now_ms());
        self.renderer.draw(&RenderFrame {
            state: &state,
            fly_offs: &fly_offs,
            character: self.character,
            high_score: self.high_score.best(),
            scaling: &self.scaling,
        });
    }
}

fn query_params() -> Option<UrlSearchParams> {
    let search = window()?.location().search().ok()?;
    UrlSearchParams::new_with_str(&search).ok()
}

fn read_config() -> GameConfig {
    match query_params() {
        Some(params) => GameConfig::from_lookup(|key| params.get(key)),
        None => GameConfig::default(),
    }
}

fn board_canvas(doc: &Document) -> Result<HtmlCanvasElement, WebError> {
    let not_canvas = |_| WebError::MissingElement(CANVAS_ID.into());
    if let Some(el) = doc.get_element_by_id(CANVAS_ID) {
        return el.dyn_into().map_err(not_canvas);
    }
    let canvas: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into().map_err(not_canvas)?;
    canvas.set_id(CANVAS_ID);
    canvas
        .set_attribute("style", "position:fixed; background:#8fd3f4; touch-action:manipulation;")
        .ok();
    doc.body()
        .ok_or_else(|| WebError::MissingElement("body".into()))?
        .append_child(&canvas)?;
    Ok(canvas)
}

fn listen<E: JsCast + 'static>(
    target: &web_sys::EventTarget,
    event: &str,
    mut handler: impl FnMut(E) + 'static,
) -> Result<(), WebError> {
    let closure = Closure::wrap(Box::new(move |evt: web_sys::Event| {
        if let Ok(evt) = evt.dyn_into::<E>() {
            handler(evt);
        }
    }) as Box<dyn FnMut(web_sys::Event)>);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// Builds the game, attaches it to the page and starts the first round.
pub fn start() -> Result<(), WebError> {
    if APP.with(|cell| cell.borrow().is_some()) {
        warn!("start_game called twice; ignoring");
        return Ok(());
    }
    let config = read_config();
    console::init_logging(if config.test_mode { Level::DEBUG } else { Level::INFO });

    let win = window().ok_or(WebError::NoWindow)?;
    let doc = win.document().ok_or(WebError::NoDocument)?;
    let canvas = board_canvas(&doc)?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .and_then(|ctx| ctx.dyn_into().ok())
        .ok_or_else(|| WebError::MissingElement("2d context".into()))?;
    let renderer = Renderer::new(canvas.clone(), ctx);

    let clock: Rc<dyn Clock> = Rc::new(PerformanceClock);
    let bus = Rc::new(EventBus::new(clock.clone()));
    let generator = config.with_test_mode_probe(BranchGenerator::from_entropy());
    let machine = GameStateMachine::new(generator, clock.clone()).with_event_bus(bus.clone());
    let sounds = SoundBridge::attach(&bus, Rc::new(HtmlAudioSink::new(SOUND_BASE_PATH)));
    let high_score = match LocalStorage::open() {
        Ok(storage) => HighScore::load(storage),
        Err(err) => {
            warn!(%err, "local storage unavailable; high score kept in memory");
            HighScore::load(MemoryStorage::default())
        }
    };

    let tick = TickTimer::new(IntervalScheduler::new(TICK_INTERVAL_MS, || {
        with_app(App::on_tick);
    }));
    let mut fly_offs = FlyOffTracker::new(RafScheduler::new(|_ts| {
        with_app(App::on_frame);
    }));
    let expired: Rc<RefCell<Vec<String>>> = Rc::default();
    {
        let expired = expired.clone();
        fly_offs.set_on_removed(move |id, _reason| expired.borrow_mut().push(id.to_owned()));
    }

    let character = character(config.character.as_deref());
    info!(character = character.id, test_mode = config.test_mode, "starting");
    let app = App {
        machine,
        clock,
        _sounds: sounds,
        high_score,
        tick,
        fly_offs,
        expired,
        pose_reset: Debounce::default(),
        scaling: compute_scaling(BOARD_WIDTH, BOARD_HEIGHT, config.scaling),
        options: config.scaling,
        character,
        renderer,
    };
    APP.with(|cell| cell.replace(Some(app)));

    listen(&doc, "keydown", |evt: web_sys::KeyboardEvent| {
        let key = evt.key();
        with_app(|app| {
            if let Some(command) = command_for_key(&key, app.machine.state().game_over) {
                evt.prevent_default();
                app.dispatch(command);
            }
        });
    })?;
    listen(&canvas, "click", |evt: web_sys::MouseEvent| {
        let (x, y) = (f64::from(evt.client_x()), f64::from(evt.client_y()));
        with_app(|app| {
            if let Some(command) = command_for_click(x, y, &app.scaling) {
                app.dispatch(command);
            }
        });
    })?;
    listen(&win, "resize", |_: web_sys::Event| {
        if let Some(Err(err)) = with_app(App::resize) {
            warn!(%err, "resize failed");
        }
    })?;

    with_app(|app| -> Result<(), WebError> {
        app.resize()?;
        app.dispatch(Command::Reset);
        Ok(())
    })
    .transpose()?;
    Ok(())
}

/// Current snapshot, or `None` before `start`.
pub fn snapshot() -> Option<Rc<GameState>> {
    with_app(|app| app.machine.state())
}

pub fn best_score() -> u32 {
    with_app(|app| app.high_score.best()).unwrap_or(0)
}
