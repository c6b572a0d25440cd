//! Browser implementations of the scheduling and audio seams.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::Promise;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{HtmlAudioElement, window};

use crate::audio::{AudioSink, SoundOptions};
use crate::error::AudioError;
use crate::schedule::Scheduler;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` loop that re-arms itself after each frame for as
/// long as it is active, and cancels the pending frame on `stop`.
pub struct RafScheduler {
    callback: FrameCallback,
    handle: Rc<Cell<Option<i32>>>,
}

impl RafScheduler {
    pub fn new(mut on_frame: impl FnMut(f64) + 'static) -> Self {
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let handle: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
        let f = callback.clone();
        let h = handle.clone();
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
            let fired = h.get();
            on_frame(ts);
            // Re-arm only if `on_frame` neither stopped the loop nor restarted
            // it (a restart has already requested the next frame).
            if fired.is_some() && h.get() == fired {
                h.set(request_frame(&f));
            }
        }) as Box<dyn FnMut(f64)>));
        Self { callback, handle }
    }
}

fn request_frame(callback: &FrameCallback) -> Option<i32> {
    let w = window()?;
    let cb = callback.borrow();
    let closure = cb.as_ref()?;
    w.request_animation_frame(closure.as_ref().unchecked_ref()).ok()
}

impl Scheduler for RafScheduler {
    fn start(&mut self) {
        if self.handle.get().is_none() {
            self.handle.set(request_frame(&self.callback));
        }
    }

    fn stop(&mut self) {
        if let Some(id) = self.handle.take() {
            if let Some(w) = window() {
                let _ = w.cancel_animation_frame(id);
            }
        }
    }

    fn is_active(&self) -> bool {
        self.handle.get().is_some()
    }
}

/// `setInterval` wrapper; `stop` clears the interval so no stale callback survives.
pub struct IntervalScheduler {
    callback: Closure<dyn FnMut()>,
    interval_ms: i32,
    handle: Option<i32>,
}

impl IntervalScheduler {
    pub fn new(interval_ms: i32, on_interval: impl FnMut() + 'static) -> Self {
        Self {
            callback: Closure::wrap(Box::new(on_interval) as Box<dyn FnMut()>),
            interval_ms,
            handle: None,
        }
    }
}

impl Scheduler for IntervalScheduler {
    fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.handle = window().and_then(|w| {
            w.set_interval_with_callback_and_timeout_and_arguments_0(
                self.callback.as_ref().unchecked_ref(),
                self.interval_ms,
            )
            .ok()
        });
    }

    fn stop(&mut self) {
        if let Some(id) = self.handle.take() {
            if let Some(w) = window() {
                w.clear_interval_with_handle(id);
            }
        }
    }

    fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

/// Runs `f` once after `delay_ms`; returns the handle for `clear_timeout`.
pub fn set_timeout(delay_ms: i32, f: impl FnOnce() + 'static) -> Option<i32> {
    let cb = Closure::once_into_js(f);
    window()?
        .set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), delay_ms)
        .ok()
}

pub fn clear_timeout(handle: i32) {
    if let Some(w) = window() {
        w.clear_timeout_with_handle(handle);
    }
}

const MUSIC_VOLUME: f64 = 0.4;
const FADE_IN_MS: i32 = 250;

fn playback_error(name: &str, err: JsValue) -> AudioError {
    AudioError::Playback {
        name: name.to_owned(),
        reason: err.as_string().unwrap_or_else(|| format!("{err:?}")),
    }
}

/// Waits for a `play()` promise. Autoplay refusals and missing or undecodable
/// files reject it, and come back as `AudioError::Playback`.
pub async fn settle_playback(name: String, playback: Promise) -> Result<(), AudioError> {
    JsFuture::from(playback)
        .await
        .map(|_| ())
        .map_err(|e| playback_error(&name, e))
}

fn watch_playback(name: &str, playback: Promise) {
    let name = name.to_owned();
    spawn_local(async move {
        if let Err(err) = settle_playback(name, playback).await {
            warn!(%err, "playback rejected");
        }
    });
}

struct Music {
    element: HtmlAudioElement,
    // Kept alive for as long as the element can fire `error`.
    _on_error: Closure<dyn FnMut()>,
}

/// Plays `<base_path>/<name>.mp3` through fresh `<audio>` elements.
pub struct HtmlAudioSink {
    base_path: String,
    master_volume: Cell<f64>,
    music: RefCell<Option<Music>>,
}

impl HtmlAudioSink {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.trim_end_matches('/').to_owned(),
            master_volume: Cell::new(1.0),
            music: RefCell::new(None),
        }
    }

    fn element(&self, name: &str) -> Result<HtmlAudioElement, AudioError> {
        HtmlAudioElement::new_with_src(&format!("{}/{}.mp3", self.base_path, name))
            .map_err(|e| playback_error(name, e))
    }
}

impl AudioSink for HtmlAudioSink {
    fn initialize(&self) -> Result<(), AudioError> {
        window().map(|_| ()).ok_or(AudioError::Unavailable)
    }

    fn play_sound(&self, name: &str, options: SoundOptions) -> Result<(), AudioError> {
        let el = self.element(name)?;
        let target = (options.volume * self.master_volume.get()).clamp(0.0, 1.0);
        el.set_loop(options.looped);
        if options.fade_in {
            el.set_volume(0.0);
            let fading = el.clone();
            set_timeout(FADE_IN_MS, move || fading.set_volume(target));
        } else {
            el.set_volume(target);
        }
        let playback = el.play().map_err(|e| playback_error(name, e))?;
        watch_playback(name, playback);
        Ok(())
    }

    fn play_background_music(&self, name: &str) -> Result<(), AudioError> {
        if let Some(old) = self.music.borrow_mut().take() {
            old.element.set_onerror(None);
            let _ = old.element.pause();
        }
        let el = self.element(name)?;
        el.set_loop(true);
        el.set_volume((MUSIC_VOLUME * self.master_volume.get()).clamp(0.0, 1.0));
        // A looping track can fail to load long after `play()` settled.
        let track = name.to_owned();
        let on_error = Closure::wrap(Box::new(move || {
            warn!(sound = %track, "background music failed to load");
        }) as Box<dyn FnMut()>);
        el.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        let playback = el.play().map_err(|e| playback_error(name, e))?;
        watch_playback(name, playback);
        *self.music.borrow_mut() = Some(Music { element: el, _on_error: on_error });
        Ok(())
    }

    fn set_master_volume(&self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        self.master_volume.set(volume);
        if let Some(music) = self.music.borrow().as_ref() {
            music.element.set_volume(MUSIC_VOLUME * volume);
        }
    }
}
