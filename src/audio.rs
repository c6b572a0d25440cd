//! Audio seam. The core never plays sounds itself: a `SoundBridge` listens on
//! the event bus and asks an `AudioSink` to play named sounds. Sink failures
//! are logged and dropped so gameplay is identical with or without sound.

use std::rc::Rc;

use tracing::warn;

use crate::error::AudioError;
use crate::events::{self, EventBus, Subscription};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoundOptions {
    pub volume: f64,
    pub looped: bool,
    pub fade_in: bool,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self { volume: 1.0, looped: false, fade_in: false }
    }
}

impl SoundOptions {
    pub fn at_volume(volume: f64) -> Self {
        Self { volume, ..Self::default() }
    }
}

pub trait AudioSink {
    fn initialize(&self) -> Result<(), AudioError>;
    fn play_sound(&self, name: &str, options: SoundOptions) -> Result<(), AudioError>;
    fn play_background_music(&self, name: &str) -> Result<(), AudioError>;
    fn set_master_volume(&self, volume: f64);
}

pub const BACKGROUND_THEME: &str = "theme";

/// Which sound each domain event plays.
pub const EVENT_SOUNDS: [(&str, &str, f64); 4] = [
    (events::CHOP, "chop", 0.6),
    (events::HIT, "hit", 0.9),
    (events::GAME_OVER, "game_over", 1.0),
    (events::TIMER_WARNING, "timer_warning", 0.7),
];

/// Keeps the bus subscriptions that route events to a sink.
#[derive(Debug)]
pub struct SoundBridge {
    subscriptions: Vec<Subscription>,
}

impl SoundBridge {
    pub fn attach(bus: &EventBus, sink: Rc<dyn AudioSink>) -> Self {
        if let Err(err) = sink.initialize() {
            warn!(%err, "audio init failed; continuing without sound");
        }
        let mut subscriptions = Vec::new();
        for (event_type, sound, volume) in EVENT_SOUNDS {
            let sink = sink.clone();
            subscriptions.push(bus.subscribe(event_type, move |_| {
                if let Err(err) = sink.play_sound(sound, SoundOptions::at_volume(volume)) {
                    warn!(%err, sound, "sound failed");
                }
            }));
        }
        let music_sink = sink.clone();
        subscriptions.push(bus.subscribe(events::RESET, move |_| {
            if let Err(err) = music_sink.play_background_music(BACKGROUND_THEME) {
                warn!(%err, "background music failed");
            }
        }));
        Self { subscriptions }
    }

    pub fn detach(self) {
        for sub in self.subscriptions {
            sub.unsubscribe();
        }
    }
}
