//! Start/stop seams for repeating callbacks (animation frames, interval timers)
//! and the tick timer that turns interval callbacks into `Tick` commands.

use tracing::debug;

use crate::game::{Command, GameState};

/// A repeating callback source that its owner explicitly arms and disarms.
/// Redundant `start`/`stop` calls must be ignored.
pub trait Scheduler {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// Scheduler that only records what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    active: bool,
    pub starts: u32,
    pub stops: u32,
}

impl Scheduler for ManualScheduler {
    fn start(&mut self) {
        if !self.active {
            self.active = true;
            self.starts += 1;
        }
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.stops += 1;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Drives the countdown: runs while the round is live, stops on game over.
#[derive(Debug)]
pub struct TickTimer<S: Scheduler> {
    scheduler: S,
    last_ms: Option<f64>,
}

impl<S: Scheduler> TickTimer<S> {
    pub fn new(scheduler: S) -> Self {
        Self { scheduler, last_ms: None }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn start(&mut self, now_ms: f64) {
        if !self.scheduler.is_active() {
            debug!("tick timer armed");
        }
        self.last_ms = Some(now_ms);
        self.scheduler.start();
    }

    pub fn stop(&mut self) {
        if self.scheduler.is_active() {
            debug!("tick timer disarmed");
        }
        self.scheduler.stop();
        self.last_ms = None;
    }

    /// Called from the interval callback. Time is measured between callbacks,
    /// so a late callback yields a larger delta rather than a lost tick.
    pub fn on_interval(&mut self, now_ms: f64) -> Option<Command> {
        if !self.scheduler.is_active() {
            return None;
        }
        let last = self.last_ms.replace(now_ms)?;
        let dt = (now_ms - last) / 1000.0;
        (dt > 0.0).then_some(Command::Tick(dt))
    }

    /// Keeps the timer in step with the snapshot: stopped once the round is
    /// over, re-armed when a live round (e.g. after reset) shows up.
    pub fn sync(&mut self, state: &GameState, now_ms: f64) {
        if state.game_over {
            self.stop();
        } else if !self.scheduler.is_active() {
            self.start(now_ms);
        }
    }
}

/// At most one pending one-shot timer. Re-arming cancels the previous one, so
/// only the latest request ever fires.
#[derive(Debug)]
pub struct Debounce<H> {
    pending: Option<H>,
}

impl<H> Default for Debounce<H> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<H> Debounce<H> {
    pub fn rearm(&mut self, cancel: impl FnOnce(H), arm: impl FnOnce() -> Option<H>) {
        if let Some(handle) = self.pending.take() {
            cancel(handle);
        }
        self.pending = arm();
    }

    /// Called from the timer callback once it has run.
    pub fn fired(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_scheduler_ignores_redundant_calls() {
        let mut s = ManualScheduler::default();
        s.start();
        s.start();
        s.stop();
        s.stop();
        assert_eq!((s.starts, s.stops, s.is_active()), (1, 1, false));
    }

    #[test]
    fn interval_callbacks_become_ticks() {
        let mut timer = TickTimer::new(ManualScheduler::default());
        assert_eq!(timer.on_interval(0.0), None, "not armed yet");
        timer.start(1_000.0);
        assert_eq!(timer.on_interval(1_100.0), Some(Command::Tick(0.1)));
        assert_eq!(timer.on_interval(1_350.0), Some(Command::Tick(0.25)));
        assert_eq!(timer.on_interval(1_350.0), None);
    }

    #[test]
    fn game_over_disarms_and_live_round_rearms() {
        let mut timer = TickTimer::new(ManualScheduler::default());
        let live = GameState::initial();
        timer.sync(&live, 0.0);
        assert!(timer.is_running());

        let over = GameState { game_over: true, ..GameState::initial() };
        timer.sync(&over, 500.0);
        assert!(!timer.is_running());
        assert_eq!(timer.on_interval(600.0), None, "stale callback after game over");

        timer.sync(&live, 700.0);
        assert!(timer.is_running());
        assert_eq!(timer.on_interval(800.0), Some(Command::Tick(0.1)));
        assert_eq!((timer.scheduler().starts, timer.scheduler().stops), (2, 1));
    }

    #[test]
    fn debounce_cancels_the_earlier_timeout() {
        let mut pose_reset = Debounce::default();
        let mut cancelled = Vec::new();
        pose_reset.rearm(|h| cancelled.push(h), || Some(1));
        pose_reset.rearm(|h| cancelled.push(h), || Some(2));
        assert_eq!(cancelled, vec![1]);
        assert!(pose_reset.is_pending());

        pose_reset.fired();
        pose_reset.rearm(|h| cancelled.push(h), || Some(3));
        assert_eq!(cancelled, vec![1], "a fired timeout is not cancelled again");
    }
}
