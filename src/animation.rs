//! Fly-off animations for chopped segments.
//!
//! Motion is purely a function of `now - start_time`: constant horizontal
//! speed in the segment's direction plus a constant spin. An entry expires
//! when it has run longer than `FLY_OFF_DURATION_MS` or has left the
//! horizontal bounds, whichever happens first.

use std::collections::HashSet;
use std::fmt;

use tracing::trace;

use crate::game::{AnimatedSegment, BOARD_WIDTH, BranchSide};
use crate::schedule::Scheduler;

pub const FLY_OFF_DURATION_MS: f64 = 1_000.0;
pub const FLY_OFF_SPEED: f64 = 900.0; // game px per second
pub const FLY_OFF_SPIN: f64 = 540.0; // degrees per second
pub const FLY_OFF_MIN_X: f64 = -150.0;
pub const FLY_OFF_MAX_X: f64 = BOARD_WIDTH + 150.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlyOffPose {
    pub x: f64,
    pub y: f64,
    pub rotation_deg: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
    Elapsed,
    OutOfBounds,
}

fn elapsed_ms(seg: &AnimatedSegment, now_ms: f64) -> f64 {
    (now_ms - seg.start_time).max(0.0)
}

pub fn fly_off_pose(seg: &AnimatedSegment, now_ms: f64) -> FlyOffPose {
    let secs = elapsed_ms(seg, now_ms) / 1000.0;
    let sign = seg.direction.sign();
    FlyOffPose {
        x: seg.start_position.x + sign * FLY_OFF_SPEED * secs,
        y: seg.start_position.y,
        rotation_deg: sign * FLY_OFF_SPIN * secs,
    }
}

pub fn expiry(seg: &AnimatedSegment, now_ms: f64) -> Option<Expiry> {
    if elapsed_ms(seg, now_ms) > FLY_OFF_DURATION_MS {
        return Some(Expiry::Elapsed);
    }
    let x = fly_off_pose(seg, now_ms).x;
    if !(FLY_OFF_MIN_X..=FLY_OFF_MAX_X).contains(&x) {
        return Some(Expiry::OutOfBounds);
    }
    None
}

/// Pose of one live fly-off for the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveFlyOff {
    pub id: String,
    pub branch_side: BranchSide,
    pub pose: FlyOffPose,
}

type RemovalCallback = Box<dyn FnMut(&str, Expiry)>;

/// Tracks in-flight fly-offs and owns the frame scheduler that animates them.
/// The scheduler runs exactly while at least one entry is active.
pub struct FlyOffTracker<S: Scheduler> {
    scheduler: S,
    active: Vec<AnimatedSegment>,
    // Expired here but possibly still present in the snapshot.
    retired: HashSet<String>,
    on_removed: Option<RemovalCallback>,
}

impl<S: Scheduler> FlyOffTracker<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            active: Vec::new(),
            retired: HashSet::new(),
            on_removed: None,
        }
    }

    /// Invoked once per expired id so the owning snapshot can drop it.
    pub fn set_on_removed(&mut self, callback: impl FnMut(&str, Expiry) + 'static) {
        self.on_removed = Some(Box::new(callback));
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Mirrors the snapshot's fly-off list: adopts new ids, forgets ids the
    /// snapshot no longer carries (e.g. after a reset).
    pub fn sync(&mut self, segments: &[AnimatedSegment]) {
        let present = |id: &str| segments.iter().any(|s| s.animation_id == id);
        self.retired.retain(|id| present(id));
        self.active.retain(|a| present(&a.animation_id));
        for seg in segments {
            let known = self.retired.contains(&seg.animation_id)
                || self.active.iter().any(|a| a.animation_id == seg.animation_id);
            if !known {
                trace!(id = %seg.animation_id, "fly-off adopted");
                self.active.push(seg.clone());
            }
        }
        self.update_scheduler();
    }

    pub fn poses(&self, now_ms: f64) -> Vec<ActiveFlyOff> {
        self.active
            .iter()
            .map(|seg| ActiveFlyOff {
                id: seg.animation_id.clone(),
                branch_side: seg.branch_side,
                pose: fly_off_pose(seg, now_ms),
            })
            .collect()
    }

    /// One animation frame: expires finished entries, then returns the poses
    /// of the survivors. Stops the scheduler when nothing is left.
    pub fn frame(&mut self, now_ms: f64) -> Vec<ActiveFlyOff> {
        let mut expired = Vec::new();
        self.active.retain(|seg| match expiry(seg, now_ms) {
            Some(reason) => {
                expired.push((seg.animation_id.clone(), reason));
                false
            }
            None => true,
        });
        for (id, reason) in expired {
            trace!(%id, ?reason, "fly-off expired");
            if let Some(cb) = self.on_removed.as_mut() {
                cb(&id, reason);
            }
            self.retired.insert(id);
        }
        self.update_scheduler();
        self.poses(now_ms)
    }

    fn update_scheduler(&mut self) {
        if self.active.is_empty() {
            self.scheduler.stop();
        } else {
            self.scheduler.start();
        }
    }
}

impl<S: Scheduler> fmt::Debug for FlyOffTracker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlyOffTracker")
            .field("active", &self.active.len())
            .field("retired", &self.retired.len())
            .field("running", &self.scheduler.is_active())
            .finish()
    }
}
