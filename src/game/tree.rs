// Tree trunk segments, branch generation and the collision rule.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

/// Which side of a trunk slice carries a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchSide {
    Left,
    Right,
    None,
}

/// Which side of the trunk the player stands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSide {
    Left,
    Right,
}

impl PlayerSide {
    pub fn opposite(self) -> Self {
        match self {
            PlayerSide::Left => PlayerSide::Right,
            PlayerSide::Right => PlayerSide::Left,
        }
    }

    /// -1.0 for left, 1.0 for right (screen x axis).
    pub fn sign(self) -> f64 {
        match self {
            PlayerSide::Left => -1.0,
            PlayerSide::Right => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerSide::Left => "left",
            PlayerSide::Right => "right",
        }
    }
}

impl From<PlayerSide> for BranchSide {
    fn from(side: PlayerSide) -> Self {
        match side {
            PlayerSide::Left => BranchSide::Left,
            PlayerSide::Right => BranchSide::Right,
        }
    }
}

/// One vertical slice of the trunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSegment {
    pub branch_side: BranchSide,
}

impl TreeSegment {
    pub const fn new(branch_side: BranchSide) -> Self {
        Self { branch_side }
    }
}

// Bucket bounds for a uniform sample in [0, 1).
const LEFT_BELOW: f64 = 0.3;
const RIGHT_BELOW: f64 = 0.6;

/// Cycle used instead of random draws once test mode is latched.
const DETERMINISTIC_CYCLE: [BranchSide; 4] = [
    BranchSide::Left,
    BranchSide::None,
    BranchSide::Right,
    BranchSide::None,
];

/// Maps a uniform sample to a branch side. 0.3 and 0.6 belong to the upper bucket.
pub fn branch_for_sample(r: f64) -> BranchSide {
    if r < LEFT_BELOW {
        BranchSide::Left
    } else if r < RIGHT_BELOW {
        BranchSide::Right
    } else {
        BranchSide::None
    }
}

/// Source of uniform samples in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl RandomSource for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

/// Always yields the same sample.
#[derive(Clone, Copy, Debug)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

/// Replays a list of samples, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor = (self.cursor + 1) % self.values.len();
        v
    }
}

type ModeProbe = Box<dyn FnOnce() -> bool>;

/// Procedural branch generator.
///
/// Deterministic mode is a one-way latch: it is switched on either explicitly
/// with [`BranchGenerator::enable_test_mode`] or by the optional mode probe,
/// which runs at most once (lazily, on first use) and whose answer is cached.
pub struct BranchGenerator {
    source: Box<dyn RandomSource>,
    probe: Option<ModeProbe>,
    deterministic: bool,
    cursor: usize,
}

impl BranchGenerator {
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            probe: None,
            deterministic: false,
            cursor: 0,
        }
    }

    /// Generator seeded from the platform entropy source.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn with_mode_probe(mut self, probe: impl FnOnce() -> bool + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn enable_test_mode(&mut self) {
        if !self.deterministic {
            debug!("branch generator latched into deterministic mode");
        }
        self.deterministic = true;
        self.probe = None;
    }

    pub fn is_test_mode(&mut self) -> bool {
        if let Some(probe) = self.probe.take() {
            if probe() {
                self.enable_test_mode();
            }
        }
        self.deterministic
    }

    pub fn generate_random_branch(&mut self) -> TreeSegment {
        if self.is_test_mode() {
            let side = DETERMINISTIC_CYCLE[self.cursor % DETERMINISTIC_CYCLE.len()];
            self.cursor = (self.cursor + 1) % DETERMINISTIC_CYCLE.len();
            return TreeSegment::new(side);
        }
        TreeSegment::new(branch_for_sample(self.source.next_unit()))
    }
}

impl fmt::Debug for BranchGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchGenerator")
            .field("deterministic", &self.deterministic)
            .field("probe_pending", &self.probe.is_some())
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Shifts the window by one: drops the bottom segment and appends a fresh one.
pub fn add_new_segment_to_tree(
    segments: &[TreeSegment],
    generator: &mut BranchGenerator,
) -> Vec<TreeSegment> {
    let mut next = Vec::with_capacity(segments.len());
    next.extend_from_slice(segments.get(1..).unwrap_or_default());
    next.push(generator.generate_random_branch());
    next
}

/// A chop from `side` collides when the incoming segment (index 1) has a branch on that side.
pub fn check_collision(side: PlayerSide, segments: &[TreeSegment]) -> bool {
    segments
        .get(1)
        .is_some_and(|seg| seg.branch_side == BranchSide::from(side))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn seg(side: BranchSide) -> TreeSegment {
        TreeSegment::new(side)
    }

    #[test]
    fn fixed_samples_land_in_their_bucket() {
        for (sample, expected) in [
            (0.2, BranchSide::Left),
            (0.4, BranchSide::Right),
            (0.8, BranchSide::None),
        ] {
            let mut generator = BranchGenerator::new(FixedRandom(sample));
            for _ in 0..20 {
                assert_eq!(generator.generate_random_branch().branch_side, expected);
            }
        }
    }

    #[test]
    fn bucket_boundaries_belong_to_the_next_bucket() {
        assert_eq!(branch_for_sample(0.0), BranchSide::Left);
        assert_eq!(branch_for_sample(0.3), BranchSide::Right);
        assert_eq!(branch_for_sample(0.6), BranchSide::None);
        assert_eq!(branch_for_sample(0.999), BranchSide::None);
    }

    #[test]
    fn add_segment_shifts_window() {
        let mut generator = BranchGenerator::new(FixedRandom(0.8));
        let start = [seg(BranchSide::Left), seg(BranchSide::Right), seg(BranchSide::None)];
        let next = add_new_segment_to_tree(&start, &mut generator);
        assert_eq!(
            next,
            vec![seg(BranchSide::Right), seg(BranchSide::None), seg(BranchSide::None)]
        );
    }

    #[test]
    fn collision_only_against_incoming_segment() {
        let segments = [seg(BranchSide::Left), seg(BranchSide::Right), seg(BranchSide::Left)];
        assert!(check_collision(PlayerSide::Right, &segments));
        assert!(!check_collision(PlayerSide::Left, &segments));
        let clear = [seg(BranchSide::Right), seg(BranchSide::None)];
        assert!(!check_collision(PlayerSide::Right, &clear));
        assert!(!check_collision(PlayerSide::Left, &clear));
        assert!(!check_collision(PlayerSide::Left, &[seg(BranchSide::Left)]));
    }

    #[test]
    fn deterministic_mode_cycles_and_ignores_source() {
        let mut generator = BranchGenerator::new(FixedRandom(0.8));
        generator.enable_test_mode();
        let sides: Vec<_> = (0..6)
            .map(|_| generator.generate_random_branch().branch_side)
            .collect();
        assert_eq!(
            sides,
            vec![
                BranchSide::Left,
                BranchSide::None,
                BranchSide::Right,
                BranchSide::None,
                BranchSide::Left,
                BranchSide::None,
            ]
        );
    }

    #[test]
    fn mode_probe_runs_once_and_latches() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut generator = BranchGenerator::new(FixedRandom(0.8)).with_mode_probe(move || {
            counter.set(counter.get() + 1);
            true
        });
        assert_eq!(calls.get(), 0, "probe must be lazy");
        for _ in 0..5 {
            generator.generate_random_branch();
        }
        assert_eq!(calls.get(), 1);
        assert!(generator.is_test_mode());
    }

    #[test]
    fn negative_probe_keeps_random_mode() {
        let mut generator = BranchGenerator::new(FixedRandom(0.2)).with_mode_probe(|| false);
        assert_eq!(generator.generate_random_branch().branch_side, BranchSide::Left);
        assert!(!generator.is_test_mode());
    }

    #[test]
    fn sequence_random_wraps() {
        let mut src = SequenceRandom::new(vec![0.1, 0.5]);
        assert_eq!([src.next_unit(), src.next_unit(), src.next_unit()], [0.1, 0.5, 0.1]);
    }
}
