//! Runtime configuration from URL query parameters.
//!
//! Unknown or unparseable values fall back to defaults without error; a bad
//! link should still load a playable game.

use serde::Serialize;
use tracing::debug;

use crate::game::BranchGenerator;
use crate::viewport::{ScalingOptions, ScalingStrategy};

pub const PARAM_TEST_MODE: &str = "testMode";
pub const PARAM_CHARACTER: &str = "character";
pub const PARAM_SCALING: &str = "scaling";
pub const PARAM_MIN_SCALE: &str = "minScale";
pub const PARAM_MAX_SCALE: &str = "maxScale";
pub const PARAM_MAINTAIN_ASPECT: &str = "maintainAspect";

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Deterministic branch generation for automated runs.
    pub test_mode: bool,
    /// Forced character id; `None` uses the default character.
    pub character: Option<String>,
    pub scaling: ScalingOptions,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_scale(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

impl GameConfig {
    /// Builds a config from a parameter lookup (`UrlSearchParams::get` in the browser).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ScalingOptions::default();
        // A bare `?testMode` arrives as an empty value and still enables it.
        let test_mode = lookup(PARAM_TEST_MODE)
            .map(|v| v.trim().is_empty() || parse_bool(&v).unwrap_or(false))
            .unwrap_or(false);
        let character = lookup(PARAM_CHARACTER)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        let scaling = ScalingOptions {
            strategy: lookup(PARAM_SCALING)
                .and_then(|v| ScalingStrategy::parse(&v))
                .unwrap_or(defaults.strategy),
            min_scale: lookup(PARAM_MIN_SCALE)
                .and_then(|v| parse_scale(&v))
                .unwrap_or(defaults.min_scale),
            max_scale: lookup(PARAM_MAX_SCALE)
                .and_then(|v| parse_scale(&v))
                .unwrap_or(defaults.max_scale),
            maintain_aspect_ratio: lookup(PARAM_MAINTAIN_ASPECT)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.maintain_aspect_ratio),
        }
        .normalized();
        let config = Self { test_mode, character, scaling };
        debug!(?config, "configuration resolved");
        config
    }

    /// Hands `testMode` to the generator as its lazy mode probe, so the
    /// deterministic latch is decided on the first branch drawn.
    pub fn with_test_mode_probe(&self, generator: BranchGenerator) -> BranchGenerator {
        let test_mode = self.test_mode;
        generator.with_mode_probe(move || test_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> GameConfig {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        GameConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_query_gives_defaults() {
        assert_eq!(from_pairs(&[]), GameConfig::default());
    }

    #[test]
    fn all_parameters_are_read() {
        let cfg = from_pairs(&[
            ("testMode", "true"),
            ("character", "ranger"),
            ("scaling", "fit-to-height"),
            ("minScale", "0.5"),
            ("maxScale", "2"),
            ("maintainAspect", "false"),
        ]);
        assert_eq!(
            cfg,
            GameConfig {
                test_mode: true,
                character: Some("ranger".into()),
                scaling: ScalingOptions {
                    strategy: ScalingStrategy::FitToHeight,
                    min_scale: 0.5,
                    max_scale: 2.0,
                    maintain_aspect_ratio: false,
                },
            }
        );
    }

    #[test]
    fn garbage_falls_back_silently() {
        let cfg = from_pairs(&[
            ("testMode", "maybe"),
            ("character", "   "),
            ("scaling", "stretch"),
            ("minScale", "-1"),
            ("maxScale", "NaN"),
            ("maintainAspect", "sometimes"),
        ]);
        assert_eq!(cfg, GameConfig::default());
    }

    #[test]
    fn bare_test_mode_flag_enables_it() {
        assert!(from_pairs(&[("testMode", "")]).test_mode);
        assert!(from_pairs(&[("testMode", "1")]).test_mode);
        assert!(!from_pairs(&[("testMode", "0")]).test_mode);
    }

    #[test]
    fn test_mode_reaches_the_generator_lazily() {
        use crate::game::{BranchSide, FixedRandom};

        let draw = |cfg: &GameConfig| {
            let mut generator = cfg.with_test_mode_probe(BranchGenerator::new(FixedRandom(0.8)));
            (0..4).map(|_| generator.generate_random_branch().branch_side).collect::<Vec<_>>()
        };
        assert_eq!(
            draw(&from_pairs(&[("testMode", "1")])),
            vec![BranchSide::Left, BranchSide::None, BranchSide::Right, BranchSide::None]
        );
        assert_eq!(draw(&from_pairs(&[])), vec![BranchSide::None; 4]);
    }

    #[test]
    fn inverted_bounds_are_reordered() {
        let cfg = from_pairs(&[("minScale", "2.5"), ("maxScale", "0.5")]);
        assert_eq!((cfg.scaling.min_scale, cfg.scaling.max_scale), (0.5, 2.5));
    }
}
