//! Parameter selection: builds the trailing `--` parameter suffix for one attempt.
//!
//! Every choice is an independent weighted draw:
//! - aspect ratio: 3:2 (70%), 16:9 (20%), 2:3 (10%)
//! - stylization:  50 (25%), 250 (25%), omitted (50%)
//! - style raw:    present with probability 25%
//! - no logo:      always present
//!
//! Rendering order is fixed: `--ar`, `--s`, `--style raw`, `--no logo`.

use std::fmt;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix shared by every parameter marker.
pub const MARKER_PREFIX: &str = "--";
pub const ASPECT_RATIO_MARKER: &str = "--ar";
pub const STYLIZE_MARKER: &str = "--s";
pub const STYLE_MARKER: &str = "--style";
pub const NO_MARKER: &str = "--no";
/// Canonical rendering of the no-logo marker.
pub const NO_LOGO: &str = "--no logo";

/// Parameter keys recognised when cleaning up candidate text.
pub const MARKER_KEYS: &[&str] = &[
    ASPECT_RATIO_MARKER,
    STYLIZE_MARKER,
    STYLE_MARKER,
    NO_MARKER,
];

const ASPECT_RATIO_WEIGHTS: [(AspectRatio, u32); 3] = [
    (AspectRatio::Landscape, 70),
    (AspectRatio::Wide, 20),
    (AspectRatio::Portrait, 10),
];

const STYLIZATION_WEIGHTS: [(Option<Stylization>, u32); 3] = [
    (Some(Stylization::Low), 25),
    (Some(Stylization::High), 25),
    (None, 50),
];

const STYLE_RAW_PROBABILITY: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 3:2
    Landscape,
    /// 16:9
    Wide,
    /// 2:3
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "3:2",
            AspectRatio::Wide => "16:9",
            AspectRatio::Portrait => "2:3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stylization {
    /// --s 50
    Low,
    /// --s 250
    High,
}

impl Stylization {
    pub fn value(self) -> u32 {
        match self {
            Stylization::Low => 50,
            Stylization::High => 250,
        }
    }
}

/// The trailing parameter block appended to every accepted prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSuffix {
    pub aspect_ratio: AspectRatio,
    pub stylization: Option<Stylization>,
    pub style_raw: bool,
}

impl ParameterSuffix {
    /// Draws a fresh suffix from `rng`.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            aspect_ratio: weighted_pick(rng, &ASPECT_RATIO_WEIGHTS),
            stylization: weighted_pick(rng, &STYLIZATION_WEIGHTS),
            style_raw: rng.gen_bool(STYLE_RAW_PROBABILITY),
        }
    }

    /// The no-logo marker is part of every suffix.
    pub fn no_logo(&self) -> bool {
        true
    }
}

impl fmt::Display for ParameterSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", ASPECT_RATIO_MARKER, self.aspect_ratio.as_str())?;
        if let Some(stylization) = self.stylization {
            write!(f, " {} {}", STYLIZE_MARKER, stylization.value())?;
        }
        if self.style_raw {
            write!(f, " {} raw", STYLE_MARKER)?;
        }
        write!(f, " {}", NO_LOGO)
    }
}

fn weighted_pick<R: Rng + ?Sized, T: Copy>(rng: &mut R, table: &[(T, u32)]) -> T {
    // Weight tables are non-empty constants with positive weights.
    let index = WeightedIndex::new(table.iter().map(|(_, w)| *w))
        .map(|dist| dist.sample(rng))
        .unwrap_or(0);
    table[index].0
}
