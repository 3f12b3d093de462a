mod engine;
pub mod resize;

pub use engine::{allocate_extents, compute_layout, layout_region, refresh_subtree};
pub use resize::{LengthUnit, ResizeAmount, ResizeOutcome, resize};
use serde::{Deserialize, Serialize};

/// Smallest weight a resizable container may be squeezed to.
pub const MIN_WEIGHT: f64 = 0.01;

/// Tolerance used when checking that sibling weights sum to one.
pub const WEIGHT_EPSILON: f64 = 1e-6;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Right and down walk toward higher child indices.
    pub fn is_forward(self) -> bool { matches!(self, Direction::Right | Direction::Down) }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Dimension {
    Width,
    Height,
}

impl Dimension {
    /// The split orientation whose main axis this dimension measures.
    pub fn orientation(self) -> Orientation {
        match self {
            Dimension::Width => Orientation::Horizontal,
            Dimension::Height => Orientation::Vertical,
        }
    }
}
