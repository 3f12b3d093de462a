use serde::{Deserialize, Serialize};

use crate::layout_engine::{Direction, Orientation};

/// Integer screen rectangle. `y` grows downward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 { self.x.saturating_add(self.width) }

    pub fn bottom(&self) -> i32 { self.y.saturating_add(self.height) }

    pub fn is_empty(&self) -> bool { self.width <= 0 || self.height <= 0 }

    pub fn center(&self) -> Point {
        Point {
            x: f64::from(self.x) + f64::from(self.width) / 2.0,
            y: f64::from(self.y) + f64::from(self.height) / 2.0,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= f64::from(self.x)
            && point.x < f64::from(self.right())
            && point.y >= f64::from(self.y)
            && point.y < f64::from(self.bottom())
    }

    /// Length of the rectangle along `orientation`'s main axis.
    pub fn extent(&self, orientation: Orientation) -> i32 {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }

    /// Shrinks every edge by `amount`, never producing a negative size.
    /// Coordinates saturate at the edges of the `i32` range.
    pub fn inset(&self, amount: i32) -> Rect {
        let twice = amount.saturating_mul(2);
        let width = self.width.saturating_sub(twice).max(0);
        let height = self.height.saturating_sub(twice).max(0);
        Rect::new(self.x.saturating_add(amount), self.y.saturating_add(amount), width, height)
    }

    /// A rectangle of `width`x`height` centered on this one.
    pub fn centered(&self, width: i32, height: i32) -> Rect {
        Rect::new(
            self.x.saturating_add(self.width.saturating_sub(width) / 2),
            self.y.saturating_add(self.height.saturating_sub(height) / 2),
            width,
            height,
        )
    }
}

impl Point {
    /// Distance from `self` to `candidate` along `direction`, if `candidate` lies that way.
    pub fn directional_delta(&self, direction: Direction, candidate: &Point) -> Option<f64> {
        let delta = match direction {
            Direction::Left => self.x - candidate.x,
            Direction::Right => candidate.x - self.x,
            Direction::Up => self.y - candidate.y,
            Direction::Down => candidate.y - self.y,
        };
        if delta > 0.0 { Some(delta) } else { None }
    }

    /// Offset on the axis perpendicular to `direction`.
    pub fn cross_delta(&self, direction: Direction, candidate: &Point) -> f64 {
        match direction.orientation() {
            Orientation::Horizontal => (self.y - candidate.y).abs(),
            Orientation::Vertical => (self.x - candidate.x).abs(),
        }
    }
}
