use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{Dimension, MIN_WEIGHT};
use crate::model::container::Container;
use crate::model::tree::{NodeId, Tree, TreeError};

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+))\s*(%|ppt|px)\s*$").expect("valid regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthUnit {
    Percentage,
    Points,
    Pixels,
}

/// A signed resize request such as `+10%`, `-5ppt` or `30px`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeAmount {
    pub value: f64,
    pub unit: LengthUnit,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid resize amount {0:?}")]
pub struct InvalidAmount(pub String);

impl FromStr for ResizeAmount {
    type Err = InvalidAmount;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = AMOUNT_RE.captures(s).ok_or_else(|| InvalidAmount(s.to_string()))?;
        let value: f64 = captures[1].parse().map_err(|_| InvalidAmount(s.to_string()))?;
        if !value.is_finite() {
            return Err(InvalidAmount(s.to_string()));
        }
        let unit = match &captures[2] {
            "%" => LengthUnit::Percentage,
            "ppt" => LengthUnit::Points,
            _ => LengthUnit::Pixels,
        };
        Ok(ResizeAmount { value, unit })
    }
}

impl fmt::Display for ResizeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            LengthUnit::Percentage => "%",
            LengthUnit::Points => "ppt",
            LengthUnit::Pixels => "px",
        };
        write!(f, "{}{}", self.value, unit)
    }
}

impl ResizeAmount {
    /// Converts to a weight delta. Pixels are divided by `scale_extent`, the
    /// combined size of the sibling group along the resized axis.
    pub fn to_proportion(&self, scale_extent: i32) -> Option<f64> {
        match self.unit {
            LengthUnit::Percentage | LengthUnit::Points => Some(self.value / 100.0),
            LengthUnit::Pixels if scale_extent > 0 => Some(self.value / f64::from(scale_extent)),
            LengthUnit::Pixels => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResizeOutcome {
    /// Nothing changed; the caller should not schedule a redraw.
    Unchanged,
    /// `container` gained `delta` weight inside `parent`.
    Resized {
        container: NodeId,
        parent: NodeId,
        delta: f64,
    },
}

/// Grows or shrinks `target` along `dimension` by `amount`.
///
/// If the target's parent is laid out on the other axis, the parent is
/// resized instead. The delta comes out of the resizable siblings in equal
/// parts and is clamped so nobody drops below [`MIN_WEIGHT`].
pub fn resize(
    tree: &mut Tree,
    target: NodeId,
    dimension: Dimension,
    amount: &ResizeAmount,
) -> Result<ResizeOutcome, TreeError> {
    let node = tree.node(target)?;
    if !node.is_resizable() {
        return Ok(ResizeOutcome::Unchanged);
    }
    let Some(parent) = node.parent() else {
        return Ok(ResizeOutcome::Unchanged);
    };

    let axis = dimension.orientation();
    let parent_node = tree.node(parent)?;
    let container = if parent_node.orientation() == Some(axis) {
        target
    } else {
        match parent_node.container {
            Container::Split(_) => parent,
            _ => return Ok(ResizeOutcome::Unchanged),
        }
    };
    let Some(parent) = tree.parent_of(container) else {
        return Ok(ResizeOutcome::Unchanged);
    };

    let siblings = tree.resizable_siblings(container);
    if siblings.is_empty() {
        return Ok(ResizeOutcome::Unchanged);
    }

    let scale_extent: i32 = tree
        .resizable_children(parent)
        .iter()
        .filter_map(|&c| tree.find_by_id(c))
        .map(|n| n.rect.extent(axis))
        .fold(0, i32::saturating_add);
    let Some(requested) = amount.to_proportion(scale_extent) else {
        debug!(?container, "no laid out extent to scale a pixel resize by");
        return Ok(ResizeOutcome::Unchanged);
    };

    let n = siblings.len() as f64;
    let current = tree.node(container)?.weight;
    let mut low = MIN_WEIGHT - current;
    let mut high = 1.0 - MIN_WEIGHT * n - current;
    for &sibling in &siblings {
        let weight = tree.node(sibling)?.weight;
        high = high.min((weight - MIN_WEIGHT) * n);
    }
    low = low.min(0.0);
    high = high.max(0.0);
    let delta = requested.clamp(low, high);
    if delta == 0.0 {
        return Ok(ResizeOutcome::Unchanged);
    }

    tree.node_mut(container)?.weight += delta;
    for sibling in siblings {
        tree.node_mut(sibling)?.weight -= delta / n;
    }
    debug!(?container, ?parent, delta, "resized container");
    Ok(ResizeOutcome::Resized { container, parent, delta })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::{Orientation, compute_layout};
    use crate::common::config::GapSettings;
    use crate::model::tree::tests::{add_split, add_window, tree_with_workspace};
    use crate::sys::geometry::Rect;

    fn weight(tree: &Tree, id: NodeId) -> f64 { tree.find_by_id(id).unwrap().weight }

    fn amount(s: &str) -> ResizeAmount { s.parse().unwrap() }

    #[test]
    fn parses_supported_units() {
        assert_eq!(amount("+10%"), ResizeAmount { value: 10.0, unit: LengthUnit::Percentage });
        assert_eq!(amount("-5ppt"), ResizeAmount { value: -5.0, unit: LengthUnit::Points });
        assert_eq!(amount("30px"), ResizeAmount { value: 30.0, unit: LengthUnit::Pixels });
        assert_eq!(amount(" 2.5 % "), ResizeAmount { value: 2.5, unit: LengthUnit::Percentage });
    }

    #[test]
    fn rejects_garbage() {
        for input in ["abc", "10", "%", "10em", "", "1e5px"] {
            assert_eq!(input.parse::<ResizeAmount>(), Err(InvalidAmount(input.to_string())));
        }
    }

    #[test]
    fn percentage_grows_target_and_shrinks_sibling() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        tree.node_mut(a).unwrap().weight = 0.6;
        tree.node_mut(b).unwrap().weight = 0.4;

        let outcome = resize(&mut tree, a, Dimension::Width, &amount("+20%")).unwrap();

        assert!(matches!(outcome, ResizeOutcome::Resized { container, parent, .. }
            if container == a && parent == ws));
        assert!((weight(&tree, a) - 0.8).abs() < 1e-9);
        assert!((weight(&tree, b) - 0.2).abs() < 1e-9);
        tree.validate().unwrap();
    }

    #[test]
    fn split_under_workspace_resizes_on_its_own_axis_only() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let split = add_split(&mut tree, ws, Orientation::Horizontal);
        let a = add_window(&mut tree, split, 1);
        let b = add_window(&mut tree, split, 2);
        tree.node_mut(a).unwrap().weight = 0.6;
        tree.node_mut(b).unwrap().weight = 0.4;

        assert_eq!(
            resize(&mut tree, a, Dimension::Height, &amount("10%")),
            Ok(ResizeOutcome::Unchanged)
        );
        assert_eq!(weight(&tree, a), 0.6);
        assert_eq!(weight(&tree, split), 1.0);

        let outcome = resize(&mut tree, a, Dimension::Width, &amount("20%")).unwrap();
        assert!(matches!(outcome, ResizeOutcome::Resized { parent, .. } if parent == split));
        assert!((weight(&tree, a) - 0.8).abs() < 1e-9);
        assert!((weight(&tree, b) - 0.2).abs() < 1e-9);
        tree.validate().unwrap();
    }

    #[test]
    fn weights_stay_normalized_through_mixed_edits() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        tree.validate().unwrap();
        let split = add_split(&mut tree, ws, Orientation::Vertical);
        let b = add_window(&mut tree, split, 2);
        let c = add_window(&mut tree, split, 3);
        tree.validate().unwrap();

        resize(&mut tree, a, Dimension::Width, &amount("+15%")).unwrap();
        tree.validate().unwrap();
        resize(&mut tree, b, Dimension::Height, &amount("-30ppt")).unwrap();
        tree.validate().unwrap();
        let d = add_window(&mut tree, ws, 4);
        tree.validate().unwrap();
        resize(&mut tree, d, Dimension::Width, &amount("+90%")).unwrap();
        tree.validate().unwrap();

        assert_eq!(tree.remove_child(split, c), Ok(true));
        tree.validate().unwrap();
        // The split was left with one child and gave its slot to it.
        assert_eq!(tree.parent_of(b), Some(ws));
        assert_eq!(tree.remove_child(ws, a), Ok(true));
        tree.validate().unwrap();
        resize(&mut tree, b, Dimension::Width, &amount("-5%")).unwrap();
        tree.validate().unwrap();

        let total: f64 = tree.children_of(ws).iter().map(|&id| weight(&tree, id)).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(tree.children_of(ws).iter().all(|&id| weight(&tree, id) >= MIN_WEIGHT - 1e-9));
    }

    #[test]
    fn pixels_scale_by_sibling_extent() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        compute_layout(&mut tree, ws, Rect::new(0, 0, 1000, 500), &GapSettings::default());

        resize(&mut tree, a, Dimension::Width, &amount("100px")).unwrap();

        assert!((weight(&tree, a) - 0.6).abs() < 1e-9);
        assert!((weight(&tree, b) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn cross_axis_resize_targets_the_parent_split() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let split = add_split(&mut tree, ws, Orientation::Vertical);
        let b = add_window(&mut tree, split, 2);
        add_window(&mut tree, split, 3);

        let outcome = resize(&mut tree, b, Dimension::Width, &amount("10%")).unwrap();

        assert!(matches!(outcome, ResizeOutcome::Resized { container, .. } if container == split));
        assert!((weight(&tree, split) - 0.6).abs() < 1e-9);
        assert!((weight(&tree, a) - 0.4).abs() < 1e-9);
        assert!((weight(&tree, b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn cross_axis_resize_under_workspace_is_a_no_op() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        add_window(&mut tree, ws, 2);
        assert_eq!(
            resize(&mut tree, a, Dimension::Height, &amount("10%")),
            Ok(ResizeOutcome::Unchanged)
        );
        assert_eq!(weight(&tree, a), 0.5);
    }

    #[test]
    fn lone_container_is_not_resized() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        assert_eq!(
            resize(&mut tree, a, Dimension::Width, &amount("10%")),
            Ok(ResizeOutcome::Unchanged)
        );
        assert_eq!(resize(&mut tree, ws, Dimension::Width, &amount("10%")), Ok(ResizeOutcome::Unchanged));
    }

    #[test]
    fn weights_are_clamped_at_minimum() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);

        resize(&mut tree, a, Dimension::Width, &amount("+500%")).unwrap();

        assert!((weight(&tree, b) - MIN_WEIGHT).abs() < 1e-9);
        assert!((weight(&tree, a) - (1.0 - MIN_WEIGHT)).abs() < 1e-9);
        tree.validate().unwrap();
    }

    #[test]
    fn pixel_resize_without_layout_is_a_no_op() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        add_window(&mut tree, ws, 2);
        assert_eq!(
            resize(&mut tree, a, Dimension::Width, &amount("40px")),
            Ok(ResizeOutcome::Unchanged)
        );
    }
}
