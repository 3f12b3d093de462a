use tracing::trace;

use super::Orientation;
use crate::common::config::GapSettings;
use crate::model::container::{Container, WindowState};
use crate::model::tree::{NodeId, Tree};
use crate::sys::geometry::Rect;

/// Splits `total` pixels across `weights` with the largest-remainder method.
///
/// Every entry gets the floor of its exact share; the leftover pixels go one
/// each to the entries with the biggest fractional parts, lower index first on
/// ties. The result always sums to `total` (clamped at zero).
pub fn allocate_extents(total: i32, weights: &[f64]) -> Vec<i32> {
    if weights.is_empty() {
        return Vec::new();
    }
    let total = total.max(0);
    let sum: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    let exact: Vec<f64> = weights
        .iter()
        .map(|&w| {
            if sum > 0.0 {
                f64::from(total) * w.max(0.0) / sum
            } else {
                f64::from(total) / weights.len() as f64
            }
        })
        .collect();
    let mut extents: Vec<i32> = exact.iter().map(|e| e.floor() as i32).collect();
    let assigned: i32 = extents.iter().sum();

    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &i in order.iter().cycle().take((total - assigned).max(0) as usize) {
        extents[i] += 1;
    }
    extents
}

/// Assigns rectangles to `id` and everything below it, given the space the
/// node has to work with.
pub fn compute_layout(tree: &mut Tree, id: NodeId, available: Rect, gaps: &GapSettings) {
    let Some(node) = tree.find_by_id(id) else {
        return;
    };
    match &node.container {
        Container::Root => {
            for monitor in tree.monitors().to_vec() {
                let rect = tree.find_by_id(monitor).map(|m| m.rect).unwrap_or_default();
                compute_layout(tree, monitor, rect, gaps);
            }
        }
        Container::Monitor(_) => {
            let workspace_rect = available.inset(gaps.outer);
            if let Some(node) = tree.get_mut(id) {
                node.rect = available;
            }
            for workspace in tree.children_of(id).to_vec() {
                compute_layout(tree, workspace, workspace_rect, gaps);
            }
        }
        Container::Workspace(_) | Container::Split(_) => {
            if let Some(node) = tree.get_mut(id) {
                node.rect = available;
            }
            lay_out_children(tree, id, available, gaps);
        }
        Container::Window(_) => place_window(tree, id, available),
    }
}

fn lay_out_children(tree: &mut Tree, id: NodeId, rect: Rect, gaps: &GapSettings) {
    let Some(orientation) = tree.find_by_id(id).and_then(|n| n.orientation()) else {
        return;
    };
    let tiling = tree.resizable_children(id);
    if !tiling.is_empty() {
        let weights: Vec<f64> = tiling
            .iter()
            .map(|&c| tree.find_by_id(c).map_or(0.0, |n| n.weight))
            .collect();
        let gaps_between = i32::try_from(tiling.len() - 1).unwrap_or(i32::MAX);
        let gap_total = gaps.inner.saturating_mul(gaps_between);
        let extents =
            allocate_extents(rect.extent(orientation).saturating_sub(gap_total), &weights);
        let mut offset = match orientation {
            Orientation::Horizontal => rect.x,
            Orientation::Vertical => rect.y,
        };
        for (&child, extent) in tiling.iter().zip(extents) {
            let child_rect = match orientation {
                Orientation::Horizontal => Rect::new(offset, rect.y, extent, rect.height),
                Orientation::Vertical => Rect::new(rect.x, offset, rect.width, extent),
            };
            offset = offset.saturating_add(extent).saturating_add(gaps.inner);
            compute_layout(tree, child, child_rect, gaps);
        }
    }
    for child in tree.children_of(id).to_vec() {
        if !tiling.contains(&child) {
            place_window(tree, child, rect);
        }
    }
}

fn place_window(tree: &mut Tree, id: NodeId, tiled: Rect) {
    let monitor_rect = tree.monitor_of(id).and_then(|m| tree.find_by_id(m)).map(|m| m.rect);
    let Some(node) = tree.get_mut(id) else {
        return;
    };
    let Some(window) = node.as_window() else {
        return;
    };
    let rect = match window.state {
        WindowState::Tiling => tiled,
        WindowState::Floating => window.floating_rect.unwrap_or(tiled),
        WindowState::Maximized | WindowState::Fullscreen => monitor_rect.unwrap_or(tiled),
        WindowState::Minimized => node.rect,
    };
    trace!(?id, ?rect, state = %window.state, "placed window");
    node.rect = rect;
}

/// Finds the node to lay out when `id` needs a refresh, together with the
/// rectangle it should be given. Tiling containers that were never laid out
/// defer to their parent.
pub fn layout_region(tree: &Tree, id: NodeId, gaps: &GapSettings) -> Option<(NodeId, Rect)> {
    let node = tree.find_by_id(id)?;
    match &node.container {
        Container::Root => Some((id, Rect::default())),
        Container::Monitor(_) => Some((id, node.rect)),
        Container::Workspace(_) => {
            let monitor = tree.find_by_id(tree.parent_of(id)?)?;
            Some((id, monitor.rect.inset(gaps.outer)))
        }
        Container::Split(_) | Container::Window(_) if node.is_resizable() => {
            if node.rect.is_empty() {
                layout_region(tree, tree.parent_of(id)?, gaps)
            } else {
                Some((id, node.rect))
            }
        }
        Container::Split(_) | Container::Window(_) => {
            let workspace = tree.workspace_of(id)?;
            let (_, rect) = layout_region(tree, workspace, gaps)?;
            Some((id, rect))
        }
    }
}

/// Recomputes the layout around `id`. Returns the node that was laid out.
pub fn refresh_subtree(tree: &mut Tree, id: NodeId, gaps: &GapSettings) -> Option<NodeId> {
    let (target, rect) = layout_region(tree, id, gaps)?;
    compute_layout(tree, target, rect, gaps);
    Some(target)
}
