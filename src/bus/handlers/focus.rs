use tracing::debug;

use super::HandlerResult;
use crate::layout_engine::{Direction, Orientation};
use crate::model::container::{ContainerKind, WindowState};
use crate::model::tree::NodeId;
use crate::model::wm_state::WmState;

pub(super) struct FocusCommandHandler;

impl FocusCommandHandler {
    /// Focuses the closest window in `direction`, crossing to the next
    /// monitor at the workspace edge. Tiling windows move through the tree;
    /// floating and fullscreen windows pick the nearest window on screen.
    pub fn handle_focus(state: &mut WmState, direction: Direction) -> HandlerResult {
        let target = match state.focused_window() {
            Some(w) if state.window_state(w) == Some(WindowState::Tiling) => {
                tiling_neighbor(state, w, direction)
                    .and_then(|container| state.last_focused_tiling_in(container))
            }
            Some(w) => spatial_neighbor(state, w, direction),
            None => None,
        };
        if let Some(target) = target {
            state.set_focused_window(Some(target));
            return Ok(None);
        }

        let Some(from) = state.focused_monitor() else {
            return Ok(None);
        };
        let Some(monitor) = monitor_in_direction(state, from, direction) else {
            debug!(%direction, "nothing to focus in that direction");
            return Ok(None);
        };
        let window = state.displayed_workspace(monitor).and_then(|ws| state.last_focused_in(ws));
        state.set_focused_monitor(monitor);
        state.set_focused_window(window);
        Ok(None)
    }

    /// Moves the focused tiling window one step in `direction`: swapping with
    /// a sibling window, entering a sibling split, leaving its split for the
    /// nearest ancestor laid out on that axis, or crossing to the next monitor.
    pub fn handle_move(state: &mut WmState, direction: Direction) -> HandlerResult {
        let Some(window) = state.focused_window() else {
            return Ok(None);
        };
        if state.window_state(window) != Some(WindowState::Tiling) {
            return Ok(None);
        }
        let axis = direction.orientation();
        let forward = direction.is_forward();
        let (Some(parent), Some(workspace)) =
            (state.tree.parent_of(window), state.tree.workspace_of(window))
        else {
            return Ok(None);
        };

        if orientation_of(state, parent) == Some(axis) {
            let siblings = state.tree.resizable_children(parent);
            let neighbor = siblings.iter().position(|&c| c == window).and_then(|i| {
                let j = if forward { i.checked_add(1) } else { i.checked_sub(1) }?;
                siblings.get(j).copied()
            });
            if let Some(neighbor) = neighbor {
                if state.window_state(neighbor).is_some() {
                    state.tree.swap_siblings(window, neighbor)?;
                } else {
                    let index = if forward { 0 } else { state.tree.children_of(neighbor).len() };
                    state.tree.move_to(window, neighbor, index)?;
                }
                state.mark_redraw(workspace);
                return Ok(None);
            }
        }

        // Leave for the closest ancestor laid out on the same axis.
        let mut child = parent;
        for ancestor in state.tree.ancestors(parent).collect::<Vec<_>>() {
            let Some(orientation) = orientation_of(state, ancestor) else {
                break;
            };
            if orientation == axis {
                let Some(anchor) = state.tree.index_of(child) else {
                    break;
                };
                let index = if forward { anchor + 1 } else { anchor };
                state.tree.move_to(window, ancestor, index)?;
                state.mark_redraw(workspace);
                return Ok(None);
            }
            if ancestor == workspace {
                break;
            }
            child = ancestor;
        }

        let Some(from) = state.tree.monitor_of(window) else {
            return Ok(None);
        };
        let Some(target) = monitor_in_direction(state, from, direction)
            .and_then(|m| state.displayed_workspace(m))
        else {
            debug!(%direction, "window is already at the edge");
            return Ok(None);
        };
        let index = if forward { 0 } else { state.tree.children_of(target).len() };
        state.tree.move_to(window, target, index)?;
        state.mark_redraw(workspace);
        state.mark_redraw(target);
        state.set_focused_window(Some(window));
        Ok(None)
    }
}

fn orientation_of(state: &WmState, id: NodeId) -> Option<Orientation> {
    state.tree.find_by_id(id).and_then(|n| n.orientation())
}

/// The sibling subtree next to `from` in `direction`, searching upward
/// through ancestors laid out on that axis. Stops at the workspace.
pub(super) fn tiling_neighbor(state: &WmState, from: NodeId, direction: Direction) -> Option<NodeId> {
    let mut node = from;
    for ancestor in state.tree.ancestors(from) {
        let parent = state.tree.find_by_id(ancestor)?;
        let orientation = parent.orientation()?;
        if orientation == direction.orientation() {
            let siblings = state.tree.resizable_children(ancestor);
            if let Some(i) = siblings.iter().position(|&c| c == node) {
                let next = if direction.is_forward() { i.checked_add(1) } else { i.checked_sub(1) };
                if let Some(&neighbor) = next.and_then(|j| siblings.get(j)) {
                    return Some(neighbor);
                }
            }
        }
        if parent.kind() == ContainerKind::Workspace {
            return None;
        }
        node = ancestor;
    }
    None
}

/// Closest window of `from`'s workspace whose center lies in `direction`
/// from `from`'s center. Minimized windows are skipped.
fn spatial_neighbor(state: &WmState, from: NodeId, direction: Direction) -> Option<NodeId> {
    let workspace = state.tree.workspace_of(from)?;
    let origin = state.tree.find_by_id(from)?.rect.center();
    state
        .tree
        .windows_in(workspace)
        .into_iter()
        .filter(|&w| w != from && state.window_state(w) != Some(WindowState::Minimized))
        .filter_map(|w| {
            let center = state.tree.find_by_id(w)?.rect.center();
            let delta = origin.directional_delta(direction, &center)?;
            Some((w, delta, origin.cross_delta(direction, &center)))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)))
        .map(|(w, ..)| w)
}

/// Nearest monitor whose center lies in `direction` from `from`'s center.
pub(super) fn monitor_in_direction(
    state: &WmState,
    from: NodeId,
    direction: Direction,
) -> Option<NodeId> {
    let origin = state.tree.find_by_id(from)?.rect.center();
    state
        .tree
        .monitors()
        .iter()
        .copied()
        .filter(|&m| m != from)
        .filter_map(|m| {
            let center = state.tree.find_by_id(m)?.rect.center();
            let delta = origin.directional_delta(direction, &center)?;
            Some((m, delta, origin.cross_delta(direction, &center)))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)))
        .map(|(m, ..)| m)
}
