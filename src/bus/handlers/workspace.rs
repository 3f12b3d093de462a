use tracing::{debug, info};

use super::HandlerResult;
use crate::bus::{CommandError, ResponsePayload, WmEvent};
use crate::common::config::Config;
use crate::layout_engine::Orientation;
use crate::model::container::{Container, Split, WindowState};
use crate::model::tree::NodeId;
use crate::model::wm_state::WmState;

pub(super) struct WorkspaceCommandHandler;

impl WorkspaceCommandHandler {
    /// Sets the axis new windows are added along next to the focused window.
    ///
    /// A lone child just re-orients its parent. Otherwise the focused window
    /// is wrapped in a new split with the requested orientation.
    pub fn handle_set_tiling_direction(
        state: &mut WmState,
        orientation: Orientation,
    ) -> HandlerResult {
        let focused = state
            .focused_window()
            .filter(|&w| state.window_state(w) == Some(WindowState::Tiling));
        let Some(window) = focused else {
            let Some(workspace) = state.focused_workspace() else {
                return Ok(None);
            };
            return reorient(state, workspace, orientation);
        };
        let Some(parent) = state.tree.parent_of(window) else {
            return Ok(None);
        };
        if state.tree.resizable_children(parent).len() <= 1 {
            return reorient(state, parent, orientation);
        }
        if state.tree.find_by_id(parent).and_then(|n| n.orientation()) == Some(orientation) {
            return Ok(None);
        }

        let split = state.tree.create(Container::Split(Split { orientation }));
        state.tree.replace(window, split)?;
        state.tree.insert_child(split, window, 0)?;
        state.mark_redraw(parent);
        debug!(?window, %orientation, "wrapped window in a new split");
        state.emit(WmEvent::TilingDirectionChanged { container: split.to_raw(), orientation });
        Ok(None)
    }

    pub fn handle_toggle_tiling_direction(state: &mut WmState) -> HandlerResult {
        let container = state
            .focused_window()
            .filter(|&w| state.window_state(w) == Some(WindowState::Tiling))
            .and_then(|w| state.tree.parent_of(w))
            .or_else(|| state.focused_workspace());
        let Some(current) =
            container.and_then(|c| state.tree.find_by_id(c)).and_then(|n| n.orientation())
        else {
            return Ok(None);
        };
        Self::handle_set_tiling_direction(state, current.toggled())
    }

    pub fn handle_focus_workspace(state: &mut WmState, config: &Config, name: &str) -> HandlerResult {
        let workspace = match state.workspace_by_name(name) {
            Some(ws) => ws,
            None => activate_workspace(state, config, name)?,
        };
        state.display_workspace(workspace)?;
        if let Some(monitor) = state.tree.parent_of(workspace) {
            state.set_focused_monitor(monitor);
        }
        let window = state.last_focused_in(workspace);
        state.set_focused_window(window);
        Ok(state.workspace_data(workspace).map(ResponsePayload::Workspace))
    }

    pub fn handle_move_to_workspace(
        state: &mut WmState,
        config: &Config,
        name: &str,
    ) -> HandlerResult {
        let Some(window) = state.focused_window() else {
            return Ok(None);
        };
        let Some(source) = state.tree.workspace_of(window) else {
            return Ok(None);
        };
        let target = match state.workspace_by_name(name) {
            Some(ws) => ws,
            None => activate_workspace(state, config, name)?,
        };
        if target == source {
            return Ok(None);
        }

        let index = state.tree.children_of(target).len();
        state.tree.move_to(window, target, index)?;
        state.mark_redraw(source);
        state.mark_redraw(target);
        info!(?window, workspace = name, "moved window to workspace");

        if state.is_displayed(target) {
            state.set_focused_window(Some(window));
        } else {
            let next = state.last_focused_in(source);
            if let Some(monitor) = state.tree.parent_of(source) {
                state.set_focused_monitor(monitor);
            }
            state.set_focused_window(next);
        }
        Ok(None)
    }

    /// Removes workspaces that are empty, hidden, not kept alive by config
    /// and not the last one on their monitor. Returns whether any went away.
    pub fn cleanup_workspaces(state: &mut WmState, config: &Config) -> Result<bool, CommandError> {
        let mut removed = false;
        for monitor in state.tree.monitors().to_vec() {
            for workspace in state.tree.children_of(monitor).to_vec() {
                let Some(name) = state.workspace_name(workspace).map(str::to_string) else {
                    continue;
                };
                let disposable = state.tree.children_of(workspace).is_empty()
                    && !state.is_displayed(workspace)
                    && !config.keep_alive(&name)
                    && state.tree.children_of(monitor).len() > 1;
                if !disposable {
                    continue;
                }
                state.tree.destroy(workspace)?;
                debug!(workspace = name, "removed empty workspace");
                state.emit(WmEvent::WorkspaceDeactivated { id: workspace.to_raw(), name });
                removed = true;
            }
        }
        Ok(removed)
    }
}

fn reorient(state: &mut WmState, container: NodeId, orientation: Orientation) -> HandlerResult {
    let node = state.tree.node_mut(container)?;
    if node.orientation() == Some(orientation) || !node.set_orientation(orientation) {
        return Ok(None);
    }
    state.mark_redraw(container);
    state.emit(WmEvent::TilingDirectionChanged { container: container.to_raw(), orientation });
    Ok(None)
}

/// Creates workspace `name` on the monitor the config binds it to, or on the
/// focused monitor.
pub(super) fn activate_workspace(
    state: &mut WmState,
    config: &Config,
    name: &str,
) -> Result<NodeId, CommandError> {
    let settings = config.workspace_config(name);
    let monitor = settings
        .and_then(|ws| ws.bind_to_monitor)
        .and_then(|i| state.tree.monitors().get(i).copied())
        .or_else(|| state.focused_monitor())
        .ok_or(CommandError::NoMonitor)?;
    let orientation = settings
        .and_then(|ws| ws.orientation)
        .unwrap_or(config.settings.default_orientation);
    info!(workspace = name, "activating workspace");
    Ok(state.create_workspace(name, monitor, orientation)?)
}
