use tracing::{info, warn};

use super::HandlerResult;
use crate::bus::{CommandError, ResponsePayload, WmEvent};
use crate::common::config::Config;
use crate::model::container::{Container, Monitor, MonitorHandle};
use crate::model::wm_state::WmState;
use crate::sys::geometry::Rect;

pub(super) struct MonitorCommandHandler;

impl MonitorCommandHandler {
    /// Registers a new monitor and gives it a workspace to display, plus any
    /// kept-alive workspaces the config binds to it.
    pub fn handle_add_monitor(
        state: &mut WmState,
        config: &Config,
        handle: MonitorHandle,
        frame: Rect,
    ) -> HandlerResult {
        if state.monitor_by_handle(handle).is_some() {
            return Err(CommandError::MonitorAlreadyExists(handle));
        }
        let position = state.tree.monitors().len();
        let monitor = state
            .tree
            .create(Container::Monitor(Monitor { handle, displayed_workspace: None }));
        state.tree.node_mut(monitor)?.rect = frame;
        let root = state.tree.root();
        state.tree.insert_child(root, monitor, position)?;
        info!(%handle, ?frame, "monitor added");

        let orientation_for = |name: &str| {
            config
                .workspace_config(name)
                .and_then(|ws| ws.orientation)
                .unwrap_or(config.settings.default_orientation)
        };
        let first = initial_workspace_name(state, config, position);
        let first_ws = state.create_workspace(&first, monitor, orientation_for(&first))?;
        for ws in &config.workspaces {
            let bound_here = ws.bind_to_monitor == Some(position);
            if bound_here && ws.keep_alive && state.workspace_by_name(&ws.name).is_none() {
                state.create_workspace(&ws.name, monitor, orientation_for(&ws.name))?;
            }
        }
        state.display_workspace(first_ws)?;

        if let Some(data) = state.monitor_data(monitor) {
            state.emit(WmEvent::MonitorAdded { monitor: data });
        }
        if position == 0 {
            state.set_focused_monitor(monitor);
        }
        state.mark_redraw(monitor);
        Ok(state.monitor_data(monitor).map(ResponsePayload::Monitor))
    }

    /// Moves every workspace of the monitor onto the first remaining one.
    /// The last monitor is never removed.
    pub fn handle_remove_monitor(state: &mut WmState, handle: MonitorHandle) -> HandlerResult {
        let monitor = state.monitor_by_handle(handle).ok_or(CommandError::MonitorNotFound(handle))?;
        let Some(target) = state.tree.monitors().iter().copied().find(|&m| m != monitor) else {
            warn!(%handle, "ignoring removal of the last monitor");
            return Ok(None);
        };
        let had_focus = state.focused_monitor() == Some(monitor);

        for workspace in state.tree.children_of(monitor).to_vec() {
            let index = state.tree.children_of(target).len();
            state.tree.move_to(workspace, target, index)?;
        }
        if state.displayed_workspace(target).is_none() {
            if let Some(&first) = state.tree.children_of(target).first() {
                state.display_workspace(first)?;
            }
        }
        state.tree.destroy(monitor)?;
        info!(%handle, "monitor removed");
        state.emit(WmEvent::MonitorRemoved { id: monitor.to_raw(), handle });
        state.mark_redraw(target);

        if had_focus {
            state.set_focused_monitor(target);
            let window = state.displayed_workspace(target).and_then(|ws| state.last_focused_in(ws));
            state.set_focused_window(window);
        }
        Ok(None)
    }

    pub fn handle_update_monitor(
        state: &mut WmState,
        handle: MonitorHandle,
        frame: Rect,
    ) -> HandlerResult {
        let monitor = state.monitor_by_handle(handle).ok_or(CommandError::MonitorNotFound(handle))?;
        let node = state.tree.node_mut(monitor)?;
        if node.rect == frame {
            return Ok(None);
        }
        node.rect = frame;
        state.mark_redraw(monitor);
        if let Some(data) = state.monitor_data(monitor) {
            state.emit(WmEvent::MonitorUpdated { monitor: data });
        }
        Ok(None)
    }
}

/// First configured workspace bound to monitor `position` that does not
/// exist yet, then the first unused unbound one, then the smallest unused
/// positive number.
fn initial_workspace_name(state: &WmState, config: &Config, position: usize) -> String {
    let unused = |name: &str| state.workspace_by_name(name).is_none();
    config
        .workspaces
        .iter()
        .find(|ws| ws.bind_to_monitor == Some(position) && unused(&ws.name))
        .or_else(|| {
            config.workspaces.iter().find(|ws| ws.bind_to_monitor.is_none() && unused(&ws.name))
        })
        .map(|ws| ws.name.clone())
        .unwrap_or_else(|| {
            (1..).map(|n: u32| n.to_string()).find(|name| unused(name)).unwrap_or_default()
        })
}
