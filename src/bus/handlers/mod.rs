mod focus;
mod general;
mod monitor;
mod window;
mod workspace;

use focus::FocusCommandHandler;
use general::GeneralCommandHandler;
use monitor::MonitorCommandHandler;
use tracing::trace;
use window::{ManageRequest, WindowCommandHandler};
use workspace::WorkspaceCommandHandler;

use super::{Command, CommandError, ContainerRef, ResponsePayload, WmEvent};
use crate::common::config::Config;
use crate::model::tree::NodeId;
use crate::model::wm_state::WmState;

pub(super) type HandlerResult = Result<Option<ResponsePayload>, CommandError>;

pub(super) fn dispatch(state: &mut WmState, config: &mut Config, command: Command) -> HandlerResult {
    trace!(command = command.name(), "dispatching");
    match command {
        Command::ManageWindow {
            handle,
            process_name,
            class_name,
            title,
            frame,
            state: initial_state,
        } => WindowCommandHandler::handle_manage_window(state, config, ManageRequest {
            handle,
            process_name,
            class_name,
            title,
            frame,
            initial_state,
        }),
        Command::UnmanageWindow { handle } => {
            WindowCommandHandler::handle_unmanage_window(state, handle)
        }
        Command::WindowFocused { handle } => {
            WindowCommandHandler::handle_window_focused(state, handle)
        }
        Command::WindowMovedOrResized { handle, frame } => {
            WindowCommandHandler::handle_window_moved_or_resized(state, handle, frame)
        }
        Command::Resize { target, dimension, amount } => {
            WindowCommandHandler::handle_resize(state, target, dimension, amount)
        }
        Command::SetWindowState { target, state: window_state } => {
            WindowCommandHandler::handle_set_window_state(state, target, window_state)
        }
        Command::ToggleWindowState { target, state: window_state } => {
            WindowCommandHandler::handle_toggle_window_state(state, target, window_state)
        }
        Command::Focus { direction } => FocusCommandHandler::handle_focus(state, direction),
        Command::Move { direction } => FocusCommandHandler::handle_move(state, direction),
        Command::SetTilingDirection { orientation } => {
            WorkspaceCommandHandler::handle_set_tiling_direction(state, orientation)
        }
        Command::ToggleTilingDirection => {
            WorkspaceCommandHandler::handle_toggle_tiling_direction(state)
        }
        Command::FocusWorkspace { name } => {
            WorkspaceCommandHandler::handle_focus_workspace(state, config, &name)
        }
        Command::MoveToWorkspace { name } => {
            WorkspaceCommandHandler::handle_move_to_workspace(state, config, &name)
        }
        Command::AddMonitor { handle, frame } => {
            MonitorCommandHandler::handle_add_monitor(state, config, handle, frame)
        }
        Command::RemoveMonitor { handle } => {
            MonitorCommandHandler::handle_remove_monitor(state, handle)
        }
        Command::UpdateMonitor { handle, frame } => {
            MonitorCommandHandler::handle_update_monitor(state, handle, frame)
        }
        Command::Redraw => GeneralCommandHandler::handle_redraw(state),
        Command::ReloadConfig { config: new_config } => {
            GeneralCommandHandler::handle_reload_config(state, config, *new_config)
        }
    }
}

/// Runs event reactions in the order events were raised, then removes
/// workspaces that are no longer needed. Reactions may raise further
/// events; the cascade is bounded by `max_event_cascade`.
pub(super) fn settle(state: &mut WmState, config: &Config) -> Result<(), CommandError> {
    let limit = state.events.len() + config.settings.max_event_cascade;
    let mut cursor = 0;
    loop {
        while cursor < state.events.len() {
            if cursor >= limit {
                return Err(CommandError::InvariantViolated(format!(
                    "event cascade did not settle after {} reactions",
                    config.settings.max_event_cascade
                )));
            }
            let event = state.events[cursor].clone();
            react(state, &event)?;
            cursor += 1;
        }
        if !WorkspaceCommandHandler::cleanup_workspaces(state, config)? {
            return Ok(());
        }
    }
}

fn react(state: &mut WmState, event: &WmEvent) -> Result<(), CommandError> {
    match event {
        WmEvent::FocusChanged { focused: Some(window) } => {
            let id = NodeId::from_raw(window.id);
            if let Some(ws) = state.tree.workspace_of(id) {
                if !state.is_displayed(ws) {
                    trace!(?ws, "showing workspace of newly focused window");
                    state.display_workspace(ws)?;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Resolves an explicit target, or the focused window when there is none.
/// `Ok(None)` means nothing is focused.
pub(super) fn resolve_target(
    state: &WmState,
    target: Option<ContainerRef>,
) -> Result<Option<NodeId>, CommandError> {
    match target {
        None => Ok(state.focused_window()),
        Some(ContainerRef::Id(raw)) => {
            let id = NodeId::from_raw(raw);
            if state.tree.is_attached(id) {
                Ok(Some(id))
            } else {
                Err(CommandError::ContainerNotFound(raw))
            }
        }
        Some(ContainerRef::Window(handle)) => state
            .window_by_handle(handle)
            .map(Some)
            .ok_or(CommandError::WindowNotFound(handle)),
    }
}

/// Like [`resolve_target`] but the result must be a window.
pub(super) fn resolve_window(
    state: &WmState,
    target: Option<ContainerRef>,
) -> Result<Option<NodeId>, CommandError> {
    let Some(id) = resolve_target(state, target)? else {
        return Ok(None);
    };
    if state.window_state(id).is_none() {
        return Err(CommandError::NotAWindow(id.to_raw()));
    }
    Ok(Some(id))
}
