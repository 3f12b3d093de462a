use tracing::{debug, info};

use super::{HandlerResult, resolve_window};
use crate::bus::{CommandError, ContainerRef, ResponsePayload, WmEvent};
use crate::common::config::Config;
use crate::layout_engine::{
    Dimension, LengthUnit, ResizeAmount, ResizeOutcome, layout_region, resize,
};
use crate::model::container::{Container, InsertionTarget, Window, WindowHandle, WindowState};
use crate::model::tree::NodeId;
use crate::model::wm_state::WmState;
use crate::sys::geometry::Rect;

pub(super) struct ManageRequest {
    pub handle: WindowHandle,
    pub process_name: String,
    pub class_name: String,
    pub title: String,
    pub frame: Option<Rect>,
    pub initial_state: Option<WindowState>,
}

pub(super) struct WindowCommandHandler;

impl WindowCommandHandler {
    pub fn handle_manage_window(
        state: &mut WmState,
        config: &Config,
        request: ManageRequest,
    ) -> HandlerResult {
        if state.window_by_handle(request.handle).is_some() {
            return Err(CommandError::WindowAlreadyManaged(request.handle));
        }
        let workspace = state.focused_workspace().ok_or(CommandError::NoMonitor)?;
        let initial_state = request.initial_state.unwrap_or_default();
        let window = state.tree.create(Container::Window(Window {
            handle: request.handle,
            process_name: request.process_name,
            class_name: request.class_name,
            title: request.title,
            state: initial_state,
            floating_rect: request.frame,
            insertion_target: None,
        }));

        let parent = if initial_state == WindowState::Tiling {
            let (parent, index) = tiling_insertion_point(state, workspace);
            state.tree.insert_child(parent, window, index)?;
            parent
        } else {
            let index = state.tree.children_of(workspace).len();
            state.tree.insert_child(workspace, window, index)?;
            ensure_floating_rect(state, window, config);
            window
        };
        state.mark_redraw(parent);

        let data = state
            .window_data(window)
            .ok_or_else(|| CommandError::InvariantViolated("new window vanished".into()))?;
        info!(handle = %request.handle, state = %initial_state, "managing window");
        state.emit(WmEvent::WindowManaged { window: data });
        state.set_focused_window(Some(window));
        Ok(state.window_data(window).map(ResponsePayload::Window))
    }

    pub fn handle_unmanage_window(state: &mut WmState, handle: WindowHandle) -> HandlerResult {
        let window = state.window_by_handle(handle).ok_or(CommandError::WindowNotFound(handle))?;
        let workspace = state.tree.workspace_of(window);
        let was_focused = state.focused_window() == Some(window);

        state.tree.destroy(window)?;
        if let Some(ws) = workspace {
            state.mark_redraw(ws);
        }
        info!(%handle, "unmanaged window");
        state.emit(WmEvent::WindowUnmanaged { id: window.to_raw(), handle });

        if was_focused {
            let next = workspace.and_then(|ws| state.last_focused_in(ws));
            state.set_focused_window(next);
        }
        state.forget_window(window);
        Ok(None)
    }

    pub fn handle_window_focused(state: &mut WmState, handle: WindowHandle) -> HandlerResult {
        let window = state.window_by_handle(handle).ok_or(CommandError::WindowNotFound(handle))?;
        state.set_focused_window(Some(window));
        Ok(None)
    }

    /// The platform reports a window that moved on its own. Floating windows
    /// keep the new placement and follow it to another monitor. A tiling
    /// window that was dragged larger or smaller resizes against its
    /// siblings by the same number of pixels; either way it is then put back
    /// where the layout wants it.
    pub fn handle_window_moved_or_resized(
        state: &mut WmState,
        handle: WindowHandle,
        frame: Rect,
    ) -> HandlerResult {
        let window = state.window_by_handle(handle).ok_or(CommandError::WindowNotFound(handle))?;
        match state.window_state(window) {
            Some(WindowState::Floating) => {
                let node = state.tree.node_mut(window)?;
                node.rect = frame;
                if let Some(w) = node.as_window_mut() {
                    w.floating_rect = Some(frame);
                }
                let center = frame.center();
                let current = state.tree.monitor_of(window);
                let landed = state.tree.monitors().iter().copied().find(|&m| {
                    state.tree.find_by_id(m).is_some_and(|n| n.rect.contains(center))
                });
                if let (Some(current), Some(landed)) = (current, landed) {
                    if current != landed {
                        if let Some(target) = state.displayed_workspace(landed) {
                            let index = state.tree.children_of(target).len();
                            state.tree.move_to(window, target, index)?;
                            if state.focused_window() == Some(window) {
                                state.set_focused_monitor(landed);
                            }
                            debug!(%handle, "floating window moved to another monitor");
                        }
                    }
                }
            }
            Some(WindowState::Tiling) => {
                let current = state.tree.node(window)?.rect;
                let deltas = [
                    (Dimension::Width, frame.width.saturating_sub(current.width)),
                    (Dimension::Height, frame.height.saturating_sub(current.height)),
                ];
                for (dimension, delta) in deltas {
                    if delta == 0 || current.is_empty() {
                        continue;
                    }
                    let amount = ResizeAmount { value: f64::from(delta), unit: LengthUnit::Pixels };
                    if let ResizeOutcome::Resized { parent, .. } =
                        resize(&mut state.tree, window, dimension, &amount)?
                    {
                        state.mark_redraw(parent);
                    }
                }
                state.mark_redraw(window);
            }
            _ => {}
        }
        Ok(None)
    }

    pub fn handle_resize(
        state: &mut WmState,
        target: Option<ContainerRef>,
        dimension: Dimension,
        amount: String,
    ) -> HandlerResult {
        let amount: ResizeAmount =
            amount.parse().map_err(|_| CommandError::InvalidResizeAmount(amount))?;
        let Some(target) = super::resolve_target(state, target)? else {
            return Ok(None);
        };
        match resize(&mut state.tree, target, dimension, &amount)? {
            ResizeOutcome::Resized { parent, .. } => state.mark_redraw(parent),
            ResizeOutcome::Unchanged => debug!(?target, %amount, "resize had no effect"),
        }
        Ok(None)
    }

    pub fn handle_set_window_state(
        state: &mut WmState,
        target: Option<ContainerRef>,
        new_state: WindowState,
    ) -> HandlerResult {
        let Some(window) = resolve_window(state, target)? else {
            return Ok(None);
        };
        let Some(previous) = state.window_state(window) else {
            return Err(CommandError::NotAWindow(window.to_raw()));
        };
        if previous == new_state {
            return Ok(None);
        }
        let workspace = state.tree.workspace_of(window).ok_or_else(|| {
            CommandError::InvariantViolated(format!("window {window:?} is outside a workspace"))
        })?;

        if previous == WindowState::Tiling {
            leave_tiling(state, window, workspace, new_state)?;
        } else if new_state == WindowState::Tiling {
            enter_tiling(state, window, workspace)?;
        } else {
            set_state(state, window, new_state)?;
            state.mark_redraw(window);
        }

        if let Some(data) = state.window_data(window) {
            state.emit(WmEvent::WindowStateChanged { window: data, previous });
        }
        Ok(None)
    }

    /// Switches to `state`, or back to tiling when the window is already in it.
    pub fn handle_toggle_window_state(
        state: &mut WmState,
        target: Option<ContainerRef>,
        toggled: WindowState,
    ) -> HandlerResult {
        let Some(window) = resolve_window(state, target)? else {
            return Ok(None);
        };
        let next = if state.window_state(window) == Some(toggled) {
            WindowState::Tiling
        } else {
            toggled
        };
        Self::handle_set_window_state(state, Some(ContainerRef::Id(window.to_raw())), next)
    }
}

/// Where a new tiling window goes: right after the focused tiling window of
/// the workspace, or at the end of the workspace.
pub(super) fn tiling_insertion_point(state: &WmState, workspace: NodeId) -> (NodeId, usize) {
    let anchor = state
        .focused_window()
        .filter(|&w| state.tree.workspace_of(w) == Some(workspace))
        .filter(|&w| state.window_state(w) == Some(WindowState::Tiling))
        .or_else(|| state.last_focused_tiling_in(workspace));
    match anchor.and_then(|a| Some((state.tree.parent_of(a)?, state.tree.index_of(a)?))) {
        Some((parent, index)) => (parent, index + 1),
        None => (workspace, state.tree.children_of(workspace).len()),
    }
}

fn set_state(state: &mut WmState, window: NodeId, new_state: WindowState) -> Result<(), CommandError> {
    let node = state.tree.node_mut(window)?;
    let Some(data) = node.as_window_mut() else {
        return Err(CommandError::NotAWindow(window.to_raw()));
    };
    data.state = new_state;
    Ok(())
}

fn ensure_floating_rect(state: &mut WmState, window: NodeId, config: &Config) {
    let has_rect = state
        .tree
        .find_by_id(window)
        .and_then(|n| n.as_window())
        .is_some_and(|w| w.floating_rect.is_some());
    if has_rect {
        return;
    }
    let area = state
        .tree
        .workspace_of(window)
        .and_then(|ws| layout_region(&state.tree, ws, &config.settings.gaps))
        .map(|(_, rect)| rect)
        .unwrap_or_default();
    let rect = area.centered(area.width * 2 / 3, area.height * 2 / 3);
    if let Some(w) = state.tree.get_mut(window).and_then(|n| n.as_window_mut()) {
        w.floating_rect = Some(rect);
    }
}

fn leave_tiling(
    state: &mut WmState,
    window: NodeId,
    workspace: NodeId,
    new_state: WindowState,
) -> Result<(), CommandError> {
    let parent = state.tree.parent_of(window).ok_or_else(|| {
        CommandError::InvariantViolated(format!("window {window:?} has no parent"))
    })?;
    let index = state.tree.index_of(window).unwrap_or(0);
    let node = state.tree.node(window)?;
    let (tiled_rect, weight) = (node.rect, node.weight);
    if let Some(w) = state.tree.get_mut(window).and_then(|n| n.as_window_mut()) {
        w.insertion_target = Some(InsertionTarget { parent, index, weight });
        if w.floating_rect.is_none() && !tiled_rect.is_empty() {
            w.floating_rect = Some(tiled_rect);
        }
    }
    // Detached as a tiling window, reattached as a floating one.
    let target_index = state.tree.children_of(workspace).len();
    state.tree.detach(window)?;
    set_state(state, window, new_state)?;
    state.tree.insert_child(workspace, window, target_index)?;
    state.mark_redraw(workspace);
    Ok(())
}

fn enter_tiling(state: &mut WmState, window: NodeId, workspace: NodeId) -> Result<(), CommandError> {
    let remembered = state
        .tree
        .find_by_id(window)
        .and_then(|n| n.as_window())
        .and_then(|w| w.insertion_target)
        .filter(|t| {
            state.tree.is_attached(t.parent)
                && state.tree.workspace_of(t.parent) == Some(workspace)
                && state.tree.find_by_id(t.parent).is_some_and(|n| n.orientation().is_some())
        });

    state.tree.detach(window)?;
    set_state(state, window, WindowState::Tiling)?;
    if let Some(w) = state.tree.get_mut(window).and_then(|n| n.as_window_mut()) {
        w.insertion_target = None;
    }
    // Back in its old slot, the window also gets its old share back.
    let parent = match remembered {
        Some(target) => {
            state.tree.insert_child_with_weight(target.parent, window, target.index, target.weight)?;
            target.parent
        }
        None => {
            let (parent, index) = tiling_insertion_point(state, workspace);
            state.tree.insert_child(parent, window, index)?;
            parent
        }
    };
    state.mark_redraw(parent);
    Ok(())
}
