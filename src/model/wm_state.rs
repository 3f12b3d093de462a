use tracing::trace;

use super::container::{Container, MonitorHandle, WindowHandle, WindowState, Workspace};
use super::tree::{NodeId, Tree, TreeError};
use crate::bus::event::WmEvent;
use crate::bus::redraw::RedrawScheduler;
use crate::layout_engine::Orientation;

/// The whole mutable world a command operates on.
///
/// The bus clones this before each command and restores the clone if the
/// command fails, so everything here must be plain owned data.
#[derive(Clone, Debug, Default)]
pub struct WmState {
    pub tree: Tree,
    focused_window: Option<NodeId>,
    focused_monitor: Option<NodeId>,
    /// Most recently focused first.
    focus_order: Vec<NodeId>,
    pub(crate) redraw: RedrawScheduler,
    pub(crate) events: Vec<WmEvent>,
}

impl WmState {
    pub fn new() -> Self { Self::default() }

    pub fn from_tree(tree: Tree) -> Self {
        let focused_monitor = tree.monitors().first().copied();
        Self { tree, focused_monitor, ..Self::default() }
    }

    pub fn focused_window(&self) -> Option<NodeId> { self.focused_window }

    /// The monitor that owns the focused window, or the last monitor focus
    /// was moved to, or the first monitor.
    pub fn focused_monitor(&self) -> Option<NodeId> {
        self.focused_window
            .and_then(|w| self.tree.monitor_of(w))
            .or(self.focused_monitor.filter(|&m| self.tree.contains(m)))
            .or_else(|| self.tree.monitors().first().copied())
    }

    pub fn focused_workspace(&self) -> Option<NodeId> {
        self.focused_window
            .and_then(|w| self.tree.workspace_of(w))
            .or_else(|| self.displayed_workspace(self.focused_monitor()?))
    }

    pub fn window_by_handle(&self, handle: WindowHandle) -> Option<NodeId> {
        self.tree
            .windows_in(self.tree.root())
            .into_iter()
            .find(|&w| self.tree.find_by_id(w).and_then(|n| n.as_window()).is_some_and(|w| w.handle == handle))
    }

    pub fn monitor_by_handle(&self, handle: MonitorHandle) -> Option<NodeId> {
        self.tree.monitors().iter().copied().find(|&m| {
            self.tree.find_by_id(m).and_then(|n| n.as_monitor()).is_some_and(|m| m.handle == handle)
        })
    }

    pub fn workspace_by_name(&self, name: &str) -> Option<NodeId> {
        self.tree.workspaces().into_iter().find(|&ws| {
            self.tree.find_by_id(ws).and_then(|n| n.as_workspace()).is_some_and(|w| w.name == name)
        })
    }

    pub fn workspace_name(&self, workspace: NodeId) -> Option<&str> {
        self.tree.find_by_id(workspace)?.as_workspace().map(|ws| ws.name.as_str())
    }

    pub fn window_state(&self, window: NodeId) -> Option<WindowState> {
        self.tree.find_by_id(window)?.as_window().map(|w| w.state)
    }

    pub fn displayed_workspace(&self, monitor: NodeId) -> Option<NodeId> {
        self.tree.find_by_id(monitor)?.as_monitor()?.displayed_workspace
    }

    pub fn is_displayed(&self, workspace: NodeId) -> bool {
        self.tree
            .parent_of(workspace)
            .and_then(|m| self.displayed_workspace(m))
            .is_some_and(|displayed| displayed == workspace)
    }

    pub fn emit(&mut self, event: WmEvent) {
        trace!(topic = event.topic(), "event raised");
        self.events.push(event);
    }

    pub fn pending_events(&self) -> &[WmEvent] { &self.events }

    pub(crate) fn take_events(&mut self) -> Vec<WmEvent> { std::mem::take(&mut self.events) }

    pub fn mark_redraw(&mut self, id: NodeId) { self.redraw.mark(id); }

    pub fn is_redraw_pending(&self, id: NodeId) -> bool { self.redraw.contains(id) }

    /// Moves focus to `window` (or to nothing) and raises `FocusChanged`
    /// when the focus actually changes.
    pub fn set_focused_window(&mut self, window: Option<NodeId>) {
        if let Some(w) = window {
            self.focus_order.retain(|&other| other != w);
            self.focus_order.insert(0, w);
            if let Some(monitor) = self.tree.monitor_of(w) {
                self.focused_monitor = Some(monitor);
            }
        }
        if self.focused_window == window {
            return;
        }
        self.focused_window = window;
        let focused = window.and_then(|w| self.window_data(w));
        self.emit(WmEvent::FocusChanged { focused });
    }

    pub fn set_focused_monitor(&mut self, monitor: NodeId) { self.focused_monitor = Some(monitor); }

    /// Drops a window from focus tracking. Focus is cleared if it was on it.
    pub(crate) fn forget_window(&mut self, window: NodeId) {
        self.focus_order.retain(|&w| w != window);
        if self.focused_window == Some(window) {
            self.focused_window = None;
        }
    }

    /// Most recently focused window under `container`, falling back to the
    /// first window in tree order.
    pub fn last_focused_in(&self, container: NodeId) -> Option<NodeId> {
        self.focus_order
            .iter()
            .copied()
            .find(|&w| w == container || self.tree.is_descendant_of(w, container))
            .or_else(|| self.tree.windows_in(container).into_iter().next())
    }

    /// Most recently focused tiling window under `container`.
    pub fn last_focused_tiling_in(&self, container: NodeId) -> Option<NodeId> {
        let is_tiling = |w: NodeId| self.window_state(w) == Some(WindowState::Tiling);
        self.focus_order
            .iter()
            .copied()
            .filter(|&w| is_tiling(w))
            .find(|&w| w == container || self.tree.is_descendant_of(w, container))
            .or_else(|| self.tree.windows_in(container).into_iter().find(|&w| is_tiling(w)))
    }

    /// Creates a workspace on `monitor` and raises `WorkspaceActivated`.
    pub fn create_workspace(
        &mut self,
        name: &str,
        monitor: NodeId,
        orientation: Orientation,
    ) -> Result<NodeId, TreeError> {
        let ws = self.tree.create(Container::Workspace(Workspace {
            name: name.to_string(),
            orientation,
        }));
        let index = self.tree.children_of(monitor).len();
        if let Err(err) = self.tree.insert_child(monitor, ws, index) {
            let _ = self.tree.destroy(ws);
            return Err(err);
        }
        if let Some(workspace) = self.workspace_data(ws) {
            self.emit(WmEvent::WorkspaceActivated { workspace });
        }
        Ok(ws)
    }

    /// Shows `workspace` on its monitor, hiding whatever was displayed before.
    /// Returns false when it was already displayed.
    pub fn display_workspace(&mut self, workspace: NodeId) -> Result<bool, TreeError> {
        let monitor = self.tree.parent_of(workspace).ok_or(TreeError::Detached(workspace))?;
        let previous = self.displayed_workspace(monitor);
        if previous == Some(workspace) {
            return Ok(false);
        }
        let node = self.tree.node_mut(monitor)?;
        let Some(monitor_data) = node.as_monitor_mut() else {
            return Err(TreeError::Invariant(format!("{workspace:?} is not under a monitor")));
        };
        monitor_data.displayed_workspace = Some(workspace);
        if let Some(previous) = previous {
            self.mark_redraw(previous);
        }
        self.mark_redraw(workspace);
        if let Some(data) = self.workspace_data(workspace) {
            self.emit(WmEvent::WorkspaceFocused { workspace: data });
        }
        Ok(true)
    }

    /// Tree invariants plus focus and display bookkeeping.
    pub fn validate(&self) -> Result<(), TreeError> {
        self.tree.validate()?;
        if let Some(window) = self.focused_window {
            let attached = self.tree.is_attached(window);
            if !attached || self.window_state(window).is_none() {
                return Err(TreeError::Invariant(format!(
                    "focused window {window:?} is not a managed window"
                )));
            }
            if !self.tree.workspace_of(window).is_some_and(|ws| self.is_displayed(ws)) {
                return Err(TreeError::Invariant(format!(
                    "focused window {window:?} is on a hidden workspace"
                )));
            }
        }
        for &monitor in self.tree.monitors() {
            let children = self.tree.children_of(monitor);
            match self.displayed_workspace(monitor) {
                Some(ws) if children.contains(&ws) => {}
                None if children.is_empty() => {}
                displayed => {
                    return Err(TreeError::Invariant(format!(
                        "monitor {monitor:?} displays {displayed:?} which it does not own"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::tree::tests::{add_window, tree_with_workspace};

    #[test]
    fn focus_changes_raise_one_event() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        let mut state = WmState::from_tree(tree);

        state.set_focused_window(Some(a));
        state.set_focused_window(Some(a));
        state.set_focused_window(Some(b));

        let topics: Vec<_> = state.take_events().iter().map(|e| e.topic()).collect();
        assert_eq!(topics, vec!["focus_changed", "focus_changed"]);
        assert_eq!(state.focused_window(), Some(b));
        assert_eq!(state.focused_workspace(), Some(ws));
        assert_eq!(state.last_focused_in(ws), Some(b));
    }

    #[test]
    fn forgetting_the_focused_window_clears_focus() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        let mut state = WmState::from_tree(tree);
        state.set_focused_window(Some(a));
        state.set_focused_window(Some(b));

        state.forget_window(b);

        assert_eq!(state.focused_window(), None);
        assert_eq!(state.last_focused_in(ws), Some(a));
        assert_eq!(state.focused_workspace(), Some(ws));
    }

    #[test]
    fn lookups_by_handle_and_name() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 0x10);
        let state = WmState::from_tree(tree);
        assert_eq!(state.window_by_handle(WindowHandle(0x10)), Some(a));
        assert_eq!(state.window_by_handle(WindowHandle(0x11)), None);
        assert_eq!(state.workspace_by_name("1"), Some(ws));
        assert!(state.monitor_by_handle(MonitorHandle(1)).is_some());
        assert!(state.is_displayed(ws));
        state.validate().unwrap();
    }

    #[test]
    fn displaying_a_workspace_flags_both_sides() {
        let (tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let mut state = WmState::from_tree(tree);
        let monitor = state.tree.parent_of(ws).unwrap();
        let other = state.create_workspace("2", monitor, Orientation::Vertical).unwrap();

        assert_eq!(state.display_workspace(other), Ok(true));
        assert_eq!(state.display_workspace(other), Ok(false));

        assert!(state.is_redraw_pending(ws));
        assert!(state.is_redraw_pending(other));
        assert!(!state.is_displayed(ws));
        let topics: Vec<_> = state.take_events().iter().map(|e| e.topic()).collect();
        assert_eq!(topics, vec!["workspace_activated", "workspace_focused"]);
    }
}
