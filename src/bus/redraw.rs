use tracing::{debug, warn};

use crate::common::collections::HashSet;
use crate::common::config::GapSettings;
use crate::layout_engine::refresh_subtree;
use crate::model::container::WindowState;
use crate::model::tree::NodeId;
use crate::model::wm_state::WmState;
use crate::sys::{Platform, PlatformError};

/// Containers whose geometry is stale. Marking is idempotent and the
/// order of first marking is preserved.
#[derive(Clone, Debug, Default)]
pub struct RedrawScheduler {
    pending: Vec<NodeId>,
    seen: HashSet<NodeId>,
}

impl RedrawScheduler {
    pub fn mark(&mut self, id: NodeId) {
        if self.seen.insert(id) {
            self.pending.push(id);
        }
    }

    pub fn contains(&self, id: NodeId) -> bool { self.seen.contains(&id) }

    pub fn len(&self) -> usize { self.pending.len() }

    pub fn is_empty(&self) -> bool { self.pending.is_empty() }

    pub fn drain(&mut self) -> Vec<NodeId> {
        self.seen.clear();
        std::mem::take(&mut self.pending)
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct FlushReport {
    /// Subtrees that were laid out.
    pub laid_out: Vec<NodeId>,
    /// Native windows that received a frame.
    pub applied: usize,
    pub errors: Vec<PlatformError>,
}

/// Lays out every flagged container and pushes the resulting frames to the
/// platform.
///
/// Dead containers and containers under another flagged container are
/// skipped. Platform failures are collected; the tree keeps the computed
/// geometry either way.
pub fn flush(state: &mut WmState, gaps: &GapSettings, platform: &mut dyn Platform) -> FlushReport {
    let mut report = FlushReport::default();
    let flagged: Vec<NodeId> =
        state.redraw.drain().into_iter().filter(|&id| state.tree.is_attached(id)).collect();
    if flagged.is_empty() {
        return report;
    }

    let mut targets: Vec<NodeId> = Vec::new();
    for &id in &flagged {
        if flagged.iter().any(|&other| other != id && state.tree.is_descendant_of(id, other)) {
            continue;
        }
        if let Some(laid_out) = refresh_subtree(&mut state.tree, id, gaps) {
            if !targets.contains(&laid_out) {
                targets.push(laid_out);
            }
        }
    }
    // A refresh may have escalated to an ancestor of an earlier target.
    let roots: Vec<NodeId> = targets
        .iter()
        .copied()
        .filter(|&t| !targets.iter().any(|&o| o != t && state.tree.is_descendant_of(t, o)))
        .collect();

    for &target in &roots {
        for window in state.tree.windows_in(target) {
            let Some(node) = state.tree.find_by_id(window) else {
                continue;
            };
            let Some(data) = node.as_window() else {
                continue;
            };
            let visible = data.state != WindowState::Minimized
                && state.tree.workspace_of(window).is_some_and(|ws| state.is_displayed(ws));
            match platform.set_frame(data.handle, node.rect, visible) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!(handle = %data.handle, %err, "failed to apply window frame");
                    report.errors.push(err);
                }
            }
        }
    }
    debug!(flagged = flagged.len(), laid_out = roots.len(), applied = report.applied, "redraw flushed");
    report.laid_out = roots;
    report
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::container::WindowHandle;
    use crate::model::tree::tests::{add_window, tree_with_workspace};
    use crate::layout_engine::Orientation;
    use crate::sys::Headless;
    use crate::sys::geometry::Rect;

    fn state_with_windows() -> (WmState, NodeId, NodeId, NodeId) {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        (WmState::from_tree(tree), ws, a, b)
    }

    #[test]
    fn marking_is_idempotent_and_ordered() {
        let (_, ws, a, b) = state_with_windows();
        let mut scheduler = RedrawScheduler::default();
        scheduler.mark(b);
        scheduler.mark(ws);
        scheduler.mark(b);
        scheduler.mark(a);
        assert_eq!(scheduler.len(), 3);
        assert!(scheduler.contains(ws));
        assert_eq!(scheduler.drain(), vec![b, ws, a]);
        assert!(scheduler.is_empty());
        assert!(!scheduler.contains(ws));
    }

    #[test]
    fn flush_lays_out_each_subtree_once() {
        let (mut state, ws, a, b) = state_with_windows();
        let mut platform = Headless::new();
        state.mark_redraw(a);
        state.mark_redraw(ws);
        state.mark_redraw(b);

        let report = flush(&mut state, &GapSettings::default(), &mut platform);

        assert_eq!(report.laid_out, vec![ws]);
        assert_eq!(report.applied, 2);
        assert_eq!(platform.last_frame(WindowHandle(1)).unwrap().frame, Rect::new(0, 0, 500, 500));
        assert_eq!(platform.last_frame(WindowHandle(2)).unwrap().frame, Rect::new(500, 0, 500, 500));
        assert!(platform.frames().iter().all(|f| f.visible));
        assert!(state.redraw.is_empty());
    }

    #[test]
    fn flush_skips_destroyed_containers() {
        let (mut state, _ws, a, _b) = state_with_windows();
        let mut platform = Headless::new();
        state.mark_redraw(a);
        state.tree.destroy(a).unwrap();

        let report = flush(&mut state, &GapSettings::default(), &mut platform);

        assert_eq!(report, FlushReport::default());
        assert!(platform.frames().is_empty());
    }

    #[test]
    fn platform_errors_are_collected_without_stopping() {
        let (mut state, ws, _a, _b) = state_with_windows();
        let mut platform = Headless::new();
        platform.fail_for(WindowHandle(1));
        state.mark_redraw(ws);

        let report = flush(&mut state, &GapSettings::default(), &mut platform);

        assert_eq!(report.errors, vec![PlatformError::WindowGone(WindowHandle(1))]);
        assert_eq!(report.applied, 1);
    }
}
