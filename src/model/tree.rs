use slotmap::{Key, KeyData, SlotMap, new_key_type};

use super::container::{Container, ContainerKind, Node};
use crate::layout_engine::{MIN_WEIGHT, WEIGHT_EPSILON};

new_key_type! {
    pub struct NodeId;
}

impl NodeId {
    /// Stable numeric form used in DTOs and on the wire.
    pub fn to_raw(self) -> u64 { self.data().as_ffi() }

    pub fn from_raw(raw: u64) -> Self { KeyData::from_ffi(raw).into() }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("container {0:?} does not exist")]
    NotFound(NodeId),
    #[error("a {child} cannot be placed under a {parent}")]
    InvalidChild {
        parent: ContainerKind,
        child: ContainerKind,
    },
    #[error("container {0:?} already has a parent")]
    AlreadyAttached(NodeId),
    #[error("container {0:?} has no parent")]
    Detached(NodeId),
    #[error("{0}")]
    Invariant(String),
}

/// Arena-backed container hierarchy.
///
/// Nodes refer to each other by [`NodeId`]; a parent owns the ordered list of
/// its children and a child only records its parent's id. Every structural
/// mutation keeps the weights of resizable siblings summing to one and
/// collapses splits that are left with a single child or none.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self { Self::new() }
}

impl Tree {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(Container::Root));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId { self.root }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.len() == 1 }

    /// Allocates a detached node.
    pub fn create(&mut self, container: Container) -> NodeId {
        self.nodes.insert(Node::new(container))
    }

    pub fn find_by_id(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> { self.nodes.get_mut(id) }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(id).ok_or(TreeError::NotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(id).ok_or(TreeError::NotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool { self.nodes.contains_key(id) }

    /// True when `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> { self.nodes.get(id)?.parent }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children_of(parent).iter().position(|&c| c == id)
    }

    pub fn siblings_of(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent_of(id) else {
            return Vec::new();
        };
        self.children_of(parent).iter().copied().filter(|&c| c != id).collect()
    }

    pub fn resizable_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children_of(id)
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].is_resizable())
            .collect()
    }

    pub fn resizable_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent_of(id) else {
            return Vec::new();
        };
        self.resizable_children(parent).into_iter().filter(|&c| c != id).collect()
    }

    /// Parent, grandparent, and so on up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent_of(id), move |&p| self.parent_of(p))
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Pre-order descendants of `id`, not including `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_of(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children_of(next).iter().rev().copied());
        }
        out
    }

    /// `id` itself or its closest ancestor of the given kind.
    pub fn nearest_of_kind(&self, id: NodeId, kind: ContainerKind) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| self.nodes.get(n).is_some_and(|node| node.kind() == kind))
    }

    pub fn workspace_of(&self, id: NodeId) -> Option<NodeId> {
        self.nearest_of_kind(id, ContainerKind::Workspace)
    }

    pub fn monitor_of(&self, id: NodeId) -> Option<NodeId> {
        self.nearest_of_kind(id, ContainerKind::Monitor)
    }

    pub fn monitors(&self) -> &[NodeId] { self.children_of(self.root) }

    pub fn workspaces(&self) -> Vec<NodeId> {
        self.monitors().iter().flat_map(|&m| self.children_of(m).iter().copied()).collect()
    }

    /// Windows in pre-order under `id`, `id` included when it is a window.
    pub fn windows_in(&self, id: NodeId) -> Vec<NodeId> {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter(|&n| self.nodes.get(n).is_some_and(|node| node.as_window().is_some()))
            .collect()
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<(), TreeError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if child == self.root || child_node.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        if !parent_node.container.accepts(&child_node.container) {
            return Err(TreeError::InvalidChild {
                parent: parent_node.kind(),
                child: child_node.kind(),
            });
        }
        let parent_node = &mut self.nodes[parent];
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Attaches a detached `child` at `index` (clamped to the end).
    ///
    /// A resizable child takes a `1/(n+1)` share, subtracted evenly from its
    /// `n` resizable siblings. When an even cut would push a sibling below
    /// [`MIN_WEIGHT`] the siblings are scaled proportionally instead.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), TreeError> {
        self.attach(parent, child, index)?;
        if !self.nodes[child].is_resizable() {
            return Ok(());
        }
        let siblings = self.resizable_siblings(child);
        if siblings.is_empty() {
            self.nodes[child].weight = 1.0;
            return Ok(());
        }
        let share = 1.0 / (siblings.len() + 1) as f64;
        let cut = share / siblings.len() as f64;
        let even = siblings.iter().all(|&s| self.nodes[s].weight - cut >= MIN_WEIGHT);
        for &sibling in &siblings {
            let node = &mut self.nodes[sibling];
            if even {
                node.weight -= cut;
            } else {
                node.weight *= 1.0 - share;
            }
        }
        self.nodes[child].weight = share;
        Ok(())
    }

    /// Like [`Tree::insert_child`] but with an explicit weight for the child;
    /// resizable siblings are scaled to fill the rest.
    pub fn insert_child_with_weight(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
        weight: f64,
    ) -> Result<(), TreeError> {
        self.attach(parent, child, index)?;
        if !self.nodes[child].is_resizable() {
            return Ok(());
        }
        let siblings = self.resizable_siblings(child);
        if siblings.is_empty() {
            self.nodes[child].weight = 1.0;
            return Ok(());
        }
        let ceiling = (1.0 - MIN_WEIGHT * siblings.len() as f64).max(MIN_WEIGHT);
        let weight = weight.clamp(MIN_WEIGHT, ceiling);
        let total: f64 = siblings.iter().map(|&s| self.nodes[s].weight).sum();
        for &sibling in &siblings {
            let node = &mut self.nodes[sibling];
            node.weight = if total > 0.0 {
                node.weight * (1.0 - weight) / total
            } else {
                (1.0 - weight) / siblings.len() as f64
            };
        }
        self.nodes[child].weight = weight;
        Ok(())
    }

    /// Detaches `child` from `parent`. Returns `Ok(false)` when `child` is not
    /// one of `parent`'s children.
    ///
    /// The removed child's weight is spread evenly across the remaining
    /// resizable siblings. A split left with one child is replaced by that
    /// child; a split left empty is removed from its own parent.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, TreeError> {
        self.node(child)?;
        self.node(parent)?;
        if !self.unlink(parent, child) {
            return Ok(false);
        }
        self.collapse(parent)?;
        Ok(true)
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(index) = self.nodes[parent].children.iter().position(|&c| c == child) else {
            return false;
        };
        let resizable = self.nodes[child].is_resizable();
        self.nodes[parent].children.remove(index);
        self.nodes[child].parent = None;

        if resizable {
            let freed = self.nodes[child].weight;
            let remaining = self.resizable_children(parent);
            if !remaining.is_empty() {
                let each = freed / remaining.len() as f64;
                for sibling in remaining {
                    self.nodes[sibling].weight += each;
                }
            }
        }
        true
    }

    /// Removes `id` from whatever parent it has.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.node(id)?.parent.ok_or(TreeError::Detached(id))?;
        self.remove_child(parent, id).map(|_| ())
    }

    /// Re-parents an attached node under `new_parent` at `index`.
    ///
    /// `index` is interpreted against `new_parent`'s children while the node
    /// is still in its old place, which keeps positions next to the old
    /// parent stable. The old parent is collapsed only after the insertion.
    pub fn move_to(&mut self, id: NodeId, new_parent: NodeId, index: usize) -> Result<(), TreeError> {
        let old_parent = self.node(id)?.parent.ok_or(TreeError::Detached(id))?;
        let target = self.node(new_parent)?;
        if new_parent == id || self.is_descendant_of(new_parent, id) {
            return Err(TreeError::Invariant(format!("cannot move {id:?} into itself")));
        }
        if !target.container.accepts(&self.nodes[id].container) {
            return Err(TreeError::InvalidChild {
                parent: target.kind(),
                child: self.nodes[id].kind(),
            });
        }
        let mut index = index;
        if old_parent == new_parent {
            let current = self.nodes[old_parent].children.iter().position(|&c| c == id);
            if current.is_some_and(|c| c < index) {
                index -= 1;
            }
        }
        self.unlink(old_parent, id);
        self.insert_child(new_parent, id, index)?;
        self.collapse(old_parent)
    }

    fn collapse(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(node) = self.nodes.get(id) else {
            return Ok(());
        };
        if !matches!(node.container, Container::Split(_)) {
            return Ok(());
        }
        match (node.children.len(), node.parent) {
            (0, Some(parent)) => {
                self.remove_child(parent, id)?;
                self.nodes.remove(id);
            }
            (1, Some(_)) => self.flatten(id),
            _ => {}
        }
        Ok(())
    }

    /// Replaces a single-child split by its child. If the child is itself a
    /// split oriented like the new parent, its children are spliced in place
    /// with their weights scaled by the inherited weight.
    fn flatten(&mut self, split: NodeId) {
        let Some(parent) = self.nodes[split].parent else {
            return;
        };
        let sole = self.nodes[split].children[0];
        let weight = self.nodes[split].weight;
        let Some(index) = self.nodes[parent].children.iter().position(|&c| c == split) else {
            return;
        };

        self.nodes[parent].children[index] = sole;
        self.nodes[sole].parent = Some(parent);
        self.nodes[sole].weight = weight;
        self.nodes.remove(split);

        let same_axis = matches!(self.nodes[sole].container, Container::Split(_))
            && self.nodes[sole].orientation() == self.nodes[parent].orientation();
        if !same_axis {
            return;
        }
        let grandchildren = std::mem::take(&mut self.nodes[sole].children);
        for &g in &grandchildren {
            let node = &mut self.nodes[g];
            node.parent = Some(parent);
            node.weight *= weight;
        }
        self.nodes[parent].children.splice(index..=index, grandchildren);
        self.nodes.remove(sole);
    }

    /// Puts detached `new` where `old` sits, inheriting its weight. `old` is
    /// left detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        let parent = self.node(old)?.parent.ok_or(TreeError::Detached(old))?;
        let new_node = self.node(new)?;
        if new_node.parent.is_some() {
            return Err(TreeError::AlreadyAttached(new));
        }
        let parent_node = &self.nodes[parent];
        if !parent_node.container.accepts(&new_node.container) {
            return Err(TreeError::InvalidChild {
                parent: parent_node.kind(),
                child: new_node.kind(),
            });
        }
        let index = parent_node
            .children
            .iter()
            .position(|&c| c == old)
            .ok_or_else(|| TreeError::Invariant(format!("{old:?} missing from its parent")))?;
        let weight = self.nodes[old].weight;
        self.nodes[parent].children[index] = new;
        self.nodes[old].parent = None;
        let new_node = &mut self.nodes[new];
        new_node.parent = Some(parent);
        new_node.weight = weight;
        Ok(())
    }

    /// Exchanges the positions of two children of the same parent. Weights
    /// travel with the nodes.
    pub fn swap_siblings(&mut self, a: NodeId, b: NodeId) -> Result<(), TreeError> {
        let parent = self.node(a)?.parent.ok_or(TreeError::Detached(a))?;
        if self.node(b)?.parent != Some(parent) {
            return Err(TreeError::Invariant(format!("{a:?} and {b:?} are not siblings")));
        }
        let children = &mut self.nodes[parent].children;
        let (Some(ia), Some(ib)) = (
            children.iter().position(|&c| c == a),
            children.iter().position(|&c| c == b),
        ) else {
            return Err(TreeError::Invariant(format!("{a:?} missing from its parent")));
        };
        children.swap(ia, ib);
        Ok(())
    }

    /// Detaches `id` if needed and frees it together with its whole subtree.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::Invariant("the root cannot be destroyed".into()));
        }
        if self.node(id)?.parent.is_some() {
            self.detach(id)?;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Checks the structural invariants of everything reachable from the root.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| TreeError::Invariant(format!("dangling child {id:?}")))?;
            for &child in &node.children {
                let child_node = self
                    .nodes
                    .get(child)
                    .ok_or_else(|| TreeError::Invariant(format!("dangling child {child:?}")))?;
                if child_node.parent != Some(id) {
                    return Err(TreeError::Invariant(format!(
                        "{child:?} does not point back at its parent {id:?}"
                    )));
                }
                if !node.container.accepts(&child_node.container) {
                    return Err(TreeError::InvalidChild {
                        parent: node.kind(),
                        child: child_node.kind(),
                    });
                }
                stack.push(child);
            }
            if matches!(node.container, Container::Split(_)) && node.children.is_empty() {
                return Err(TreeError::Invariant(format!("split {id:?} has no children")));
            }
            if node.orientation().is_some() {
                let weights: Vec<f64> = self
                    .resizable_children(id)
                    .into_iter()
                    .map(|c| self.nodes[c].weight)
                    .collect();
                if weights.iter().any(|&w| !(w > 0.0)) {
                    return Err(TreeError::Invariant(format!(
                        "{id:?} has a child with non-positive weight"
                    )));
                }
                let sum: f64 = weights.iter().sum();
                if !weights.is_empty() && (sum - 1.0).abs() > WEIGHT_EPSILON {
                    return Err(TreeError::Invariant(format!(
                        "weights under {id:?} sum to {sum}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Human-readable rendering of the hierarchy, used in diagnostics.
    pub fn draw(&self) -> String {
        let mut out = String::new();
        let _ = ascii_tree::write_tree(&mut out, &self.draw_node(self.root));
        out
    }

    fn draw_node(&self, id: NodeId) -> ascii_tree::Tree {
        let node = &self.nodes[id];
        let r = node.rect;
        let label = match &node.container {
            Container::Root => "root".to_string(),
            Container::Monitor(m) => {
                format!("monitor {} [{},{} {}x{}]", m.handle, r.x, r.y, r.width, r.height)
            }
            Container::Workspace(ws) => format!("workspace {} ({})", ws.name, ws.orientation),
            Container::Split(s) => format!("split {} w={:.3}", s.orientation, node.weight),
            Container::Window(w) => format!(
                "window {} {} w={:.3} [{},{} {}x{}]",
                w.handle, w.state, node.weight, r.x, r.y, r.width, r.height
            ),
        };
        if node.children.is_empty() {
            ascii_tree::Tree::Leaf(vec![label])
        } else {
            let children = node.children.iter().map(|&c| self.draw_node(c)).collect();
            ascii_tree::Tree::Node(label, children)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::Orientation;
    use crate::model::container::{
        Monitor, MonitorHandle, Split, Window, WindowHandle, WindowState, Workspace,
    };
    use crate::sys::geometry::Rect;

    pub(crate) fn tree_with_workspace(orientation: Orientation) -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let monitor = tree.create(Container::Monitor(Monitor {
            handle: MonitorHandle(1),
            displayed_workspace: None,
        }));
        tree.node_mut(monitor).unwrap().rect = Rect::new(0, 0, 1000, 500);
        tree.insert_child(tree.root(), monitor, 0).unwrap();
        let ws = tree.create(Container::Workspace(Workspace { name: "1".into(), orientation }));
        tree.insert_child(monitor, ws, 0).unwrap();
        tree.get_mut(monitor).unwrap().as_monitor_mut().unwrap().displayed_workspace = Some(ws);
        (tree, ws)
    }

    pub(crate) fn add_window(tree: &mut Tree, parent: NodeId, handle: u64) -> NodeId {
        let window = tree.create(Container::Window(Window::new(WindowHandle(handle))));
        let index = tree.children_of(parent).len();
        tree.insert_child(parent, window, index).unwrap();
        window
    }

    pub(crate) fn add_split(tree: &mut Tree, parent: NodeId, orientation: Orientation) -> NodeId {
        let split = tree.create(Container::Split(Split { orientation }));
        let index = tree.children_of(parent).len();
        tree.insert_child(parent, split, index).unwrap();
        split
    }

    fn weights(tree: &Tree, parent: NodeId) -> Vec<f64> {
        tree.children_of(parent).iter().map(|&c| tree.find_by_id(c).unwrap().weight).collect()
    }

    fn assert_weights(tree: &Tree, parent: NodeId, expected: &[f64]) {
        let actual = weights(tree, parent);
        assert_eq!(actual.len(), expected.len(), "{actual:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn inserting_children_splits_weight_evenly() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        add_window(&mut tree, ws, 1);
        assert_weights(&tree, ws, &[1.0]);
        add_window(&mut tree, ws, 2);
        assert_weights(&tree, ws, &[0.5, 0.5]);
        add_window(&mut tree, ws, 3);
        assert_weights(&tree, ws, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        tree.validate().unwrap();
    }

    #[test]
    fn insertion_falls_back_to_proportional_scaling() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        tree.node_mut(a).unwrap().weight = 0.995;
        tree.node_mut(b).unwrap().weight = 0.005;
        add_window(&mut tree, ws, 3);
        let w = weights(&tree, ws);
        assert!(w[1] > 0.0);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_weight_scales_siblings_to_fill_the_rest() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        tree.node_mut(a).unwrap().weight = 0.75;
        tree.node_mut(b).unwrap().weight = 0.25;

        let c = tree.create(Container::Window(Window::new(WindowHandle(3))));
        tree.insert_child_with_weight(ws, c, 1, 0.2).unwrap();

        assert_eq!(tree.children_of(ws), &[a, c, b]);
        assert_weights(&tree, ws, &[0.6, 0.2, 0.2]);
        tree.validate().unwrap();

        let d = tree.create(Container::Window(Window::new(WindowHandle(4))));
        tree.insert_child_with_weight(ws, d, 9, 5.0).unwrap();
        assert_eq!(tree.children_of(ws).last(), Some(&d));
        assert!((tree.find_by_id(d).unwrap().weight - (1.0 - 3.0 * MIN_WEIGHT)).abs() < 1e-9);
        tree.validate().unwrap();
    }

    #[test]
    fn removing_a_child_redistributes_its_weight() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        add_window(&mut tree, ws, 2);
        add_window(&mut tree, ws, 3);
        tree.node_mut(a).unwrap().weight = 0.5;
        for &c in &tree.children_of(ws)[1..].to_vec() {
            tree.node_mut(c).unwrap().weight = 0.25;
        }
        assert_eq!(tree.remove_child(ws, a), Ok(true));
        assert_weights(&tree, ws, &[0.5, 0.5]);
        assert_eq!(tree.parent_of(a), None);
        assert_eq!(tree.remove_child(ws, a), Ok(false));
    }

    #[test]
    fn floating_windows_do_not_take_weight() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        add_window(&mut tree, ws, 1);
        let floating = tree.create(Container::Window(Window {
            state: WindowState::Floating,
            ..Window::new(WindowHandle(2))
        }));
        tree.insert_child(ws, floating, 1).unwrap();
        assert_eq!(tree.resizable_children(ws).len(), 1);
        assert_eq!(tree.find_by_id(tree.children_of(ws)[0]).unwrap().weight, 1.0);
        tree.validate().unwrap();
    }

    #[test]
    fn single_child_split_is_flattened_into_parent() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let split = add_split(&mut tree, ws, Orientation::Vertical);
        let b = add_window(&mut tree, split, 2);
        let c = add_window(&mut tree, split, 3);
        tree.node_mut(a).unwrap().weight = 0.3;
        tree.node_mut(split).unwrap().weight = 0.7;

        tree.destroy(b).unwrap();

        assert!(!tree.contains(split));
        assert_eq!(tree.children_of(ws), &[a, c]);
        assert_eq!(tree.parent_of(c), Some(ws));
        assert_weights(&tree, ws, &[0.3, 0.7]);
        tree.validate().unwrap();
    }

    #[test]
    fn flattening_splices_same_orientation_grandchildren() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let outer = add_split(&mut tree, ws, Orientation::Vertical);
        let inner = add_split(&mut tree, outer, Orientation::Horizontal);
        let x = add_window(&mut tree, inner, 2);
        let y = add_window(&mut tree, inner, 3);
        let z = add_window(&mut tree, outer, 4);

        tree.destroy(z).unwrap();

        assert!(!tree.contains(outer));
        assert!(!tree.contains(inner));
        assert_eq!(tree.children_of(ws), &[a, x, y]);
        assert_weights(&tree, ws, &[0.5, 0.25, 0.25]);
        tree.validate().unwrap();
    }

    #[test]
    fn emptied_split_is_removed_with_cascade() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let split = add_split(&mut tree, ws, Orientation::Vertical);
        let only = tree.create(Container::Window(Window::new(WindowHandle(2))));
        tree.insert_child(split, only, 0).unwrap();

        tree.destroy(only).unwrap();

        assert!(!tree.contains(split));
        assert_eq!(tree.children_of(ws), &[a]);
        assert_weights(&tree, ws, &[1.0]);
    }

    #[test]
    fn move_to_ancestor_collapses_old_parent_after_insert() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let split = add_split(&mut tree, ws, Orientation::Vertical);
        let w = add_window(&mut tree, split, 1);
        let inner = add_split(&mut tree, split, Orientation::Horizontal);
        let a = add_window(&mut tree, inner, 2);
        let b = add_window(&mut tree, inner, 3);
        let z = add_window(&mut tree, ws, 4);

        let index = tree.index_of(split).unwrap() + 1;
        tree.move_to(w, ws, index).unwrap();

        assert_eq!(tree.children_of(ws), &[a, b, w, z]);
        assert!(!tree.contains(split));
        tree.validate().unwrap();
    }

    #[test]
    fn move_to_within_parent_reorders() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        let c = add_window(&mut tree, ws, 3);
        tree.move_to(a, ws, 3).unwrap();
        assert_eq!(tree.children_of(ws), &[b, c, a]);
        tree.validate().unwrap();
    }

    #[test]
    fn replace_keeps_slot_and_weight() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        let b = add_window(&mut tree, ws, 2);
        tree.node_mut(a).unwrap().weight = 0.25;
        tree.node_mut(b).unwrap().weight = 0.75;
        let split = tree.create(Container::Split(Split { orientation: Orientation::Vertical }));

        tree.replace(b, split).unwrap();

        assert_eq!(tree.children_of(ws), &[a, split]);
        assert_eq!(tree.find_by_id(split).unwrap().weight, 0.75);
        assert_eq!(tree.parent_of(b), None);
        assert_eq!(tree.replace(b, split), Err(TreeError::Detached(b)));
    }

    #[test]
    fn invalid_parent_child_pairs_are_rejected() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let window = add_window(&mut tree, ws, 1);
        let other = tree.create(Container::Window(Window::new(WindowHandle(2))));
        assert_eq!(
            tree.insert_child(window, other, 0),
            Err(TreeError::InvalidChild {
                parent: ContainerKind::Window,
                child: ContainerKind::Window,
            })
        );
        assert_eq!(tree.insert_child(ws, window, 0), Err(TreeError::AlreadyAttached(window)));
    }

    #[test]
    fn validate_reports_broken_weights() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let a = add_window(&mut tree, ws, 1);
        add_window(&mut tree, ws, 2);
        tree.node_mut(a).unwrap().weight = 0.9;
        assert!(matches!(tree.validate(), Err(TreeError::Invariant(_))));
    }

    #[test]
    fn queries_walk_the_hierarchy() {
        let (mut tree, ws) = tree_with_workspace(Orientation::Horizontal);
        let split = add_split(&mut tree, ws, Orientation::Vertical);
        let a = add_window(&mut tree, split, 1);
        let b = add_window(&mut tree, split, 2);

        assert_eq!(tree.workspace_of(a), Some(ws));
        assert!(tree.monitor_of(a).is_some());
        assert_eq!(tree.siblings_of(a), vec![b]);
        assert_eq!(tree.index_of(b), Some(1));
        assert_eq!(tree.windows_in(ws), vec![a, b]);
        assert!(tree.is_descendant_of(b, ws));
        assert!(tree.is_attached(b));
        assert_eq!(NodeId::from_raw(a.to_raw()), a);
        assert!(tree.draw().contains("split vertical"));
    }
}
