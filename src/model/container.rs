use std::fmt;

use serde::{Deserialize, Serialize};

use super::tree::NodeId;
use crate::layout_engine::Orientation;
use crate::sys::geometry::Rect;

/// Opaque native window handle as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

/// Opaque native monitor handle as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#x}", self.0) }
}

impl fmt::Display for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#x}", self.0) }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WindowState {
    #[default]
    Tiling,
    Floating,
    Minimized,
    Maximized,
    Fullscreen,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Monitor {
    pub handle: MonitorHandle,
    pub displayed_workspace: Option<NodeId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Workspace {
    pub name: String,
    pub orientation: Orientation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Split {
    pub orientation: Orientation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    pub handle: WindowHandle,
    pub process_name: String,
    pub class_name: String,
    pub title: String,
    pub state: WindowState,
    /// Placement used while floating. Survives trips through other states.
    pub floating_rect: Option<Rect>,
    /// Where the window sat when it last left the tiling layout.
    pub insertion_target: Option<InsertionTarget>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsertionTarget {
    pub parent: NodeId,
    pub index: usize,
    /// Share of the parent the window had before it left.
    pub weight: f64,
}

impl Window {
    pub fn new(handle: WindowHandle) -> Self {
        Self {
            handle,
            process_name: String::new(),
            class_name: String::new(),
            title: String::new(),
            state: WindowState::Tiling,
            floating_rect: None,
            insertion_target: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Container {
    Root,
    Monitor(Monitor),
    Workspace(Workspace),
    Split(Split),
    Window(Window),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContainerKind {
    Root,
    Monitor,
    Workspace,
    Split,
    Window,
}

impl Container {
    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Root => ContainerKind::Root,
            Container::Monitor(_) => ContainerKind::Monitor,
            Container::Workspace(_) => ContainerKind::Workspace,
            Container::Split(_) => ContainerKind::Split,
            Container::Window(_) => ContainerKind::Window,
        }
    }

    /// Whether `child` may be attached directly under a container of this kind.
    pub fn accepts(&self, child: &Container) -> bool {
        matches!(
            (self, child),
            (Container::Root, Container::Monitor(_))
                | (Container::Monitor(_), Container::Workspace(_))
                | (Container::Workspace(_), Container::Split(_) | Container::Window(_))
                | (Container::Split(_), Container::Split(_) | Container::Window(_))
        )
    }
}

/// One arena slot. `weight` is only meaningful for resizable containers.
#[derive(Clone, Debug)]
pub struct Node {
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub weight: f64,
    pub rect: Rect,
    pub container: Container,
}

impl Node {
    pub(super) fn new(container: Container) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            weight: 0.0,
            rect: Rect::default(),
            container,
        }
    }

    pub fn parent(&self) -> Option<NodeId> { self.parent }

    pub fn children(&self) -> &[NodeId] { &self.children }

    pub fn kind(&self) -> ContainerKind { self.container.kind() }

    /// Tiling windows and splits share their parent's space by weight.
    pub fn is_resizable(&self) -> bool {
        match &self.container {
            Container::Split(_) => true,
            Container::Window(window) => window.state == WindowState::Tiling,
            _ => false,
        }
    }

    pub fn orientation(&self) -> Option<Orientation> {
        match &self.container {
            Container::Workspace(ws) => Some(ws.orientation),
            Container::Split(split) => Some(split.orientation),
            _ => None,
        }
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> bool {
        match &mut self.container {
            Container::Workspace(ws) => ws.orientation = orientation,
            Container::Split(split) => split.orientation = orientation,
            _ => return false,
        }
        true
    }

    pub fn as_window(&self) -> Option<&Window> {
        match &self.container {
            Container::Window(window) => Some(window),
            _ => None,
        }
    }

    pub fn as_window_mut(&mut self) -> Option<&mut Window> {
        match &mut self.container {
            Container::Window(window) => Some(window),
            _ => None,
        }
    }

    pub fn as_workspace(&self) -> Option<&Workspace> {
        match &self.container {
            Container::Workspace(ws) => Some(ws),
            _ => None,
        }
    }

    pub fn as_monitor(&self) -> Option<&Monitor> {
        match &self.container {
            Container::Monitor(monitor) => Some(monitor),
            _ => None,
        }
    }

    pub fn as_monitor_mut(&mut self) -> Option<&mut Monitor> {
        match &mut self.container {
            Container::Monitor(monitor) => Some(monitor),
            _ => None,
        }
    }
}
