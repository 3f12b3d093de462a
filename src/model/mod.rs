//! The container tree and everything hanging off it.

pub mod container;
pub mod server;
pub mod tree;
pub mod wm_state;

pub use container::{Container, ContainerKind, MonitorHandle, WindowHandle, WindowState};
pub use tree::{NodeId, Tree, TreeError};
pub use wm_state::WmState;
