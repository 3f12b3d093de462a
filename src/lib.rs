//! Core of a tiling window manager: a container tree, the layout engine
//! that turns it into window frames, and the command bus that mutates it.
//!
//! Platform integration lives behind [`sys::Platform`]; everything else is
//! plain data driven by [`bus::Command`]s.

pub mod actor;
pub mod bus;
pub mod common;
pub mod ipc;
pub mod layout_engine;
pub mod model;
pub mod sys;
