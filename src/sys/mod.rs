//! The seam between the window manager and the native windowing system.
//!
//! Everything that touches real windows goes through [`Platform`]. The
//! engine ships with [`Headless`], which records the calls it receives and
//! never fails unless told to.

pub mod geometry;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::common::collections::{HashMap, HashSet, VecDeque};
use crate::model::container::WindowHandle;
use geometry::Rect;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("window {0} no longer exists")]
    WindowGone(WindowHandle),
}

/// Native window operations. Implementations must tolerate being called for
/// windows the OS has already destroyed and report that as an error.
pub trait Platform: Send + Sync {
    fn set_frame(&mut self, handle: WindowHandle, frame: Rect, visible: bool)
    -> Result<(), PlatformError>;

    fn focus(&mut self, handle: WindowHandle) -> Result<(), PlatformError>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppliedFrame {
    pub handle: WindowHandle,
    pub frame: Rect,
    pub visible: bool,
}

/// How many focus calls [`Headless`] remembers.
const FOCUS_LOG_LEN: usize = 32;

#[derive(Default, Debug)]
struct HeadlessLog {
    frames: HashMap<WindowHandle, AppliedFrame>,
    focused: VecDeque<WindowHandle>,
    failing: HashSet<WindowHandle>,
}

/// In-process platform that only records. It keeps the latest frame of each
/// window and the most recent focus calls, so its memory stays bounded by
/// the number of windows. Clones share one log so a test can keep a handle
/// after giving the platform to a bus.
#[derive(Clone, Default, Debug)]
pub struct Headless {
    log: Arc<Mutex<HeadlessLog>>,
}

impl Headless {
    pub fn new() -> Self { Self::default() }

    /// The latest frame applied to each window, ordered by handle.
    pub fn frames(&self) -> Vec<AppliedFrame> {
        let mut frames: Vec<AppliedFrame> = self.log.lock().frames.values().cloned().collect();
        frames.sort_by_key(|f| f.handle);
        frames
    }

    pub fn last_frame(&self, handle: WindowHandle) -> Option<AppliedFrame> {
        self.log.lock().frames.get(&handle).cloned()
    }

    /// Recent focus calls, oldest first.
    pub fn focused(&self) -> Vec<WindowHandle> { self.log.lock().focused.iter().copied().collect() }

    pub fn clear(&self) {
        let mut log = self.log.lock();
        log.frames.clear();
        log.focused.clear();
    }

    /// Makes every later call for `handle` fail as if the window were gone.
    pub fn fail_for(&self, handle: WindowHandle) { self.log.lock().failing.insert(handle); }
}

impl Platform for Headless {
    fn set_frame(
        &mut self,
        handle: WindowHandle,
        frame: Rect,
        visible: bool,
    ) -> Result<(), PlatformError> {
        let mut log = self.log.lock();
        if log.failing.contains(&handle) {
            return Err(PlatformError::WindowGone(handle));
        }
        log.frames.insert(handle, AppliedFrame { handle, frame, visible });
        Ok(())
    }

    fn focus(&mut self, handle: WindowHandle) -> Result<(), PlatformError> {
        let mut log = self.log.lock();
        if log.failing.contains(&handle) {
            return Err(PlatformError::WindowGone(handle));
        }
        if log.focused.len() == FOCUS_LOG_LEN {
            log.focused.pop_front();
        }
        log.focused.push_back(handle);
        Ok(())
    }
}

static_assertions::assert_impl_all!(Headless: Platform, Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn headless_log_stays_bounded() {
        let mut platform = Headless::new();
        for i in 0..1000 {
            let handle = WindowHandle(i % 3);
            platform.set_frame(handle, Rect::new(0, 0, i as i32, 10), true).unwrap();
            platform.focus(handle).unwrap();
        }
        let frames = platform.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].handle, WindowHandle(0));
        assert_eq!(platform.last_frame(WindowHandle(0)).unwrap().frame.width, 999);
        assert_eq!(platform.focused().len(), FOCUS_LOG_LEN);
        assert_eq!(platform.focused().last(), Some(&WindowHandle(0)));
    }
}
