use serde::Serialize;
use strum::VariantNames;

use crate::layout_engine::Orientation;
use crate::model::container::{MonitorHandle, WindowHandle, WindowState};
use crate::model::server::{MonitorData, WindowData, WorkspaceData};

/// Something that happened as a result of a command. Events are buffered
/// while a command runs and published to subscribers once it commits.
#[derive(Clone, Debug, PartialEq, Serialize, strum::IntoStaticStr, strum::VariantNames)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WmEvent {
    WindowManaged {
        window: WindowData,
    },
    WindowUnmanaged {
        id: u64,
        handle: WindowHandle,
    },
    FocusChanged {
        focused: Option<WindowData>,
    },
    WindowStateChanged {
        window: WindowData,
        previous: WindowState,
    },
    TilingDirectionChanged {
        container: u64,
        orientation: Orientation,
    },
    WorkspaceActivated {
        workspace: WorkspaceData,
    },
    WorkspaceDeactivated {
        id: u64,
        name: String,
    },
    WorkspaceFocused {
        workspace: WorkspaceData,
    },
    MonitorAdded {
        monitor: MonitorData,
    },
    MonitorUpdated {
        monitor: MonitorData,
    },
    MonitorRemoved {
        id: u64,
        handle: MonitorHandle,
    },
    UserConfigReloaded,
}

/// Subscribing to this topic receives every event.
pub const ALL_TOPICS: &str = "all";

impl WmEvent {
    pub fn topic(&self) -> &'static str { self.into() }

    pub fn topics() -> &'static [&'static str] { Self::VARIANTS }

    pub fn is_known_topic(topic: &str) -> bool {
        topic == ALL_TOPICS || Self::VARIANTS.contains(&topic)
    }
}
