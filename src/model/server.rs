use serde::{Deserialize, Serialize};

use super::container::{Container, MonitorHandle, WindowHandle, WindowState};
use super::tree::NodeId;
use super::wm_state::WmState;
use crate::layout_engine::Orientation;
use crate::sys::geometry::Rect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorData {
    pub id: u64,
    pub handle: MonitorHandle,
    pub frame: Rect,
    pub is_focused: bool,
    pub displayed_workspace: Option<String>,
    pub workspaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceData {
    pub id: u64,
    pub name: String,
    pub monitor: Option<MonitorHandle>,
    pub orientation: Orientation,
    pub frame: Rect,
    pub is_displayed: bool,
    pub is_focused: bool,
    pub window_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowData {
    pub id: u64,
    pub handle: WindowHandle,
    pub process_name: String,
    pub class_name: String,
    pub title: String,
    pub state: WindowState,
    pub frame: Rect,
    /// Share of the parent's space; absent for windows outside the tiling layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub workspace: Option<String>,
    pub is_focused: bool,
}

/// Recursive snapshot of the container tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContainerData {
    Root {
        id: u64,
        children: Vec<ContainerData>,
    },
    Monitor {
        id: u64,
        handle: MonitorHandle,
        frame: Rect,
        children: Vec<ContainerData>,
    },
    Workspace {
        id: u64,
        name: String,
        orientation: Orientation,
        frame: Rect,
        is_displayed: bool,
        children: Vec<ContainerData>,
    },
    Split {
        id: u64,
        orientation: Orientation,
        weight: f64,
        frame: Rect,
        children: Vec<ContainerData>,
    },
    Window(WindowData),
}

/// Envelope for everything sent to IPC clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ServerMessage {
    ClientResponse {
        client_message: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SubscribedEvent {
        data: serde_json::Value,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(r#"{{"message_type":"error","error":{:?}}}"#, err.to_string())
        })
    }
}

impl WmState {
    pub fn window_data(&self, id: NodeId) -> Option<WindowData> {
        let node = self.tree.find_by_id(id)?;
        let window = node.as_window()?;
        let workspace = self
            .tree
            .workspace_of(id)
            .and_then(|ws| self.tree.find_by_id(ws))
            .and_then(|ws| ws.as_workspace())
            .map(|ws| ws.name.clone());
        Some(WindowData {
            id: id.to_raw(),
            handle: window.handle,
            process_name: window.process_name.clone(),
            class_name: window.class_name.clone(),
            title: window.title.clone(),
            state: window.state,
            frame: node.rect,
            weight: node.is_resizable().then_some(node.weight),
            workspace,
            is_focused: self.focused_window() == Some(id),
        })
    }

    pub fn workspace_data(&self, id: NodeId) -> Option<WorkspaceData> {
        let node = self.tree.find_by_id(id)?;
        let ws = node.as_workspace()?;
        let monitor = self
            .tree
            .parent_of(id)
            .and_then(|m| self.tree.find_by_id(m))
            .and_then(|m| m.as_monitor())
            .map(|m| m.handle);
        Some(WorkspaceData {
            id: id.to_raw(),
            name: ws.name.clone(),
            monitor,
            orientation: ws.orientation,
            frame: node.rect,
            is_displayed: self.is_displayed(id),
            is_focused: self.focused_workspace() == Some(id),
            window_count: self.tree.windows_in(id).len(),
        })
    }

    pub fn monitor_data(&self, id: NodeId) -> Option<MonitorData> {
        let node = self.tree.find_by_id(id)?;
        let monitor = node.as_monitor()?;
        let name_of = |ws: NodeId| {
            self.tree.find_by_id(ws).and_then(|n| n.as_workspace()).map(|w| w.name.clone())
        };
        Some(MonitorData {
            id: id.to_raw(),
            handle: monitor.handle,
            frame: node.rect,
            is_focused: self.focused_monitor() == Some(id),
            displayed_workspace: monitor.displayed_workspace.and_then(name_of),
            workspaces: node.children().iter().filter_map(|&ws| name_of(ws)).collect(),
        })
    }

    pub fn container_data(&self, id: NodeId) -> Option<ContainerData> {
        let node = self.tree.find_by_id(id)?;
        let children =
            || node.children().iter().filter_map(|&c| self.container_data(c)).collect();
        Some(match &node.container {
            Container::Root => ContainerData::Root { id: id.to_raw(), children: children() },
            Container::Monitor(m) => ContainerData::Monitor {
                id: id.to_raw(),
                handle: m.handle,
                frame: node.rect,
                children: children(),
            },
            Container::Workspace(ws) => ContainerData::Workspace {
                id: id.to_raw(),
                name: ws.name.clone(),
                orientation: ws.orientation,
                frame: node.rect,
                is_displayed: self.is_displayed(id),
                children: children(),
            },
            Container::Split(split) => ContainerData::Split {
                id: id.to_raw(),
                orientation: split.orientation,
                weight: node.weight,
                frame: node.rect,
                children: children(),
            },
            Container::Window(_) => ContainerData::Window(self.window_data(id)?),
        })
    }

    pub fn query_monitors(&self) -> Vec<MonitorData> {
        self.tree.monitors().iter().filter_map(|&m| self.monitor_data(m)).collect()
    }

    pub fn query_workspaces(&self) -> Vec<WorkspaceData> {
        self.tree.workspaces().into_iter().filter_map(|ws| self.workspace_data(ws)).collect()
    }

    pub fn query_windows(&self) -> Vec<WindowData> {
        self.tree
            .windows_in(self.tree.root())
            .into_iter()
            .filter_map(|w| self.window_data(w))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn sample_window() -> WindowData {
        WindowData {
            id: 7,
            handle: WindowHandle(0x2a),
            process_name: "kitty".into(),
            class_name: "term".into(),
            title: "shell".into(),
            state: WindowState::Tiling,
            frame: Rect::new(0, 0, 640, 480),
            weight: Some(0.5),
            workspace: Some("1".into()),
            is_focused: true,
        }
    }

    #[test]
    fn window_data_serializes_with_expected_shape() {
        let value = serde_json::to_value(sample_window()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "handle": 42,
                "process_name": "kitty",
                "class_name": "term",
                "title": "shell",
                "state": "tiling",
                "frame": { "x": 0, "y": 0, "width": 640, "height": 480 },
                "weight": 0.5,
                "workspace": "1",
                "is_focused": true,
            })
        );
    }

    #[test]
    fn floating_window_omits_weight() {
        let window = WindowData {
            state: WindowState::Floating,
            weight: None,
            ..sample_window()
        };
        let value = serde_json::to_value(&window).unwrap();
        assert!(value.get("weight").is_none());
        let back: WindowData = serde_json::from_value(value).unwrap();
        assert_eq!(back, window);
    }

    #[test]
    fn container_data_is_tagged_by_type() {
        let tree = ContainerData::Split {
            id: 3,
            orientation: Orientation::Vertical,
            weight: 1.0,
            frame: Rect::default(),
            children: vec![ContainerData::Window(sample_window())],
        };
        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(value["type"], "split");
        assert_eq!(value["children"][0]["type"], "window");
        assert_eq!(value["children"][0]["handle"], 42);
    }

    #[test]
    fn server_messages_carry_message_type() {
        let message = ServerMessage::ClientResponse {
            client_message: "monitors".into(),
            success: false,
            data: None,
            error: Some("boom".into()),
        };
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&message.to_json()).unwrap(),
            json!({
                "message_type": "client_response",
                "client_message": "monitors",
                "success": false,
                "error": "boom",
            })
        );
    }
}
