use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::config::Config;
use crate::layout_engine::{Dimension, Direction, Orientation};
use crate::model::container::{MonitorHandle, WindowHandle, WindowState};
use crate::sys::geometry::Rect;

/// Names a container a command should act on. Commands that take an
/// `Option<ContainerRef>` fall back to the focused window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRef {
    Id(u64),
    Window(WindowHandle),
}

/// Everything the bus can be asked to do.
///
/// The first group mirrors platform hooks; the rest are user commands that
/// also have a text form (see [`FromStr`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "command", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    ManageWindow {
        handle: WindowHandle,
        #[serde(default)]
        process_name: String,
        #[serde(default)]
        class_name: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        frame: Option<Rect>,
        #[serde(default)]
        state: Option<WindowState>,
    },
    UnmanageWindow {
        handle: WindowHandle,
    },
    WindowFocused {
        handle: WindowHandle,
    },
    WindowMovedOrResized {
        handle: WindowHandle,
        frame: Rect,
    },
    AddMonitor {
        handle: MonitorHandle,
        frame: Rect,
    },
    RemoveMonitor {
        handle: MonitorHandle,
    },
    UpdateMonitor {
        handle: MonitorHandle,
        frame: Rect,
    },
    Resize {
        #[serde(default)]
        target: Option<ContainerRef>,
        dimension: Dimension,
        /// Kept as text so that a malformed amount surfaces as a command
        /// failure rather than a decode error.
        amount: String,
    },
    Focus {
        direction: Direction,
    },
    Move {
        direction: Direction,
    },
    SetTilingDirection {
        orientation: Orientation,
    },
    ToggleTilingDirection,
    SetWindowState {
        #[serde(default)]
        target: Option<ContainerRef>,
        state: WindowState,
    },
    ToggleWindowState {
        #[serde(default)]
        target: Option<ContainerRef>,
        state: WindowState,
    },
    FocusWorkspace {
        name: String,
    },
    MoveToWorkspace {
        name: String,
    },
    Redraw,
    ReloadConfig {
        config: Box<Config>,
    },
}

impl Command {
    /// Stable snake_case name used in the history and in failure reports.
    pub fn name(&self) -> &'static str { self.into() }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("{command}: invalid {argument} {value:?}")]
    InvalidArgument {
        command: &'static str,
        argument: &'static str,
        value: String,
    },
    #[error("{command}: unexpected {rest:?}")]
    Trailing { command: &'static str, rest: String },
}

fn arg<'a, T: FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<T, CommandParseError> {
    let token = tokens.next().ok_or(CommandParseError::MissingArgument { command, argument })?;
    token.parse().map_err(|_| CommandParseError::InvalidArgument {
        command,
        argument,
        value: token.to_string(),
    })
}

fn rest<'a>(
    tokens: impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<String, CommandParseError> {
    let joined = tokens.collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        return Err(CommandParseError::MissingArgument { command, argument });
    }
    Ok(joined)
}

/// Parses the text form used in keybindings and by IPC clients, e.g.
/// `resize width +10%`, `focus workspace 2` or `toggle floating`.
impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let head = tokens.next().ok_or(CommandParseError::Empty)?.to_ascii_lowercase();
        let command = match head.as_str() {
            "resize" => Command::Resize {
                target: None,
                dimension: arg(&mut tokens, "resize", "dimension")?,
                amount: arg(&mut tokens, "resize", "amount")?,
            },
            "focus" => match tokens.next() {
                Some(t) if t.eq_ignore_ascii_case("workspace") => Command::FocusWorkspace {
                    name: rest(&mut tokens, "focus", "workspace name")?,
                },
                Some(t) => Command::Focus {
                    direction: t.parse().map_err(|_| CommandParseError::InvalidArgument {
                        command: "focus",
                        argument: "direction",
                        value: t.to_string(),
                    })?,
                },
                None => {
                    return Err(CommandParseError::MissingArgument {
                        command: "focus",
                        argument: "direction",
                    });
                }
            },
            "move" => match tokens.next() {
                Some(t) if t.eq_ignore_ascii_case("workspace") => Command::MoveToWorkspace {
                    name: rest(&mut tokens, "move", "workspace name")?,
                },
                Some(t) => Command::Move {
                    direction: t.parse().map_err(|_| CommandParseError::InvalidArgument {
                        command: "move",
                        argument: "direction",
                        value: t.to_string(),
                    })?,
                },
                None => {
                    return Err(CommandParseError::MissingArgument {
                        command: "move",
                        argument: "direction",
                    });
                }
            },
            "tiling-direction" => match tokens.next() {
                Some(t) if t.eq_ignore_ascii_case("toggle") => Command::ToggleTilingDirection,
                Some(t) => Command::SetTilingDirection {
                    orientation: t.parse().map_err(|_| CommandParseError::InvalidArgument {
                        command: "tiling-direction",
                        argument: "orientation",
                        value: t.to_string(),
                    })?,
                },
                None => {
                    return Err(CommandParseError::MissingArgument {
                        command: "tiling-direction",
                        argument: "orientation",
                    });
                }
            },
            "set" => Command::SetWindowState {
                target: None,
                state: arg(&mut tokens, "set", "state")?,
            },
            "toggle" => Command::ToggleWindowState {
                target: None,
                state: arg(&mut tokens, "toggle", "state")?,
            },
            "redraw" => Command::Redraw,
            _ => return Err(CommandParseError::Unknown(head)),
        };
        let leftover: Vec<&str> = tokens.collect();
        if !leftover.is_empty() {
            return Err(CommandParseError::Trailing {
                command: command.name(),
                rest: leftover.join(" "),
            });
        }
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Resize { dimension, amount, .. } => write!(f, "resize {dimension} {amount}"),
            Command::Focus { direction } => write!(f, "focus {direction}"),
            Command::FocusWorkspace { name } => write!(f, "focus workspace {name}"),
            Command::Move { direction } => write!(f, "move {direction}"),
            Command::MoveToWorkspace { name } => write!(f, "move workspace {name}"),
            Command::SetTilingDirection { orientation } => {
                write!(f, "tiling-direction {orientation}")
            }
            Command::ToggleTilingDirection => f.write_str("tiling-direction toggle"),
            Command::SetWindowState { state, .. } => write!(f, "set {state}"),
            Command::ToggleWindowState { state, .. } => write!(f, "toggle {state}"),
            Command::Redraw => f.write_str("redraw"),
            Command::ManageWindow { handle, .. }
            | Command::UnmanageWindow { handle }
            | Command::WindowFocused { handle }
            | Command::WindowMovedOrResized { handle, .. } => {
                write!(f, "{} {handle}", self.name())
            }
            Command::AddMonitor { handle, .. }
            | Command::RemoveMonitor { handle }
            | Command::UpdateMonitor { handle, .. } => write!(f, "{} {handle}", self.name()),
            Command::ReloadConfig { .. } => f.write_str(self.name()),
        }
    }
}
