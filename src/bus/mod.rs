//! Command dispatch.
//!
//! Every mutation of the window-manager state goes through [`Bus::invoke`]:
//! the command is recorded in the history, handled against a checkpoint of
//! the state, followed by the event reactions it triggered, validated, and
//! then committed. Only committed commands flush redraws and publish events.

pub mod command;
pub mod event;
mod handlers;
pub mod redraw;
pub mod shared;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub use command::{Command, CommandParseError, ContainerRef};
pub use event::WmEvent;
pub use shared::SharedBus;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::actor::broadcast::{EventSink, ListenerId, SubscriptionRegistry};
use crate::common::collections::VecDeque;
use crate::common::config::Config;
use crate::model::container::{MonitorHandle, WindowHandle};
use crate::model::server::{ContainerData, MonitorData, WindowData, WorkspaceData};
use crate::model::tree::TreeError;
use crate::model::wm_state::WmState;
use crate::sys::{Headless, Platform, PlatformError};

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CommandError {
    #[error("invalid resize amount {0:?}")]
    InvalidResizeAmount(String),
    #[error("container {0} does not exist")]
    ContainerNotFound(u64),
    #[error("container {0} is not a window")]
    NotAWindow(u64),
    #[error("window {0} is not managed")]
    WindowNotFound(WindowHandle),
    #[error("window {0} is already managed")]
    WindowAlreadyManaged(WindowHandle),
    #[error("monitor {0} is not known")]
    MonitorNotFound(MonitorHandle),
    #[error("monitor {0} is already known")]
    MonitorAlreadyExists(MonitorHandle),
    #[error("no monitor is available")]
    NoMonitor,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("platform call failed: {0}")]
    Platform(String),
    #[error("tree invariant violated: {0}")]
    InvariantViolated(String),
    #[error("command handler panicked: {0}")]
    HandlerPanicked(String),
    #[error("the engine is not running")]
    EngineUnavailable,
}

impl CommandError {
    /// Programming errors, as opposed to bad input or a flaky platform.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CommandError::InvariantViolated(_) | CommandError::HandlerPanicked(_))
    }
}

impl From<TreeError> for CommandError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::NotFound(id) => CommandError::ContainerNotFound(id.to_raw()),
            other => CommandError::InvariantViolated(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Window(WindowData),
    Workspace(WorkspaceData),
    Monitor(MonitorData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandFailure {
    pub command: &'static str,
    pub error: CommandError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandResponse {
    Success(Option<ResponsePayload>),
    Failure(CommandFailure),
}

impl CommandResponse {
    pub fn is_success(&self) -> bool { matches!(self, CommandResponse::Success(_)) }

    pub fn error(&self) -> Option<&CommandError> {
        match self {
            CommandResponse::Success(_) => None,
            CommandResponse::Failure(failure) => Some(&failure.error),
        }
    }

    pub fn payload(&self) -> Option<&ResponsePayload> {
        match self {
            CommandResponse::Success(payload) => payload.as_ref(),
            CommandResponse::Failure(_) => None,
        }
    }

    pub(crate) fn failure(command: &'static str, error: CommandError) -> Self {
        CommandResponse::Failure(CommandFailure { command, error })
    }
}

/// Names of recently invoked commands, most recent first.
#[derive(Clone, Debug)]
pub struct CommandHistory {
    entries: VecDeque<&'static str>,
    capacity: usize,
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, name: &'static str) {
        self.entries.push_front(name);
        self.entries.truncate(self.capacity);
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.entries.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ { self.entries.iter().copied() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

pub struct Bus {
    state: WmState,
    config: Config,
    history: CommandHistory,
    subscriptions: SubscriptionRegistry,
    platform: Box<dyn Platform>,
}

static_assertions::assert_impl_all!(Bus: Send, Sync);

impl Bus {
    pub fn new(config: Config) -> Self {
        Self {
            state: WmState::new(),
            history: CommandHistory::new(config.settings.history_capacity),
            config,
            subscriptions: SubscriptionRegistry::default(),
            platform: Box::new(Headless::new()),
        }
    }

    pub fn with_platform(mut self, platform: impl Platform + 'static) -> Self {
        self.platform = Box::new(platform);
        self
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.subscriptions.set_sink(sink);
        self
    }

    pub fn state(&self) -> &WmState { &self.state }

    pub fn config(&self) -> &Config { &self.config }

    pub fn history(&self) -> Vec<&'static str> { self.history.iter().collect() }

    pub fn subscriptions(&self) -> &SubscriptionRegistry { &self.subscriptions }

    /// Registers `listener` for `topic`. Returns false for unknown topics.
    pub fn subscribe(&mut self, topic: &str, listener: ListenerId) -> bool {
        if !WmEvent::is_known_topic(topic) {
            return false;
        }
        self.subscriptions.subscribe(topic, listener);
        true
    }

    pub fn unsubscribe(&mut self, listener: ListenerId) -> bool {
        self.subscriptions.unsubscribe(listener)
    }

    /// Runs one command to completion.
    ///
    /// On failure (including a panicking handler or a broken invariant) the
    /// state is restored to what it was before the command, nothing is
    /// redrawn and no events are published. Platform errors during the
    /// redraw are reported as a failure but the new state is kept. A panic
    /// while redrawing or publishing also restores the old state and leaves
    /// a full redraw pending.
    #[instrument(level = "debug", skip_all, fields(command = command.name()))]
    pub fn invoke(&mut self, command: Command) -> CommandResponse {
        let name = command.name();
        self.history.record(name);
        let checkpoint = (self.state.clone(), self.config.clone());

        let state = &mut self.state;
        let config = &mut self.config;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<_, CommandError> {
            let payload = handlers::dispatch(state, config, command)?;
            handlers::settle(state, config)?;
            state.validate().map_err(|err| CommandError::InvariantViolated(err.to_string()))?;
            Ok(payload)
        }));
        let result = outcome.unwrap_or_else(|panic| {
            Err(CommandError::HandlerPanicked(panic_message(panic.as_ref())))
        });

        let payload = match result {
            Ok(payload) => payload,
            Err(err) => {
                (self.state, self.config) = checkpoint;
                if err.is_fatal() {
                    error!(command = name, %err, dump = %self.diagnostic_dump(), "command rolled back");
                } else {
                    debug!(command = name, %err, "command failed");
                }
                return CommandResponse::failure(name, err);
            }
        };

        let committed = panic::catch_unwind(AssertUnwindSafe(|| self.commit(name, payload)));
        committed.unwrap_or_else(|panic| {
            let err = CommandError::HandlerPanicked(panic_message(panic.as_ref()));
            (self.state, self.config) = checkpoint;
            // Native windows may already sit at the abandoned layout.
            let root = self.state.tree.root();
            self.state.mark_redraw(root);
            error!(command = name, %err, dump = %self.diagnostic_dump(), "command rolled back after commit");
            CommandResponse::failure(name, err)
        })
    }

    /// Applies a validated command: redraws, publishes its events and
    /// syncs native focus.
    fn commit(&mut self, name: &'static str, payload: Option<ResponsePayload>) -> CommandResponse {
        self.history.set_capacity(self.config.settings.history_capacity);
        let report =
            redraw::flush(&mut self.state, &self.config.settings.gaps, self.platform.as_mut());
        let events = self.state.take_events();
        let focus_error = self.sync_native_focus(&events);
        for event in &events {
            self.subscriptions.publish(event);
        }

        match report.errors.into_iter().next().or(focus_error) {
            Some(err) => CommandResponse::failure(name, CommandError::Platform(err.to_string())),
            None => CommandResponse::Success(payload),
        }
    }

    /// Runs the commands bound to `binding`, stopping at the first failure.
    pub fn invoke_keybinding(&mut self, binding: &str) -> Option<Vec<CommandResponse>> {
        let commands = self.config.commands_for(binding)?.to_vec();
        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            let response = self.invoke(command);
            let failed = !response.is_success();
            responses.push(response);
            if failed {
                break;
            }
        }
        Some(responses)
    }

    fn sync_native_focus(&mut self, events: &[WmEvent]) -> Option<PlatformError> {
        let focused = events.iter().rev().find_map(|event| match event {
            WmEvent::FocusChanged { focused } => Some(focused.as_ref().map(|w| w.handle)),
            _ => None,
        })??;
        match self.platform.focus(focused) {
            Ok(()) => None,
            Err(err) => {
                warn!(handle = %focused, %err, "failed to focus native window");
                Some(err)
            }
        }
    }

    pub fn query_monitors(&self) -> Vec<MonitorData> { self.state.query_monitors() }

    pub fn query_workspaces(&self) -> Vec<WorkspaceData> { self.state.query_workspaces() }

    pub fn query_windows(&self) -> Vec<WindowData> { self.state.query_windows() }

    pub fn query_tree(&self) -> Option<ContainerData> {
        self.state.container_data(self.state.tree.root())
    }

    /// Plain-text snapshot for logs and bug reports.
    pub fn diagnostic_dump(&self) -> String {
        let focused = self
            .state
            .focused_window()
            .and_then(|w| self.state.window_data(w))
            .map(|w| format!("{} ({})", w.handle, w.title))
            .unwrap_or_else(|| "none".into());
        let state = self
            .query_tree()
            .and_then(|tree| serde_json::to_string(&tree).ok())
            .unwrap_or_default();
        format!(
            "focused: {focused}\nrecent commands: {}\npending events: {}\n{}\n{state}",
            self.history().join(", "),
            self.state.pending_events().len(),
            self.state.tree.draw()
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn history_keeps_most_recent_first_and_is_bounded() {
        let mut history = CommandHistory::new(2);
        history.record("a");
        history.record("b");
        history.record("c");
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["c", "b"]);
        history.set_capacity(1);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn tree_errors_map_to_command_errors() {
        let id = crate::model::tree::NodeId::from_raw(0x1_0000_0001);
        assert_eq!(
            CommandError::from(TreeError::NotFound(id)),
            CommandError::ContainerNotFound(0x1_0000_0001)
        );
        assert!(CommandError::from(TreeError::Invariant("x".into())).is_fatal());
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }

    #[test]
    fn failure_serializes_with_kind() {
        let response = CommandResponse::failure("resize", CommandError::InvalidResizeAmount("abc".into()));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "failure": {
                    "command": "resize",
                    "error": { "kind": "invalid_resize_amount", "detail": "abc" },
                }
            })
        );
    }
}
