//! Line-oriented client protocol.
//!
//! Each request is one line and gets exactly one [`ServerMessage`] back:
//!
//! ```text
//! command focus left
//! command {"command":"manage_window","handle":7,...}
//! keybinding alt+h
//! query monitors|workspaces|windows|tree|history|topics|dump
//! windows
//! subscribe focus_changed,window_managed
//! unsubscribe
//! ```
//!
//! Events for subscribed topics are delivered separately through the
//! event sink.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::actor::broadcast::ListenerId;
use crate::actor::reactor::ReactorHandle;
use crate::bus::{Command, CommandParseError, CommandResponse, WmEvent};
use crate::model::server::ServerMessage;

#[derive(Debug, thiserror::Error)]
enum IpcError {
    #[error("empty message")]
    Empty,
    #[error("unknown message {0:?}")]
    UnknownMessage(String),
    #[error("unknown query {0:?}")]
    UnknownQuery(String),
    #[error("{0}")]
    BadCommand(String),
    #[error("unknown topics: {}", .0.join(", "))]
    UnknownTopics(Vec<String>),
    #[error("subscribe needs at least one topic")]
    NoTopics,
    #[error("no keybinding {0:?}")]
    UnknownKeybinding(String),
    #[error("the engine is not running")]
    Unavailable,
}

pub struct IpcMessageHandler {
    reactor: ReactorHandle,
}

impl IpcMessageHandler {
    pub fn new(reactor: ReactorHandle) -> Self { Self { reactor } }

    /// Handles one request line from `listener` and returns the serialized reply.
    pub fn handle_message(&self, listener: ListenerId, message: &str) -> String {
        let message = message.trim();
        trace!(%listener, message, "ipc request");
        let reply = match self.respond(listener, message) {
            Ok((success, data, error)) => ServerMessage::ClientResponse {
                client_message: message.to_string(),
                success,
                data,
                error,
            },
            Err(err) => {
                debug!(%listener, %err, "rejected ipc request");
                ServerMessage::ClientResponse {
                    client_message: message.to_string(),
                    success: false,
                    data: None,
                    error: Some(err.to_string()),
                }
            }
        };
        reply.to_json()
    }

    fn respond(
        &self,
        listener: ListenerId,
        message: &str,
    ) -> Result<(bool, Option<Value>, Option<String>), IpcError> {
        let (verb, rest) = message.split_once(char::is_whitespace).unwrap_or((message, ""));
        let rest = rest.trim();
        match verb {
            "" => Err(IpcError::Empty),
            "command" => {
                let command = parse_command(rest)?;
                Ok(from_response(self.reactor.invoke(command)))
            }
            "keybinding" => {
                let responses = self
                    .reactor
                    .invoke_keybinding(rest)
                    .ok_or_else(|| IpcError::UnknownKeybinding(rest.to_string()))?;
                let success = responses.iter().all(CommandResponse::is_success);
                let error = responses.iter().find_map(|r| r.error()).map(ToString::to_string);
                Ok((success, to_value(&responses), error))
            }
            "query" => self.query(rest).map(|data| (true, data, None)),
            "monitors" | "workspaces" | "windows" | "tree" | "history" => {
                self.query(verb).map(|data| (true, data, None))
            }
            "subscribe" => {
                let topics: Vec<String> = rest
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
                if topics.is_empty() {
                    return Err(IpcError::NoTopics);
                }
                let rejected = self
                    .reactor
                    .subscribe(topics, listener)
                    .map_err(|_| IpcError::Unavailable)?;
                if !rejected.is_empty() {
                    return Err(IpcError::UnknownTopics(rejected));
                }
                Ok((true, None, None))
            }
            "unsubscribe" => {
                self.reactor.unsubscribe(listener);
                Ok((true, None, None))
            }
            other => Err(IpcError::UnknownMessage(other.to_string())),
        }
    }

    fn query(&self, what: &str) -> Result<Option<Value>, IpcError> {
        let data = match what {
            "monitors" => to_value(&self.reactor.query_monitors()),
            "workspaces" => to_value(&self.reactor.query_workspaces()),
            "windows" => to_value(&self.reactor.query_windows()),
            "tree" => to_value(&self.reactor.query_tree()),
            "history" => to_value(&self.reactor.query_history()),
            "topics" => to_value(WmEvent::topics()),
            "dump" => to_value(&self.reactor.query_dump()),
            other => return Err(IpcError::UnknownQuery(other.to_string())),
        };
        Ok(data)
    }
}

/// Accepts either the text grammar or a JSON object tagged with `command`.
fn parse_command(text: &str) -> Result<Command, IpcError> {
    if text.starts_with('{') {
        serde_json::from_str(text).map_err(|err| IpcError::BadCommand(err.to_string()))
    } else {
        text.parse().map_err(|err: CommandParseError| IpcError::BadCommand(err.to_string()))
    }
}

fn from_response(response: CommandResponse) -> (bool, Option<Value>, Option<String>) {
    let error = response.error().map(ToString::to_string);
    (response.is_success(), response.payload().and_then(to_value), error)
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Option<Value> { serde_json::to_value(value).ok() }

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_log::test;

    use super::*;
    use crate::actor::reactor::Reactor;
    use crate::bus::Bus;
    use crate::common::config::Config;

    fn handler() -> (IpcMessageHandler, ReactorHandle, std::thread::JoinHandle<Bus>) {
        let (reactor, thread) = Reactor::spawn(Bus::new(Config::default())).unwrap();
        (IpcMessageHandler::new(reactor.clone()), reactor, thread)
    }

    fn reply(handler: &IpcMessageHandler, message: &str) -> Value {
        serde_json::from_str(&handler.handle_message(ListenerId(1), message)).unwrap()
    }

    #[test]
    fn json_and_text_commands_share_one_entry_point() {
        let (ipc, reactor, thread) = handler();
        let added = reply(
            &ipc,
            r#"command {"command":"add_monitor","handle":1,"frame":{"x":0,"y":0,"width":800,"height":600}}"#,
        );
        assert_eq!(added["message_type"], "client_response");
        assert_eq!(added["success"], true);
        assert_eq!(added["data"]["type"], "monitor");

        let focused = reply(&ipc, "command focus workspace 2");
        assert_eq!(focused["success"], true);
        assert_eq!(focused["data"]["name"], "2");

        let topics = reply(&ipc, "query topics");
        assert!(topics["data"].as_array().unwrap().contains(&json!("focus_changed")));
        let dump = reply(&ipc, "query dump");
        assert!(dump["data"].as_str().unwrap().starts_with("focused: none"));

        let workspaces = reply(&ipc, "query workspaces");
        assert_eq!(workspaces["data"].as_array().map(Vec::len), Some(1));
        assert_eq!(reply(&ipc, "monitors")["data"][0]["displayed_workspace"], "2");

        reactor.shutdown();
        thread.join().unwrap();
    }

    #[test]
    fn bad_requests_get_an_error_reply() {
        let (ipc, reactor, thread) = handler();
        assert_eq!(reply(&ipc, "fly away")["error"], json!("unknown message \"fly\""));
        assert_eq!(reply(&ipc, "query nothing")["success"], false);
        assert_eq!(reply(&ipc, "command resize width")["success"], false);
        assert_eq!(reply(&ipc, "")["error"], json!("empty message"));
        reactor.shutdown();
        thread.join().unwrap();
    }

    #[test]
    fn subscribing_to_unknown_topics_fails() {
        let (ipc, reactor, thread) = handler();
        let rejected = reply(&ipc, "subscribe focus_changed,not_a_topic");
        assert_eq!(rejected["success"], false);
        assert_eq!(rejected["error"], json!("unknown topics: not_a_topic"));
        assert_eq!(reply(&ipc, "subscribe all")["success"], true);
        assert_eq!(reply(&ipc, "unsubscribe")["success"], true);
        reactor.shutdown();
        thread.join().unwrap();
    }
}
