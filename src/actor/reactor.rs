//! The reactor is the single thread that owns the [`Bus`].
//!
//! Platform adapters, the config watcher and IPC clients all talk to it by
//! sending [`Event`]s, so commands are applied strictly one after another
//! in arrival order.

mod query;

use std::sync::mpsc::{RecvError, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, info_span, trace, warn};

use crate::actor::{self, broadcast::ListenerId};
use crate::bus::{Bus, Command, CommandError, CommandResponse, WmEvent};

pub type Sender = actor::Sender<Event>;
type Receiver = actor::Receiver<Event>;
pub use query::{QueryRequest, ReactorQueryHandle};

#[derive(Debug)]
pub enum Event {
    /// Run a command. The response is sent back when a reply channel is given.
    Command(Command, Option<SyncSender<CommandResponse>>),
    Keybinding(String, SyncSender<Option<Vec<CommandResponse>>>),
    Query(QueryRequest),
    /// Subscribes to all of `topics` or, if any is unknown, to none of them.
    /// The reply lists the unknown topics.
    Subscribe {
        topics: Vec<String>,
        listener: ListenerId,
        resp: SyncSender<Vec<String>>,
    },
    Unsubscribe(ListenerId),
    Shutdown,
}

#[derive(Clone)]
pub struct ReactorHandle {
    sender: Sender,
    queries: ReactorQueryHandle,
}

impl ReactorHandle {
    pub fn new(sender: Sender, queries: ReactorQueryHandle) -> Self { Self { sender, queries } }

    pub fn sender(&self) -> Sender { self.sender.clone() }

    pub fn send(&self, event: Event) { self.sender.send(event) }

    /// Queues a command without waiting for it.
    pub fn submit(&self, command: Command) { self.send(Event::Command(command, None)) }

    /// Runs a command and waits for its response.
    pub fn invoke(&self, command: Command) -> CommandResponse {
        let name = command.name();
        let (tx, rx) = sync_channel(1);
        if self.sender.try_send(Event::Command(command, Some(tx))).is_err() {
            return CommandResponse::failure(name, CommandError::EngineUnavailable);
        }
        rx.recv()
            .unwrap_or_else(|_| CommandResponse::failure(name, CommandError::EngineUnavailable))
    }

    pub fn invoke_keybinding(&self, binding: &str) -> Option<Vec<CommandResponse>> {
        let (tx, rx) = sync_channel(1);
        self.sender.try_send(Event::Keybinding(binding.to_string(), tx)).ok()?;
        rx.recv().ok().flatten()
    }

    /// Returns the topics that were rejected; nothing is subscribed then.
    pub fn subscribe(&self, topics: Vec<String>, listener: ListenerId) -> Result<Vec<String>, RecvError> {
        let (resp, rx) = sync_channel(1);
        if self.sender.try_send(Event::Subscribe { topics, listener, resp }).is_err() {
            return Err(RecvError);
        }
        rx.recv()
    }

    pub fn unsubscribe(&self, listener: ListenerId) { self.send(Event::Unsubscribe(listener)) }

    pub fn shutdown(&self) { self.send(Event::Shutdown) }
}

impl std::ops::Deref for ReactorHandle {
    type Target = ReactorQueryHandle;

    fn deref(&self) -> &Self::Target { &self.queries }
}

pub struct Reactor {
    bus: Bus,
}

impl Reactor {
    pub fn new(bus: Bus) -> Self { Self { bus } }

    /// Starts the reactor thread. Joining the returned handle gives the bus
    /// back after [`ReactorHandle::shutdown`] or once every sender is gone.
    pub fn spawn(bus: Bus) -> std::io::Result<(ReactorHandle, JoinHandle<Bus>)> {
        let (events_tx, events) = actor::channel();
        let query_handle = ReactorQueryHandle::new(events_tx.clone());
        let reactor = Reactor::new(bus);
        let thread = thread::Builder::new()
            .name("reactor".to_string())
            .spawn(move || Self::run(reactor, events))?;
        Ok((ReactorHandle::new(events_tx, query_handle), thread))
    }

    fn run(mut reactor: Reactor, events: Receiver) -> Bus {
        while let Some((span, event)) = events.recv() {
            let _guard = span.enter();
            if !reactor.handle_event(event) {
                break;
            }
        }
        info!("reactor stopped");
        reactor.bus
    }

    /// Returns false when the reactor should stop.
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Command(command, resp) => {
                let _span = info_span!("command", name = command.name()).entered();
                let response = self.bus.invoke(command);
                if let Some(err) = response.error() {
                    debug!(%err, "command did not succeed");
                }
                if let Some(resp) = resp {
                    let _ = resp.send(response);
                }
            }
            Event::Keybinding(binding, resp) => {
                trace!(binding, "keybinding");
                let _ = resp.send(self.bus.invoke_keybinding(&binding));
            }
            Event::Query(req) => self.handle_query_request(req),
            Event::Subscribe { topics, listener, resp } => {
                let unknown: Vec<String> =
                    topics.iter().filter(|t| !WmEvent::is_known_topic(t)).cloned().collect();
                if unknown.is_empty() {
                    for topic in &topics {
                        self.bus.subscribe(topic, listener);
                    }
                } else {
                    warn!(%listener, ?unknown, "rejecting subscription");
                }
                let _ = resp.send(unknown);
            }
            Event::Unsubscribe(listener) => {
                self.bus.unsubscribe(listener);
            }
            Event::Shutdown => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor::broadcast::{EventSink, SinkError};
    use crate::common::config::Config;
    use crate::model::container::MonitorHandle;
    use crate::sys::geometry::Rect;

    #[test]
    fn commands_and_queries_go_through_the_reactor_thread() {
        let (handle, thread) = Reactor::spawn(Bus::new(Config::default())).unwrap();
        let response = handle.invoke(Command::AddMonitor {
            handle: MonitorHandle(1),
            frame: Rect::new(0, 0, 800, 600),
        });
        assert!(response.is_success(), "{response:?}");
        assert_eq!(handle.query_monitors().len(), 1);
        assert_eq!(handle.query_history(), vec!["add_monitor"]);

        handle.shutdown();
        let bus = thread.join().unwrap();
        assert_eq!(bus.query_workspaces().len(), 1);
    }

    #[test]
    fn unknown_topics_reject_the_whole_subscription() {
        let (handle, thread) = Reactor::spawn(Bus::new(Config::default())).unwrap();
        let rejected = handle
            .subscribe(vec!["focus_changed".into(), "bogus".into()], ListenerId(1))
            .unwrap();
        assert_eq!(rejected, vec!["bogus".to_string()]);
        handle.shutdown();
        let bus = thread.join().unwrap();
        assert!(bus.subscriptions().listeners("focus_changed").is_empty());
    }

    struct ExplodingSink;

    impl EventSink for ExplodingSink {
        fn deliver(&self, _: ListenerId, _: &str) -> Result<(), SinkError> { panic!("listener crashed") }
    }

    #[test]
    fn a_panicking_sink_fails_one_command_and_keeps_the_reactor_alive() {
        let bus = Bus::new(Config::default()).with_sink(ExplodingSink);
        let (handle, thread) = Reactor::spawn(bus).unwrap();
        let add_monitor = || Command::AddMonitor {
            handle: MonitorHandle(1),
            frame: Rect::new(0, 0, 800, 600),
        };
        assert!(handle.subscribe(vec!["monitor_added".into()], ListenerId(1)).unwrap().is_empty());

        let response = handle.invoke(add_monitor());
        assert!(matches!(response.error(), Some(CommandError::HandlerPanicked(_))), "{response:?}");
        assert!(handle.query_monitors().is_empty());

        handle.unsubscribe(ListenerId(1));
        assert!(handle.invoke(add_monitor()).is_success());
        assert_eq!(handle.query_monitors().len(), 1);
        assert!(handle.query_dump().contains("recent commands: add_monitor, add_monitor"));

        handle.shutdown();
        thread.join().unwrap();
    }

    #[test]
    fn invoking_after_shutdown_reports_engine_unavailable() {
        let (handle, thread) = Reactor::spawn(Bus::new(Config::default())).unwrap();
        handle.shutdown();
        thread.join().unwrap();
        let response = handle.invoke(Command::Redraw);
        assert_eq!(response.error(), Some(&CommandError::EngineUnavailable));
    }
}
