//! Actors own a piece of state and talk to each other over channels.
//!
//! Every message carries the [`tracing::Span`] that was current when it was
//! sent, so the receiving side can log inside the sender's context.

pub mod broadcast;
pub mod config_watcher;
pub mod reactor;

use crossbeam_channel::SendError;

pub struct Sender<Event>(crossbeam_channel::Sender<(tracing::Span, Event)>);

pub struct Receiver<Event>(crossbeam_channel::Receiver<(tracing::Span, Event)>);

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Sender(tx), Receiver(rx))
}

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Event> Sender<Event> {
    /// Sends without reporting a closed channel. The receiver going away
    /// means the program is shutting down.
    pub fn send(&self, event: Event) {
        if self.try_send(event).is_err() {
            tracing::trace!("dropping event, receiver is gone");
        }
    }

    pub fn try_send(&self, event: Event) -> Result<(), SendError<(tracing::Span, Event)>> {
        self.0.send((tracing::Span::current(), event))
    }
}

impl<Event> Receiver<Event> {
    /// Blocks until an event arrives. `None` once every sender is gone.
    pub fn recv(&self) -> Option<(tracing::Span, Event)> { self.0.recv().ok() }
}
