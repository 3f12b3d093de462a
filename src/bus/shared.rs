use std::sync::Arc;

use parking_lot::RwLock;

use super::{Bus, Command, CommandResponse};
use crate::actor::broadcast::ListenerId;
use crate::model::server::{ContainerData, MonitorData, WindowData, WorkspaceData};

/// A [`Bus`] shared between threads.
///
/// Commands take the write lock for their whole duration, so each one sees
/// and leaves a consistent state. Queries share the read lock and never
/// observe a command half way through.
#[derive(Clone)]
pub struct SharedBus(Arc<RwLock<Bus>>);

static_assertions::assert_impl_all!(SharedBus: Send, Sync, Clone);

impl SharedBus {
    pub fn new(bus: Bus) -> Self { Self(Arc::new(RwLock::new(bus))) }

    pub fn invoke(&self, command: Command) -> CommandResponse { self.0.write().invoke(command) }

    pub fn invoke_keybinding(&self, binding: &str) -> Option<Vec<CommandResponse>> {
        self.0.write().invoke_keybinding(binding)
    }

    pub fn subscribe(&self, topic: &str, listener: ListenerId) -> bool {
        self.0.write().subscribe(topic, listener)
    }

    pub fn unsubscribe(&self, listener: ListenerId) -> bool { self.0.write().unsubscribe(listener) }

    pub fn query_monitors(&self) -> Vec<MonitorData> { self.0.read().query_monitors() }

    pub fn query_workspaces(&self) -> Vec<WorkspaceData> { self.0.read().query_workspaces() }

    pub fn query_windows(&self) -> Vec<WindowData> { self.0.read().query_windows() }

    pub fn query_tree(&self) -> Option<ContainerData> { self.0.read().query_tree() }

    pub fn history(&self) -> Vec<&'static str> { self.0.read().history() }

    /// Runs `f` against a consistent snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&Bus) -> T) -> T { f(&self.0.read()) }

    /// Gives the bus back once this is the last handle.
    pub fn into_inner(self) -> Result<Bus, Self> {
        Arc::try_unwrap(self.0).map(RwLock::into_inner).map_err(Self)
    }
}
