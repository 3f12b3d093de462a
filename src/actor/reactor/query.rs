use std::sync::mpsc::{RecvError, SyncSender, sync_channel};

use crate::actor::reactor::{Event, Reactor, Sender};
use crate::model::server::{ContainerData, MonitorData, WindowData, WorkspaceData};

#[derive(Clone)]
pub struct ReactorQueryHandle {
    tx: Sender,
}

impl ReactorQueryHandle {
    pub(super) fn new(tx: Sender) -> Self { Self { tx } }

    fn send_query<T>(
        &self,
        build: impl FnOnce(SyncSender<T>) -> QueryRequest,
    ) -> Result<T, RecvError> {
        let (tx, rx) = sync_channel(1);
        if self.tx.try_send(Event::Query(build(tx))).is_err() {
            return Err(RecvError);
        }
        rx.recv().map_err(|_| RecvError)
    }

    pub fn query_monitors(&self) -> Vec<MonitorData> {
        self.send_query(QueryRequest::Monitors).unwrap_or_default()
    }

    pub fn query_workspaces(&self) -> Vec<WorkspaceData> {
        self.send_query(QueryRequest::Workspaces).unwrap_or_default()
    }

    pub fn query_windows(&self) -> Vec<WindowData> {
        self.send_query(QueryRequest::Windows).unwrap_or_default()
    }

    pub fn query_tree(&self) -> Option<ContainerData> {
        self.send_query(QueryRequest::Tree).ok().flatten()
    }

    pub fn query_history(&self) -> Vec<&'static str> {
        self.send_query(QueryRequest::History).unwrap_or_default()
    }

    pub fn query_dump(&self) -> String { self.send_query(QueryRequest::Dump).unwrap_or_default() }
}

#[derive(Debug)]
pub enum QueryRequest {
    Monitors(SyncSender<Vec<MonitorData>>),
    Workspaces(SyncSender<Vec<WorkspaceData>>),
    Windows(SyncSender<Vec<WindowData>>),
    Tree(SyncSender<Option<ContainerData>>),
    History(SyncSender<Vec<&'static str>>),
    Dump(SyncSender<String>),
}

impl Reactor {
    pub(super) fn handle_query_request(&mut self, req: QueryRequest) {
        let bus = &self.bus;
        match req {
            QueryRequest::Monitors(resp) => {
                let _ = resp.send(bus.query_monitors());
            }
            QueryRequest::Workspaces(resp) => {
                let _ = resp.send(bus.query_workspaces());
            }
            QueryRequest::Windows(resp) => {
                let _ = resp.send(bus.query_windows());
            }
            QueryRequest::Tree(resp) => {
                let _ = resp.send(bus.query_tree());
            }
            QueryRequest::History(resp) => {
                let _ = resp.send(bus.history());
            }
            QueryRequest::Dump(resp) => {
                let _ = resp.send(bus.diagnostic_dump());
            }
        }
    }
}
