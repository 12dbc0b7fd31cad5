// aoi_server/server/src/network/connection.rs
use crate::core::error::{ConnectionError, ConnectionResult};
use bytes::Bytes;
use crossbeam_queue::SegQueue;
use dashmap::DashMap;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Capability surface a client connection offers to the game layer.
///
/// The AOI index never sees a connection; players hold one and push query
/// results through it.
pub trait Connection: Send + Sync {
    fn start(&self);
    fn stop(&self);
    fn conn_id(&self) -> u32;
    fn remote_addr(&self) -> SocketAddr;
    fn send_msg(&self, msg_id: u32, data: Bytes) -> ConnectionResult<()>;
    fn set_property(&self, key: &str, value: Value);
    fn get_property(&self, key: &str) -> ConnectionResult<Value>;
    fn remove_property(&self, key: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub msg_id: u32,
    pub data: Bytes,
}

/// In-process connection that queues outbound messages instead of writing to a socket.
#[derive(Debug)]
pub struct QueuedConnection {
    conn_id: u32,
    remote_addr: SocketAddr,
    outbox: SegQueue<OutboundMessage>,
    properties: DashMap<String, Value>,
    closed: AtomicBool,
}

impl QueuedConnection {
    pub fn new(conn_id: u32, remote_addr: SocketAddr) -> Self {
        QueuedConnection {
            conn_id,
            remote_addr,
            outbox: SegQueue::new(),
            properties: DashMap::new(),
            closed: AtomicBool::new(true),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn pop_outbound(&self) -> Option<OutboundMessage> {
        self.outbox.pop()
    }

    pub fn drain_outbound(&self) -> Vec<OutboundMessage> {
        let mut drained = Vec::with_capacity(self.outbox.len());
        while let Some(msg) = self.outbox.pop() {
            drained.push(msg);
        }
        drained
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }
}

impl Connection for QueuedConnection {
    fn start(&self) {
        self.closed.store(false, Ordering::Release);
        debug!("Connection {} started for {}", self.conn_id, self.remote_addr);
    }

    fn stop(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Connection {} stopped, {} messages left unsent", self.conn_id, self.outbox.len());
        }
    }

    fn conn_id(&self) -> u32 {
        self.conn_id
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    fn send_msg(&self, msg_id: u32, data: Bytes) -> ConnectionResult<()> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        trace!("Connection {} queued msg {} ({} bytes)", self.conn_id, msg_id, data.len());
        self.outbox.push(OutboundMessage { msg_id, data });
        Ok(())
    }

    fn set_property(&self, key: &str, value: Value) {
        self.properties.insert(key.to_string(), value);
    }

    fn get_property(&self, key: &str) -> ConnectionResult<Value> {
        self.properties
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ConnectionError::PropertyNotFound(key.to_string()))
    }

    fn remove_property(&self, key: &str) {
        self.properties.remove(key);
    }
}
