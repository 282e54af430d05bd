//! In-process broker.
//!
//! Implements the [`BrokerLink`] seam for tests and loopback deployments:
//! named queues, ack/redeliver semantics, and per-host fault injection so
//! failover behavior can be exercised without a real broker.

use crate::{Acknowledge, BrokerChannel, BrokerLink, Delivery, TransportError};
use agent_config::{Credentials, Endpoint, QueueBinding};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<(u64, Vec<u8>)>,
    unacked: BTreeMap<u64, Vec<u8>>,
    next_tag: u64,
}

#[derive(Default)]
struct MemoryQueue {
    state: Mutex<QueueState>,
    ready: Notify,
}

impl MemoryQueue {
    fn push(&self, bytes: Vec<u8>) {
        let mut state = self.state.lock().expect("lock poisoned");
        let tag = state.next_tag;
        state.next_tag += 1;
        state.pending.push_back((tag, bytes));
        drop(state);
        self.ready.notify_one();
    }

    /// Move the next pending message to the unacked set.
    fn take_next(&self) -> Option<(u64, Vec<u8>)> {
        let mut state = self.state.lock().expect("lock poisoned");
        let (tag, bytes) = state.pending.pop_front()?;
        state.unacked.insert(tag, bytes.clone());
        Some((tag, bytes))
    }

    fn ack(&self, tag: u64) {
        self.state
            .lock()
            .expect("lock poisoned")
            .unacked
            .remove(&tag);
    }

    /// Return everything unacked to the front of the queue, oldest first.
    fn requeue_unacked(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        let unacked = std::mem::take(&mut state.unacked);
        for (tag, bytes) in unacked.into_iter().rev() {
            state.pending.push_front((tag, bytes));
        }
    }

    fn requeue(&self, tag: u64) {
        let mut state = self.state.lock().expect("lock poisoned");
        if let Some(bytes) = state.unacked.remove(&tag) {
            state.pending.push_front((tag, bytes));
        }
    }
}

struct ChannelHandle {
    host: String,
    open: Arc<AtomicBool>,
    closed: Arc<Notify>,
}

#[derive(Default)]
struct BrokerCore {
    queues: Mutex<HashMap<String, Arc<MemoryQueue>>>,
    down_hosts: Mutex<HashSet<String>>,
    channels: Mutex<Vec<ChannelHandle>>,
    fail_publishes: AtomicU32,
}

impl BrokerCore {
    fn queue(&self, name: &str) -> Arc<MemoryQueue> {
        let mut queues = self.queues.lock().expect("lock poisoned");
        queues.entry(name.to_string()).or_default().clone()
    }
}

/// An in-process broker shared by every channel opened through it.
#[derive(Default)]
pub struct MemoryBroker {
    core: Arc<BrokerCore>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a host unreachable (severing its open channels) or reachable.
    pub fn set_host_down(&self, host: &str, down: bool) {
        {
            let mut down_hosts = self.core.down_hosts.lock().expect("lock poisoned");
            if down {
                down_hosts.insert(host.to_string());
            } else {
                down_hosts.remove(host);
            }
        }
        if down {
            let channels = self.core.channels.lock().expect("lock poisoned");
            for channel in channels.iter().filter(|c| c.host == host) {
                channel.open.store(false, Ordering::SeqCst);
                channel.closed.notify_one();
            }
        }
    }

    /// Make the next `n` publishes fail without confirmation.
    pub fn fail_next_publishes(&self, n: u32) {
        self.core.fail_publishes.store(n, Ordering::SeqCst);
    }

    /// Place a message directly on a queue, bypassing any channel.
    pub fn enqueue(&self, queue_name: &str, bytes: Vec<u8>) {
        self.core.queue(queue_name).push(bytes);
    }

    /// Drain and return every pending message on a queue.
    pub fn take_published(&self, queue_name: &str) -> Vec<Vec<u8>> {
        let queue = self.core.queue(queue_name);
        let mut state = queue.state.lock().expect("lock poisoned");
        state.pending.drain(..).map(|(_, bytes)| bytes).collect()
    }

    /// Number of messages waiting on a queue.
    pub fn queue_depth(&self, queue_name: &str) -> usize {
        let queue = self.core.queue(queue_name);
        let state = queue.state.lock().expect("lock poisoned");
        state.pending.len()
    }
}

#[async_trait]
impl BrokerLink for MemoryBroker {
    async fn open(
        &self,
        endpoint: &Endpoint,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn BrokerChannel>, TransportError> {
        if self
            .core
            .down_hosts
            .lock()
            .expect("lock poisoned")
            .contains(&endpoint.host)
        {
            return Err(TransportError::Connection(format!(
                "host {} unreachable",
                endpoint.host
            )));
        }

        let open = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(Notify::new());
        self.core
            .channels
            .lock()
            .expect("lock poisoned")
            .push(ChannelHandle {
                host: endpoint.host.clone(),
                open: open.clone(),
                closed: closed.clone(),
            });

        Ok(Arc::new(MemoryChannel {
            core: self.core.clone(),
            open,
            closed,
        }))
    }
}

struct MemoryChannel {
    core: Arc<BrokerCore>,
    open: Arc<AtomicBool>,
    closed: Arc<Notify>,
}

#[async_trait]
impl BrokerChannel for MemoryChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn publish(&self, binding: &QueueBinding, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Connection("channel closed".to_string()));
        }
        if self
            .core
            .fail_publishes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TransportError::Unconfirmed);
        }
        self.core.queue(&binding.queue_name).push(bytes.to_vec());
        Ok(())
    }

    async fn consume(
        &self,
        binding: &QueueBinding,
        deliveries: mpsc::Sender<Delivery>,
    ) -> Result<(), TransportError> {
        let queue = self.core.queue(&binding.queue_name);
        loop {
            if !self.is_open() {
                queue.requeue_unacked();
                return Err(TransportError::Connection(
                    "connection severed".to_string(),
                ));
            }

            match queue.take_next() {
                Some((tag, bytes)) => {
                    let delivery = Delivery::new(
                        bytes,
                        Box::new(MemoryAcker {
                            queue: queue.clone(),
                            tag,
                        }),
                    );
                    if deliveries.send(delivery).await.is_err() {
                        queue.requeue(tag);
                        return Ok(());
                    }
                }
                None => {
                    tokio::select! {
                        _ = queue.ready.notified() => {}
                        _ = self.closed.notified() => {}
                    }
                }
            }
        }
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.closed.notify_one();
    }
}

struct MemoryAcker {
    queue: Arc<MemoryQueue>,
    tag: u64,
}

impl Acknowledge for MemoryAcker {
    fn ack(self: Box<Self>) {
        self.queue.ack(self.tag);
    }
}
