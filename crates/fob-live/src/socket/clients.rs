//! Connected client handles and the registry that tracks them.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;

/// Identity of one connection. Never reused, even when the same browser
/// reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outgoing frame queue of one client. Frames are pre-serialized JSON.
pub type FrameSender = mpsc::UnboundedSender<Arc<str>>;

/// Server-side handle of a connected client.
///
/// Frames pushed through [`ClientHandle::push`] reach the client in push
/// order.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ClientId,
    connected_at: SystemTime,
    tx: FrameSender,
}

impl ClientHandle {
    pub fn new(id: ClientId, tx: FrameSender) -> Self {
        Self {
            id,
            connected_at: SystemTime::now(),
            tx,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn connected_at(&self) -> SystemTime {
        self.connected_at
    }

    /// Queue a frame. Fails only when the connection side has gone away.
    pub fn push(&self, frame: Arc<str>) -> Result<(), Arc<str>> {
        self.tx.send(frame).map_err(|e| e.0)
    }

    /// Whether the connection side is still receiving.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Live set of connected clients, iterated in connection order.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: IndexMap<ClientId, ClientHandle>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle. Re-adding an id replaces the previous handle in
    /// place.
    pub fn add(&mut self, handle: ClientHandle) {
        self.clients.insert(handle.id(), handle);
    }

    /// Remove a handle. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: ClientId) -> Option<ClientHandle> {
        self.clients.shift_remove(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&ClientHandle> {
        self.clients.get(&id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Visit every handle in insertion order.
    pub fn for_each(&self, mut f: impl FnMut(&ClientHandle)) {
        for handle in self.clients.values() {
            f(handle);
        }
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Remove every handle, dropping their senders.
    pub fn clear(&mut self) -> usize {
        let count = self.clients.len();
        self.clients.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64) -> (ClientHandle, mpsc::UnboundedReceiver<Arc<str>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ClientHandle::new(ClientId::new(id), tx), rx)
    }

    #[test]
    fn test_iterates_in_insertion_order() {
        let mut registry = ClientRegistry::new();
        for id in [5, 1, 3] {
            registry.add(handle(id).0);
        }

        let mut seen = Vec::new();
        registry.for_each(|h| seen.push(h.id().get()));
        assert_eq!(seen, vec![5, 1, 3]);

        registry.remove(ClientId::new(1));
        assert_eq!(registry.ids(), vec![ClientId::new(5), ClientId::new(3)]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = ClientRegistry::new();
        registry.add(handle(1).0);

        assert!(registry.remove(ClientId::new(1)).is_some());
        assert!(registry.remove(ClientId::new(1)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_push_keeps_order_and_detects_closed() {
        let (h, mut rx) = handle(1);
        h.push("a".into()).unwrap();
        h.push("b".into()).unwrap();
        assert_eq!(&*rx.try_recv().unwrap(), "a");
        assert_eq!(&*rx.try_recv().unwrap(), "b");

        drop(rx);
        assert!(!h.is_open());
        assert!(h.push("c".into()).is_err());
    }

    #[test]
    fn test_clear_reports_count() {
        let mut registry = ClientRegistry::new();
        registry.add(handle(1).0);
        registry.add(handle(2).0);
        assert_eq!(registry.clear(), 2);
        assert_eq!(registry.len(), 0);
    }
}
