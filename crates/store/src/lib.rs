use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

pub use shared::error::StoreError;

pub mod paths;
pub mod remote;
pub(crate) mod tree;

pub use remote::HostedStore;

/// Current value of a subscribed subtree. `None` means the path is absent
/// from the store.
pub type Snapshot = Option<Value>;

/// The hosted realtime key-value tree the whole system hangs off.
///
/// Contract: `subscribe` delivers the full subtree value on every committed
/// change; `update` applies a mapping of absolute path to value as one
/// all-or-nothing commit; `put` is a single-path overwrite. There is no
/// compare-and-swap primitive, so read-then-write increments can lose
/// updates under concurrent writers.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Subscribe to `path`. The receiver starts at the current value and is
    /// refreshed on every committed change touching the subtree.
    async fn subscribe(&self, path: &str) -> Result<watch::Receiver<Snapshot>, StoreError>;

    /// Overwrite the value at a single path. `Value::Null` removes the node.
    async fn put(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Apply `changes` (absolute path -> new value) as one atomic commit.
    async fn update(&self, changes: BTreeMap<String, Value>) -> Result<(), StoreError>;

    /// Create a child of `path` under a store-assigned key and return it.
    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError>;
}

struct Watcher {
    path: String,
    tx: watch::Sender<Snapshot>,
}

#[derive(Default)]
struct MemoryInner {
    tree: Value,
    watchers: Vec<Watcher>,
}

/// In-process implementation of the store contract: one JSON tree behind a
/// lock, watch fan-out performed synchronously inside the commit.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn commit(&self, changes: impl IntoIterator<Item = (String, Value)>) {
        let mut inner = self.inner.lock().await;
        let MemoryInner { tree, watchers } = &mut *inner;
        for (path, value) in changes {
            tree::write(tree, &path, value);
        }
        watchers.retain(|watcher| !watcher.tx.is_closed());
        for watcher in watchers.iter() {
            let next = tree::subtree(tree, &watcher.path).cloned();
            watcher.tx.send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next;
                    true
                }
            });
        }
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn subscribe(&self, path: &str) -> Result<watch::Receiver<Snapshot>, StoreError> {
        let mut inner = self.inner.lock().await;
        let initial = tree::subtree(&inner.tree, path).cloned();
        let (tx, rx) = watch::channel(initial);
        inner.watchers.push(Watcher {
            path: path.to_string(),
            tx,
        });
        Ok(rx)
    }

    async fn put(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.commit([(path.to_string(), value)]).await;
        Ok(())
    }

    async fn update(&self, changes: BTreeMap<String, Value>) -> Result<(), StoreError> {
        self.commit(changes).await;
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let key = Uuid::new_v4().simple().to_string();
        self.commit([(format!("{path}/{key}"), value)]).await;
        Ok(key)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
