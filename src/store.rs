//! The realtime store contract and an in-memory implementation.
//!
//! A store hands out one [`Subscription`] per listener. Each subscription
//! receives the current value at its path right away and again whenever that
//! value changes, until it is dropped, unsubscribed, or its [`CancelToken`]
//! fires.

use crate::errors::StoreError;
use crate::models::CompanyId;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;

const SUBSCRIPTION_BUFFER: usize = 8;

pub type SnapshotEvent = Result<Option<Value>, StoreError>;

pub type SharedStore = Arc<dyn RealtimeStore>;

pub trait RealtimeStore: Send + Sync + 'static {
    fn subscribe(&self, path: &DataPath, cancel: &CancelToken) -> Subscription;
}

/// Slash separated location in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataPath(String);

impl DataPath {
    pub fn drivers() -> Self {
        Self("drivers".to_string())
    }

    pub fn vehicles() -> Self {
        Self("vehicles".to_string())
    }

    pub fn company_vehicles(company: &CompanyId) -> Self {
        Self(format!("vehicles/{company}"))
    }

    pub fn companies() -> Self {
        Self("company".to_string())
    }

    pub fn company(company: &CompanyId) -> Self {
        Self(format!("company/{company}"))
    }

    pub fn routes(company: &CompanyId) -> Self {
        Self(format!("routes/{company}"))
    }

    pub fn departed(company: &CompanyId) -> Self {
        Self(format!("departed/{company}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-view cancellation signal. Clones share the same state.
#[derive(Debug, Clone)]
pub struct CancelToken {
    signal: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
        }
    }

    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }

    pub async fn cancelled(&self) {
        let mut rx = self.signal.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[derive(Debug)]
pub struct Subscription {
    path: DataPath,
    events: mpsc::Receiver<SnapshotEvent>,
}

impl Subscription {
    pub fn from_channel(path: DataPath, events: mpsc::Receiver<SnapshotEvent>) -> Self {
        Self { path, events }
    }

    pub fn path(&self) -> &DataPath {
        &self.path
    }

    /// Next snapshot or error; `None` once the listener is gone.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.events.close();
    }
}

/// Reads the current value at `path` once and releases the listener.
pub async fn read_once(store: &dyn RealtimeStore, path: &DataPath) -> SnapshotEvent {
    let cancel = CancelToken::new();
    let mut subscription = store.subscribe(path, &cancel);
    let event = subscription.next().await.unwrap_or(Err(StoreError::Closed));
    cancel.cancel();
    subscription.unsubscribe();
    event
}

#[derive(Debug, Default)]
struct Tree {
    root: Value,
    failures: BTreeMap<String, String>,
}

impl Tree {
    fn event_at(&self, path: &DataPath) -> SnapshotEvent {
        if let Some(message) = self.failures.get(path.as_str()) {
            return Err(StoreError::Subscription {
                path: path.to_string(),
                message: message.clone(),
            });
        }
        Ok(lookup(&self.root, path).cloned())
    }
}

fn lookup<'a>(root: &'a Value, path: &DataPath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if node.is_null() { None } else { Some(node) }
}

fn insert(node: &mut Value, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if value.is_null() {
        let Value::Object(map) = node else {
            return;
        };
        if rest.is_empty() {
            map.shift_remove(*first);
        } else if let Some(child) = map.get_mut(*first) {
            insert(child, rest, value);
        }
        return;
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    let child = map.entry((*first).to_string()).or_insert(Value::Null);
    insert(child, rest, value);
}

/// A whole document tree held in memory, pushing changes to its listeners.
/// Serves as the dashboard's data source and as the test double.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tree: Arc<watch::Sender<Tree>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl MemoryStore {
    pub fn new(root: Value) -> Self {
        let (tree, _) = watch::channel(Tree {
            root,
            failures: BTreeMap::new(),
        });
        Self {
            tree: Arc::new(tree),
        }
    }

    pub fn replace_root(&self, root: Value) {
        self.tree.send_modify(|tree| tree.root = root);
    }

    /// Writes `value` at `path`; `null` removes the entry.
    pub fn set(&self, path: &DataPath, value: Value) {
        let segments: Vec<&str> = path.segments().collect();
        self.tree
            .send_modify(|tree| insert(&mut tree.root, &segments, value));
    }

    pub fn get(&self, path: &DataPath) -> Option<Value> {
        lookup(&self.tree.borrow().root, path).cloned()
    }

    /// Makes every listener at `path` report `message` as a listener failure.
    pub fn fail(&self, path: &DataPath, message: impl Into<String>) {
        let message = message.into();
        self.tree.send_modify(|tree| {
            tree.failures.insert(path.to_string(), message);
        });
    }

    pub fn listener_count(&self) -> usize {
        // One receiver is held by each live forwarding task.
        self.tree.receiver_count()
    }
}

impl RealtimeStore for MemoryStore {
    fn subscribe(&self, path: &DataPath, cancel: &CancelToken) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut tree = self.tree.subscribe();
        let cancel = cancel.clone();
        let task_path = path.clone();
        tokio::spawn(async move {
            let mut last: Option<SnapshotEvent> = None;
            loop {
                let event = tree.borrow_and_update().event_at(&task_path);
                if last.as_ref() != Some(&event) {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        sent = tx.send(event.clone()) => if sent.is_err() { break },
                    }
                    last = Some(event);
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tx.closed() => break,
                    changed = tree.changed() => if changed.is_err() { break },
                }
            }
            debug!(path = %task_path, "listener released");
        });
        Subscription::from_channel(path.clone(), rx)
    }
}

/// Delegates to a [`MemoryStore`] but never answers listeners whose path
/// starts with one of the stalled prefixes.
#[cfg(test)]
pub(crate) struct StalledStore {
    inner: MemoryStore,
    stalled: Vec<&'static str>,
    parked: std::sync::Mutex<Vec<mpsc::Sender<SnapshotEvent>>>,
}

#[cfg(test)]
impl StalledStore {
    pub(crate) fn new(inner: MemoryStore, stalled: &[&'static str]) -> Self {
        Self {
            inner,
            stalled: stalled.to_vec(),
            parked: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl RealtimeStore for StalledStore {
    fn subscribe(&self, path: &DataPath, cancel: &CancelToken) -> Subscription {
        if self.stalled.iter().any(|prefix| path.as_str().starts_with(prefix)) {
            let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
            self.parked.lock().unwrap().push(tx);
            return Subscription::from_channel(path.clone(), rx);
        }
        self.inner.subscribe(path, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn company(id: &str) -> CompanyId {
        CompanyId::parse(id).unwrap()
    }

    async fn wait_for_listeners(store: &MemoryStore, expected: usize) {
        timeout(Duration::from_secs(1), async {
            while store.listener_count() != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("listener count never settled");
    }

    #[test]
    fn paths_render_company_scope() {
        let acme = company("acme");
        assert_eq!(DataPath::company_vehicles(&acme).as_str(), "vehicles/acme");
        assert_eq!(DataPath::company(&acme).as_str(), "company/acme");
        assert_eq!(DataPath::routes(&acme).as_str(), "routes/acme");
        assert_eq!(DataPath::departed(&acme).as_str(), "departed/acme");
    }

    #[test]
    fn set_and_get_nested_values() {
        let store = MemoryStore::default();
        let path = DataPath::routes(&company("c1"));
        store.set(&path, json!({ "r1": { "routeName": "north" } }));
        assert_eq!(store.get(&DataPath::companies()), None);
        assert_eq!(
            store.get(&path),
            Some(json!({ "r1": { "routeName": "north" } }))
        );
        store.set(&path, Value::Null);
        assert_eq!(store.get(&path), None);
    }

    #[tokio::test]
    async fn subscription_gets_current_value_then_changes() {
        let store = MemoryStore::new(json!({ "drivers": { "L1": { "name": "A" } } }));
        let cancel = CancelToken::new();
        let mut subscription = store.subscribe(&DataPath::drivers(), &cancel);

        let first = subscription.next().await.unwrap().unwrap();
        assert_eq!(first, Some(json!({ "L1": { "name": "A" } })));

        store.set(&DataPath::drivers(), Value::Null);
        let second = subscription.next().await.unwrap().unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn unrelated_writes_do_not_push() {
        let store = MemoryStore::new(json!({ "drivers": { "L1": {} } }));
        let cancel = CancelToken::new();
        let mut subscription = store.subscribe(&DataPath::drivers(), &cancel);
        subscription.next().await.unwrap().unwrap();

        store.set(&DataPath::vehicles(), json!({ "u1": { "V1": {} } }));
        let pending = timeout(Duration::from_millis(50), subscription.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn failures_reach_listeners() {
        let store = MemoryStore::default();
        let path = DataPath::routes(&company("c1"));
        store.fail(&path, "permission denied");
        let event = read_once(&store, &path).await;
        assert!(matches!(event, Err(StoreError::Subscription { .. })));
    }

    #[tokio::test]
    async fn cancel_releases_listener() {
        let store = MemoryStore::default();
        let cancel = CancelToken::new();
        let mut subscription = store.subscribe(&DataPath::drivers(), &cancel);
        subscription.next().await.unwrap().unwrap();
        wait_for_listeners(&store, 1).await;

        cancel.cancel();
        assert!(cancel.is_cancelled());
        wait_for_listeners(&store, 0).await;
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn stalled_paths_stay_silent() {
        let inner = MemoryStore::new(json!({ "company": { "c1": {} }, "drivers": { "L1": {} } }));
        let store = StalledStore::new(inner, &["company/"]);
        let cancel = CancelToken::new();
        let mut stalled = store.subscribe(&DataPath::company(&company("c1")), &cancel);
        let mut live = store.subscribe(&DataPath::drivers(), &cancel);
        assert!(live.next().await.unwrap().unwrap().is_some());
        assert!(timeout(Duration::from_millis(50), stalled.next()).await.is_err());
    }

    #[tokio::test]
    async fn dropping_subscription_releases_listener() {
        let store = MemoryStore::default();
        let subscription = store.subscribe(&DataPath::vehicles(), &CancelToken::new());
        wait_for_listeners(&store, 1).await;
        drop(subscription);
        wait_for_listeners(&store, 0).await;
    }
}
