//! In-memory object store with fault injection, for unit tests.

use crate::digest::bytes_digest;
use funnel_error::{FunnelError, Result, StoreError};
use funnel_traits::{Connection, Connector, Container, KeyInfo, ListPage, PutOptions};
use funnel_types::Acl;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Store operations that can be counted and faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Connect,
    Container,
    ListContainers,
    CreateContainer,
    DropContainer,
    Get,
    Put,
    Head,
    Delete,
    Copy,
    List,
}

/// A failure injected into one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Transport,
    StaleSession,
    NotFound,
    Server(u16),
    Panic,
}

impl Fault {
    fn into_error(self, what: &str) -> FunnelError {
        let error = match self {
            Fault::Transport => StoreError::Transport(format!("connection reset: {what}")),
            Fault::StaleSession => StoreError::StaleSession(format!("unparseable response: {what}")),
            Fault::NotFound => StoreError::NotFound(what.to_string()),
            Fault::Server(status) => StoreError::Server {
                status,
                message: format!("injected: {what}"),
            },
            Fault::Panic => unreachable!("panics are raised, not returned"),
        };
        FunnelError::Store(error)
    }
}

#[derive(Debug, Clone)]
pub struct MockObject {
    pub data: Vec<u8>,
    pub digest: Option<String>,
    pub acl: Acl,
}

#[derive(Default)]
struct State {
    containers: BTreeMap<String, BTreeMap<String, MockObject>>,
    faults: HashMap<(Op, String), VecDeque<Fault>>,
    calls: HashMap<Op, usize>,
    page_size: Option<usize>,
}

impl State {
    /// Count the call and take the next fault queued for it, if any.
    fn enter(&mut self, op: Op, key: &str) -> Option<Fault> {
        *self.calls.entry(op).or_default() += 1;
        self.faults
            .get_mut(&(op, key.to_string()))
            .and_then(VecDeque::pop_front)
    }
}

/// Shared backing store for every mock connection.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<State>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn create(&self, container: &str) {
        self.state
            .lock()
            .containers
            .entry(container.to_string())
            .or_default();
    }

    /// Store an object without a digest.
    pub fn insert(&self, container: &str, key: &str, data: &[u8]) {
        self.insert_object(container, key, data, None);
    }

    /// Store an object carrying the digest of its content.
    pub fn insert_with_digest(&self, container: &str, key: &str, data: &[u8]) {
        self.insert_object(container, key, data, Some(bytes_digest(data)));
    }

    fn insert_object(&self, container: &str, key: &str, data: &[u8], digest: Option<String>) {
        self.state
            .lock()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(
                key.to_string(),
                MockObject {
                    data: data.to_vec(),
                    digest,
                    acl: Acl::Private,
                },
            );
    }

    pub fn object(&self, container: &str, key: &str) -> Option<MockObject> {
        self.state
            .lock()
            .containers
            .get(container)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub fn keys(&self, container: &str) -> Vec<String> {
        self.state
            .lock()
            .containers
            .get(container)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state.lock().containers.contains_key(container)
    }

    /// Queue faults for calls of `op` on `key`, consumed one per call.
    ///
    /// `key` is the object key for object operations, the container name
    /// for container operations and empty for `Connect`/`ListContainers`.
    pub fn inject<I: IntoIterator<Item = Fault>>(&self, op: Op, key: &str, faults: I) {
        self.state
            .lock()
            .faults
            .entry((op, key.to_string()))
            .or_default()
            .extend(faults);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn connects(&self) -> usize {
        self.calls(Op::Connect)
    }

    /// Limit listing pages to `size` entries.
    pub fn set_page_size(&self, size: usize) {
        self.state.lock().page_size = Some(size.max(1));
    }

    /// Count the call and return its injected fault as an error.
    ///
    /// The lock is released before an injected panic is raised.
    fn check(&self, op: Op, key: &str) -> Result<()> {
        let fault = self.state.lock().enter(op, key);
        match fault {
            None => Ok(()),
            Some(Fault::Panic) => panic!("injected panic in {op:?} on {key:?}"),
            Some(fault) => Err(fault.into_error(key)),
        }
    }
}

pub struct MockConnector {
    store: Arc<MockStore>,
}

impl MockConnector {
    pub fn new(store: Arc<MockStore>) -> Self {
        Self { store }
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    fn connect(&self) -> Result<MockConnection> {
        self.store.check(Op::Connect, "")?;
        Ok(MockConnection {
            store: self.store.clone(),
        })
    }
}

pub struct MockConnection {
    store: Arc<MockStore>,
}

impl Connection for MockConnection {
    type Container = MockContainer;

    fn container(&self, name: &str) -> Result<MockContainer> {
        self.store.check(Op::Container, name)?;
        if !self.store.has_container(name) {
            return Err(StoreError::NotFound(name.to_string()).into());
        }
        Ok(MockContainer {
            store: self.store.clone(),
            name: name.to_string(),
        })
    }

    fn list_containers(&self) -> Result<Vec<String>> {
        self.store.check(Op::ListContainers, "")?;
        Ok(self.store.state.lock().containers.keys().cloned().collect())
    }

    fn create_container(&self, name: &str) -> Result<()> {
        self.store.check(Op::CreateContainer, name)?;
        let mut state = self.store.state.lock();
        if state.containers.contains_key(name) {
            return Err(StoreError::Server {
                status: 409,
                message: format!("BucketAlreadyExists: {name}"),
            }
            .into());
        }
        state.containers.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    fn drop_container(&self, name: &str) -> Result<()> {
        self.store.check(Op::DropContainer, name)?;
        let mut state = self.store.state.lock();
        match state.containers.get(name) {
            None => Err(StoreError::NotFound(name.to_string()).into()),
            Some(objects) if !objects.is_empty() => Err(StoreError::Server {
                status: 409,
                message: format!("BucketNotEmpty: {name}"),
            }
            .into()),
            Some(_) => {
                state.containers.remove(name);
                Ok(())
            }
        }
    }
}

pub struct MockContainer {
    store: Arc<MockStore>,
    name: String,
}

impl MockContainer {
    fn lookup(&self, key: &str) -> Option<MockObject> {
        self.store.object(&self.name, key)
    }
}

impl Container for MockContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_object(&self, key: &str, dest: &mut dyn Write) -> Result<u64> {
        if let Err(e) = self.store.check(Op::Get, key) {
            // Failed downloads leave a partial artifact behind.
            let _ = dest.write_all(b"partial");
            return Err(e);
        }
        let object = self
            .lookup(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        dest.write_all(&object.data)
            .map_err(|e| FunnelError::local(key, e))?;
        Ok(object.data.len() as u64)
    }

    fn put_object(&self, key: &str, source: &Path, options: &PutOptions) -> Result<u64> {
        self.store.check(Op::Put, key)?;
        let data = std::fs::read(source).map_err(|e| FunnelError::local(source, e))?;
        let size = data.len() as u64;
        self.store.state.lock().containers.entry(self.name.clone()).or_default().insert(
            key.to_string(),
            MockObject {
                data,
                digest: options.digest.clone(),
                acl: options.acl,
            },
        );
        Ok(size)
    }

    fn object_digest(&self, key: &str) -> Result<Option<String>> {
        self.store.check(Op::Head, key)?;
        Ok(self.lookup(key).and_then(|object| object.digest))
    }

    fn delete_object(&self, key: &str) -> Result<()> {
        self.store.check(Op::Delete, key)?;
        if let Some(objects) = self.store.state.lock().containers.get_mut(&self.name) {
            objects.remove(key);
        }
        Ok(())
    }

    fn copy_object(
        &self,
        source_container: &str,
        source_key: &str,
        dest_key: &str,
        acl: Acl,
    ) -> Result<()> {
        self.store.check(Op::Copy, source_key)?;
        let mut object = self
            .store
            .object(source_container, source_key)
            .ok_or_else(|| StoreError::NotFound(format!("{source_container}/{source_key}")))?;
        object.acl = acl;
        self.store
            .state
            .lock()
            .containers
            .entry(self.name.clone())
            .or_default()
            .insert(dest_key.to_string(), object);
        Ok(())
    }

    fn list_keys(&self, marker: &str, prefix: &str, delimiter: &str) -> Result<ListPage> {
        self.store.check(Op::List, marker)?;
        let state = self.store.state.lock();
        let objects = state
            .containers
            .get(&self.name)
            .ok_or_else(|| StoreError::NotFound(self.name.clone()))?;

        let mut entries: Vec<KeyInfo> = Vec::new();
        for (key, object) in objects.iter().filter(|(k, _)| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            let entry = match rest.find(delimiter).filter(|_| !delimiter.is_empty()) {
                Some(pos) => KeyInfo::prefix(&key[..prefix.len() + pos + delimiter.len()]),
                None => KeyInfo::object(key.as_str(), object.data.len() as u64),
            };
            if entries.last().is_none_or(|last| last.name != entry.name) {
                entries.push(entry);
            }
        }

        let mut remaining = entries
            .into_iter()
            .filter(|entry| marker.is_empty() || entry.name.as_str() > marker);
        let page_size = state.page_size.unwrap_or(1000);
        let keys: Vec<KeyInfo> = remaining.by_ref().take(page_size).collect();
        let is_truncated = remaining.next().is_some();
        Ok(ListPage::new(keys, is_truncated))
    }
}
