use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use ferry_api::{ComponentDescriptor, Resource, ResourceStatus, Snapshot, SnapshotSpec};
use ferry_core::ObjectKey;
use kube::ResourceExt;
use serde_json::Value as Json;

use crate::patch::apply_merge_patch;
use crate::{ObjectStore, StoreError};

/// Store operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    GetResource,
    GetDescriptor,
    GetSnapshot,
    CreateSnapshot,
    UpdateSnapshot,
    PatchStatus,
}

#[derive(Default)]
struct State {
    resources: BTreeMap<ObjectKey, Resource>,
    descriptors: BTreeMap<ObjectKey, ComponentDescriptor>,
    snapshots: BTreeMap<ObjectKey, Snapshot>,
    patches: Vec<(ObjectKey, Json)>,
    calls: BTreeMap<Op, usize>,
    failures: BTreeMap<Op, String>,
}

/// In-memory [`ObjectStore`] for tests and dry runs.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<State>,
}

fn key_of<K: kube::Resource>(obj: &K) -> ObjectKey {
    ObjectKey::new(obj.namespace().unwrap_or_default(), obj.name_any())
}

impl MockStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_resource(&self, r: Resource) { self.lock().resources.insert(key_of(&r), r); }

    pub fn insert_descriptor(&self, cd: ComponentDescriptor) { self.lock().descriptors.insert(key_of(&cd), cd); }

    pub fn insert_snapshot(&self, s: Snapshot) { self.lock().snapshots.insert(key_of(&s), s); }

    pub fn remove_descriptor(&self, key: &ObjectKey) { self.lock().descriptors.remove(key); }

    /// Make every later call of `op` fail with a backend error.
    pub fn fail_on(&self, op: Op, message: impl Into<String>) { self.lock().failures.insert(op, message.into()); }

    pub fn clear_failures(&self) { self.lock().failures.clear(); }

    pub fn resource(&self, key: &ObjectKey) -> Option<Resource> { self.lock().resources.get(key).cloned() }

    pub fn snapshot(&self, key: &ObjectKey) -> Option<Snapshot> { self.lock().snapshots.get(key).cloned() }

    pub fn snapshots(&self) -> Vec<Snapshot> { self.lock().snapshots.values().cloned().collect() }

    /// Status patches received so far, in order.
    pub fn status_patches(&self) -> Vec<(ObjectKey, Json)> { self.lock().patches.clone() }

    pub fn calls(&self, op: Op) -> usize { self.lock().calls.get(&op).copied().unwrap_or(0) }

    fn enter(&self, op: Op, kind: &'static str, key: &ObjectKey) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut st = self.lock();
        *st.calls.entry(op).or_insert(0) += 1;
        if let Some(message) = st.failures.get(&op) {
            return Err(StoreError::Backend { kind, key: key.clone(), message: message.clone() });
        }
        Ok(st)
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockStore {
    async fn get_resource(&self, key: &ObjectKey) -> Result<Option<Resource>, StoreError> {
        Ok(self.enter(Op::GetResource, "Resource", key)?.resources.get(key).cloned())
    }

    async fn get_component_descriptor(&self, key: &ObjectKey) -> Result<Option<ComponentDescriptor>, StoreError> {
        Ok(self.enter(Op::GetDescriptor, "ComponentDescriptor", key)?.descriptors.get(key).cloned())
    }

    async fn get_snapshot(&self, key: &ObjectKey) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.enter(Op::GetSnapshot, "Snapshot", key)?.snapshots.get(key).cloned())
    }

    async fn create_snapshot(&self, snapshot: &Snapshot) -> Result<Snapshot, StoreError> {
        let key = key_of(snapshot);
        let mut st = self.enter(Op::CreateSnapshot, "Snapshot", &key)?;
        if st.snapshots.contains_key(&key) {
            return Err(StoreError::AlreadyExists { kind: "Snapshot", key });
        }
        st.snapshots.insert(key, snapshot.clone());
        Ok(snapshot.clone())
    }

    async fn update_snapshot_spec(&self, key: &ObjectKey, spec: &SnapshotSpec) -> Result<Snapshot, StoreError> {
        let mut st = self.enter(Op::UpdateSnapshot, "Snapshot", key)?;
        let snap = st
            .snapshots
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound { kind: "Snapshot", key: key.clone() })?;
        snap.spec = spec.clone();
        Ok(snap.clone())
    }

    async fn patch_resource_status(&self, key: &ObjectKey, patch: &Json) -> Result<(), StoreError> {
        let mut st = self.enter(Op::PatchStatus, "Resource", key)?;
        st.patches.push((key.clone(), patch.clone()));
        let r = st
            .resources
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound { kind: "Resource", key: key.clone() })?;
        let mut status = serde_json::to_value(r.status.clone().unwrap_or_default())
            .map_err(|e| StoreError::Backend { kind: "Resource", key: key.clone(), message: e.to_string() })?;
        if let Some(p) = patch.get("status") { apply_merge_patch(&mut status, p); }
        let status: ResourceStatus = serde_json::from_value(status)
            .map_err(|e| StoreError::Backend { kind: "Resource", key: key.clone(), message: e.to_string() })?;
        r.status = Some(status);
        Ok(())
    }
}
