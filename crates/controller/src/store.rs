use std::sync::Arc;

use ferry_api::{ComponentDescriptor, Resource, Snapshot, SnapshotSpec};
use ferry_core::ObjectKey;
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: ObjectKey },
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: ObjectKey },
    #[error("{kind} {key}: {message}")]
    Backend { kind: &'static str, key: ObjectKey, message: String },
}

/// Reads and writes the three kinds the controller touches. Absent objects are `Ok(None)`.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_resource(&self, key: &ObjectKey) -> Result<Option<Resource>, StoreError>;
    async fn get_component_descriptor(&self, key: &ObjectKey) -> Result<Option<ComponentDescriptor>, StoreError>;
    async fn get_snapshot(&self, key: &ObjectKey) -> Result<Option<Snapshot>, StoreError>;
    /// Create a new Snapshot. Namespace and name come from the object's metadata.
    async fn create_snapshot(&self, snapshot: &Snapshot) -> Result<Snapshot, StoreError>;
    /// Overwrite the mutable part of an existing Snapshot.
    async fn update_snapshot_spec(&self, key: &ObjectKey, spec: &SnapshotSpec) -> Result<Snapshot, StoreError>;
    /// Apply a JSON merge patch to the Resource's status subresource.
    async fn patch_resource_status(&self, key: &ObjectKey, patch: &Json) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn get_resource(&self, key: &ObjectKey) -> Result<Option<Resource>, StoreError> {
        (**self).get_resource(key).await
    }
    async fn get_component_descriptor(&self, key: &ObjectKey) -> Result<Option<ComponentDescriptor>, StoreError> {
        (**self).get_component_descriptor(key).await
    }
    async fn get_snapshot(&self, key: &ObjectKey) -> Result<Option<Snapshot>, StoreError> {
        (**self).get_snapshot(key).await
    }
    async fn create_snapshot(&self, snapshot: &Snapshot) -> Result<Snapshot, StoreError> {
        (**self).create_snapshot(snapshot).await
    }
    async fn update_snapshot_spec(&self, key: &ObjectKey, spec: &SnapshotSpec) -> Result<Snapshot, StoreError> {
        (**self).update_snapshot_spec(key, spec).await
    }
    async fn patch_resource_status(&self, key: &ObjectKey, patch: &Json) -> Result<(), StoreError> {
        (**self).patch_resource_status(key, patch).await
    }
}
