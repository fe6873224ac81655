use ferry_api::{ComponentDescriptor, Resource, Snapshot, SnapshotSpec};
use ferry_controller::{ObjectStore, StoreError};
use ferry_core::ObjectKey;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use serde_json::{json, Value as Json};
use tracing::debug;

/// [`ObjectStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self { Self { client } }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn store_err(kind: &'static str, key: &ObjectKey, e: kube::Error) -> StoreError {
    match e {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound { kind, key: key.clone() },
        kube::Error::Api(ae) if ae.code == 409 => StoreError::AlreadyExists { kind, key: key.clone() },
        other => StoreError::Backend { kind, key: key.clone(), message: other.to_string() },
    }
}

#[async_trait::async_trait]
impl ObjectStore for KubeStore {
    async fn get_resource(&self, key: &ObjectKey) -> Result<Option<Resource>, StoreError> {
        self.api::<Resource>(&key.namespace).get_opt(&key.name).await.map_err(|e| store_err("Resource", key, e))
    }

    async fn get_component_descriptor(&self, key: &ObjectKey) -> Result<Option<ComponentDescriptor>, StoreError> {
        self.api::<ComponentDescriptor>(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| store_err("ComponentDescriptor", key, e))
    }

    async fn get_snapshot(&self, key: &ObjectKey) -> Result<Option<Snapshot>, StoreError> {
        self.api::<Snapshot>(&key.namespace).get_opt(&key.name).await.map_err(|e| store_err("Snapshot", key, e))
    }

    async fn create_snapshot(&self, snapshot: &Snapshot) -> Result<Snapshot, StoreError> {
        let key = ObjectKey::new(snapshot.namespace().unwrap_or_default(), snapshot.name_any());
        debug!(snapshot = %key, "creating snapshot");
        self.api::<Snapshot>(&key.namespace)
            .create(&PostParams::default(), snapshot)
            .await
            .map_err(|e| store_err("Snapshot", &key, e))
    }

    async fn update_snapshot_spec(&self, key: &ObjectKey, spec: &SnapshotSpec) -> Result<Snapshot, StoreError> {
        let patch = json!({ "spec": spec });
        self.api::<Snapshot>(&key.namespace)
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| store_err("Snapshot", key, e))
    }

    async fn patch_resource_status(&self, key: &ObjectKey, patch: &Json) -> Result<(), StoreError> {
        self.api::<Resource>(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(|e| store_err("Resource", key, e))
    }
}
