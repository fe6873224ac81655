use std::time::Duration;

use ferry_core::{Destination, ObjectKey};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::duration::{default_interval, parse_duration};

/// Desired state: snapshot one named resource of a component into the local registry.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "delivery.ocm.software",
    version = "v1alpha1",
    kind = "Resource",
    namespaced,
    status = "ResourceStatus",
    shortname = "ocmres",
    printcolumn = r#"{"name":"Generation","type":"integer","jsonPath":".status.observedGeneration"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.lastAppliedResourceVersion"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// Re-drive interval, e.g. `10m`. Falls back to the controller default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    pub component_ref: ComponentRef,
    pub resource: ResourceRef,
    pub snapshot_template: SnapshotTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRef {
    /// Component name, e.g. `github.com/acme/app`.
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    /// Entry name within the component descriptor.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTemplate {
    pub name: String,
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_applied_resource_version: Option<String>,
}

impl Resource {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace().unwrap_or_default(), self.name_any())
    }

    /// Key of the referenced ComponentDescriptor.
    pub fn component_descriptor_key(&self) -> ObjectKey {
        ObjectKey::component_descriptor(&self.spec.component_ref.name, &self.spec.component_ref.namespace)
    }

    /// The Snapshot object is named after the template and lives next to this Resource.
    pub fn snapshot_key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace().unwrap_or_default(), self.spec.snapshot_template.name.clone())
    }

    pub fn destination(&self, registry_addr: &str) -> Destination {
        let t = &self.spec.snapshot_template;
        Destination::new(registry_addr, &t.name, &t.tag)
    }

    /// Delay before the next re-drive of this object.
    pub fn requeue_after(&self) -> Duration {
        match self.spec.interval.as_deref() {
            None => default_interval(),
            Some(raw) => parse_duration(raw).unwrap_or_else(|e| {
                warn!(resource = %self.key(), interval = %raw, error = %e, "invalid interval; using default");
                default_interval()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample() -> Resource {
        let mut r = Resource::new(
            "app-image",
            ResourceSpec {
                interval: Some("5m".into()),
                component_ref: ComponentRef { name: "app/v1".into(), namespace: "default".into() },
                resource: ResourceRef { name: "image".into() },
                snapshot_template: SnapshotTemplate { name: "app".into(), tag: "v1".into() },
            },
        );
        r.metadata.namespace = Some("default".into());
        r
    }

    #[test]
    fn derived_keys() {
        let r = sample();
        assert_eq!(r.key(), ObjectKey::new("default", "app-image"));
        assert_eq!(r.component_descriptor_key(), ObjectKey::new("default", "app-v1"));
        assert_eq!(r.snapshot_key(), ObjectKey::new("default", "app"));
        let d = r.destination("registry.local:5000");
        assert_eq!(d.reference(), "registry.local:5000/snapshots/app:v1");
        assert_eq!(d.snapshot_ref(), "app:v1");
    }

    #[test]
    fn requeue_interval_from_spec_or_default() {
        let mut r = sample();
        assert_eq!(r.requeue_after(), Duration::from_secs(300));
        r.spec.interval = Some("soon".into());
        assert_eq!(r.requeue_after(), default_interval());
        r.spec.interval = None;
        assert_eq!(r.requeue_after(), default_interval());
    }

    #[test]
    fn spec_uses_camel_case_on_the_wire() {
        let v = serde_json::to_value(&sample()).unwrap();
        assert_eq!(v["apiVersion"], "delivery.ocm.software/v1alpha1");
        assert_eq!(v["kind"], "Resource");
        assert_eq!(v["spec"]["componentRef"]["name"], "app/v1");
        assert_eq!(v["spec"]["snapshotTemplate"]["tag"], "v1");
    }
}
