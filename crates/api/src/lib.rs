//! ferry API: the custom resources the controller reads and writes.
//!
//! - [`Resource`]: desired state, names a component resource to snapshot locally.
//! - [`ComponentDescriptor`]: external catalog of versioned resource entries (read-only here).
//! - [`Snapshot`]: derived state, where the transferred artifact now lives.

#![forbid(unsafe_code)]

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

pub mod component;
pub mod duration;
pub mod resource;
pub mod snapshot;

pub use component::{ComponentDescriptor, ComponentDescriptorSpec, ResourceEntry};
pub use duration::{default_interval, parse_duration, DurationError};
pub use resource::{ComponentRef, Resource, ResourceRef, ResourceSpec, ResourceStatus, SnapshotTemplate};
pub use snapshot::{Snapshot, SnapshotSpec};

/// API group shared by all ferry kinds.
pub const GROUP: &str = "delivery.ocm.software";
pub const VERSION: &str = "v1alpha1";

/// All CustomResourceDefinitions served for this controller, in install order.
pub fn crds() -> Vec<CustomResourceDefinition> {
    vec![ComponentDescriptor::crd(), Resource::crd(), Snapshot::crd()]
}

/// Schema for untyped sub-documents: any object, fields preserved verbatim.
pub(crate) fn preserve_unknown_fields(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
    use schemars::schema::{InstanceType, Schema, SchemaObject};
    let mut obj = SchemaObject { instance_type: Some(InstanceType::Object.into()), ..Default::default() };
    obj.extensions.insert("x-kubernetes-preserve-unknown-fields".to_string(), serde_json::Value::Bool(true));
    Schema::Object(obj)
}
