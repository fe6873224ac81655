use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Projection of the last successful transfer for one Resource.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "delivery.ocm.software",
    version = "v1alpha1",
    kind = "Snapshot",
    namespaced,
    shortname = "snap",
    printcolumn = r#"{"name":"Ref","type":"string","jsonPath":".spec.ref"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSpec {
    /// Artifact location relative to the local registry's snapshots root, e.g. `app:v1`.
    #[serde(rename = "ref")]
    pub reference: String,
}
