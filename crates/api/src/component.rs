use ferry_core::{Access, AccessError};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Resolved component descriptor, as published by the component-descriptor provider.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(group = "delivery.ocm.software", version = "v1alpha1", kind = "ComponentDescriptor", namespaced, shortname = "cd")]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

/// One versioned resource of a component and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    pub name: String,
    pub version: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Untyped access document; interpret through [`ResourceEntry::access`].
    #[serde(default)]
    #[schemars(schema_with = "crate::preserve_unknown_fields")]
    pub access: Json,
}

impl ResourceEntry {
    pub fn access(&self) -> Result<Access, AccessError> {
        Access::from_document(&self.access)
    }
}

impl ComponentDescriptor {
    /// Entries whose name matches, in descriptor order. Duplicates are all returned.
    pub fn entries_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResourceEntry> + 'a {
        self.spec.resources.iter().filter(move |r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_descriptor_and_filters_entries() {
        let cd: ComponentDescriptor = serde_json::from_value(json!({
            "apiVersion": "delivery.ocm.software/v1alpha1",
            "kind": "ComponentDescriptor",
            "metadata": { "name": "app-v1", "namespace": "default" },
            "spec": {
                "resources": [
                    { "name": "image", "version": "1.0.0", "type": "ociImage",
                      "access": { "globalAccess": { "ref": "example.com/app", "digest": "sha256:aa" } } },
                    { "name": "chart", "version": "1.0.0", "access": {} },
                    { "name": "image", "version": "1.0.1", "access": { "globalAccess": { "ref": "example.com/app" } } }
                ]
            }
        }))
        .unwrap();
        let versions: Vec<_> = cd.entries_named("image").map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.0.1"]);
        let first = cd.entries_named("image").next().unwrap();
        assert_eq!(first.kind.as_deref(), Some("ociImage"));
        assert!(first.access().is_ok());
        let last = cd.entries_named("image").last().unwrap();
        assert_eq!(last.access().unwrap_err(), AccessError::MissingField("digest"));
    }

    #[test]
    fn missing_access_is_a_malformed_entry_not_a_crash() {
        let e: ResourceEntry = serde_json::from_value(json!({ "name": "x", "version": "1" })).unwrap();
        assert!(e.access().is_err());
    }
}
