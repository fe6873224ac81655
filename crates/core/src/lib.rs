//! ferry core types: object keys, typed access descriptors and snapshot references.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod access;
pub mod refs;

pub use access::{Access, AccessError, GlobalAccess};
pub use refs::{remote_reference, Destination, SNAPSHOTS_REPOSITORY};

/// Namespaced object address used to load and write cluster objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }

    /// Key of the ComponentDescriptor object for a component name.
    /// Component names are path-like (`github.com/acme/app`); object names cannot carry `/`.
    pub fn component_descriptor(component: &str, namespace: &str) -> Self {
        Self::new(namespace, component.replace('/', "-"))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

pub mod prelude {
    pub use super::{Access, AccessError, Destination, GlobalAccess, ObjectKey};
}
