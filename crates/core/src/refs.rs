//! Reference arithmetic for remote sources and local snapshot destinations.

/// Repository prefix under which all snapshots are published in the local registry.
pub const SNAPSHOTS_REPOSITORY: &str = "snapshots";

/// Canonical `repo:tag@digest` string for a remote artifact.
pub fn remote_reference(repository: &str, version: &str, digest: &str) -> String {
    format!("{}:{}@{}", repository, version, digest)
}

/// Where a snapshot is published: `<registry>/snapshots/<name>:<tag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    registry_addr: String,
    reference: String,
}

impl Destination {
    pub fn new(registry_addr: &str, name: &str, tag: &str) -> Self {
        let registry_addr = registry_addr.trim_end_matches('/').to_string();
        let reference = format!("{}/{}/{}:{}", registry_addr, SNAPSHOTS_REPOSITORY, name, tag);
        Self { registry_addr, reference }
    }

    /// Full destination reference including the registry address.
    pub fn reference(&self) -> &str { &self.reference }

    pub fn registry_addr(&self) -> &str { &self.registry_addr }

    /// Reference relative to the snapshots root, as stored on the Snapshot object.
    pub fn snapshot_ref(&self) -> &str {
        let prefix_len = self.registry_addr.len() + 1 + SNAPSHOTS_REPOSITORY.len() + 1;
        &self.reference[prefix_len..]
    }
}
