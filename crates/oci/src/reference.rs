use ferry_core::{remote_reference, GlobalAccess};
use ferry_transport::TransferIdentity;
use oci_distribution::Reference;

use crate::TransferError;

/// A remote artifact pinned by digest, resolved from a global access entry.
#[derive(Debug, Clone)]
pub struct RemoteDigest {
    canonical: String,
    version: String,
    reference: Reference,
}

impl RemoteDigest {
    /// Build `ref:version@digest` and parse it. The parse is permissive about transport
    /// (plain HTTP and self-signed registries are allowed later) but strict about syntax.
    pub fn resolve(access: &GlobalAccess, version: &str) -> Result<Self, TransferError> {
        let canonical = remote_reference(&access.reference, version, &access.digest);
        let reference = canonical
            .parse::<Reference>()
            .map_err(|e| TransferError::Reference { reference: canonical.clone(), reason: e.to_string() })?;
        if reference.digest().is_none() {
            return Err(TransferError::Reference { reference: canonical, reason: "no digest".to_string() });
        }
        Ok(Self { canonical, version: version.to_string(), reference })
    }

    /// The exact `ref:version@digest` string this was built from.
    pub fn canonical(&self) -> &str { &self.canonical }

    /// Registry as written in the reference, e.g. `docker.io`.
    pub fn registry(&self) -> &str { self.reference.registry() }

    /// Host to dial; `index.docker.io` for Docker Hub, otherwise [`registry`](Self::registry).
    pub fn resolve_registry(&self) -> &str { self.reference.resolve_registry() }

    /// Repository path within the registry, e.g. `acme/app`.
    pub fn repository(&self) -> &str { self.reference.repository() }

    pub fn version(&self) -> &str { &self.version }

    pub fn digest(&self) -> &str { self.reference.digest().unwrap_or_default() }

    /// Registry-qualified repository against the dialled host, e.g. `example.com/acme/app`.
    pub fn qualified_repository(&self) -> String {
        format!("{}/{}", self.resolve_registry(), self.repository())
    }

    /// Repository pinned by digest, e.g. `example.com/acme/app@sha256:...`.
    pub fn image(&self) -> String {
        format!("{}@{}", self.qualified_repository(), self.digest())
    }

    /// Values the proxy uses to correlate the pull with this artifact.
    pub fn identity(&self) -> TransferIdentity {
        TransferIdentity {
            digest: Some(self.canonical.clone()),
            registry: Some(self.resolve_registry().to_string()),
            repository: Some(self.qualified_repository()),
            tag: Some(self.version.clone()),
            image: Some(self.image()),
        }
    }
}

/// Parse a destination reference such as `registry.local:5000/snapshots/app:v1`.
pub fn parse_destination(destination: &str) -> Result<Reference, TransferError> {
    destination
        .parse::<Reference>()
        .map_err(|e| TransferError::Reference { reference: destination.to_string(), reason: e.to_string() })
}
