/// Context header keys, in the order they are applied. Each is sent as `x-<key>`.
pub const HEADER_KEYS: [&str; 5] = ["digest", "registry", "repository", "tag", "image"];

/// Identity of the artifact a transfer is fetching. Unset fields produce no header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferIdentity {
    /// Full `repo:tag@digest` reference.
    pub digest: Option<String>,
    /// Registry host, e.g. `example.com`.
    pub registry: Option<String>,
    /// Registry-qualified repository, e.g. `example.com/app`.
    pub repository: Option<String>,
    pub tag: Option<String>,
    /// Repository pinned by digest, e.g. `example.com/app@sha256:...`.
    pub image: Option<String>,
}

impl TransferIdentity {
    pub fn value(&self, key: &str) -> Option<&str> {
        let v = match key {
            "digest" => &self.digest,
            "registry" => &self.registry,
            "repository" => &self.repository,
            "tag" => &self.tag,
            "image" => &self.image,
            _ => return None,
        };
        v.as_deref()
    }

    /// `(header-name, value)` pairs for the fields that are set.
    pub fn headers(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        HEADER_KEYS
            .iter()
            .filter_map(move |k| self.value(k).map(|v| (format!("x-{}", k), v)))
    }
}
