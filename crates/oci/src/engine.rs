use std::time::Instant;

use ferry_api::ResourceEntry;
use ferry_transport::{Connector, HeaderPropagatingTransport, ProxyConnector, TransportOptions};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{fetch_layer, parse_destination, OciPublisher, Publisher, RemoteDigest, Scheme, SnapshotImage, SnapshotMetadata, Transfer, TransferError};

/// Outcome of one successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    /// Canonical `ref:version@digest` that was pulled.
    pub remote: String,
    pub destination: String,
    pub layer_digest: String,
    pub bytes: usize,
    pub manifest_url: String,
}

/// Pulls through the local registry acting as a proxy, pushes to it directly.
pub struct TransferEngine<C = ProxyConnector, P = OciPublisher> {
    registry_addr: String,
    pull_scheme: Scheme,
    connector: C,
    publisher: P,
}

impl TransferEngine {
    pub fn new(registry_addr: impl Into<String>, pull_scheme: Scheme, push_scheme: Scheme, options: TransportOptions) -> Self {
        Self::with_parts(registry_addr, pull_scheme, ProxyConnector::new(options), OciPublisher::new(push_scheme))
    }
}

impl<C: Connector, P: Publisher> TransferEngine<C, P> {
    pub fn with_parts(registry_addr: impl Into<String>, pull_scheme: Scheme, connector: C, publisher: P) -> Self {
        Self { registry_addr: registry_addr.into(), pull_scheme, connector, publisher }
    }

    pub fn registry_addr(&self) -> &str { &self.registry_addr }

    async fn run(&self, destination: &str, entry: &ResourceEntry) -> Result<TransferReport, TransferError> {
        let access = entry.access()?;
        let remote = RemoteDigest::resolve(access.global(), &entry.version)?;
        let target = parse_destination(destination)?;
        debug!(remote = %remote.canonical(), destination = %destination, "transfer resolved");

        // Fresh transport per transfer; nothing is pooled across runs.
        let transport = HeaderPropagatingTransport::new(self.connector.proxied(&self.registry_addr)?, remote.identity());
        let data = fetch_layer(&transport, &remote, self.pull_scheme).await?;
        let bytes = data.len();

        let image = SnapshotImage::single_layer(data, remote.digest(), &SnapshotMetadata::now(destination))?;
        let layer_digest = image.layer.digest.clone();
        let manifest_url = self.publisher.publish(&target, &image).await?;
        Ok(TransferReport {
            remote: remote.canonical().to_string(),
            destination: destination.to_string(),
            layer_digest,
            bytes,
            manifest_url,
        })
    }
}

#[async_trait::async_trait]
impl<C: Connector, P: Publisher> Transfer for TransferEngine<C, P> {
    async fn transfer(&self, destination: &str, entry: &ResourceEntry) -> Result<TransferReport, TransferError> {
        let started = Instant::now();
        counter!("ferry_transfer_total", 1u64);
        let res = self.run(destination, entry).await;
        histogram!("ferry_transfer_latency_ms", started.elapsed().as_secs_f64() * 1000.0);
        match &res {
            Ok(report) => {
                histogram!("ferry_transfer_bytes", report.bytes as f64);
                info!(remote = %report.remote, destination = %report.destination, bytes = report.bytes, "transfer complete");
            }
            Err(e) => {
                counter!("ferry_transfer_errors_total", 1u64);
                warn!(entry = %entry.name, version = %entry.version, destination = %destination, error = %e, "transfer failed");
            }
        }
        res
    }
}
