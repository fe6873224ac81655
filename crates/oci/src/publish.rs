use std::sync::Arc;

use oci_distribution::client::{ClientConfig, ClientProtocol, Config, ImageLayer};
use oci_distribution::manifest::OciImageManifest;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use tracing::info;

use crate::image::CONFIG_MEDIA_TYPE;
use crate::{Scheme, SnapshotImage, TransferError};

/// Writes an assembled snapshot image to its destination. Returns the manifest URL.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, destination: &Reference, image: &SnapshotImage) -> Result<String, TransferError>;
}

#[async_trait::async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(&self, destination: &Reference, image: &SnapshotImage) -> Result<String, TransferError> {
        (**self).publish(destination, image).await
    }
}

/// Pushes straight to the local registry with anonymous auth and default certificate checks.
/// A new client is built per push; no pool or token cache outlives a transfer.
#[derive(Debug, Clone)]
pub struct OciPublisher {
    protocol: ClientProtocol,
}

impl OciPublisher {
    pub fn new(scheme: Scheme) -> Self {
        let protocol = match scheme {
            Scheme::Http => ClientProtocol::Http,
            Scheme::Https => ClientProtocol::Https,
        };
        Self { protocol }
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig { protocol: self.protocol.clone(), ..Default::default() }
    }
}

#[async_trait::async_trait]
impl Publisher for OciPublisher {
    async fn publish(&self, destination: &Reference, image: &SnapshotImage) -> Result<String, TransferError> {
        let layers = vec![ImageLayer::new(image.layer.data.clone(), image.layer.media_type.to_string(), None)];
        let config = Config::new(image.config.clone(), CONFIG_MEDIA_TYPE.to_string(), None);
        let mut manifest = OciImageManifest::build(&layers, &config, None);
        manifest.annotations = Some(image.annotations.clone().into_iter().collect());

        let client = Client::new(self.client_config());
        let pushed = client
            .push(destination, &layers, config, &RegistryAuth::Anonymous, Some(manifest))
            .await
            .map_err(|e| TransferError::Publish { reference: destination.whole(), message: e.to_string() })?;
        info!(reference = %destination, manifest = %pushed.manifest_url, "snapshot image pushed");
        Ok(pushed.manifest_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_certificate_verification() {
        let cfg = OciPublisher::new(Scheme::Https).client_config();
        assert_eq!(cfg.protocol, ClientProtocol::Https);
        assert!(!cfg.accept_invalid_certificates);
        assert_eq!(OciPublisher::new(Scheme::Http).client_config().protocol, ClientProtocol::Http);
    }
}
