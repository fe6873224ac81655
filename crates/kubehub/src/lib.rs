//! ferry kubehub: Kubernetes object store and watch/dispatch wiring for the controller.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use kube::Client;
use tracing::info;

mod runtime;
mod store;

pub use runtime::{requeue_action, retry_action, run_controller};
pub use store::KubeStore;

/// Client from the ambient kubeconfig or in-cluster service account.
pub async fn get_kube_client() -> Result<Client> {
    let client = Client::try_default().await.context("building kube client (kubeconfig or in-cluster)")?;
    info!(namespace = %client.default_namespace(), "kube client ready");
    Ok(client)
}
