use std::time::Instant;

use ferry_api::{Resource, Snapshot, SnapshotSpec};
use ferry_core::{Destination, ObjectKey};
use ferry_oci::Transfer;
use kube::Resource as _;
use metrics::{counter, histogram};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::patch::status_patch;
use crate::{Failure, ObjectStore, ReconcileError, Requeue};

/// Drives one Resource toward its Snapshot. Holds no per-object state between passes.
pub struct Reconciler<S, T> {
    store: S,
    transfer: T,
    registry_addr: String,
}

impl<S: ObjectStore, T: Transfer> Reconciler<S, T> {
    pub fn new(store: S, transfer: T, registry_addr: impl Into<String>) -> Self {
        Self { store, transfer, registry_addr: registry_addr.into() }
    }

    pub fn store(&self) -> &S { &self.store }

    pub fn registry_addr(&self) -> &str { &self.registry_addr }

    /// One convergence pass for `key`. Must not run concurrently for the same key.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Requeue, Failure> {
        let started = Instant::now();
        counter!("ferry_reconcile_total", 1u64);
        let res = self.converge(key).instrument(info_span!("reconcile", resource = %key)).await;
        histogram!("ferry_reconcile_latency_ms", started.elapsed().as_secs_f64() * 1000.0);
        match &res {
            Ok(requeue) => debug!(resource = %key, requeue = %requeue, "reconcile done"),
            Err(f) => {
                counter!("ferry_reconcile_errors_total", 1u64);
                warn!(resource = %key, requeue = %f.requeue, error = %f.error, "reconcile failed");
            }
        }
        res
    }

    async fn converge(&self, key: &ObjectKey) -> Result<Requeue, Failure> {
        let resource = match self.store.get_resource(key).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                debug!("resource no longer exists");
                return Ok(Requeue::Never);
            }
            Err(source) => return Err(Failure::new(ReconcileError::LoadResource { key: key.clone(), source }, Requeue::Never)),
        };
        let requeue = Requeue::after(resource.requeue_after());
        let fail = |error| Failure::new(error, requeue);

        let cd_key = resource.component_descriptor_key();
        let descriptor = match self.store.get_component_descriptor(&cd_key).await {
            Ok(Some(cd)) => cd,
            Ok(None) => {
                counter!("ferry_descriptor_pending_total", 1u64);
                info!(descriptor = %cd_key, "component descriptor not found yet; waiting");
                return Ok(requeue);
            }
            Err(source) => return Err(fail(ReconcileError::LoadDescriptor { key: cd_key, source })),
        };

        let before = resource.status.clone().unwrap_or_default();
        let mut status = before.clone();
        let destination = resource.destination(&self.registry_addr);
        for entry in descriptor.entries_named(&resource.spec.resource.name) {
            self.transfer.transfer(destination.reference(), entry).await.map_err(|source| {
                fail(ReconcileError::Transfer {
                    entry: entry.name.clone(),
                    version: entry.version.clone(),
                    destination: destination.reference().to_string(),
                    source,
                })
            })?;
            self.write_snapshot(&resource, &destination).await.map_err(fail)?;
            status.last_applied_resource_version = Some(entry.version.clone());
        }
        if let Some(generation) = resource.metadata.generation {
            status.observed_generation = Some(generation);
        }

        match status_patch(&before, &status).map_err(|e| fail(e.into()))? {
            Some(patch) => {
                self.store
                    .patch_resource_status(key, &patch)
                    .await
                    .map_err(|source| fail(ReconcileError::PatchStatus { key: key.clone(), source }))?;
                info!(generation = ?status.observed_generation, version = ?status.last_applied_resource_version, "status updated");
            }
            None => debug!("status unchanged"),
        }
        Ok(requeue)
    }

    /// Absent: create with an owner link to the Resource. Present: rewrite the ref only.
    async fn write_snapshot(&self, resource: &Resource, destination: &Destination) -> Result<(), ReconcileError> {
        let key = resource.snapshot_key();
        let spec = SnapshotSpec { reference: destination.snapshot_ref().to_string() };
        let snapshot_err = |source| ReconcileError::Snapshot { key: key.clone(), source };

        match self.store.get_snapshot(&key).await.map_err(snapshot_err)? {
            None => {
                let mut snap = Snapshot::new(&key.name, spec);
                snap.metadata.namespace = Some(key.namespace.clone());
                snap.metadata.owner_references = resource.owner_ref(&()).map(|o| vec![o]);
                self.store.create_snapshot(&snap).await.map_err(snapshot_err)?;
                counter!("ferry_snapshot_writes_total", 1u64, "op" => "create");
                info!(snapshot = %key, reference = %snap.spec.reference, "snapshot created");
            }
            Some(current) if current.spec == spec => debug!(snapshot = %key, "snapshot up to date"),
            Some(_) => {
                self.store.update_snapshot_spec(&key, &spec).await.map_err(snapshot_err)?;
                counter!("ferry_snapshot_writes_total", 1u64, "op" => "update");
                info!(snapshot = %key, reference = %spec.reference, "snapshot updated");
            }
        }
        Ok(())
    }
}
