use std::sync::Arc;

use anyhow::Result;
use ferry_api::{default_interval, Resource, Snapshot};
use ferry_controller::{Failure, Reconciler, Requeue};
use ferry_oci::Transfer;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::{predicates, reflector, watcher, Controller, WatchStreamExt};
use kube::Client;
use tracing::{debug, info, warn};

use crate::KubeStore;

type Ctx<T> = Reconciler<KubeStore, T>;

pub fn requeue_action(requeue: Requeue) -> Action {
    match requeue {
        Requeue::After(d) if !d.is_zero() => Action::requeue(d),
        _ => Action::await_change(),
    }
}

/// Failures always come back; an unknown or zero interval falls back to the default.
pub fn retry_action(failure: &Failure) -> Action {
    match failure.requeue {
        Requeue::After(d) if !d.is_zero() => Action::requeue(d),
        _ => Action::requeue(default_interval()),
    }
}

async fn reconcile<T: Transfer + 'static>(obj: Arc<Resource>, ctx: Arc<Ctx<T>>) -> Result<Action, Failure> {
    ctx.reconcile(&obj.key()).await.map(requeue_action)
}

fn error_policy<T: Transfer + 'static>(_obj: Arc<Resource>, failure: &Failure, _ctx: Arc<Ctx<T>>) -> Action {
    retry_action(failure)
}

fn scoped<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Watch Resources (dispatching on generation changes only) and their owned Snapshots,
/// and drive the reconciler until SIGINT/SIGTERM.
pub async fn run_controller<T: Transfer + 'static>(client: Client, namespace: Option<&str>, reconciler: Reconciler<KubeStore, T>) -> Result<()> {
    let resources: Api<Resource> = scoped(client.clone(), namespace);
    let snapshots: Api<Snapshot> = scoped(client, namespace);

    let (reader, writer) = reflector::store();
    let trigger = watcher(resources, watcher::Config::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(predicates::generation);

    info!(ns = ?namespace, registry = %reconciler.registry_addr(), "controller starting");
    Controller::for_stream(trigger, reader)
        .owns(snapshots, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile::<T>, error_policy::<T>, Arc::new(reconciler))
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!(object = %obj, action = ?action, "reconciled"),
                Err(e) => warn!(error = %e, "controller error"),
            }
        })
        .await;
    info!("controller stopped");
    Ok(())
}
