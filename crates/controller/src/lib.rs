//! ferry reconciliation controller.
//!
//! Level-triggered: every pass reloads the Resource, resolves its ComponentDescriptor,
//! transfers each matching entry, writes the Snapshot and patches status. There is no
//! internal retry; callers re-drive the key after the returned [`Requeue`].
//!
//! Cluster access goes through [`ObjectStore`] so the loop runs the same against the
//! Kubernetes API and against [`MockStore`] in tests.

#![forbid(unsafe_code)]

use std::fmt;
use std::time::Duration;

use ferry_core::ObjectKey;
use ferry_oci::TransferError;

mod mock;
pub mod patch;
mod reconcile;
mod store;

pub use mock::{MockStore, Op};
pub use reconcile::Reconciler;
pub use store::{ObjectStore, StoreError};

/// When the dispatcher should run this key again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    After(Duration),
    /// Object is gone (or its interval is unknown); wait for the next watch event.
    Never,
}

impl Requeue {
    /// A zero interval means no timed re-drive.
    pub fn after(interval: Duration) -> Self {
        if interval.is_zero() { Requeue::Never } else { Requeue::After(interval) }
    }
}

impl fmt::Display for Requeue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requeue::After(d) => write!(f, "after {:?}", d),
            Requeue::Never => f.write_str("never"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("loading resource {key}: {source}")]
    LoadResource { key: ObjectKey, source: StoreError },
    #[error("loading component descriptor {key}: {source}")]
    LoadDescriptor { key: ObjectKey, source: StoreError },
    #[error("transferring {entry}:{version} to {destination}: {source}")]
    Transfer { entry: String, version: String, destination: String, source: TransferError },
    #[error("writing snapshot {key}: {source}")]
    Snapshot { key: ObjectKey, source: StoreError },
    #[error("encoding status patch: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("patching status of {key}: {source}")]
    PatchStatus { key: ObjectKey, source: StoreError },
}

/// A failed pass together with the re-drive delay the object asked for.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct Failure {
    pub error: ReconcileError,
    pub requeue: Requeue,
}

impl Failure {
    pub fn new(error: ReconcileError, requeue: Requeue) -> Self { Self { error, requeue } }
}
