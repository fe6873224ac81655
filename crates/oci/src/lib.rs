//! ferry OCI transfer engine.
//!
//! Resolves a component resource entry to a remote digest reference, pulls that single
//! layer through the proxied, identity-annotated transport, wraps it in a fresh
//! single-layer image stamped with creation metadata, and pushes it to the local registry
//! directly (the push never goes through the proxy).

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use ferry_api::ResourceEntry;
use ferry_core::AccessError;
use ferry_transport::TransportError;

mod engine;
mod fetch;
mod image;
mod publish;
mod reference;

pub use engine::{TransferEngine, TransferReport};
pub use fetch::{blob_url, fetch_layer};
pub use image::{LayerBlob, SnapshotImage, SnapshotMetadata, ANNOTATION_CREATED, ANNOTATION_REF_NAME};
pub use publish::{OciPublisher, Publisher};
pub use reference::{parse_destination, RemoteDigest};

pub use oci_distribution::Reference;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("malformed access document: {0}")]
    Access(#[from] AccessError),
    #[error("invalid reference {reference:?}: {reason}")]
    Reference { reference: String, reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("fetching {url}: unexpected status {status}")]
    Status { url: String, status: u16 },
    #[error("reading layer body from {url}: {source}")]
    Body { url: String, #[source] source: reqwest::Error },
    #[error("layer digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
    #[error("assembling snapshot image: {0}")]
    Assemble(String),
    #[error("pushing {reference}: {message}")]
    Publish { reference: String, message: String },
}

/// Copies one resource entry's artifact to a destination reference.
#[async_trait::async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer(&self, destination: &str, entry: &ResourceEntry) -> Result<TransferReport, TransferError>;
}

/// URL scheme used to reach a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self { Scheme::Http => "http", Scheme::Https => "https" }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(format!("unknown scheme {:?} (expected http or https)", other)),
        }
    }
}
