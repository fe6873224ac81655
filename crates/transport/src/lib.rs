//! ferry transports: request execution seams used by the transfer engine.
//!
//! Pulls of remote content go through a [`Connector`]-built transport that targets the
//! local registry as an HTTP proxy, wrapped in a [`HeaderPropagatingTransport`] so the
//! proxy can tell which logical artifact a request belongs to. Pushes do not use this crate.

#![forbid(unsafe_code)]

use std::sync::Arc;

pub use reqwest::{Request, Response};

mod client;
mod identity;
mod propagate;

pub use client::{HttpTransport, ProxyConnector, TransportOptions};
pub use identity::{TransferIdentity, HEADER_KEYS};
pub use propagate::HeaderPropagatingTransport;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid proxy address {addr}: {source}")]
    Proxy { addr: String, #[source] source: reqwest::Error },
    #[error("building http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("invalid value for header {name}: {value:?}")]
    InvalidHeader { name: String, value: String },
    #[error("request to {url} failed: {source}")]
    Request { url: String, #[source] source: reqwest::Error },
}

/// Executes a single HTTP request. Implementations decorate or delegate; none retry.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        (**self).execute(request).await
    }
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        (**self).execute(request).await
    }
}

/// Builds a fresh transport that sends everything through `proxy_addr`.
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    fn proxied(&self, proxy_addr: &str) -> Result<Self::Transport, TransportError>;
}
