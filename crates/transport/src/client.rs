use std::time::Duration;

use reqwest::{Proxy, Request, Response};
use tracing::debug;

use crate::{Connector, Transport, TransportError};

/// Knobs for transports built per transfer.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Whole-request deadline; a stalled pull surfaces as a transfer error.
    pub timeout: Option<Duration>,
    /// Skip upstream certificate verification. The in-cluster proxy terminates trust.
    pub accept_invalid_certs: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self { timeout: Some(Duration::from_secs(300)), accept_invalid_certs: true }
    }
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport that talks to registries directly.
    pub fn direct(opts: &TransportOptions) -> Result<Self, TransportError> {
        let client = builder(opts).build().map_err(TransportError::Build)?;
        Ok(Self { client })
    }

    /// Transport that sends every request through the proxy at `proxy_addr` (`host:port`).
    pub fn proxied(proxy_addr: &str, opts: &TransportOptions) -> Result<Self, TransportError> {
        let url = if proxy_addr.contains("://") { proxy_addr.to_string() } else { format!("http://{}", proxy_addr) };
        let proxy = Proxy::all(url.as_str()).map_err(|source| TransportError::Proxy { addr: proxy_addr.to_string(), source })?;
        let client = builder(opts).proxy(proxy).build().map_err(TransportError::Build)?;
        debug!(proxy = %url, insecure = opts.accept_invalid_certs, "proxied transport ready");
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client { &self.client }
}

fn builder(opts: &TransportOptions) -> reqwest::ClientBuilder {
    let mut b = reqwest::Client::builder().danger_accept_invalid_certs(opts.accept_invalid_certs);
    if let Some(t) = opts.timeout {
        b = b.timeout(t);
    }
    b
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let url = request.url().to_string();
        self.client
            .execute(request)
            .await
            .map_err(|source| TransportError::Request { url, source })
    }
}

/// Default [`Connector`]: a fresh proxied [`HttpTransport`] per call.
#[derive(Debug, Clone, Default)]
pub struct ProxyConnector {
    pub options: TransportOptions,
}

impl ProxyConnector {
    pub fn new(options: TransportOptions) -> Self { Self { options } }
}

impl Connector for ProxyConnector {
    type Transport = HttpTransport;

    fn proxied(&self, proxy_addr: &str) -> Result<HttpTransport, TransportError> {
        HttpTransport::proxied(proxy_addr, &self.options)
    }
}
