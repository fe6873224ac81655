use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Request, Response};
use tracing::debug;

use crate::{TransferIdentity, Transport, TransportError};

/// Decorates every outbound request with the `x-*` identity headers, then delegates.
/// No retries, no response inspection.
#[derive(Debug, Clone)]
pub struct HeaderPropagatingTransport<T> {
    inner: T,
    identity: TransferIdentity,
}

impl<T: Transport> HeaderPropagatingTransport<T> {
    pub fn new(inner: T, identity: TransferIdentity) -> Self {
        Self { inner, identity }
    }

    pub fn identity(&self) -> &TransferIdentity { &self.identity }

    fn decorate(&self, request: &mut Request) -> Result<(), TransportError> {
        for (name, value) in self.identity.headers() {
            let invalid = || TransportError::InvalidHeader { name: name.clone(), value: value.to_string() };
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let hv = HeaderValue::from_str(value).map_err(|_| invalid())?;
            request.headers_mut().insert(header, hv);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: Transport> Transport for HeaderPropagatingTransport<T> {
    async fn execute(&self, mut request: Request) -> Result<Response, TransportError> {
        self.decorate(&mut request)?;
        debug!(method = %request.method(), url = %request.url(), "forwarding with identity headers");
        self.inner.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::Method;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Recorder {
        seen: Arc<Mutex<Vec<HeaderMap>>>,
    }

    #[async_trait::async_trait]
    impl Transport for Recorder {
        async fn execute(&self, request: Request) -> Result<Response, TransportError> {
            self.seen.lock().unwrap().push(request.headers().clone());
            Ok(Response::from(::http::Response::builder().status(200).body("ok").unwrap()))
        }
    }

    fn get() -> Request {
        Request::new(Method::GET, "http://example.com/v2/app/blobs/sha256:aa".parse().unwrap())
    }

    #[tokio::test]
    async fn sets_present_headers_and_omits_absent_ones() {
        let rec = Recorder::default();
        let identity = TransferIdentity {
            digest: Some("example.com/app:1.0.0@sha256:aa".into()),
            registry: Some("example.com".into()),
            repository: Some("example.com/app".into()),
            tag: None,
            image: Some("example.com/app@sha256:aa".into()),
        };
        let t = HeaderPropagatingTransport::new(rec.clone(), identity);
        let resp = t.execute(get()).await.unwrap();
        assert_eq!(resp.status(), 200);

        let seen = rec.seen.lock().unwrap();
        let h = &seen[0];
        assert_eq!(h.get("x-digest").unwrap(), "example.com/app:1.0.0@sha256:aa");
        assert_eq!(h.get("x-registry").unwrap(), "example.com");
        assert_eq!(h.get("x-repository").unwrap(), "example.com/app");
        assert_eq!(h.get("x-image").unwrap(), "example.com/app@sha256:aa");
        assert!(h.get("x-tag").is_none());
    }

    #[tokio::test]
    async fn overwrites_existing_header_values() {
        let rec = Recorder::default();
        let t = HeaderPropagatingTransport::new(
            rec.clone(),
            TransferIdentity { tag: Some("1.0.0".into()), ..Default::default() },
        );
        let mut req = get();
        req.headers_mut().insert("x-tag", HeaderValue::from_static("stale"));
        t.execute(req).await.unwrap();
        let seen = rec.seen.lock().unwrap();
        let tags: Vec<_> = seen[0].get_all("x-tag").iter().cloned().collect();
        assert_eq!(tags, vec![HeaderValue::from_static("1.0.0")]);
    }

    #[tokio::test]
    async fn rejects_values_that_cannot_be_headers() {
        let rec = Recorder::default();
        let t = HeaderPropagatingTransport::new(
            rec.clone(),
            TransferIdentity { tag: Some("bad\nvalue".into()), ..Default::default() },
        );
        let err = t.execute(get()).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeader { .. }), "err={}", err);
        assert!(rec.seen.lock().unwrap().is_empty());
    }
}
