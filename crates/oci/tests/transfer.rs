use std::io::Write;
use std::sync::{Arc, Mutex};

use ferry_api::ResourceEntry;
use ferry_oci::{Reference, Publisher, SnapshotImage, Transfer, TransferEngine, TransferError, Scheme, ANNOTATION_CREATED, ANNOTATION_REF_NAME};
use ferry_transport::{Connector, Request, Response, Transport, TransportError};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
struct Seen {
    proxy: String,
    url: String,
    headers: Vec<(String, String)>,
}

/// Serves one canned blob response and records what was asked for.
#[derive(Clone)]
struct ScriptedConnector {
    status: u16,
    body: Vec<u8>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl ScriptedConnector {
    fn serving(body: Vec<u8>) -> Self { Self { status: 200, body, seen: Default::default() } }

    fn failing(status: u16) -> Self { Self { status, body: Vec::new(), seen: Default::default() } }

    fn seen(&self) -> Vec<Seen> { self.seen.lock().unwrap().clone() }
}

struct ScriptedTransport {
    proxy: String,
    connector: ScriptedConnector,
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let headers = request
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap().to_string()))
            .collect();
        self.connector.seen.lock().unwrap().push(Seen { proxy: self.proxy.clone(), url: request.url().to_string(), headers });
        let resp = http::Response::builder().status(self.connector.status).body(self.connector.body.clone()).unwrap();
        Ok(Response::from(resp))
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn proxied(&self, proxy_addr: &str) -> Result<ScriptedTransport, TransportError> {
        Ok(ScriptedTransport { proxy: proxy_addr.to_string(), connector: self.clone() })
    }
}

#[derive(Default, Clone)]
struct RecordingPublisher {
    pushed: Arc<Mutex<Vec<(String, SnapshotImage)>>>,
}

#[async_trait::async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, destination: &Reference, image: &SnapshotImage) -> Result<String, TransferError> {
        self.pushed.lock().unwrap().push((destination.whole(), image.clone()));
        Ok(format!("http://{}/v2/{}/manifests/{}", destination.registry(), destination.repository(), destination.tag().unwrap_or("latest")))
    }
}

const REGISTRY: &str = "registry.local:5000";
const DESTINATION: &str = "registry.local:5000/snapshots/app:v1";

fn sha256(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

fn entry(access: serde_json::Value) -> ResourceEntry {
    ResourceEntry { name: "image".into(), version: "1.0.0".into(), kind: None, access }
}

fn global(reference: &str, digest: &str) -> ResourceEntry {
    entry(json!({ "globalAccess": { "ref": reference, "digest": digest } }))
}

fn engine(connector: ScriptedConnector, publisher: RecordingPublisher) -> TransferEngine<ScriptedConnector, RecordingPublisher> {
    TransferEngine::with_parts(REGISTRY, Scheme::Http, connector, publisher)
}

fn header<'a>(seen: &'a Seen, name: &str) -> Option<&'a str> {
    seen.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn pulls_through_proxy_with_identity_headers_and_pushes_directly() {
    let blob = b"plain tar layer".to_vec();
    let digest = sha256(&blob);
    let connector = ScriptedConnector::serving(blob.clone());
    let publisher = RecordingPublisher::default();
    let e = engine(connector.clone(), publisher.clone());

    let report = e.transfer(DESTINATION, &global("example.com/app", &digest)).await.unwrap();
    let remote = format!("example.com/app:1.0.0@{}", digest);
    assert_eq!(report.remote, remote);
    assert_eq!(report.destination, DESTINATION);
    assert_eq!(report.bytes, blob.len());
    assert_eq!(report.layer_digest, digest);

    let seen = connector.seen();
    assert_eq!(seen.len(), 1);
    let s = &seen[0];
    assert_eq!(s.proxy, REGISTRY);
    assert_eq!(s.url, format!("http://example.com/v2/app/blobs/{}", digest));
    assert_eq!(header(s, "x-digest"), Some(remote.as_str()));
    assert_eq!(header(s, "x-registry"), Some("example.com"));
    assert_eq!(header(s, "x-repository"), Some("example.com/app"));
    assert_eq!(header(s, "x-tag"), Some("1.0.0"));
    assert_eq!(header(s, "x-image"), Some(format!("example.com/app@{}", digest).as_str()));

    let pushed = publisher.pushed.lock().unwrap();
    assert_eq!(pushed.len(), 1);
    let (dest, image) = &pushed[0];
    assert_eq!(dest, DESTINATION);
    assert_eq!(image.layer.data, blob);
    assert_eq!(image.annotations[ANNOTATION_REF_NAME], DESTINATION);
    assert!(image.annotations[ANNOTATION_CREATED].ends_with('Z'));
}

#[tokio::test]
async fn gzip_layer_records_uncompressed_diff_id() {
    let raw = b"uncompressed tar stream".repeat(32);
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&raw).unwrap();
    let gz = enc.finish().unwrap();
    let publisher = RecordingPublisher::default();
    let e = engine(ScriptedConnector::serving(gz.clone()), publisher.clone());

    e.transfer(DESTINATION, &global("example.com/app", &sha256(&gz))).await.unwrap();
    let pushed = publisher.pushed.lock().unwrap();
    let image = &pushed[0].1;
    assert_eq!(image.layer.media_type, "application/vnd.oci.image.layer.v1.tar+gzip");
    assert_eq!(image.layer.diff_id, sha256(&raw));
    let cfg: serde_json::Value = serde_json::from_slice(&image.config).unwrap();
    assert_eq!(cfg["rootfs"]["diff_ids"], json!([sha256(&raw)]));
}

#[tokio::test]
async fn digest_mismatch_aborts_before_push() {
    let publisher = RecordingPublisher::default();
    let e = engine(ScriptedConnector::serving(b"tampered".to_vec()), publisher.clone());
    let err = e.transfer(DESTINATION, &global("example.com/app", &sha256(b"original"))).await.unwrap_err();
    assert!(matches!(err, TransferError::DigestMismatch { .. }), "err={}", err);
    assert!(publisher.pushed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upstream_error_status_is_a_transfer_error() {
    let publisher = RecordingPublisher::default();
    let e = engine(ScriptedConnector::failing(404), publisher.clone());
    let err = e.transfer(DESTINATION, &global("example.com/app", &sha256(b"x"))).await.unwrap_err();
    match err {
        TransferError::Status { status, url } => {
            assert_eq!(status, 404);
            assert!(url.starts_with("http://example.com/v2/app/blobs/sha256:"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(publisher.pushed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_access_never_touches_the_network() {
    let connector = ScriptedConnector::serving(Vec::new());
    let e = engine(connector.clone(), RecordingPublisher::default());

    let err = e.transfer(DESTINATION, &entry(json!({ "globalAccess": { "ref": "example.com/app" } }))).await.unwrap_err();
    assert!(matches!(err, TransferError::Access(_)), "err={}", err);
    let err = e.transfer(DESTINATION, &entry(json!("not-an-object"))).await.unwrap_err();
    assert!(matches!(err, TransferError::Access(_)), "err={}", err);
    let err = e.transfer(DESTINATION, &global("example.com/app", "sha256:zz")).await.unwrap_err();
    assert!(matches!(err, TransferError::Reference { .. }), "err={}", err);
    let err = e.transfer("Not A Reference", &global("example.com/app", &sha256(b"x"))).await.unwrap_err();
    assert!(matches!(err, TransferError::Reference { .. }), "err={}", err);

    assert!(connector.seen().is_empty());
}

#[tokio::test]
async fn repeated_transfer_overwrites_same_destination() {
    let blob = b"layer".to_vec();
    let publisher = RecordingPublisher::default();
    let e = engine(ScriptedConnector::serving(blob.clone()), publisher.clone());
    let entry = global("example.com/app", &sha256(&blob));

    let first = e.transfer(DESTINATION, &entry).await.unwrap();
    let second = e.transfer(DESTINATION, &entry).await.unwrap();
    assert_eq!(first.destination, second.destination);
    assert_eq!(first.manifest_url, second.manifest_url);
    let pushed = publisher.pushed.lock().unwrap();
    assert_eq!(pushed.len(), 2);
    assert_eq!(pushed[0].0, pushed[1].0);
}
