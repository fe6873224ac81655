use ferry_transport::Transport;
use reqwest::{Method, Request, Url};
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, warn};

use crate::{RemoteDigest, Scheme, TransferError};

/// Registry v2 blob URL for the pinned digest.
pub fn blob_url(scheme: Scheme, remote: &RemoteDigest) -> String {
    format!("{}://{}/v2/{}/blobs/{}", scheme, remote.resolve_registry(), remote.repository(), remote.digest())
}

/// GET the layer blob through `transport` and check it against the requested digest.
///
/// The whole blob is held in memory: digest checking needs all of it and the push
/// takes an owned buffer. Peak memory is one layer per in-flight transfer, and the
/// transport's request timeout bounds how long a large body can stream.
pub async fn fetch_layer<T: Transport + ?Sized>(
    transport: &T,
    remote: &RemoteDigest,
    scheme: Scheme,
) -> Result<Vec<u8>, TransferError> {
    let url = blob_url(scheme, remote);
    let parsed = Url::parse(&url).map_err(|e| TransferError::Reference { reference: remote.canonical().to_string(), reason: e.to_string() })?;
    let response = transport.execute(Request::new(Method::GET, parsed)).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::Status { url, status: status.as_u16() });
    }
    let body = response.bytes().await.map_err(|source| TransferError::Body { url: url.clone(), source })?;
    debug!(url = %url, bytes = body.len(), "layer fetched");
    verify_digest(remote.digest(), &body)?;
    Ok(body.to_vec())
}

/// `algo:hex` of `data` for a supported algorithm, `None` otherwise.
pub(crate) fn digest_of(algorithm: &str, data: &[u8]) -> Option<String> {
    match algorithm {
        "sha256" => Some(format!("sha256:{}", hex::encode(Sha256::digest(data)))),
        "sha512" => Some(format!("sha512:{}", hex::encode(Sha512::digest(data)))),
        _ => None,
    }
}

fn verify_digest(expected: &str, data: &[u8]) -> Result<(), TransferError> {
    let algorithm = expected.split_once(':').map(|(a, _)| a).unwrap_or_default();
    match digest_of(algorithm, data) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(TransferError::DigestMismatch { expected: expected.to_string(), actual }),
        None => {
            warn!(digest = %expected, "unsupported digest algorithm; layer not verified");
            Ok(())
        }
    }
}
