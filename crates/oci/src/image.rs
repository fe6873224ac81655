use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use flate2::write::GzDecoder;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::fetch::digest_of;
use crate::TransferError;

pub const ANNOTATION_CREATED: &str = "org.opencontainers.image.created";
pub const ANNOTATION_REF_NAME: &str = "org.opencontainers.image.ref.name";

pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.image.config.v1+json";
pub const LAYER_MEDIA_TYPE_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
pub const LAYER_MEDIA_TYPE_TAR: &str = "application/vnd.oci.image.layer.v1.tar";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The one layer carried by a snapshot image.
#[derive(Debug, Clone)]
pub struct LayerBlob {
    pub data: Vec<u8>,
    pub media_type: &'static str,
    /// Digest of `data` as stored.
    pub digest: String,
    /// Digest of the uncompressed tar stream.
    pub diff_id: String,
}

/// Creation metadata stamped on every snapshot manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMetadata {
    pub created: DateTime<Utc>,
    /// Destination reference the image is published under.
    pub reference: String,
}

impl SnapshotMetadata {
    pub fn new(reference: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self { created, reference: reference.into() }
    }

    pub fn now(reference: impl Into<String>) -> Self { Self::new(reference, Utc::now()) }

    pub fn to_annotations(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (ANNOTATION_CREATED.to_string(), self.created.to_rfc3339_opts(SecondsFormat::Secs, true)),
            (ANNOTATION_REF_NAME.to_string(), self.reference.clone()),
        ])
    }
}

#[derive(Serialize)]
struct ImageConfig<'a> {
    architecture: &'a str,
    os: &'a str,
    created: String,
    config: BTreeMap<String, String>,
    rootfs: RootFs<'a>,
    history: Vec<History<'a>>,
}

#[derive(Serialize)]
struct RootFs<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    diff_ids: Vec<&'a str>,
}

#[derive(Serialize)]
struct History<'a> {
    created: String,
    created_by: &'a str,
}

/// A fresh single-layer image: the fetched layer plus a minimal config.
#[derive(Debug, Clone)]
pub struct SnapshotImage {
    pub layer: LayerBlob,
    pub config: Vec<u8>,
    pub annotations: BTreeMap<String, String>,
}

impl SnapshotImage {
    /// Wrap `data` (already verified against `digest`) as the sole layer.
    pub fn single_layer(data: Vec<u8>, digest: &str, metadata: &SnapshotMetadata) -> Result<Self, TransferError> {
        let gzipped = data.starts_with(&GZIP_MAGIC);
        let diff_id = if gzipped { uncompressed_digest(&data)? } else { tar_digest(&data, digest) };
        let layer = LayerBlob {
            media_type: if gzipped { LAYER_MEDIA_TYPE_GZIP } else { LAYER_MEDIA_TYPE_TAR },
            digest: digest.to_string(),
            diff_id,
            data,
        };
        let created = metadata.created.to_rfc3339_opts(SecondsFormat::Secs, true);
        let config = ImageConfig {
            architecture: "amd64",
            os: "linux",
            created: created.clone(),
            config: BTreeMap::new(),
            rootfs: RootFs { kind: "layers", diff_ids: vec![layer.diff_id.as_str()] },
            history: vec![History { created, created_by: "ferry snapshot" }],
        };
        let config = serde_json::to_vec(&config).map_err(|e| TransferError::Assemble(e.to_string()))?;
        Ok(Self { layer, config, annotations: metadata.to_annotations() })
    }

    pub fn config_digest(&self) -> String {
        format!("sha256:{}", hex::encode(Sha256::digest(&self.config)))
    }
}

/// Uncompressed tar: the diff id is the blob digest, recomputed as sha256 when needed.
fn tar_digest(data: &[u8], digest: &str) -> String {
    if digest.starts_with("sha256:") {
        digest.to_string()
    } else {
        digest_of("sha256", data).unwrap_or_default()
    }
}

struct HashWriter(Sha256);

impl Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

fn uncompressed_digest(data: &[u8]) -> Result<String, TransferError> {
    let assemble = |e: io::Error| TransferError::Assemble(format!("decompressing layer: {}", e));
    let mut decoder = GzDecoder::new(HashWriter(Sha256::new()));
    decoder.write_all(data).map_err(assemble)?;
    let HashWriter(hasher) = decoder.finish().map_err(assemble)?;
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn metadata() -> SnapshotMetadata {
        SnapshotMetadata::new("registry.local:5000/snapshots/app:v1", Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn annotations_carry_created_and_ref_name() {
        let a = metadata().to_annotations();
        assert_eq!(a[ANNOTATION_CREATED], "2024-05-01T12:00:00Z");
        assert_eq!(a[ANNOTATION_REF_NAME], "registry.local:5000/snapshots/app:v1");
    }

    #[test]
    fn plain_tar_layer_reuses_blob_digest() {
        let data = b"not gzip".to_vec();
        let digest = digest_of("sha256", &data).unwrap();
        let img = SnapshotImage::single_layer(data, &digest, &metadata()).unwrap();
        assert_eq!(img.layer.media_type, LAYER_MEDIA_TYPE_TAR);
        assert_eq!(img.layer.diff_id, digest);
        let cfg: serde_json::Value = serde_json::from_slice(&img.config).unwrap();
        assert_eq!(cfg["rootfs"]["type"], "layers");
        assert_eq!(cfg["rootfs"]["diff_ids"][0], digest.as_str());
        assert_eq!(cfg["created"], "2024-05-01T12:00:00Z");
        assert!(img.config_digest().starts_with("sha256:"));
    }

    #[test]
    fn gzip_layer_diff_id_is_uncompressed_digest() {
        let raw = b"tar bytes".repeat(64);
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&raw).unwrap();
        let gz = enc.finish().unwrap();
        let digest = digest_of("sha256", &gz).unwrap();
        let img = SnapshotImage::single_layer(gz, &digest, &metadata()).unwrap();
        assert_eq!(img.layer.media_type, LAYER_MEDIA_TYPE_GZIP);
        assert_eq!(img.layer.digest, digest);
        assert_eq!(img.layer.diff_id, digest_of("sha256", &raw).unwrap());
    }

    #[test]
    fn truncated_gzip_is_an_assembly_error() {
        let data = vec![0x1f, 0x8b, 0x08, 0x00];
        let err = SnapshotImage::single_layer(data, "sha256:00", &metadata()).unwrap_err();
        assert!(matches!(err, TransferError::Assemble(_)), "err={}", err);
    }
}
