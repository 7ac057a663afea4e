use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::storage::trace_store::TraceStore;

/// Descriptive metadata stored next to each received bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMeta {
    pub received_at_utc: DateTime<Utc>,
    pub content_type: String,
    pub content_encoding: String,
    pub client_id: String,
    pub source: String,
    pub schema_version: String,
    pub user_agent: String,
}

impl BundleMeta {
    pub fn new(client_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            received_at_utc: Utc::now(),
            content_type: "application/x-ndjson".to_string(),
            content_encoding: "gzip".to_string(),
            client_id: client_id.into(),
            source: source.into(),
            schema_version: "hindsight.bundle.v1".to_string(),
            user_agent: String::new(),
        }
    }
}

/// Outcome of storing one bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReceipt {
    pub key: String,
    pub meta_key: String,
    pub content_sha256: String,
    pub duplicate: bool,
}

/// Content-addressed storage for gzipped session bundles:
/// `teams/<teamId>/sessions/<sessionId>/<contentSha256>.ndjson.gz` plus a
/// sibling `.meta.json`. The hash covers the uncompressed bytes, so the
/// same content re-shipped with different compression settings dedupes.
pub struct BundleStore {
    root: PathBuf,
}

impl BundleStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Store a gzipped JSONL bundle. Storing the same content twice is a
    /// no-op reported via `duplicate=true`.
    pub fn store(
        &self,
        team_id: &str,
        session_id: &str,
        gz_bytes: &[u8],
        meta: &BundleMeta,
    ) -> Result<BundleReceipt> {
        let mut decoder = GzDecoder::new(gz_bytes);
        let mut uncompressed = Vec::new();
        decoder.read_to_end(&mut uncompressed).map_err(|err| {
            Error::InvalidOperation(format!("bundle is not valid gzip: {}", err))
        })?;

        let sha = hex_digest(&uncompressed);
        let dir = self
            .root
            .join("teams")
            .join(sanitize_component(team_id))
            .join("sessions")
            .join(sanitize_component(session_id));
        std::fs::create_dir_all(&dir)?;

        let key = format!(
            "teams/{}/sessions/{}/{}.ndjson.gz",
            sanitize_component(team_id),
            sanitize_component(session_id),
            sha
        );
        let meta_key = format!(
            "teams/{}/sessions/{}/{}.meta.json",
            sanitize_component(team_id),
            sanitize_component(session_id),
            sha
        );

        let bundle_path = dir.join(format!("{}.ndjson.gz", sha));
        if bundle_path.exists() {
            return Ok(BundleReceipt {
                key,
                meta_key,
                content_sha256: sha,
                duplicate: true,
            });
        }

        std::fs::write(&bundle_path, gz_bytes)?;
        let meta_path = dir.join(format!("{}.meta.json", sha));
        std::fs::write(&meta_path, serde_json::to_vec_pretty(meta)?)?;

        Ok(BundleReceipt {
            key,
            meta_key,
            content_sha256: sha,
            duplicate: false,
        })
    }

    /// Stored bundle bytes for a receipt key
    pub fn read(&self, key: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.root.join(key))?)
    }
}

/// Gzip one session's JSONL log for shipping
pub fn export_session(store: &TraceStore, session_id: &str) -> Result<Vec<u8>> {
    let bytes = store.session_bytes(session_id)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&bytes)?;
    Ok(encoder.finish()?)
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn sanitize_component(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
