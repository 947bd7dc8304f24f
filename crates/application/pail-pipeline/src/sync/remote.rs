use chrono::DateTime;
use pail_core::path_utils::PailPath;
use pail_core::{FileRecord, Snapshot};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sync::{FileCollection, SyncError};

/// Header carrying the sidecar metadata blob on object up/downloads.
pub const META_HEADER: &str = "x-object-meta";

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// One entry of the store listing. `metadata` is the raw sidecar blob
/// attached at upload time, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSummaryExternal {
    pub key: String,
    pub etag: String,
    pub size: u64,
    /// RFC 3339, the store's own object-modification time.
    pub last_modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingExternal {
    pub objects: Vec<ObjectSummaryExternal>,
}

/// Sidecar blob written at upload time: the uploader's own modification
/// time in nanoseconds, which survives re-uploads that would otherwise
/// reset the store clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarMeta {
    pub mtime: u64,
}

/// Normalize a store URL so it can be used as a base for object paths.
/// Treat the input as a directory base even without a trailing slash;
/// otherwise `Url::join` would replace the last path segment instead of
/// appending below it.
pub(crate) fn normalize_store_base(store_url: &str) -> Result<Url, SyncError> {
    let mut url = Url::parse(store_url)
        .map_err(|e| SyncError::Unavailable(format!("invalid store url {store_url}: {e}")))?;

    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }

    Ok(url)
}

/// Strip the quotes most stores wrap around etags.
fn trim_etag(raw: &str) -> String {
    raw.trim_matches('"').to_string()
}

/// Sidecar mtime truncated to seconds; the store's own last-modified
/// when the sidecar is absent or unparsable.
fn modified_of(key: &str, metadata: Option<&str>, last_modified: &str) -> u64 {
    if let Some(raw) = metadata {
        match serde_json::from_str::<SidecarMeta>(raw) {
            Ok(meta) => return meta.mtime / NANOS_PER_SEC,
            Err(e) => debug!("unparsable sidecar for {key}: {e}"),
        }
    }

    DateTime::parse_from_rfc3339(last_modified)
        .or_else(|_| DateTime::parse_from_rfc2822(last_modified))
        .map(|dt| dt.timestamp().max(0) as u64)
        .unwrap_or(0)
}

/// HTTP object-store backend. The listing endpoint returns metadata for
/// every object in one round trip, so a snapshot costs a single request.
pub struct RemoteStore {
    client: Client,
    base: Url,
}

impl RemoteStore {
    pub fn new(client: Client, store_url: &str) -> Result<Self, SyncError> {
        Ok(Self {
            client,
            base: normalize_store_base(store_url)?,
        })
    }

    fn listing_url(&self) -> Result<Url, SyncError> {
        self.base
            .join("objects")
            .map_err(|e| SyncError::Unavailable(format!("bad listing url from {}: {e}", self.base)))
    }

    fn object_url(&self, key: &str) -> Result<Url, SyncError> {
        let mut url = self.base.clone();
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| SyncError::Unavailable("cannot mutate store url".into()))?;
            segs.pop_if_empty();
            segs.push("objects");
            for part in PailPath::normalize(key).split('/') {
                if !part.is_empty() {
                    segs.push(part);
                }
            }
        }
        Ok(url)
    }

    async fn list(&self) -> Result<ListingExternal, SyncError> {
        let url = self.listing_url()?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::Unavailable(format!("listing request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(SyncError::Unavailable(format!(
                "listing returned {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SyncError::Unavailable(format!("listing body failed: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::Unavailable(format!("listing parse failed: {e}")))
    }

    fn header_str(resp: &reqwest::Response, name: &str) -> Option<String> {
        resp.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string())
    }
}

#[async_trait::async_trait]
impl FileCollection for RemoteStore {
    fn name(&self) -> String {
        format!("store:{}", self.base)
    }

    async fn enumerate(&self) -> Result<Vec<String>, SyncError> {
        let listing = self.list().await?;
        let mut keys: Vec<String> = listing
            .objects
            .into_iter()
            .map(|o| PailPath::normalize(&o.key))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn lookup(&self, path: &str) -> Result<FileRecord, SyncError> {
        let url = self.object_url(path)?;
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| SyncError::Unavailable(format!("head for {path} failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(path.to_string()));
        }
        if !resp.status().is_success() {
            return Err(SyncError::Unavailable(format!(
                "head for {path} returned {}",
                resp.status()
            )));
        }

        let etag = Self::header_str(&resp, "etag")
            .map(|raw| trim_etag(&raw))
            .ok_or_else(|| SyncError::Unavailable(format!("no etag for {path}")))?;
        let metadata = Self::header_str(&resp, META_HEADER);
        let last_modified = Self::header_str(&resp, "last-modified").unwrap_or_default();
        let modified = modified_of(path, metadata.as_deref(), &last_modified);

        Ok(FileRecord::present(PailPath::normalize(path), etag, modified))
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SyncError> {
        let url = self.object_url(path)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::Transfer(format!("download of {path} failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(path.to_string()));
        }
        if !resp.status().is_success() {
            return Err(SyncError::Transfer(format!(
                "download of {path} returned {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SyncError::Transfer(format!("download body of {path} failed: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn store(&self, path: &str, content: &[u8], modified: u64) -> Result<(), SyncError> {
        let url = self.object_url(path)?;
        let sidecar = serde_json::to_string(&SidecarMeta {
            mtime: modified * NANOS_PER_SEC,
        })
        .map_err(|e| SyncError::Transfer(format!("sidecar encode for {path} failed: {e}")))?;

        let resp = self
            .client
            .put(url)
            .header(META_HEADER, sidecar)
            .body(content.to_vec())
            .send()
            .await
            .map_err(|e| SyncError::Transfer(format!("upload of {path} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(SyncError::Transfer(format!(
                "upload of {path} returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// One listing round trip; the entries already carry everything a
    /// record needs.
    async fn snapshot(&self, _workers: usize) -> Result<Snapshot, SyncError> {
        let listing = self.list().await?;

        let mut snapshot = Snapshot::new();
        for obj in listing.objects {
            let key = PailPath::normalize(&obj.key);
            if !PailPath::verify_safe(&key) {
                debug!("skipping unsafe store key {key}");
                continue;
            }
            let modified = modified_of(&key, obj.metadata.as_deref(), &obj.last_modified);
            let record = FileRecord::present(key.clone(), trim_etag(&obj.etag), modified);
            snapshot.insert(key, record);
        }
        Ok(snapshot)
    }
}
