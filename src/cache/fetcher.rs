//! Asset fetching
//!
//! The cache talks to storage through [`AssetFetcher`]. [`FsFetcher`] reads
//! frames from a local directory tree; hosts with a CDN plug in their own.

use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::CacheKey;
use crate::catalog::Encoding;

/// Why a single (frame, encoding) fetch failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The asset does not exist in this encoding
    #[error("not found: {0}")]
    NotFound(String),

    /// The payload is not an image of the requested encoding
    #[error("corrupt payload: {0}")]
    Corrupt(String),

    /// Timeout, connection reset or similar; worth retrying
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Failures that will not go away on retry
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::NotFound(_) | FetchError::Corrupt(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// One fetch handed to an [`AssetFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub key: CacheKey,
    /// Path rendered from the sequence template, relative to the asset root
    pub path: String,
}

/// Source of frame payloads.
///
/// The returned future must be `'static`: the cache drives it on its own task
/// so a load completes (and fills the cache) even if the caller goes away.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> BoxFuture<'static, Result<Bytes, FetchError>>;
}

/// Reads frames from a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetFetcher for FsFetcher {
    fn fetch(&self, request: &FetchRequest) -> BoxFuture<'static, Result<Bytes, FetchError>> {
        let path = self.root.join(&request.path);
        async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                    Err(FetchError::NotFound(path.display().to_string()))
                }
                Err(e) => Err(FetchError::Transient(format!("{}: {}", path.display(), e))),
            }
        }
        .boxed()
    }
}

/// Check that `bytes` look like an image in `encoding`
pub fn sniff(bytes: &[u8], encoding: Encoding) -> Result<(), FetchError> {
    if bytes.is_empty() {
        return Err(FetchError::Corrupt("empty payload".to_string()));
    }

    match image::guess_format(bytes) {
        Ok(format) if format == encoding.image_format() => Ok(()),
        Ok(format) => Err(FetchError::Corrupt(format!(
            "expected {}, payload is {:?}",
            encoding.mime_type(),
            format
        ))),
        // ISO-BMFF brand check for AVIF variants the magic table misses
        Err(_) if encoding == Encoding::Avif && bytes.len() >= 12 && &bytes[4..8] == b"ftyp" => Ok(()),
        Err(_) => Err(FetchError::Corrupt(format!(
            "unrecognized payload for {}",
            encoding.mime_type()
        ))),
    }
}

/// Minimal payloads carrying the right magic bytes for each encoding
#[cfg(test)]
pub(crate) fn fake_payload(encoding: Encoding, tag: u8) -> Bytes {
    let mut data: Vec<u8> = match encoding {
        Encoding::Png => b"\x89PNG\r\n\x1a\n".to_vec(),
        Encoding::Jpeg => vec![0xFF, 0xD8, 0xFF, 0xE0],
        Encoding::Webp => b"RIFF\x10\x00\x00\x00WEBPVP8 ".to_vec(),
        Encoding::Avif => b"\x00\x00\x00\x1cftypavif".to_vec(),
    };
    data.extend_from_slice(&[tag; 16]);
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MaterialId;

    #[test]
    fn test_sniff_accepts_matching_format() {
        for encoding in [Encoding::Png, Encoding::Jpeg, Encoding::Webp, Encoding::Avif] {
            assert_eq!(sniff(&fake_payload(encoding, 1), encoding), Ok(()), "{:?}", encoding);
        }
    }

    #[test]
    fn test_sniff_rejects_mismatch_and_garbage() {
        assert!(matches!(
            sniff(&fake_payload(Encoding::Png, 1), Encoding::Webp),
            Err(FetchError::Corrupt(_))
        ));
        assert!(matches!(sniff(b"<html>404</html>", Encoding::Jpeg), Err(FetchError::Corrupt(_))));
        assert!(matches!(sniff(b"", Encoding::Png), Err(FetchError::Corrupt(_))));
    }

    #[test]
    fn test_error_classification() {
        assert!(FetchError::NotFound("x".into()).is_permanent());
        assert!(FetchError::Corrupt("x".into()).is_permanent());
        assert!(FetchError::Transient("x".into()).is_transient());
        assert!(!FetchError::Cancelled.is_permanent());
        assert!(!FetchError::Cancelled.is_transient());
    }

    #[tokio::test]
    async fn test_fs_fetcher_reads_and_reports_missing() {
        let root = std::env::temp_dir().join(format!("turntable-fetch-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(root.join("ring")).await.unwrap();
        tokio::fs::write(root.join("ring/0.png"), fake_payload(Encoding::Png, 7))
            .await
            .unwrap();

        let fetcher = FsFetcher::new(&root);
        let key = CacheKey::new(MaterialId::from("a"), 0, Encoding::Png);
        let found = fetcher
            .fetch(&FetchRequest {
                key: key.clone(),
                path: "ring/0.png".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(found, fake_payload(Encoding::Png, 7));

        let missing = fetcher
            .fetch(&FetchRequest {
                key,
                path: "ring/1.png".to_string(),
            })
            .await;
        assert!(matches!(missing, Err(FetchError::NotFound(_))));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
