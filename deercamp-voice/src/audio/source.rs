//! Clip source resolution
//!
//! Turns a clip's `source_uri` into bytes: `file://` URIs and bare paths are
//! read from disk, `http(s)://` URIs are downloaded.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a clip's encoded bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipSource {
    Local(PathBuf),
    Remote(String),
}

impl ClipSource {
    /// Classify a source URI
    ///
    /// # Errors
    /// - Empty URI
    /// - Any scheme other than `file`, `http` or `https`
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(Error::Source("empty source URI".to_string()));
        }

        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(ClipSource::Local(PathBuf::from(path)));
        }

        if let Some((scheme, _)) = uri.split_once("://") {
            return match scheme.to_ascii_lowercase().as_str() {
                "http" | "https" => Ok(ClipSource::Remote(uri.to_string())),
                _ => Err(Error::UnsupportedSource(uri.to_string())),
            };
        }

        Ok(ClipSource::Local(PathBuf::from(uri)))
    }

    /// File extension used as a format hint for the decoder
    pub fn extension_hint(&self) -> Option<String> {
        match self {
            ClipSource::Local(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase),
            ClipSource::Remote(url) => {
                // Drop query/fragment, then take the last path segment's extension
                let path = url.split(['?', '#']).next().unwrap_or(url);
                let (_, after_scheme) = path.split_once("://").unwrap_or(("", path));
                let (_, path_part) = after_scheme.split_once('/').unwrap_or((after_scheme, ""));
                Path::new(path_part)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase)
            }
        }
    }

    /// Read the encoded clip
    pub async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<u8>> {
        match self {
            ClipSource::Local(path) => {
                debug!("Reading clip from {}", path.display());
                tokio::fs::read(path)
                    .await
                    .map_err(|e| Error::Source(format!("{}: {}", path.display(), e)))
            }
            ClipSource::Remote(url) => {
                debug!("Downloading clip from {}", url);
                let response = http.get(url).send().await?.error_for_status()?;
                let bytes = response.bytes().await?;
                debug!("Downloaded {} bytes from {}", bytes.len(), url);
                Ok(bytes.to_vec())
            }
        }
    }
}
