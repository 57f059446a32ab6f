//! Registration document resolution
//!
//! Turns the metadata pointer stored on chain into a [`RegistrationFile`]. Pointers may
//! be inline base64 data URIs, `ipfs://` content addresses or plain HTTP(S) URLs.
//! Resolution never fails from the caller's point of view: any error yields an empty
//! registration.

use crate::error::MetadataError;
use crate::types::RegistrationFile;
use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use std::time::Duration;
use tracing::debug;

/// Standard alphabet; accepts payloads with or without trailing padding.
const DATA_URI_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Where a metadata pointer leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointer<'a> {
    Empty,
    /// `data:` URI; the full URI is kept for decoding.
    Inline(&'a str),
    /// `ipfs://` path with the scheme stripped.
    Ipfs(&'a str),
    Http(&'a str),
    Unsupported(&'a str),
}

impl<'a> Pointer<'a> {
    pub fn classify(pointer: Option<&'a str>) -> Self {
        let Some(raw) = pointer.map(str::trim).filter(|p| !p.is_empty()) else {
            return Pointer::Empty;
        };
        if raw.starts_with("data:") {
            Pointer::Inline(raw)
        } else if let Some(path) = raw.strip_prefix("ipfs://") {
            Pointer::Ipfs(path.strip_prefix("ipfs/").unwrap_or(path))
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            Pointer::Http(raw)
        } else {
            Pointer::Unsupported(raw)
        }
    }
}

/// Decode a `data:<mime>;base64,<payload>` URI into a registration.
pub fn decode_data_uri(uri: &str) -> Result<RegistrationFile, MetadataError> {
    let rest = uri.strip_prefix("data:").ok_or(MetadataError::InvalidDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(MetadataError::InvalidDataUri)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(MetadataError::InvalidDataUri)?;
    if mime.is_empty() || payload.trim().is_empty() {
        return Err(MetadataError::InvalidDataUri);
    }
    let bytes = DATA_URI_ENGINE.decode(payload.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Rewrite an IPFS path onto an HTTP gateway prefix.
pub fn gateway_url(gateway: &str, path: &str) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Resolves metadata pointers to registration documents.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolve with the failure reason exposed.
    async fn try_resolve(&self, pointer: Option<&str>) -> Result<RegistrationFile, MetadataError>;

    /// Resolve, degrading any failure to an empty registration.
    async fn resolve(&self, pointer: Option<&str>) -> RegistrationFile {
        match self.try_resolve(pointer).await {
            Ok(file) => file,
            Err(e) => {
                debug!(pointer = ?pointer, error = %e, "registration unresolvable");
                RegistrationFile::default()
            }
        }
    }
}

/// Resolver that fetches remote documents over HTTP.
pub struct HttpRegistrationResolver {
    http: reqwest::Client,
    gateway: String,
    timeout: Duration,
}

impl HttpRegistrationResolver {
    pub fn new(gateway: impl Into<String>, timeout: Duration) -> Result<Self, MetadataError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            gateway: gateway.into(),
            timeout,
        })
    }

    async fn fetch(&self, url: &str) -> Result<RegistrationFile, MetadataError> {
        let exchange = async {
            let response = self.http.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(MetadataError::Status(status.as_u16()));
            }
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| MetadataError::Timeout(self.timeout.as_secs()))?
    }
}

#[async_trait]
impl MetadataResolver for HttpRegistrationResolver {
    async fn try_resolve(&self, pointer: Option<&str>) -> Result<RegistrationFile, MetadataError> {
        match Pointer::classify(pointer) {
            Pointer::Empty => Ok(RegistrationFile::default()),
            Pointer::Inline(uri) => decode_data_uri(uri),
            Pointer::Ipfs(path) => self.fetch(&gateway_url(&self.gateway, path)).await,
            Pointer::Http(url) => self.fetch(url).await,
            Pointer::Unsupported(raw) => Err(MetadataError::UnsupportedScheme(
                raw.split(':').next().unwrap_or(raw).to_string(),
            )),
        }
    }
}
