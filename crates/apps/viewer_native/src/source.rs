//! Where region documents come from: an HTTP feed keyed by administrative
//! code, or a directory of previously downloaded documents.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use formats::{RegionCollection, RegionParseError};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Status { code: u32, status: u16 },
    NotFound { code: u32 },
    Io(std::io::Error),
    Parse(RegionParseError),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Http(err) => write!(f, "request failed: {err}"),
            FetchError::Status { code, status } => {
                write!(f, "region {code}: upstream returned status {status}")
            }
            FetchError::NotFound { code } => write!(f, "region {code}: no document"),
            FetchError::Io(err) => write!(f, "I/O error: {err}"),
            FetchError::Parse(err) => write!(f, "region document rejected: {err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(err) => Some(err),
            FetchError::Io(err) => Some(err),
            FetchError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}

impl From<RegionParseError> for FetchError {
    fn from(err: RegionParseError) -> Self {
        FetchError::Parse(err)
    }
}

/// Fetches the feature collection for one administrative code.
pub trait RegionSource: Send + Sync {
    fn describe(&self) -> String;

    fn fetch(&self, code: u32) -> BoxFuture<'_, Result<RegionCollection, FetchError>>;
}

/// URL template with a `{code}` placeholder.
pub struct HttpRegionSource {
    client: reqwest::Client,
    template: String,
}

impl HttpRegionSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            template: template.into(),
        }
    }

    pub fn url_for(&self, code: u32) -> String {
        self.template.replace("{code}", &code.to_string())
    }
}

impl RegionSource for HttpRegionSource {
    fn describe(&self) -> String {
        self.template.clone()
    }

    fn fetch(&self, code: u32) -> BoxFuture<'_, Result<RegionCollection, FetchError>> {
        Box::pin(async move {
            let url = self.url_for(code);
            tracing::debug!(target: "viewer_native::source", %url, "fetching region");
            let resp = self.client.get(&url).send().await?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound { code });
            }
            if !resp.status().is_success() {
                return Err(FetchError::Status {
                    code,
                    status: resp.status().as_u16(),
                });
            }
            let bytes = resp.bytes().await?;
            Ok(RegionCollection::from_geojson_slice(&bytes)?)
        })
    }
}

/// Directory holding `{code}_full.json` (preferred) or `{code}.json`.
pub struct DirRegionSource {
    root: PathBuf,
}

impl DirRegionSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, code: u32) -> [PathBuf; 2] {
        [
            self.root.join(format!("{code}_full.json")),
            self.root.join(format!("{code}.json")),
        ]
    }
}

impl RegionSource for DirRegionSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn fetch(&self, code: u32) -> BoxFuture<'_, Result<RegionCollection, FetchError>> {
        Box::pin(async move {
            for path in self.candidates(code) {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => return Ok(RegionCollection::from_geojson_slice(&bytes)?),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => return Err(FetchError::Io(err)),
                }
            }
            Err(FetchError::NotFound { code })
        })
    }
}

/// `http://` and `https://` locations are URL templates; anything else is a directory.
pub fn source_for(location: &str) -> Arc<dyn RegionSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpRegionSource::new(location))
    } else {
        Arc::new(DirRegionSource::new(location))
    }
}
