use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{CACHE_CONTROL, CONTENT_TYPE, RANGE},
};

use crate::error::{MediaError, Result};

/// Status and content type of an existence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
}

impl ProbeResponse {
    pub fn new(status: u16, content_type: Option<&str>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type_matches(&self, prefixes: &[&str]) -> bool {
        let Some(ct) = self.content_type.as_deref() else {
            return false;
        };
        let ct = ct.to_ascii_lowercase();
        prefixes.iter().any(|p| ct.starts_with(p))
    }
}

/// Inclusive byte range for partial GETs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub first: u64,
    pub last: u64,
}

impl ByteRange {
    pub const PROBE: ByteRange = ByteRange { first: 0, last: 256 };

    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.first, self.last)
    }
}

/// Network access used by the prober and caption loader. `url` is either an
/// absolute URL or a path on the asset origin.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn head(&self, url: &str) -> Result<ProbeResponse>;

    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<ProbeResponse>;

    /// Fetch a body as text; non-2xx is an error.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// `AssetFetcher` backed by a shared reqwest client and an asset origin.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    origin: String,
}

impl HttpFetcher {
    pub fn new(origin: &str) -> Result<Self> {
        let origin = origin.trim().trim_end_matches('/');
        if origin.is_empty() {
            return Err(MediaError::MissingOrigin);
        }
        let client = Client::builder()
            .user_agent(concat!("microreel/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            origin: origin.to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.origin, url)
        } else {
            format!("{}/{}", self.origin, url)
        }
    }

    fn response_of(res: &reqwest::Response) -> ProbeResponse {
        ProbeResponse {
            status: res.status().as_u16(),
            content_type: res
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        let res = self
            .client
            .head(self.absolute(url))
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;
        Ok(Self::response_of(&res))
    }

    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<ProbeResponse> {
        let mut req = self
            .client
            .get(self.absolute(url))
            .header(CACHE_CONTROL, "no-store");
        if let Some(range) = range {
            req = req.header(RANGE, range.header_value());
        }
        // Only the status line matters; the body is dropped unread.
        let res = req.send().await?;
        Ok(Self::response_of(&res))
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let absolute = self.absolute(url);
        let res = self
            .client
            .get(&absolute)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(MediaError::Status {
                url: absolute,
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }
        Ok(res.text().await?)
    }
}

/// Method recorded by [`MemoryFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Head,
    RangedGet,
    Get,
}

#[derive(Debug, Clone)]
struct StoredAsset {
    content_type: Option<String>,
    body: String,
}

/// In-memory asset host for offline runs and tests.
///
/// Unknown paths answer 404. Paths can be marked as failing at the
/// transport level, and HEAD can be disabled to mimic hosts that reject it.
#[derive(Default)]
pub struct MemoryFetcher {
    assets: Mutex<HashMap<String, StoredAsset>>,
    broken: Mutex<HashSet<String>>,
    head_status: Mutex<Option<u16>>,
    log: Mutex<Vec<(FetchMethod, String)>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(self, url: &str, content_type: &str, body: &str) -> Self {
        self.insert(url, content_type, body);
        self
    }

    pub fn insert(&self, url: &str, content_type: &str, body: &str) {
        self.assets.lock().expect("MemoryFetcher poisoned").insert(
            url.to_string(),
            StoredAsset {
                content_type: Some(content_type.to_string()),
                body: body.to_string(),
            },
        );
    }

    /// Requests to `url` fail as if the connection dropped.
    pub fn with_broken(self, url: &str) -> Self {
        self.broken
            .lock()
            .expect("MemoryFetcher poisoned")
            .insert(url.to_string());
        self
    }

    /// Every HEAD answers with `status` regardless of the path.
    pub fn with_head_status(self, status: u16) -> Self {
        *self.head_status.lock().expect("MemoryFetcher poisoned") = Some(status);
        self
    }

    pub fn requests(&self) -> Vec<(FetchMethod, String)> {
        self.log.lock().expect("MemoryFetcher poisoned").clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.log
            .lock()
            .expect("MemoryFetcher poisoned")
            .iter()
            .filter(|(_, u)| u == url)
            .count()
    }

    fn record(&self, method: FetchMethod, url: &str) -> Result<Option<StoredAsset>> {
        self.log
            .lock()
            .expect("MemoryFetcher poisoned")
            .push((method, url.to_string()));
        if self.broken.lock().expect("MemoryFetcher poisoned").contains(url) {
            return Err(MediaError::transport(url, "connection reset"));
        }
        Ok(self
            .assets
            .lock()
            .expect("MemoryFetcher poisoned")
            .get(url)
            .cloned())
    }
}

#[async_trait]
impl AssetFetcher for MemoryFetcher {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        let asset = self.record(FetchMethod::Head, url)?;
        let forced = *self.head_status.lock().expect("MemoryFetcher poisoned");
        Ok(match (forced, asset) {
            (Some(status), asset) => ProbeResponse {
                status,
                content_type: asset.and_then(|a| a.content_type),
            },
            (None, Some(asset)) => ProbeResponse {
                status: 200,
                content_type: asset.content_type,
            },
            (None, None) => ProbeResponse::new(404, Some("text/html")),
        })
    }

    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<ProbeResponse> {
        let method = if range.is_some() {
            FetchMethod::RangedGet
        } else {
            FetchMethod::Get
        };
        Ok(match self.record(method, url)? {
            Some(asset) => ProbeResponse {
                status: if range.is_some() { 206 } else { 200 },
                content_type: asset.content_type,
            },
            None => ProbeResponse::new(404, Some("text/html")),
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        match self.record(FetchMethod::Get, url)? {
            Some(asset) => Ok(asset.body),
            None => Err(MediaError::Status {
                url: url.to_string(),
                status: 404,
                message: "Not Found".to_string(),
            }),
        }
    }
}
