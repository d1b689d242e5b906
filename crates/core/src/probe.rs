//! Existence probing of optional assets.
//!
//! A probe walks candidate URLs in priority order and, per URL, tries a list
//! of strategies (HEAD, ranged GET, plain GET). Each strategy yields
//! `Option<Result<..>>`; the first confirming answer wins. A miss is not an
//! error, it only means the asset is absent.

use std::{fmt::Display, future::Future, sync::Arc};

use tracing::{debug, trace};

use crate::{
    error::Result,
    fetch::{AssetFetcher, ByteRange, ProbeResponse},
    types::AssetKind,
};

/// How a single existence check is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    Head,
    RangedGet(ByteRange),
    Get,
}

impl ProbeStrategy {
    pub fn for_kind(kind: AssetKind) -> &'static [ProbeStrategy] {
        static MEDIA: [ProbeStrategy; 3] = [
            ProbeStrategy::Head,
            ProbeStrategy::RangedGet(ByteRange::PROBE),
            ProbeStrategy::Get,
        ];
        static SMALL: [ProbeStrategy; 2] = [ProbeStrategy::Head, ProbeStrategy::Get];

        if kind.is_large_media() {
            return &MEDIA;
        }
        &SMALL
    }

    async fn send(&self, fetcher: &dyn AssetFetcher, url: &str) -> Result<ProbeResponse> {
        match self {
            ProbeStrategy::Head => fetcher.head(url).await,
            ProbeStrategy::RangedGet(range) => fetcher.get(url, Some(*range)).await,
            ProbeStrategy::Get => fetcher.get(url, None).await,
        }
    }
}

/// Whether a 2xx alone proves existence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentTypeCheck {
    #[default]
    Lenient,
    /// Also require the kind's content-type family, so a catch-all host
    /// answering `200 text/html` for every path does not count as a hit.
    Strict,
}

/// Await lazily built attempts in order and return the first `Some(Ok(_))`.
///
/// `None` means the attempt was conclusive but negative; `Some(Err(_))` is a
/// failed attempt. Both move on to the next one. Attempts after the winner
/// are never polled.
pub async fn first_success<T, E, Fut, I>(attempts: I) -> Option<T>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Option<std::result::Result<T, E>>>,
    E: Display,
{
    for attempt in attempts {
        match attempt.await {
            Some(Ok(value)) => return Some(value),
            Some(Err(e)) => trace!(error = %e, "Attempt failed"),
            None => {}
        }
    }
    None
}

#[derive(Clone)]
pub struct AssetProber {
    fetcher: Arc<dyn AssetFetcher>,
    check: ContentTypeCheck,
}

impl AssetProber {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            check: ContentTypeCheck::default(),
        }
    }

    pub fn with_content_type_check(mut self, check: ContentTypeCheck) -> Self {
        self.check = check;
        self
    }

    pub fn fetcher(&self) -> &Arc<dyn AssetFetcher> {
        &self.fetcher
    }

    fn confirms(&self, kind: AssetKind, strategy: ProbeStrategy, res: &ProbeResponse) -> bool {
        let status_ok = match strategy {
            ProbeStrategy::RangedGet(_) => res.is_success() || res.status == 206,
            _ => res.is_success(),
        };
        match self.check {
            ContentTypeCheck::Lenient => status_ok,
            ContentTypeCheck::Strict => {
                status_ok && res.content_type_matches(kind.expected_content_types())
            }
        }
    }

    /// Whether `url` exists, trying each strategy for `kind` in turn.
    pub async fn exists(&self, kind: AssetKind, url: &str) -> bool {
        let attempts = ProbeStrategy::for_kind(kind).iter().copied().map(|strategy| async move {
            match strategy.send(self.fetcher.as_ref(), url).await {
                Ok(res) if self.confirms(kind, strategy, &res) => Some(Ok(())),
                Ok(res) => {
                    trace!(url, status = res.status, ?strategy, "Probe miss");
                    None
                }
                Err(e) => Some(Err(e)),
            }
        });
        first_success(attempts).await.is_some()
    }

    /// First URL in `urls` that exists, or `None` when none does.
    pub async fn probe_first<S: AsRef<str>>(&self, kind: AssetKind, urls: &[S]) -> Option<String> {
        for url in urls {
            let url = url.as_ref();
            if self.exists(kind, url).await {
                debug!(kind = kind.name(), url, "Probe hit");
                return Some(url.to_string());
            }
        }
        None
    }
}
