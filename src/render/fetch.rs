//! Concurrent download of remote images.
//!
//! Every URL gets its own worker; the caller blocks until all of them have
//! finished. A failed URL leaves its slot empty and never affects the
//! others.

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, warn};
use url::Url;

use crate::config::NetworkConfig;
use crate::error::{MailError, Result};

use super::locations::ScratchSpace;

/// Source of remote image bytes.
pub trait ImageTransport: Sync {
    fn get(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        // reqwest's blocking client defaults to a 30 s timeout; `None` lifts it.
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| MailError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl ImageTransport for HttpTransport {
    fn get(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| MailError::Resolution(format!("{url}: {e}")))?;
        let bytes = response
            .bytes()
            .map_err(|e| MailError::Resolution(format!("{url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Resolves image URLs of one document, remembering the last origin seen.
///
/// A URL without a host is joined onto the origin of the most recent
/// absolute image URL in the same document.
#[derive(Debug, Default)]
pub struct UrlResolver {
    last_origin: Option<Url>,
}

impl UrlResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute URL for `src`, or `None` when it cannot be resolved.
    pub fn resolve(&mut self, src: &str) -> Option<Url> {
        let src = src.trim();
        if src.is_empty() {
            return None;
        }
        match Url::parse(src) {
            Ok(url) if url.has_host() => {
                let mut origin = url.clone();
                origin.set_path("/");
                origin.set_query(None);
                origin.set_fragment(None);
                self.last_origin = Some(origin);
                Some(url)
            }
            Ok(url) => {
                debug!(%url, "Image URL has no host");
                None
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.last_origin.as_ref()?;
                base.join(src).ok()
            }
            Err(e) => {
                debug!(src, error = %e, "Unparseable image URL");
                None
            }
        }
    }
}

/// One pending download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub slot: usize,
    pub url: Url,
}

/// Fetch every job concurrently and return the written paths.
///
/// The result has `slot_count` entries; entries without a successful
/// download are `None`.
pub fn fetch_all(
    jobs: Vec<FetchJob>,
    slot_count: usize,
    transport: &dyn ImageTransport,
    scratch: &ScratchSpace,
) -> Vec<Option<PathBuf>> {
    let mut slots: Vec<Option<PathBuf>> = vec![None; slot_count];
    if jobs.is_empty() {
        return slots;
    }

    let fetched: Vec<(usize, Option<PathBuf>)> = match rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.len())
        .thread_name(|i| format!("image-fetch-{i}"))
        .build()
    {
        Ok(pool) => pool.install(|| {
            jobs.into_par_iter()
                .map(|job| (job.slot, fetch_one(&job, transport, scratch)))
                .collect()
        }),
        Err(e) => {
            warn!(error = %e, "Could not start fetch workers, downloading in sequence");
            jobs.into_iter()
                .map(|job| (job.slot, fetch_one(&job, transport, scratch)))
                .collect()
        }
    };

    for (slot, path) in fetched {
        if let Some(entry) = slots.get_mut(slot) {
            *entry = path;
        }
    }
    slots
}

fn fetch_one(job: &FetchJob, transport: &dyn ImageTransport, scratch: &ScratchSpace) -> Option<PathBuf> {
    let bytes = match transport.get(&job.url) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(slot = job.slot, url = %job.url, error = %e, "Image download failed");
            return None;
        }
    };
    match scratch.write_unique(&bytes, None) {
        Ok(path) => {
            debug!(slot = job.slot, url = %job.url, path = %path.display(), "Image downloaded");
            Some(path)
        }
        Err(e) => {
            warn!(slot = job.slot, error = %e, "Could not store downloaded image");
            None
        }
    }
}
