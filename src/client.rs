//! Two-stage catalog fetch: one index page, then one detail call per entry.
//!
//! Detail calls run on a bounded pool of scoped worker threads. Workers pull
//! index entries from a job queue and push outcomes into a result channel; the
//! first failure stops every worker from starting another request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::config::SyncConfig;
use crate::decoder;
use crate::error::{DexError, NetworkError, Result};
use crate::models::CatalogItem;

/// Anything that can produce the full catalog for a sync attempt.
///
/// Items come back in completion order; callers must not rely on id order.
pub trait CatalogSource: Send + Sync {
    fn fetch_catalog(&self) -> Result<Vec<CatalogItem>>;
}

/// One `{name, url}` reference from the index page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexPage {
    results: Vec<IndexEntry>,
}

// ---------------------------------------------------------------------------
// CatalogClient
// ---------------------------------------------------------------------------

/// Blocking HTTP client for the remote catalog API.
///
/// Holds no storage state; deciding whether a fetch is needed at all is the
/// orchestrator's job.
pub struct CatalogClient {
    client: Client,
    base_url: String,
    page_size: u32,
    fan_out: usize,
}

impl CatalogClient {
    /// Build a client from a validated configuration.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(NetworkError::Transport)?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.catalog_size,
            fan_out: config.fan_out,
        })
    }

    /// The index URL: `{base}?limit={catalog size}`.
    pub fn index_url(&self) -> Result<Url> {
        index_url(&self.base_url, self.page_size)
    }

    /// Fetch and parse the index page.
    pub fn fetch_index(&self) -> Result<Vec<IndexEntry>> {
        let url = self.index_url()?;
        let body = self.get(url.as_str())?;
        parse_index(url.as_str(), &body)
    }

    /// Fetch and decode a single catalog item.
    pub fn fetch_item(&self, url: &str) -> Result<CatalogItem> {
        let url = Url::parse(url).map_err(|e| NetworkError::BadUrl(format!("{}: {}", url, e)))?;
        let body = self.get(url.as_str())?;
        let payload: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| NetworkError::BadData {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let item = decoder::decode(&payload)?;
        tracing::debug!(id = item.id, name = %item.name, "fetched catalog item");
        Ok(item)
    }

    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().map_err(NetworkError::Transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetworkError::BadResponse {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        let bytes = resp.bytes().map_err(NetworkError::Transport)?;
        Ok(bytes.to_vec())
    }
}

impl CatalogSource for CatalogClient {
    fn fetch_catalog(&self) -> Result<Vec<CatalogItem>> {
        let entries = self.fetch_index()?;
        let mut urls = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.url {
                Some(url) => urls.push(url),
                None => tracing::warn!(name = %entry.name, "index entry has no url; skipping"),
            }
        }
        tracing::info!(count = urls.len(), fan_out = self.fan_out, "fetching catalog details");
        fan_out(urls, self.fan_out, |url| self.fetch_item(&url))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append the page-size query to the catalog base URL.
pub fn index_url(base: &str, page_size: u32) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| NetworkError::BadUrl(format!("{}: {}", base, e)))?;
    if url.cannot_be_a_base() {
        return Err(NetworkError::BadUrl(base.to_string()).into());
    }
    url.query_pairs_mut()
        .append_pair("limit", &page_size.to_string());
    Ok(url)
}

/// Parse an index page body into its ordered references.
pub fn parse_index(url: &str, body: &[u8]) -> Result<Vec<IndexEntry>> {
    let page: IndexPage = serde_json::from_slice(body).map_err(|e| NetworkError::BadData {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(page.results)
}

/// Run `task` over `inputs` on at most `workers` threads.
///
/// Outputs are returned in completion order. On failure the first error in
/// completion order is returned and no new inputs are started.
pub(crate) fn fan_out<T, R, F>(inputs: Vec<T>, workers: usize, task: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Sync,
{
    if inputs.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, inputs.len());

    let (job_tx, job_rx) = flume::unbounded::<T>();
    for input in inputs {
        // The receiver is alive for the whole function, so this cannot fail.
        let _ = job_tx.send(input);
    }
    drop(job_tx);

    let (result_tx, result_rx) = flume::unbounded::<Result<R>>();
    let failed = AtomicBool::new(false);

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let failed = &failed;
            let task = &task;
            scope.spawn(move || {
                while let Ok(input) = job_rx.recv() {
                    if failed.load(Ordering::Acquire) {
                        break;
                    }
                    let outcome = task(input);
                    if outcome.is_err() {
                        failed.store(true, Ordering::Release);
                    }
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut out = Vec::new();
        let mut first_error: Option<DexError> = None;
        for outcome in result_rx.iter() {
            match outcome {
                Ok(value) => out.push(value),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(out),
        }
    })
}
