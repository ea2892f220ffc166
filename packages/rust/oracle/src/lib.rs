//! Extraction oracle: turns page locators into links and table rows.
//!
//! This crate provides:
//! - [`ExtractionOracle`]: the interface the pipeline stages call
//! - [`HtmlOracle`]: a static-HTML implementation over `reqwest` + `scraper`
//!
//! The pipeline treats the oracle as opaque: it never sees markup, only
//! link lists and rows of cell text.

mod page;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use cs2stat_shared::{Cs2StatError, MatchPage, Result};

pub use page::{parse_match_links, parse_match_page};

/// Browser-like User-Agent; stats sites serve an empty shell to unknown bots.
const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; cs2stat/", env!("CARGO_PKG_VERSION"), ")");

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Row-extraction oracle used by the discovery and extraction stages.
///
/// Implementations must be safe to share across workers; each call is
/// isolated so one failing page cannot affect another.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    /// Most recent match links on a profile page, at most `limit`.
    async fn discover_match_links(&self, profile_url: &str, limit: usize) -> Result<Vec<String>>;

    /// Load a match page and return its result phrase and table rows.
    async fn extract_match_rows(&self, match_url: &str) -> Result<MatchPage>;
}

// ---------------------------------------------------------------------------
// HtmlOracle
// ---------------------------------------------------------------------------

/// Settings for [`HtmlOracle`].
#[derive(Debug, Clone)]
pub struct OracleOptions {
    /// Per-request timeout.
    pub page_timeout: Duration,
    /// Wait after a match page loads before reading it.
    pub settle_delay: Duration,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// Oracle that fetches server-rendered HTML and reads it with CSS selectors.
#[derive(Debug, Clone)]
pub struct HtmlOracle {
    client: Client,
    settle_delay: Duration,
}

impl HtmlOracle {
    pub fn new(opts: OracleOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(opts.page_timeout)
            .build()
            .map_err(|e| Cs2StatError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            settle_delay: opts.settle_delay,
        })
    }

    /// Fetch a page body. Returns the final URL (after redirects) and the HTML.
    async fn fetch(&self, url: &str) -> Result<(Url, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Cs2StatError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Cs2StatError::Network(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| Cs2StatError::Network(format!("{url}: body read failed: {e}")))?;

        Ok((final_url, body))
    }
}

#[async_trait]
impl ExtractionOracle for HtmlOracle {
    #[instrument(skip(self))]
    async fn discover_match_links(&self, profile_url: &str, limit: usize) -> Result<Vec<String>> {
        let (base, body) = self.fetch(profile_url).await?;
        let links = parse_match_links(&body, &base, limit)?;
        debug!(count = links.len(), "match links found");
        Ok(links)
    }

    #[instrument(skip(self))]
    async fn extract_match_rows(&self, match_url: &str) -> Result<MatchPage> {
        let (_, body) = self.fetch(match_url).await?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let page = parse_match_page(&body)?;
        debug!(
            rows = page.rows.len(),
            result = %page.result_phrase,
            "match page extracted"
        );
        Ok(page)
    }
}
